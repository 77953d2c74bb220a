//! Client library and command-line interface for the Gadget RPC bridge.
//!
//! [`GadgetClient`] speaks the length-prefixed JSON protocol over a blocking
//! TCP stream. The `gadget` binary wraps it with three commands:
//! `list-apps`, `attach <target>`, and `call <target> <method> [ARG...]`.
//! Successful payloads are printed to stdout as JSON; failures are written
//! to stderr and produce a non-zero exit code.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use serde_json::Value;

mod cli;
mod client;
mod errors;

use cli::{Cli, CliCommand};
pub use client::{CONNECTION_TIMEOUT, GadgetClient};
use errors::AppError;
pub use errors::ClientError;

/// Runs the `gadget` command with `args`, writing to the given streams.
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    match execute(args, stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(AppError::CliUsage(error)) => {
            let code = if error.use_stderr() {
                ExitCode::from(2)
            } else {
                ExitCode::SUCCESS
            };
            let rendered = error.render().to_string();
            let _ = if error.use_stderr() {
                stderr.write_all(rendered.as_bytes())
            } else {
                stdout.write_all(rendered.as_bytes())
            };
            code
        }
        Err(error) => {
            let _ = writeln!(stderr, "gadget: {error}");
            ExitCode::FAILURE
        }
    }
}

fn execute<I, W>(args: I, stdout: &mut W) -> Result<(), AppError>
where
    I: IntoIterator<Item = OsString>,
    W: Write,
{
    let cli = Cli::try_parse_from(args).map_err(AppError::CliUsage)?;
    let mut client = GadgetClient::connect(&cli.host, cli.port)?;
    let payload = match cli.command {
        CliCommand::ListApps => Value::from(client.list_apps()?),
        CliCommand::Attach { target } => Value::String(client.connect_app(&target)?),
        CliCommand::Call {
            target,
            method,
            arguments,
        } => {
            let arguments = arguments.iter().map(|raw| parse_argument(raw)).collect();
            client.call(&target, &method, arguments)?
        }
    };
    let rendered = serde_json::to_string_pretty(&payload).map_err(AppError::Render)?;
    writeln!(stdout, "{rendered}").map_err(AppError::Output)
}

fn parse_argument(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()))
}

#[cfg(test)]
mod tests;
