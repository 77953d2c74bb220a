//! CLI argument definitions for the `gadget` command.

use clap::{Parser, Subcommand};
use gadget_config::{DEFAULT_LISTEN_HOST, DEFAULT_LISTEN_PORT};

/// Command-line client for a gadget server.
#[derive(Parser, Debug)]
#[command(name = "gadget", disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Server host name or address.
    #[arg(long, default_value = DEFAULT_LISTEN_HOST)]
    pub(crate) host: String,
    /// Server TCP port.
    #[arg(long, default_value_t = DEFAULT_LISTEN_PORT)]
    pub(crate) port: u16,
    /// Operation to perform.
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Operations offered by the client.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum CliCommand {
    /// Lists the targets the server can attach to.
    ListApps,
    /// Attaches the server to a target.
    Attach {
        /// Target identifier.
        target: String,
    },
    /// Calls an operation on an attached target.
    Call {
        /// Target identifier.
        target: String,
        /// Operation name.
        method: String,
        /// Positional arguments. Each is parsed as JSON; text that is not
        /// valid JSON is sent as a string.
        #[arg(
            value_name = "ARG",
            num_args = 0..,
            trailing_var_arg = true,
            allow_hyphen_values = true
        )]
        arguments: Vec<String>,
    },
}
