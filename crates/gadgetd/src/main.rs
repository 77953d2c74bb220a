use std::process::ExitCode;

fn main() -> ExitCode {
    match gadgetd::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("gadgetd: {error}");
            ExitCode::FAILURE
        }
    }
}
