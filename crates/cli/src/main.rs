use std::process::ExitCode;

fn main() -> ExitCode {
    herald_cli::run()
}
