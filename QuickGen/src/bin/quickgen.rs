use std::process::ExitCode;

fn main() -> ExitCode {
    quickgen::cli::run_cli()
}
