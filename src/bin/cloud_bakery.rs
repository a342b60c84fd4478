use std::process::ExitCode;

use cloud_bakery::cli::runner::run_bakery_cli;

fn main() -> ExitCode {
    run_bakery_cli()
}
