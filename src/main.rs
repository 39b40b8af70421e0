use std::process::ExitCode;

use clap::Parser;

fn main() -> ExitCode {
    let cli = household_planner::Cli::parse();
    match household_planner::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}
