mod args;
mod cli;
mod commands;
mod exit;
mod logging;
mod scan;

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match cli::run(std::env::args().collect()).await {
        Ok(exit) => exit.report(),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
