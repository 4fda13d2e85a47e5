//! CLI entry point for webdl.

use std::process::ExitCode;

mod app;
mod app_config;
mod cli;

use app::exit_handler::ProcessExit;

#[tokio::main]
async fn main() -> ExitCode {
    // Dropping the run future on Ctrl-C aborts in-flight downloads; their
    // partial files are removed as the tasks unwind.
    let exit = tokio::select! {
        result = app::runtime::run_webdl() => match result {
            Ok(exit) => exit,
            Err(err) => {
                eprintln!("Error: {err:#}");
                ProcessExit::Failure
            }
        },
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Interrupted");
            ProcessExit::Interrupted
        }
    };
    exit.into()
}
