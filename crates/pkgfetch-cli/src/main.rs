mod cli;
mod progress;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{App, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let app = App::parse();
    init_tracing(app.verbose);

    match app.cmd {
        Commands::Fetch(arg) => cli::fetch::run(arg, app.config.as_deref(), app.verbose).await,
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
