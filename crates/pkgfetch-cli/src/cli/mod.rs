pub mod fetch;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Clone, Debug, Parser)]
#[command(name = "pkgfetch", version = env!("CARGO_PKG_VERSION"), about, long_about = None, propagate_version = true)]
pub struct App {
    #[command(subcommand)]
    pub cmd: Commands,

    /// More output: -v for debug, -vv for trace. `RUST_LOG` wins when set.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// TOML file with engine settings.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    #[command(alias = "f", name = "fetch", about = "Fetch one artifact, conditionally and across mirrors")]
    Fetch(fetch::FetchArg),
}
