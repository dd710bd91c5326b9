pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mega")]
#[command(version)]
#[command(about = "Command-line client for the MEGA cloud storage service")]
pub struct Args {
    /// Config file path (defaults to ~/.megacli.json)
    #[arg(long = "conf", global = true)]
    pub conf: Option<PathBuf>,

    /// Recursive listing
    #[arg(long, global = true)]
    pub recursive: bool,

    /// Force hard delete or overwrite
    #[arg(long, global = true)]
    pub force: bool,

    /// Verbosity level
    #[arg(long, global = true, default_value_t = 0)]
    pub verbose: u8,

    /// Skip a transfer when the destination already has a file of the
    /// same size
    #[arg(long = "skip-same-size", global = true)]
    pub skip_same_size: bool,

    /// Skip unreadable local entries during sync
    #[arg(long = "skip-error", global = true)]
    pub skip_error: bool,

    #[command(subcommand)]
    pub command: crate::Command,
}
