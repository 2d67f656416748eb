//! Command-line entry points.

pub mod duration;
pub mod init;
pub mod migrate;
pub mod queue;
pub mod watch;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Configuration initialization")]
    Init(init::InitArgs),
    #[command(about = "Capture activity and sync it until interrupted")]
    Watch,
    #[command(about = "Inspect or change the database schema version")]
    Migrate(migrate::MigrateArgs),
    #[command(about = "Show recorded activity for a timer", arg_required_else_help = true)]
    Duration(duration::DurationArgs),
    #[command(about = "List entries waiting to be pushed to the server")]
    Queue,
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help(true))]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    pub async fn menu() -> Result<()> {
        let cli = Self::parse();
        match cli.command {
            Commands::Init(args) => init::cmd(args),
            Commands::Watch => watch::cmd().await,
            Commands::Migrate(args) => migrate::cmd(args),
            Commands::Duration(args) => duration::cmd(args),
            Commands::Queue => queue::cmd(),
        }
    }
}
