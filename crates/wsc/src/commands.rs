mod config;
mod watch;

use anyhow::Result;
use clap::Subcommand;

use crate::args::GlobalArgs;
use crate::exit::Exit;

pub trait Command {
    async fn execute(&self, args: &GlobalArgs) -> Result<Exit>;
}

#[derive(Debug, Subcommand)]
pub enum WscCommand {
    /// Print the effective configuration
    Config(self::config::Config),
    /// Load workspaces into the cache and report its state until interrupted
    Watch(self::watch::Watch),
}

impl Command for WscCommand {
    async fn execute(&self, args: &GlobalArgs) -> Result<Exit> {
        match self {
            WscCommand::Config(command) => command.execute(args).await,
            WscCommand::Watch(command) => command.execute(args).await,
        }
    }
}
