use anyhow::Result;
use clap::Parser;

use crate::args::Args;
use crate::commands::Command;
use crate::commands::WscCommand;
use crate::exit::Exit;
use crate::logging;

/// Keep loaded workspaces warm and watch them for changes.
#[derive(Parser)]
#[command(name = "wsc")]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: WscCommand,

    #[command(flatten)]
    pub args: Args,
}

/// Parse CLI arguments and execute the chosen command
pub async fn run(args: Vec<String>) -> Result<Exit> {
    let cli = Cli::try_parse_from(args).unwrap_or_else(|e| {
        e.exit();
    });

    let _guard = logging::init_tracing(&cli.args.global);
    cli.command.execute(&cli.args.global).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_watch_with_globals() {
        let cli = Cli::try_parse_from(["wsc", "watch", "a.csproj", "b.sln", "-vv", "--interval", "2"])
            .unwrap();
        assert_eq!(cli.args.global.verbose, 2);
        assert!(matches!(cli.command, WscCommand::Watch(_)));
    }

    #[test]
    fn watch_requires_a_path() {
        assert!(Cli::try_parse_from(["wsc", "watch"]).is_err());
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["wsc", "config", "-q", "-v"]).is_err());
    }
}
