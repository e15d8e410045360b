use anyhow::Context;
use anyhow::Result;
use camino::Utf8PathBuf;
use clap::Parser;
use wsc_conf::Settings;

use crate::args::GlobalArgs;
use crate::commands::Command;
use crate::exit::Exit;

#[derive(Debug, Parser)]
pub struct Config {
    /// Project directory whose config files to read. Defaults to the
    /// current directory.
    #[arg(long)]
    project: Option<Utf8PathBuf>,

    /// Print JSON instead of TOML.
    #[arg(long)]
    json: bool,
}

impl Command for Config {
    async fn execute(&self, _args: &GlobalArgs) -> Result<Exit> {
        let project_root = match &self.project {
            Some(dir) => dir.clone().into_std_path_buf(),
            None => std::env::current_dir().context("Failed to read the current directory")?,
        };
        let settings = Settings::new(&project_root).context("Failed to load settings")?;

        let rendered = if self.json {
            serde_json::to_string_pretty(&settings)?
        } else {
            toml::to_string_pretty(&settings).context("Failed to render settings")?
        };
        print!("{rendered}");
        if !rendered.ends_with('\n') {
            println!();
        }
        Ok(Exit::success())
    }
}
