use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use clap::Parser;
use wsc_cache::Deadline;
use wsc_cache::WorkspaceCache;
use wsc_conf::Settings;
use wsc_workspace::ChangeFilter;

use crate::args::GlobalArgs;
use crate::commands::Command;
use crate::exit::Exit;
use crate::scan::ScanLoader;

#[derive(Debug, Parser)]
pub struct Watch {
    /// Project or solution files to load.
    #[arg(required = true)]
    paths: Vec<Utf8PathBuf>,

    /// Seconds to wait for each load.
    #[arg(long, default_value_t = 120)]
    timeout: u64,

    /// Seconds between stats reports.
    #[arg(long, default_value_t = 5)]
    interval: u64,
}

impl Command for Watch {
    async fn execute(&self, args: &GlobalArgs) -> Result<Exit> {
        let project_root = std::env::current_dir().context("Failed to read the current directory")?;
        let settings = Settings::new(&project_root).context("Failed to load settings")?;

        let loader = ScanLoader::new(ChangeFilter::from_settings(&settings.watch));
        let cache = WorkspaceCache::builder(settings.cache, loader)
            .watch(settings.watch)
            .spawn()
            .context("Failed to start the file watcher")?;

        let timeout = Duration::from_secs(self.timeout);
        let mut failed = 0;
        for path in &self.paths {
            if !warm(&cache, path, timeout, args.quiet).await {
                failed += 1;
            }
        }
        if failed == self.paths.len() {
            cache.shutdown().await;
            return Ok(Exit::error().with_message("No workspace could be loaded."));
        }

        let period = Duration::from_secs(self.interval.max(1));
        let mut ticker = tokio::time::interval(period);
        loop {
            tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    signal.context("Failed to listen for Ctrl-C")?;
                    break;
                }
                _ = ticker.tick() => {
                    if !args.quiet {
                        println!("{}", serde_json::to_string(&cache.stats())?);
                    }
                }
            }
        }

        cache.shutdown().await;
        if failed > 0 {
            let total = self.paths.len();
            return Ok(Exit::error().with_message(format!(
                "{failed} of {total} workspaces failed to load."
            )));
        }
        Ok(Exit::success())
    }
}

async fn warm(cache: &WorkspaceCache<ScanLoader>, path: &Utf8Path, timeout: Duration, quiet: bool) -> bool {
    let handle = match cache.get_or_load(path, &Deadline::after(timeout)).await {
        Ok(handle) => handle,
        Err(err) => {
            tracing::error!("{err}");
            return false;
        }
    };

    let warmed = match handle.analyze(&Deadline::after(timeout)).await {
        Ok(tree) => {
            if !quiet {
                println!(
                    "{} ({:?}): {} files, {} KiB",
                    handle.path(),
                    tree.kind,
                    tree.files.len(),
                    tree.total_bytes / 1024
                );
            }
            true
        }
        Err(err) => {
            tracing::error!("{err}");
            false
        }
    };
    warmed
}
