//! Tracing setup for the `wsc` binary.
//!
//! Two layers: human-readable output on stderr, sized by `-q`/`-v`, and a
//! daily-rolling log file that always records at `info` or above. `RUST_LOG`
//! overrides both filters.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::Registry;

use crate::args::GlobalArgs;

const LOG_FILE: &str = "wsc.log";

/// Filter directive for the stderr layer when `RUST_LOG` is unset.
fn stderr_directive(args: &GlobalArgs) -> &'static str {
    if args.quiet {
        return "off";
    }
    match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn env_filter_or(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

fn log_dir() -> PathBuf {
    let dir = wsc_conf::project_dirs()
        .map_or_else(std::env::temp_dir, |dirs| dirs.cache_dir().join("logs"));
    match std::fs::create_dir_all(&dir) {
        Ok(()) => dir,
        Err(_) => std::env::temp_dir(),
    }
}

/// Install the global subscriber.
///
/// Returns a `WorkerGuard` that must be kept alive for the file logging to work.
pub fn init_tracing(args: &GlobalArgs) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(log_dir(), LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(env_filter_or("info"));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(env_filter_or(stderr_directive(args)));

    // A subscriber may already be installed (tests, embedding); keep it.
    let _ = Registry::default()
        .with(file_layer)
        .with(stderr_layer)
        .try_init();

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(quiet: bool, verbose: u8) -> GlobalArgs {
        GlobalArgs { quiet, verbose }
    }

    #[test]
    fn verbosity_raises_stderr_level() {
        assert_eq!(stderr_directive(&args(false, 0)), "warn");
        assert_eq!(stderr_directive(&args(false, 1)), "info");
        assert_eq!(stderr_directive(&args(false, 2)), "debug");
        assert_eq!(stderr_directive(&args(false, 7)), "trace");
    }

    #[test]
    fn quiet_silences_stderr() {
        assert_eq!(stderr_directive(&args(true, 0)), "off");
    }
}
