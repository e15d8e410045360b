use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use config::Config;
use config::ConfigError as ExternalConfigError;
use config::Environment;
use config::File;
use config::FileFormat;
use config::Map;
use directories::ProjectDirs;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Prefix for environment overrides, e.g. `WSC_CACHE__MAX_ENTRIES=3`.
const ENV_PREFIX: &str = "WSC";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration build/deserialize error")]
    Config(#[from] ExternalConfigError),
    #[error("Invalid value {value} for `{key}`: must be at least {minimum}")]
    Invalid {
        key: &'static str,
        value: u64,
        minimum: u64,
    },
}

/// Platform directories for wsc (config, cache, logs).
#[must_use]
pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "wsc", "wsc")
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub cache: CacheSettings,
    pub watch: WatchSettings,
}

/// Options for the workspace cache and its eviction policies.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CacheSettings {
    /// When false, every request loads a fresh context and nothing is retained.
    pub enabled: bool,
    pub max_entries: usize,
    pub idle_timeout_minutes: u64,
    /// Soft budget for process memory; exceeding it triggers pressure eviction.
    pub max_memory_mb: u64,
    /// Debounce width for file-change invalidation.
    pub quiescence_window_seconds: u64,
    /// Artifact extensions that describe a multi-project workspace.
    pub solution_extensions: Vec<String>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 5,
            idle_timeout_minutes: 30,
            max_memory_mb: 4096,
            quiescence_window_seconds: 2,
            solution_extensions: vec!["sln".to_string(), "slnx".to_string()],
        }
    }
}

impl CacheSettings {
    pub const MIN_MAX_ENTRIES: u64 = 1;
    pub const MIN_IDLE_TIMEOUT_MINUTES: u64 = 1;
    pub const MIN_MAX_MEMORY_MB: u64 = 256;
    pub const MIN_QUIESCENCE_WINDOW_SECONDS: u64 = 1;

    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_minutes.saturating_mul(60))
    }

    /// Period of the background idle/memory sweep.
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        self.idle_timeout() / 2
    }

    #[must_use]
    pub fn quiescence_window(&self) -> Duration {
        Duration::from_secs(self.quiescence_window_seconds)
    }

    #[must_use]
    pub fn max_memory_bytes(&self) -> u64 {
        self.max_memory_mb.saturating_mul(1024 * 1024)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        at_least(
            "cache.max_entries",
            self.max_entries as u64,
            Self::MIN_MAX_ENTRIES,
        )?;
        at_least(
            "cache.idle_timeout_minutes",
            self.idle_timeout_minutes,
            Self::MIN_IDLE_TIMEOUT_MINUTES,
        )?;
        at_least(
            "cache.max_memory_mb",
            self.max_memory_mb,
            Self::MIN_MAX_MEMORY_MB,
        )?;
        at_least(
            "cache.quiescence_window_seconds",
            self.quiescence_window_seconds,
            Self::MIN_QUIESCENCE_WINDOW_SECONDS,
        )
    }
}

/// Options for the file change watcher.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct WatchSettings {
    /// Extensions (without the leading dot) whose changes can invalidate a workspace.
    pub extensions: Vec<String>,
    /// Directory names skipped anywhere below a watched root.
    pub exclude_dirs: Vec<String>,
    /// Capacity of the bounded change-event channel.
    pub buffer_capacity: usize,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            extensions: [
                "cs", "vb", "fs", "csproj", "vbproj", "fsproj", "sln", "slnx", "props",
                "targets", "editorconfig",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            exclude_dirs: ["bin", "obj", ".git", ".vs", "node_modules"]
                .into_iter()
                .map(String::from)
                .collect(),
            buffer_capacity: 1024,
        }
    }
}

impl WatchSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        at_least("watch.buffer_capacity", self.buffer_capacity as u64, 1)
    }
}

fn at_least(key: &'static str, value: u64, minimum: u64) -> Result<(), ConfigError> {
    if value < minimum {
        return Err(ConfigError::Invalid {
            key,
            value,
            minimum,
        });
    }
    Ok(())
}

impl Settings {
    /// Load settings for a project, layering user config, project files and
    /// `WSC_*` environment variables on top of the defaults.
    pub fn new(project_root: &Path) -> Result<Self, ConfigError> {
        let user_config_file = project_dirs().map(|dirs| dirs.config_dir().join("wsc.toml"));

        Self::load_from_paths(project_root, user_config_file.as_deref(), None)
    }

    /// `env` replaces the process environment when given, so tests don't have
    /// to mutate global state.
    fn load_from_paths(
        project_root: &Path,
        user_config_path: Option<&Path>,
        env: Option<Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = user_config_path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        for path in Self::project_files(project_root) {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;

        tracing::debug!(?settings, "Loaded settings for {}", project_root.display());
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()?;
        self.watch.validate()
    }

    /// Candidate config files for a project, in increasing precedence.
    #[must_use]
    pub fn project_files(project_root: &Path) -> Vec<PathBuf> {
        [".wsc.toml", "wsc.toml"]
            .into_iter()
            .map(|name| project_root.join(name))
            .collect()
    }
}
