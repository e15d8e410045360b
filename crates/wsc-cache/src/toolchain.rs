//! One-time registration of the external build toolchain.
//!
//! Loaders typically depend on a process-wide setup step (locating an SDK,
//! registering build assemblies) that must run exactly once before the first
//! load. [`ToolchainRegistry`] runs it lazily and remembers the outcome; the
//! cache receives a registry instead of reaching for a static, so tests can
//! substitute their own.

use std::sync::Arc;
use std::sync::OnceLock;

use crate::loader::LoadError;

/// A process-wide setup step required before any project can load.
pub trait Toolchain: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn register(&self) -> anyhow::Result<()>;
}

/// Toolchain for loaders that need no setup.
#[derive(Debug, Default)]
pub struct NoToolchain;

impl Toolchain for NoToolchain {
    fn name(&self) -> &str {
        "none"
    }

    fn register(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

pub struct ToolchainRegistry {
    toolchain: Box<dyn Toolchain>,
    outcome: OnceLock<Result<(), String>>,
}

impl std::fmt::Debug for ToolchainRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolchainRegistry")
            .field("toolchain", &self.toolchain.name())
            .field("outcome", &self.outcome.get())
            .finish()
    }
}

impl ToolchainRegistry {
    #[must_use]
    pub fn new(toolchain: impl Toolchain) -> Self {
        Self {
            toolchain: Box::new(toolchain),
            outcome: OnceLock::new(),
        }
    }

    /// Register the toolchain on first call; later calls replay the outcome.
    pub fn ensure_registered(&self) -> Result<(), LoadError> {
        self.outcome
            .get_or_init(|| {
                let name = self.toolchain.name();
                match self.toolchain.register() {
                    Ok(()) => {
                        tracing::info!("Registered toolchain {name}");
                        Ok(())
                    }
                    Err(err) => {
                        tracing::error!("Failed to register toolchain {name}: {err:#}");
                        Err(format!("toolchain {name} failed to register: {err:#}"))
                    }
                }
            })
            .clone()
            .map_err(LoadError::build_failure)
    }

    #[must_use]
    pub fn is_registered(&self) -> bool {
        matches!(self.outcome.get(), Some(Ok(())))
    }
}

impl Default for ToolchainRegistry {
    fn default() -> Self {
        Self::new(NoToolchain)
    }
}

static GLOBAL_TOOLCHAIN: OnceLock<Arc<ToolchainRegistry>> = OnceLock::new();

/// Install the process-wide registry. Returns `false` if one was already set.
pub fn install_global_toolchain(toolchain: impl Toolchain) -> bool {
    GLOBAL_TOOLCHAIN
        .set(Arc::new(ToolchainRegistry::new(toolchain)))
        .is_ok()
}

/// Get the process-wide registry, defaulting to [`NoToolchain`].
pub fn global_toolchain() -> Arc<ToolchainRegistry> {
    Arc::clone(GLOBAL_TOOLCHAIN.get_or_init(Arc::default))
}
