//! Bounded cache of loaded workspaces.
//!
//! Loading a project into an analysis context is expensive, so contexts are
//! kept in a [`WorkspaceCache`] keyed by canonical path and reused across
//! requests. Entries leave the cache when it is full (least recently used
//! first), when they sit idle, when the process exceeds its memory budget, or
//! when files under them change on disk. Every use of a context goes through
//! its [`WorkspaceHandle`]'s exclusive lock, and every wait is bounded by a
//! [`Deadline`].

mod cache;
mod deadline;
mod error;
mod handle;
mod loader;
mod memory;
mod reload;
mod stats;
mod toolchain;

pub use cache::CacheBuilder;
pub use cache::SweepReport;
pub use cache::WorkspaceCache;
pub use deadline::Deadline;
pub use error::CacheError;
pub use error::ErrorKind;
pub use error::Operation;
pub use handle::Access;
pub use handle::WorkspaceGuard;
pub use handle::WorkspaceHandle;
pub use handle::WorkspaceState;
pub use loader::AnalysisContext;
pub use loader::LoadError;
pub use loader::ProjectLoader;
pub use memory::MemoryProbe;
pub use memory::ProcessMemory;
pub use reload::ReloadCoordinator;
pub use stats::CacheStats;
pub use stats::EvictionCounts;
pub use stats::EvictionReason;
pub use toolchain::global_toolchain;
pub use toolchain::install_global_toolchain;
pub use toolchain::NoToolchain;
pub use toolchain::Toolchain;
pub use toolchain::ToolchainRegistry;
pub use wsc_workspace::ChangeEvent;
pub use wsc_workspace::ChangeKind;
pub use wsc_workspace::ProjectKind;
pub use wsc_workspace::WorkspaceKey;
