//! The keyed workspace cache.
//!
//! Locking follows two tiers. The structural lock (`entries`) guards the map
//! and is only held for short, synchronous bookkeeping; it is never held
//! across a load or while waiting on a handle's exclusive lock. Handle locks
//! are taken only after the handle has left the structural critical section.
//! Watch registration happens after the structural lock is released, under
//! its own lock, so the notify backend never runs inside the map's critical
//! section.
//!
//! Evictions triggered as a side effect (capacity, idle, memory pressure and
//! invalidation) leave the map immediately and are disposed on background
//! tasks, since a victim may be in use. Explicit `remove` and `clear_all` wait
//! for disposal.

use std::io;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::Weak;
use std::time::Duration;

use camino::Utf8Path;
use rustc_hash::FxHashMap;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use wsc_conf::CacheSettings;
use wsc_conf::WatchSettings;
use wsc_workspace::FileChangeWatcher;
use wsc_workspace::ProjectKind;
use wsc_workspace::WatchError;
use wsc_workspace::WorkspaceKey;

use crate::deadline::Deadline;
use crate::error::CacheError;
use crate::error::Operation;
use crate::handle::WorkspaceHandle;
use crate::handle::WorkspaceState;
use crate::loader::ProjectLoader;
use crate::memory::MemoryProbe;
use crate::memory::ProcessMemory;
use crate::reload::ReloadCoordinator;
use crate::stats::CacheStats;
use crate::stats::EvictionCounters;
use crate::stats::EvictionReason;
use crate::toolchain::global_toolchain;
use crate::toolchain::ToolchainRegistry;

type Handle<L> = Arc<WorkspaceHandle<<L as ProjectLoader>::Context>>;

const BYTES_PER_MB: u64 = 1024 * 1024;

enum Slot<L: ProjectLoader> {
    /// A load is in flight. Waiters wake when the loader drops its sender.
    Loading { id: u64, done: watch::Receiver<()> },
    Ready(Handle<L>),
}

enum Claim<'a, L: ProjectLoader> {
    Hit(Handle<L>),
    Wait(watch::Receiver<()>),
    Load(LoadTicket<'a, L>),
}

/// Ownership of an in-flight load for one key.
///
/// Dropping the ticket without inserting a handle (failure, timeout, or the
/// caller's future being dropped) removes the placeholder, then wakes waiters
/// so one of them can retry.
struct LoadTicket<'a, L: ProjectLoader> {
    inner: &'a CacheInner<L>,
    key: WorkspaceKey,
    id: u64,
    _done: watch::Sender<()>,
}

impl<L: ProjectLoader> Drop for LoadTicket<'_, L> {
    fn drop(&mut self) {
        let mut entries = self.inner.entries();
        if matches!(entries.get(&self.key), Some(Slot::Loading { id, .. }) if *id == self.id) {
            entries.remove(&self.key);
        }
    }
}

/// Outcome of one background sweep.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub idle: usize,
    pub memory_pressure: usize,
}

pub(crate) struct CacheInner<L: ProjectLoader> {
    settings: CacheSettings,
    loader: L,
    toolchain: Arc<ToolchainRegistry>,
    memory: Arc<dyn MemoryProbe>,
    watcher: Option<FileChangeWatcher>,
    entries: Mutex<FxHashMap<WorkspaceKey, Slot<L>>>,
    next_load_id: AtomicU64,
    evictions: EvictionCounters,
    shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    /// Background disposals of evicted handles.
    disposals: Mutex<JoinSet<()>>,
    /// Serializes watch and unwatch calls.
    watch_sync: Mutex<()>,
}

impl<L: ProjectLoader> CacheInner<L> {
    fn entries(&self) -> MutexGuard<'_, FxHashMap<WorkspaceKey, Slot<L>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn disposals(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.disposals.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove a ready entry. The caller reconciles its watch once the
    /// structural lock is released.
    fn detach(
        entries: &mut FxHashMap<WorkspaceKey, Slot<L>>,
        key: &WorkspaceKey,
    ) -> Option<Handle<L>> {
        if !matches!(entries.get(key), Some(Slot::Ready(_))) {
            return None;
        }
        match entries.remove(key) {
            Some(Slot::Ready(handle)) => Some(handle),
            _ => None,
        }
    }

    /// Detach the `count` least recently accessed entries, oldest first.
    fn detach_least_recent(
        entries: &mut FxHashMap<WorkspaceKey, Slot<L>>,
        count: usize,
    ) -> Vec<Handle<L>> {
        if count == 0 {
            return Vec::new();
        }

        let mut by_recency: Vec<(Instant, WorkspaceKey)> = entries
            .iter()
            .filter_map(|(key, slot)| match slot {
                Slot::Ready(handle) => Some((handle.last_accessed(), key.clone())),
                Slot::Loading { .. } => None,
            })
            .collect();
        // ties fall back to key order
        by_recency.sort();

        by_recency
            .into_iter()
            .take(count)
            .filter_map(|(_, key)| Self::detach(entries, &key))
            .collect()
    }

    /// Watch `key`'s root while any ready entry lives under it, and release
    /// it otherwise. Must not be called with the structural lock held.
    fn sync_watch(&self, key: &WorkspaceKey) {
        let Some(watcher) = &self.watcher else {
            return;
        };
        let _serial = self.watch_sync.lock().unwrap_or_else(PoisonError::into_inner);

        let in_use = self
            .entries()
            .iter()
            .any(|(other, slot)| matches!(slot, Slot::Ready(_)) && other.shares_root(key));
        if in_use {
            if let Err(err) = watcher.watch(key.root_dir()) {
                tracing::warn!("Changes to {key} will not be detected: {err}");
            }
        } else {
            watcher.unwatch(key.root_dir());
        }
    }
}

impl<L: ProjectLoader> Drop for CacheInner<L> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn ready_count<L: ProjectLoader>(entries: &FxHashMap<WorkspaceKey, Slot<L>>) -> usize {
    entries
        .values()
        .filter(|slot| matches!(slot, Slot::Ready(_)))
        .count()
}

/// Configures and creates a [`WorkspaceCache`].
pub struct CacheBuilder<L: ProjectLoader> {
    settings: CacheSettings,
    loader: L,
    toolchain: Option<Arc<ToolchainRegistry>>,
    memory: Option<Arc<dyn MemoryProbe>>,
    watch: Option<WatchSettings>,
}

impl<L: ProjectLoader> CacheBuilder<L> {
    #[must_use]
    pub fn new(settings: CacheSettings, loader: L) -> Self {
        Self {
            settings,
            loader,
            toolchain: None,
            memory: None,
            watch: None,
        }
    }

    /// Use `toolchain` instead of the process-wide registry.
    #[must_use]
    pub fn toolchain(mut self, toolchain: Arc<ToolchainRegistry>) -> Self {
        self.toolchain = Some(toolchain);
        self
    }

    #[must_use]
    pub fn memory_probe(mut self, probe: impl MemoryProbe) -> Self {
        self.memory = Some(Arc::new(probe));
        self
    }

    /// Watch cached workspaces for file changes when spawned.
    #[must_use]
    pub fn watch(mut self, settings: WatchSettings) -> Self {
        self.watch = Some(settings);
        self
    }

    /// Build a passive cache: no watcher and no background tasks.
    ///
    /// Eviction only happens inline on insert or when the sweep methods are
    /// called explicitly.
    #[must_use]
    pub fn build(self) -> WorkspaceCache<L> {
        self.into_cache(None)
    }

    /// Build the cache and start its background work.
    ///
    /// Spawns the idle/memory sweep and, when watching is configured, the
    /// file watcher and reload coordinator. Must be called within a Tokio
    /// runtime. Background tasks stop on [`WorkspaceCache::shutdown`] or when
    /// the last clone of the cache is dropped.
    pub fn spawn(mut self) -> Result<WorkspaceCache<L>, WatchError> {
        let enabled = self.settings.enabled;
        let watch = self.watch.take().filter(|_| enabled);

        let (watcher, events) = match watch {
            Some(settings) => {
                let (watcher, events) = FileChangeWatcher::new(&settings)?;
                (Some(watcher), Some(events))
            }
            None => (None, None),
        };

        let cache = self.into_cache(watcher);
        if !enabled {
            return Ok(cache);
        }

        let shutdown = cache.inner.shutdown.clone();
        let mut tasks = Vec::new();

        let period = cache.inner.settings.sweep_interval().max(Duration::from_secs(1));
        tasks.push(tokio::spawn(run_maintenance(
            Arc::downgrade(&cache.inner),
            period,
            shutdown.clone(),
        )));

        if let Some(events) = events {
            let coordinator = ReloadCoordinator::new(&cache);
            tasks.push(tokio::spawn(coordinator.run(events, shutdown)));
        }

        *cache
            .inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = tasks;
        Ok(cache)
    }

    fn into_cache(self, watcher: Option<FileChangeWatcher>) -> WorkspaceCache<L> {
        WorkspaceCache {
            inner: Arc::new(CacheInner {
                settings: self.settings,
                loader: self.loader,
                toolchain: self.toolchain.unwrap_or_else(global_toolchain),
                memory: self
                    .memory
                    .unwrap_or_else(|| Arc::new(ProcessMemory::new())),
                watcher,
                entries: Mutex::default(),
                next_load_id: AtomicU64::new(0),
                evictions: EvictionCounters::default(),
                shutdown: CancellationToken::new(),
                tasks: Mutex::default(),
                disposals: Mutex::default(),
                watch_sync: Mutex::default(),
            }),
        }
    }
}

async fn run_maintenance<L: ProjectLoader>(
    cache: Weak<CacheInner<L>>,
    period: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let Some(inner) = cache.upgrade() else { break };
                WorkspaceCache { inner }.sweep();
            }
        }
    }
    tracing::debug!("Cache maintenance stopped");
}

/// Keyed store of loaded workspaces.
///
/// Cheap to clone; all clones share the same entries.
pub struct WorkspaceCache<L: ProjectLoader> {
    inner: Arc<CacheInner<L>>,
}

impl<L: ProjectLoader> Clone for WorkspaceCache<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L: ProjectLoader> std::fmt::Debug for WorkspaceCache<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceCache")
            .field("settings", &self.inner.settings)
            .field("keys", &self.keys())
            .finish_non_exhaustive()
    }
}

impl<L: ProjectLoader> WorkspaceCache<L> {
    /// A passive cache using the process-wide toolchain and memory probe.
    #[must_use]
    pub fn new(settings: CacheSettings, loader: L) -> Self {
        CacheBuilder::new(settings, loader).build()
    }

    #[must_use]
    pub fn builder(settings: CacheSettings, loader: L) -> CacheBuilder<L> {
        CacheBuilder::new(settings, loader)
    }

    #[must_use]
    pub fn settings(&self) -> &CacheSettings {
        &self.inner.settings
    }

    pub(crate) fn downgrade(&self) -> Weak<CacheInner<L>> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn from_inner(inner: Arc<CacheInner<L>>) -> Self {
        Self { inner }
    }

    /// Return the cached workspace for `path`, loading it on a miss.
    ///
    /// Concurrent calls for the same uncached path share a single load. A
    /// failed load leaves nothing behind, so the next call retries; callers
    /// that were waiting on a failed load retry it themselves.
    pub async fn get_or_load(
        &self,
        path: impl AsRef<Utf8Path>,
        deadline: &Deadline,
    ) -> Result<Handle<L>, CacheError> {
        let key = resolve(path.as_ref())?;

        if !self.inner.settings.enabled {
            return self.load(&key, deadline).await.map(Arc::new);
        }

        loop {
            match self.claim(&key) {
                Claim::Hit(handle) => return Ok(handle),
                Claim::Load(ticket) => return self.load_and_insert(ticket, deadline).await,
                Claim::Wait(mut done) => {
                    tracing::debug!("Waiting for in-flight load of {key}");
                    // Err only means the loader is gone, which is what we wait for.
                    deadline
                        .run(key.path(), Operation::Load, async move {
                            let _ = done.changed().await;
                        })
                        .await?;
                }
            }
        }
    }

    fn claim(&self, key: &WorkspaceKey) -> Claim<'_, L> {
        let mut entries = self.inner.entries();
        match entries.get(key) {
            Some(Slot::Ready(handle)) => {
                handle.touch();
                tracing::trace!("Cache hit for {key}");
                Claim::Hit(Arc::clone(handle))
            }
            Some(Slot::Loading { done, .. }) => Claim::Wait(done.clone()),
            None => {
                let id = self.inner.next_load_id.fetch_add(1, Ordering::Relaxed);
                let (sender, done) = watch::channel(());
                entries.insert(key.clone(), Slot::Loading { id, done });
                Claim::Load(LoadTicket {
                    inner: &self.inner,
                    key: key.clone(),
                    id,
                    _done: sender,
                })
            }
        }
    }

    async fn load_and_insert(
        &self,
        ticket: LoadTicket<'_, L>,
        deadline: &Deadline,
    ) -> Result<Handle<L>, CacheError> {
        let handle = Arc::new(self.load(&ticket.key, deadline).await?);

        let evicted = {
            let mut entries = self.inner.entries();
            let excess = (ready_count(&entries) + 1).saturating_sub(self.inner.settings.max_entries);
            let evicted = CacheInner::<L>::detach_least_recent(&mut entries, excess);

            entries.insert(ticket.key.clone(), Slot::Ready(Arc::clone(&handle)));
            evicted
        };
        self.inner.sync_watch(&ticket.key);
        drop(ticket);

        self.retire(evicted, EvictionReason::Capacity);
        Ok(handle)
    }

    async fn load(
        &self,
        key: &WorkspaceKey,
        deadline: &Deadline,
    ) -> Result<WorkspaceHandle<L::Context>, CacheError> {
        self.inner
            .toolchain
            .ensure_registered()
            .map_err(|err| err.into_cache_error(key.path(), deadline))?;

        let kind = ProjectKind::detect(key.path(), &self.inner.settings.solution_extensions);
        tracing::info!(?kind, "Loading workspace {key}");

        let started = Instant::now();
        let loaded = deadline
            .run(
                key.path(),
                Operation::Load,
                self.inner.loader.load(key.path(), kind, deadline),
            )
            .await
            .and_then(|result| result.map_err(|err| err.into_cache_error(key.path(), deadline)));

        match loaded {
            Ok(context) => {
                tracing::info!(elapsed = ?started.elapsed(), "Loaded workspace {key}");
                Ok(WorkspaceHandle::new(key.clone(), kind, context))
            }
            Err(err) => {
                tracing::warn!(elapsed = ?started.elapsed(), "Failed to load workspace {key}: {err}");
                Err(err)
            }
        }
    }

    fn evicted(&self, handle: &Handle<L>, reason: EvictionReason) {
        self.inner.evictions.record(reason);
        tracing::info!(%reason, "Evicting workspace {}", handle.key());
        self.inner.sync_watch(handle.key());
    }

    async fn dispose(&self, handle: Handle<L>, reason: EvictionReason) {
        self.evicted(&handle, reason);
        handle.dispose().await;
    }

    /// Account for detached handles now and dispose them in the background.
    ///
    /// Each handle is disposed once its current holder releases it. Returns
    /// how many handles were retired.
    fn retire(&self, handles: Vec<Handle<L>>, reason: EvictionReason) -> usize {
        self.retire_then(handles, reason, || {})
    }

    fn retire_then(
        &self,
        handles: Vec<Handle<L>>,
        reason: EvictionReason,
        after: impl FnOnce() + Send + 'static,
    ) -> usize {
        let count = handles.len();
        if count == 0 {
            after();
            return 0;
        }
        for handle in &handles {
            self.evicted(handle, reason);
        }

        let mut disposals = self.inner.disposals();
        while disposals.try_join_next().is_some() {}
        disposals.spawn(async move {
            let mut batch = JoinSet::new();
            for handle in handles {
                batch.spawn(async move {
                    handle.dispose().await;
                });
            }
            while batch.join_next().await.is_some() {}
            after();
        });
        count
    }

    /// Wait until every background disposal started so far has finished.
    pub async fn wait_for_disposals(&self) {
        loop {
            let mut pending = std::mem::take(&mut *self.inner.disposals());
            if pending.is_empty() {
                break;
            }
            while let Some(result) = pending.join_next().await {
                if let Err(err) = result {
                    tracing::warn!("Workspace disposal failed: {err}");
                }
            }
        }
    }

    /// Remove and dispose the entry for `path`, if cached.
    ///
    /// Returns whether an entry was removed. In-flight loads are unaffected.
    pub async fn remove(&self, path: impl AsRef<Utf8Path>) -> bool {
        let path = path.as_ref();
        // A deleted artifact can no longer be canonicalized.
        let key = WorkspaceKey::canonicalize(path)
            .unwrap_or_else(|_| WorkspaceKey::from_canonical(path.to_path_buf()));
        let handle = {
            let mut entries = self.inner.entries();
            CacheInner::<L>::detach(&mut entries, &key)
        };
        match handle {
            Some(handle) => {
                self.dispose(handle, EvictionReason::Removed).await;
                true
            }
            None => false,
        }
    }

    /// Evict `key` if it was loaded no later than `changed_at`.
    ///
    /// A handle loaded after the change already reflects it and is kept.
    /// Disposal happens in the background.
    pub(crate) fn invalidate(&self, key: &WorkspaceKey, changed_at: Instant) -> bool {
        let handle = {
            let mut entries = self.inner.entries();
            let stale = matches!(
                entries.get(key),
                Some(Slot::Ready(handle)) if handle.loaded_at() <= changed_at
            );
            if stale {
                CacheInner::<L>::detach(&mut entries, key)
            } else {
                None
            }
        };
        handle.is_some_and(|handle| self.retire(vec![handle], EvictionReason::Invalidated) > 0)
    }

    /// Remove and dispose every cached entry. Returns how many were removed.
    pub async fn clear_all(&self) -> usize {
        let handles: Vec<_> = {
            let mut entries = self.inner.entries();
            let keys: Vec<_> = entries.keys().cloned().collect();
            let detached = keys
                .iter()
                .filter_map(|key| CacheInner::<L>::detach(&mut entries, key))
                .collect();
            detached
        };

        let count = handles.len();
        for handle in handles {
            self.dispose(handle, EvictionReason::Cleared).await;
        }
        if count > 0 {
            tracing::info!("Cleared {count} cached workspaces");
        }
        count
    }

    /// Evict every entry unused for longer than the idle timeout.
    ///
    /// Returns how many entries left the cache; their disposal finishes in
    /// the background, so this must be called within a Tokio runtime.
    pub fn evict_idle(&self) -> usize {
        let idle_timeout = self.inner.settings.idle_timeout();
        let now = Instant::now();

        let handles: Vec<_> = {
            let mut entries = self.inner.entries();
            let expired: Vec<_> = entries
                .iter()
                .filter_map(|(key, slot)| match slot {
                    Slot::Ready(handle)
                        if now.saturating_duration_since(handle.last_accessed()) > idle_timeout =>
                    {
                        Some(key.clone())
                    }
                    _ => None,
                })
                .collect();
            let detached = expired
                .iter()
                .filter_map(|key| CacheInner::<L>::detach(&mut entries, key))
                .collect();
            detached
        };

        self.retire(handles, EvictionReason::Idle)
    }

    /// When process memory exceeds the budget, evict the least recently used
    /// half of the entries (at least one) and ask for memory to be reclaimed
    /// once they are disposed.
    pub fn relieve_memory_pressure(&self) -> usize {
        let Some(resident) = self.inner.memory.resident_bytes() else {
            return 0;
        };
        let budget = self.inner.settings.max_memory_bytes();
        if resident <= budget {
            return 0;
        }

        let handles = {
            let mut entries = self.inner.entries();
            let target = (ready_count(&entries) / 2).max(1);
            CacheInner::<L>::detach_least_recent(&mut entries, target)
        };
        tracing::warn!(
            resident_mb = resident / BYTES_PER_MB,
            budget_mb = budget / BYTES_PER_MB,
            "Memory budget exceeded; evicting {} workspaces",
            handles.len()
        );

        let memory = Arc::clone(&self.inner.memory);
        self.retire_then(handles, EvictionReason::MemoryPressure, move || memory.reclaim())
    }

    /// Run idle eviction, then memory-pressure eviction.
    pub fn sweep(&self) -> SweepReport {
        let report = SweepReport {
            idle: self.evict_idle(),
            memory_pressure: self.relieve_memory_pressure(),
        };
        if report != SweepReport::default() {
            tracing::debug!(?report, "Cache sweep evicted workspaces");
        }
        report
    }

    /// Keys of all ready entries, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<WorkspaceKey> {
        let mut keys: Vec<_> = self
            .inner
            .entries()
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Ready(_)))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    #[must_use]
    pub fn contains(&self, path: impl AsRef<Utf8Path>) -> bool {
        WorkspaceKey::canonicalize(path.as_ref()).is_ok_and(|key| {
            matches!(self.inner.entries().get(&key), Some(Slot::Ready(_)))
        })
    }

    /// Point-in-time snapshot. Has no side effects on entries.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let (handles, loading): (Vec<_>, usize) = {
            let entries = self.inner.entries();
            let handles = entries
                .values()
                .filter_map(|slot| match slot {
                    Slot::Ready(handle) => Some(Arc::clone(handle)),
                    Slot::Loading { .. } => None,
                })
                .collect();
            let loading = entries.len() - ready_count(&entries);
            (handles, loading)
        };

        let mut per_state = std::collections::BTreeMap::new();
        for handle in &handles {
            *per_state.entry(handle.state()).or_insert(0) += 1;
        }
        if loading > 0 {
            per_state.insert(WorkspaceState::Loading, loading);
        }

        CacheStats {
            enabled: self.inner.settings.enabled,
            total_entries: handles.len(),
            max_entries: self.inner.settings.max_entries,
            loading,
            per_state,
            approx_memory_mb: self
                .inner
                .memory
                .resident_bytes()
                .map(|bytes| bytes / BYTES_PER_MB),
            watched_roots: self
                .inner
                .watcher
                .as_ref()
                .map_or(0, |watcher| watcher.watched_roots().len()),
            evictions: self.inner.evictions.snapshot(),
        }
    }

    /// Stop background work and dispose every entry, including entries
    /// still being disposed in the background.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();

        let tasks = std::mem::take(
            &mut *self
                .inner
                .tasks
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for task in tasks {
            if let Err(err) = task.await {
                tracing::warn!("Cache background task failed: {err}");
            }
        }

        let cleared = self.clear_all().await;
        self.wait_for_disposals().await;
        tracing::info!("Workspace cache shut down ({cleared} entries disposed)");
    }
}

fn resolve(path: &Utf8Path) -> Result<WorkspaceKey, CacheError> {
    WorkspaceKey::canonicalize(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => CacheError::NotFound {
            path: path.to_path_buf(),
        },
        _ => CacheError::LoadFailure {
            path: path.to_path_buf(),
            message: format!("failed to resolve path: {err}"),
        },
    })
}
