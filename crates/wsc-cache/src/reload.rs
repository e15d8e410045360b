//! Debounced invalidation of cached workspaces on file changes.
//!
//! Editors and build tools touch files in bursts. Each change stamps the
//! owning workspaces; a workspace is only evicted once it has been quiet for
//! a full quiescence window, so a burst costs one eviction and one reload.

use std::sync::Weak;
use std::time::Duration;

use rustc_hash::FxHashMap;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use wsc_workspace::ChangeEvent;
use wsc_workspace::WorkspaceKey;

use crate::cache::CacheInner;
use crate::cache::WorkspaceCache;
use crate::loader::ProjectLoader;

pub struct ReloadCoordinator<L: ProjectLoader> {
    cache: Weak<CacheInner<L>>,
    window: Duration,
    /// Last change seen per workspace.
    pending: FxHashMap<WorkspaceKey, Instant>,
}

impl<L: ProjectLoader> ReloadCoordinator<L> {
    /// A coordinator using the cache's configured quiescence window.
    #[must_use]
    pub fn new(cache: &WorkspaceCache<L>) -> Self {
        Self::with_window(cache, cache.settings().quiescence_window())
    }

    #[must_use]
    pub fn with_window(cache: &WorkspaceCache<L>, window: Duration) -> Self {
        Self {
            cache: cache.downgrade(),
            window,
            pending: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Number of workspaces waiting for their window to pass.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn cache(&self) -> Option<WorkspaceCache<L>> {
        self.cache.upgrade().map(WorkspaceCache::from_inner)
    }

    /// Stamp every cached workspace that owns the changed file.
    ///
    /// Returns how many workspaces were stamped.
    pub fn record(&mut self, event: &ChangeEvent) -> usize {
        let Some(cache) = self.cache() else {
            return 0;
        };

        let now = Instant::now();
        let mut stamped = 0;
        for key in cache.keys() {
            if key.owns(&event.path) {
                tracing::trace!(kind = ?event.kind, "{} changed under {key}", event.path);
                self.pending.insert(key, now);
                stamped += 1;
            }
        }
        stamped
    }

    /// Evict every stamped workspace that has been quiet for a full window.
    ///
    /// Returns the keys that were actually evicted. A workspace that already
    /// left the cache, or was reloaded after its last change, is dropped from
    /// the pending set silently. Never waits on a workspace in use; disposal
    /// happens in the background.
    pub fn flush(&mut self) -> Vec<WorkspaceKey> {
        let Some(cutoff) = Instant::now().checked_sub(self.window) else {
            return Vec::new();
        };

        let quiet: Vec<(WorkspaceKey, Instant)> = self
            .pending
            .iter()
            .filter(|(_, stamped)| **stamped < cutoff)
            .map(|(key, stamped)| (key.clone(), *stamped))
            .collect();
        if quiet.is_empty() {
            return Vec::new();
        }
        for (key, _) in &quiet {
            self.pending.remove(key);
        }

        let Some(cache) = self.cache() else {
            return Vec::new();
        };

        let mut evicted = Vec::with_capacity(quiet.len());
        for (key, changed_at) in quiet {
            if cache.invalidate(&key, changed_at) {
                tracing::info!("Workspace {key} changed on disk; it will reload on next use");
                evicted.push(key);
            }
        }
        evicted
    }

    /// Consume change events until `shutdown` fires, the event stream ends, or
    /// the cache is dropped.
    pub async fn run(mut self, mut events: mpsc::Receiver<ChangeEvent>, shutdown: CancellationToken) {
        let period = self.window.max(Duration::from_millis(100));
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => {
                        self.record(&event);
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    if self.cache.strong_count() == 0 {
                        break;
                    }
                    self.flush();
                }
            }
        }
        tracing::debug!("Reload coordinator stopped");
    }
}
