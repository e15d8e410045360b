//! File system watching for cache invalidation.
//!
//! [`FileChangeWatcher`] keeps one recursive OS watch per workspace root and
//! forwards interesting changes into a bounded channel. The notify callback
//! runs on the OS notification thread, so it only filters, converts and
//! `try_send`s; all coordination happens on the receiving side.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use notify::event::ModifyKind;
use notify::Config;
use notify::Event;
use notify::EventKind;
use notify::RecommendedWatcher;
use notify::RecursiveMode;
use notify::Watcher;
use rustc_hash::FxHashSet;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::Instant;
use wsc_conf::WatchSettings;

use crate::filter::ChangeFilter;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to create file watcher")]
    Init(#[source] notify::Error),
    #[error("Failed to watch {path}")]
    Watch {
        path: Utf8PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Kind of change observed on a file.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
    Renamed,
}

/// A single filtered change notification.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeEvent {
    pub path: Utf8PathBuf,
    pub kind: ChangeKind,
    pub observed_at: Instant,
}

impl ChangeEvent {
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
            observed_at: Instant::now(),
        }
    }
}

type Roots = Arc<Mutex<FxHashSet<Utf8PathBuf>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Watches workspace root directories and emits [`ChangeEvent`]s.
///
/// Cloning shares the same OS watcher. All OS watches are released when the
/// last clone is dropped.
#[derive(Clone)]
pub struct FileChangeWatcher {
    inner: Arc<WatcherInner>,
}

struct WatcherInner {
    // Never lock `watcher` while holding `roots`: the notify thread takes
    // `roots` inside the callback while `watch` may be waiting on it.
    watcher: Mutex<RecommendedWatcher>,
    roots: Roots,
}

impl std::fmt::Debug for FileChangeWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileChangeWatcher")
            .field("roots", &self.watched_roots())
            .finish_non_exhaustive()
    }
}

impl FileChangeWatcher {
    /// Create a watcher and the receiving end of its event channel.
    ///
    /// The channel holds at most `buffer_capacity` events; when the consumer
    /// falls behind, further events are dropped with a warning.
    pub fn new(settings: &WatchSettings) -> Result<(Self, mpsc::Receiver<ChangeEvent>), WatchError> {
        let (tx, rx) = mpsc::channel(settings.buffer_capacity.max(1));
        let filter = ChangeFilter::from_settings(settings);
        let roots: Roots = Arc::default();

        let callback_roots = Arc::clone(&roots);
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| dispatch(res, &filter, &callback_roots, &tx),
            Config::default(),
        )
        .map_err(WatchError::Init)?;

        let watcher = Self {
            inner: Arc::new(WatcherInner {
                watcher: Mutex::new(watcher),
                roots,
            }),
        };
        Ok((watcher, rx))
    }

    /// Start watching `root` recursively.
    ///
    /// Returns `false` without touching the OS watch when `root` is already watched.
    pub fn watch(&self, root: &Utf8Path) -> Result<bool, WatchError> {
        if !lock(&self.inner.roots).insert(root.to_path_buf()) {
            return Ok(false);
        }

        let result = lock(&self.inner.watcher).watch(root.as_std_path(), RecursiveMode::Recursive);
        if let Err(source) = result {
            lock(&self.inner.roots).remove(root);
            return Err(WatchError::Watch {
                path: root.to_path_buf(),
                source,
            });
        }

        tracing::debug!("Watching {root}");
        Ok(true)
    }

    /// Release the OS watch for `root`.
    ///
    /// Returns `false` when `root` was not being watched.
    pub fn unwatch(&self, root: &Utf8Path) -> bool {
        if !lock(&self.inner.roots).remove(root) {
            return false;
        }

        // A deleted root has already lost its OS watch.
        if let Err(err) = lock(&self.inner.watcher).unwatch(root.as_std_path()) {
            tracing::debug!("Unwatching {root} reported: {err}");
        } else {
            tracing::debug!("Stopped watching {root}");
        }
        true
    }

    #[must_use]
    pub fn is_watching(&self, root: &Utf8Path) -> bool {
        lock(&self.inner.roots).contains(root)
    }

    #[must_use]
    pub fn watched_roots(&self) -> Vec<Utf8PathBuf> {
        let mut roots: Vec<_> = lock(&self.inner.roots).iter().cloned().collect();
        roots.sort();
        roots
    }
}

/// Runs on the notify thread: filter, convert, hand off, never block.
fn dispatch(
    res: notify::Result<Event>,
    filter: &ChangeFilter,
    roots: &Roots,
    tx: &mpsc::Sender<ChangeEvent>,
) {
    let event = match res {
        Ok(event) => event,
        Err(err) => {
            tracing::warn!("File watcher error: {err}");
            return;
        }
    };

    if event.need_rescan() {
        tracing::warn!("File watcher overflowed; some changes may have been missed");
    }

    let changes = {
        let roots = lock(roots);
        convert_event(event, filter, &roots)
    };

    for change in changes {
        match tx.try_send(change) {
            Ok(()) => {}
            Err(TrySendError::Full(change)) => {
                tracing::warn!(path = %change.path, "Change buffer full, dropping event");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::trace!("Change receiver closed");
                return;
            }
        }
    }
}

fn convert_event(
    event: Event,
    filter: &ChangeFilter,
    roots: &FxHashSet<Utf8PathBuf>,
) -> Vec<ChangeEvent> {
    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Modify(ModifyKind::Name(_)) => ChangeKind::Renamed,
        EventKind::Modify(_) => ChangeKind::Modified,
        EventKind::Remove(_) => ChangeKind::Deleted,
        _ => return Vec::new(),
    };

    event
        .paths
        .into_iter()
        .filter_map(|path| Utf8PathBuf::try_from(path).ok())
        .filter(|path| {
            roots.iter().any(|root| {
                path.strip_prefix(root)
                    .is_ok_and(|relative| filter.matches(relative))
            })
        })
        .map(|path| ChangeEvent::new(path, kind))
        .collect()
}
