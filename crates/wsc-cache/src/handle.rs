//! Cached workspace handles.
//!
//! A [`WorkspaceHandle`] owns one [`AnalysisContext`] and serializes every
//! use of it through an exclusive async lock. State transitions:
//!
//! ```text
//! Loading -> Ready <-> Analyzing
//!            Ready <-> Modifying
//! any     -> Disposing -> Disposed
//! ```
//!
//! Handles are only created after a successful load, so `Loading` is only
//! ever reported for in-flight loads in cache statistics.

use std::ops::Deref;
use std::ops::DerefMut;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use camino::Utf8Path;
use serde::Serialize;
use tokio::sync::MappedMutexGuard;
use tokio::time::Instant;
use wsc_workspace::ProjectKind;
use wsc_workspace::WorkspaceKey;

use crate::deadline::Deadline;
use crate::error::CacheError;
use crate::error::Operation;
use crate::loader::AnalysisContext;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceState {
    Loading,
    Ready,
    Analyzing,
    Modifying,
    Disposing,
    Disposed,
}

/// The kind of exclusive access a caller asks for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Access {
    Analyze,
    Modify,
}

impl Access {
    fn state(self) -> WorkspaceState {
        match self {
            Access::Analyze => WorkspaceState::Analyzing,
            Access::Modify => WorkspaceState::Modifying,
        }
    }

    fn operation(self) -> Operation {
        match self {
            Access::Analyze => Operation::Analyze,
            Access::Modify => Operation::Modify,
        }
    }
}

#[derive(Debug)]
struct Meta {
    state: WorkspaceState,
    last_accessed: Instant,
}

pub struct WorkspaceHandle<C: AnalysisContext> {
    key: WorkspaceKey,
    kind: ProjectKind,
    loaded_at: Instant,
    meta: Mutex<Meta>,
    /// `None` once disposed.
    context: tokio::sync::Mutex<Option<C>>,
}

impl<C: AnalysisContext> std::fmt::Debug for WorkspaceHandle<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceHandle")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl<C: AnalysisContext> WorkspaceHandle<C> {
    pub(crate) fn new(key: WorkspaceKey, kind: ProjectKind, context: C) -> Self {
        let now = Instant::now();
        Self {
            key,
            kind,
            loaded_at: now,
            meta: Mutex::new(Meta {
                state: WorkspaceState::Ready,
                last_accessed: now,
            }),
            context: tokio::sync::Mutex::new(Some(context)),
        }
    }

    fn meta(&self) -> MutexGuard<'_, Meta> {
        self.meta.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn key(&self) -> &WorkspaceKey {
        &self.key
    }

    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        self.key.path()
    }

    #[must_use]
    pub fn kind(&self) -> ProjectKind {
        self.kind
    }

    #[must_use]
    pub fn is_multi_project(&self) -> bool {
        self.kind.is_multi_project()
    }

    #[must_use]
    pub fn loaded_at(&self) -> Instant {
        self.loaded_at
    }

    #[must_use]
    pub fn last_accessed(&self) -> Instant {
        self.meta().last_accessed
    }

    #[must_use]
    pub fn state(&self) -> WorkspaceState {
        self.meta().state
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        matches!(
            self.state(),
            WorkspaceState::Disposing | WorkspaceState::Disposed
        )
    }

    pub(crate) fn touch(&self) {
        self.meta().last_accessed = Instant::now();
    }

    fn set_state(&self, state: WorkspaceState) {
        self.meta().state = state;
    }

    /// Acquire the context for a semantic query.
    pub async fn analyze(&self, deadline: &Deadline) -> Result<WorkspaceGuard<'_, C>, CacheError> {
        self.acquire(Access::Analyze, deadline).await
    }

    /// Acquire the context for a mutating operation.
    pub async fn modify(&self, deadline: &Deadline) -> Result<WorkspaceGuard<'_, C>, CacheError> {
        self.acquire(Access::Modify, deadline).await
    }

    /// Wait for exclusive access to the context.
    ///
    /// Fails with [`CacheError::Disposed`] if the handle was evicted, including
    /// when the eviction happened while this caller was waiting.
    pub async fn acquire(
        &self,
        access: Access,
        deadline: &Deadline,
    ) -> Result<WorkspaceGuard<'_, C>, CacheError> {
        if self.is_disposed() {
            return Err(self.disposed());
        }

        let guard = deadline
            .run(self.path(), access.operation(), self.context.lock())
            .await?;
        let context = tokio::sync::MutexGuard::try_map(guard, Option::as_mut)
            .map_err(|_| self.disposed())?;

        self.set_state(access.state());
        self.touch();
        Ok(WorkspaceGuard {
            handle: self,
            access,
            context,
        })
    }

    /// Release the context once no caller holds it.
    ///
    /// Returns `false` if it was already released.
    pub(crate) async fn dispose(&self) -> bool {
        let mut guard = self.context.lock().await;
        let Some(context) = guard.take() else {
            return false;
        };

        self.set_state(WorkspaceState::Disposing);
        context.dispose();
        self.set_state(WorkspaceState::Disposed);
        tracing::debug!("Disposed workspace {}", self.key);
        true
    }

    fn disposed(&self) -> CacheError {
        CacheError::Disposed {
            path: self.path().to_path_buf(),
        }
    }
}

impl<C: AnalysisContext> Drop for WorkspaceHandle<C> {
    fn drop(&mut self) {
        // Only uncached handles still own a context here.
        if let Some(context) = self.context.get_mut().take() {
            context.dispose();
            tracing::debug!("Disposed uncached workspace {}", self.key);
        }
    }
}

/// Exclusive, scoped access to a workspace's context.
///
/// The handle returns to `Ready` when the guard is dropped, whether the
/// caller finished, failed, or was cancelled.
pub struct WorkspaceGuard<'a, C: AnalysisContext> {
    handle: &'a WorkspaceHandle<C>,
    access: Access,
    context: MappedMutexGuard<'a, C>,
}

impl<C: AnalysisContext> WorkspaceGuard<'_, C> {
    #[must_use]
    pub fn access(&self) -> Access {
        self.access
    }
}

impl<C: AnalysisContext> std::fmt::Debug for WorkspaceGuard<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceGuard")
            .field("key", &self.handle.key)
            .field("access", &self.access)
            .finish_non_exhaustive()
    }
}

impl<C: AnalysisContext> Deref for WorkspaceGuard<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.context
    }
}

impl<C: AnalysisContext> DerefMut for WorkspaceGuard<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.context
    }
}

impl<C: AnalysisContext> Drop for WorkspaceGuard<'_, C> {
    fn drop(&mut self) {
        // Runs before `context` is released, so the next holder sees `Ready`.
        self.handle.set_state(WorkspaceState::Ready);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    use camino::Utf8PathBuf;

    use super::*;
    use crate::error::ErrorKind;

    #[derive(Debug)]
    struct Counted {
        disposals: Arc<AtomicUsize>,
        queries: usize,
    }

    impl AnalysisContext for Counted {
        fn dispose(self) {
            self.disposals.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn handle() -> (Arc<WorkspaceHandle<Counted>>, Arc<AtomicUsize>) {
        let disposals = Arc::new(AtomicUsize::new(0));
        let key = WorkspaceKey::from_canonical(Utf8PathBuf::from("/src/App.csproj"));
        let handle = WorkspaceHandle::new(
            key,
            ProjectKind::SingleProject,
            Counted {
                disposals: Arc::clone(&disposals),
                queries: 0,
            },
        );
        (Arc::new(handle), disposals)
    }

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn guard_transitions_and_restores_ready() {
        let (handle, _) = handle();
        assert_eq!(handle.state(), WorkspaceState::Ready);

        {
            let mut guard = handle.analyze(&deadline()).await.unwrap();
            assert_eq!(handle.state(), WorkspaceState::Analyzing);
            guard.queries += 1;
        }
        assert_eq!(handle.state(), WorkspaceState::Ready);

        {
            let guard = handle.modify(&deadline()).await.unwrap();
            assert_eq!(guard.access(), Access::Modify);
            assert!(format!("{guard:?}").contains("Modify"));
            assert_eq!(handle.state(), WorkspaceState::Modifying);
            assert_eq!(guard.queries, 1);
        }
        assert_eq!(handle.state(), WorkspaceState::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn second_caller_times_out_while_lock_is_held() {
        let (handle, _) = handle();
        let _held = handle.analyze(&deadline()).await.unwrap();

        let err = handle
            .analyze(&Deadline::after(Duration::from_millis(50)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        // the holder's state is untouched by the failed waiter
        assert_eq!(handle.state(), WorkspaceState::Analyzing);
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_waits_for_active_caller() {
        let (handle, disposals) = handle();
        let guard = handle.modify(&deadline()).await.unwrap();

        let disposer = {
            let handle = Arc::clone(&handle);
            tokio::spawn(async move { handle.dispose().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(disposals.load(Ordering::SeqCst), 0);
        assert_eq!(handle.state(), WorkspaceState::Modifying);

        drop(guard);
        assert!(disposer.await.unwrap());
        assert_eq!(disposals.load(Ordering::SeqCst), 1);
        assert_eq!(handle.state(), WorkspaceState::Disposed);
    }

    #[tokio::test]
    async fn dispose_releases_exactly_once() {
        let (handle, disposals) = handle();
        assert!(handle.dispose().await);
        assert!(!handle.dispose().await);
        drop(handle);
        assert_eq!(disposals.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn acquiring_disposed_handle_fails() {
        let (handle, _) = handle();
        handle.dispose().await;
        let err = handle.analyze(&deadline()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Disposed);
    }

    #[tokio::test(start_paused = true)]
    async fn waiter_sees_disposal_that_happened_while_waiting() {
        let (handle, _) = handle();
        let guard = handle.analyze(&deadline()).await.unwrap();

        // queued first, so it disposes as soon as the guard is gone
        let disposer = {
            let handle = Arc::clone(&handle);
            tokio::spawn(async move { handle.dispose().await })
        };
        tokio::task::yield_now().await;

        let waiter = {
            let handle = Arc::clone(&handle);
            tokio::spawn(async move {
                handle
                    .analyze(&deadline())
                    .await
                    .map(|_| ())
                    .map_err(|err| err.kind())
            })
        };
        tokio::task::yield_now().await;

        drop(guard);
        disposer.await.unwrap();
        assert_eq!(waiter.await.unwrap(), Err(ErrorKind::Disposed));
    }

    #[tokio::test]
    async fn dropping_an_undisposed_handle_disposes_its_context() {
        let (handle, disposals) = handle();
        drop(handle);
        assert_eq!(disposals.load(Ordering::SeqCst), 1);
    }
}
