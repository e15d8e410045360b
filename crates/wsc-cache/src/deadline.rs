use std::future::Future;
use std::time::Duration;

use camino::Utf8Path;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::CacheError;
use crate::error::Operation;

/// A caller's budget for one bounded operation.
///
/// Combines an internal timeout with the caller's own cancellation. The
/// expiry is fixed when the deadline is created, so every step performed
/// under it (waiting for a concurrent load, the load itself) draws on the
/// same budget.
#[derive(Clone, Debug)]
pub struct Deadline {
    started: Instant,
    timeout: Duration,
    cancellation: CancellationToken,
}

impl Deadline {
    #[must_use]
    pub fn after(timeout: Duration) -> Self {
        Self {
            started: Instant::now(),
            timeout,
            cancellation: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Token loaders can poll or await to stop work early.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Drive `future` to completion unless the deadline expires or the caller
    /// cancels first. On either, `future` is dropped before returning, which
    /// releases anything it had acquired.
    pub(crate) async fn run<F: Future>(
        &self,
        path: &Utf8Path,
        operation: Operation,
        future: F,
    ) -> Result<F::Output, CacheError> {
        if self.cancellation.is_cancelled() {
            return Err(self.cancelled(path, operation));
        }

        let bounded = async {
            match self.started.checked_add(self.timeout) {
                Some(expiry) => tokio::time::timeout_at(expiry, future)
                    .await
                    .map_err(|_| self.timed_out(path, operation)),
                None => Ok(future.await),
            }
        };

        tokio::select! {
            biased;
            () = self.cancellation.cancelled() => Err(self.cancelled(path, operation)),
            result = bounded => result,
        }
    }

    pub(crate) fn timed_out(&self, path: &Utf8Path, operation: Operation) -> CacheError {
        CacheError::Timeout {
            path: path.to_path_buf(),
            operation,
            elapsed: self.elapsed(),
            deadline: self.timeout,
        }
    }

    pub(crate) fn cancelled(&self, path: &Utf8Path, operation: Operation) -> CacheError {
        CacheError::Cancelled {
            path: path.to_path_buf(),
            operation,
            elapsed: self.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test(start_paused = true)]
    async fn completes_within_budget() {
        let deadline = Deadline::after(Duration::from_secs(5));
        let value = deadline
            .run(Utf8Path::new("/p"), Operation::Load, async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                7
            })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn expires_with_timeout() {
        let deadline = Deadline::after(Duration::from_secs(2));
        let err = deadline
            .run(
                Utf8Path::new("/p"),
                Operation::Analyze,
                tokio::time::sleep(Duration::from_secs(10)),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        match err {
            CacheError::Timeout {
                operation,
                deadline,
                elapsed,
                ..
            } => {
                assert_eq!(operation, Operation::Analyze);
                assert_eq!(deadline, Duration::from_secs(2));
                assert!(elapsed >= Duration::from_secs(2));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn budget_is_shared_across_steps() {
        let deadline = Deadline::after(Duration::from_secs(3));
        tokio::time::sleep(Duration::from_secs(2)).await;
        let err = deadline
            .run(
                Utf8Path::new("/p"),
                Operation::Load,
                tokio::time::sleep(Duration::from_secs(2)),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[tokio::test]
    async fn already_cancelled_fails_fast() {
        let token = CancellationToken::new();
        token.cancel();
        let deadline = Deadline::after(Duration::from_secs(60)).with_cancellation(token);
        let err = deadline
            .run(Utf8Path::new("/p"), Operation::Modify, std::future::pending::<()>())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_pending_work() {
        let token = CancellationToken::new();
        let deadline = Deadline::after(Duration::from_secs(60)).with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            token.cancel();
        });

        let err = deadline
            .run(Utf8Path::new("/p"), Operation::Load, std::future::pending::<()>())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        canceller.await.unwrap();
    }
}
