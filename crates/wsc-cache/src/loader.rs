use async_trait::async_trait;
use camino::Utf8Path;
use thiserror::Error;
use wsc_workspace::ProjectKind;

use crate::deadline::Deadline;
use crate::error::CacheError;
use crate::error::Operation;

/// A loaded project representation, produced by a [`ProjectLoader`].
///
/// The cache owns each context from the moment the loader returns it and
/// calls [`AnalysisContext::dispose`] exactly once when the entry goes away.
pub trait AnalysisContext: Send + 'static {
    fn dispose(self)
    where
        Self: Sized,
    {
    }
}

/// Failures a loader can report.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Project artifact does not exist")]
    NotFound,
    #[error("Load timed out")]
    Timeout,
    #[error("Project build failed: {message}")]
    BuildFailure { message: String },
    #[error("Load was cancelled")]
    Cancelled,
}

impl LoadError {
    pub fn build_failure(message: impl Into<String>) -> Self {
        LoadError::BuildFailure {
            message: message.into(),
        }
    }

    pub(crate) fn into_cache_error(self, path: &Utf8Path, deadline: &Deadline) -> CacheError {
        match self {
            LoadError::NotFound => CacheError::NotFound {
                path: path.to_path_buf(),
            },
            LoadError::Timeout => deadline.timed_out(path, Operation::Load),
            LoadError::Cancelled => deadline.cancelled(path, Operation::Load),
            LoadError::BuildFailure { message } => CacheError::LoadFailure {
                path: path.to_path_buf(),
                message,
            },
        }
    }
}

impl From<anyhow::Error> for LoadError {
    fn from(err: anyhow::Error) -> Self {
        LoadError::build_failure(format!("{err:#}"))
    }
}

/// Builds analysis contexts for project artifacts.
///
/// The cache bounds every call with the caller's [`Deadline`]; loaders that
/// can stop early should watch [`Deadline::cancellation`].
#[async_trait]
pub trait ProjectLoader: Send + Sync + 'static {
    type Context: AnalysisContext;

    async fn load(
        &self,
        path: &Utf8Path,
        kind: ProjectKind,
        deadline: &Deadline,
    ) -> Result<Self::Context, LoadError>;
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn maps_loader_errors_onto_cache_taxonomy() {
        let path = Utf8Path::new("/src/App.sln");
        let deadline = Deadline::after(Duration::from_secs(1));

        let cases = [
            (LoadError::NotFound, ErrorKind::NotFound),
            (LoadError::Timeout, ErrorKind::Timeout),
            (LoadError::Cancelled, ErrorKind::Cancelled),
            (LoadError::build_failure("bad xml"), ErrorKind::LoadFailure),
        ];
        for (err, kind) in cases {
            assert_eq!(err.into_cache_error(path, &deadline).kind(), kind);
        }
    }

    #[test]
    fn anyhow_errors_become_build_failures() {
        let err: LoadError = anyhow::anyhow!("missing SDK").context("restoring App.sln").into();
        match err {
            LoadError::BuildFailure { message } => {
                assert!(message.contains("restoring App.sln"));
                assert!(message.contains("missing SDK"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
