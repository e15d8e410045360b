use std::fmt;
use std::time::Duration;

use camino::Utf8PathBuf;
use thiserror::Error;

/// The bounded operations a caller can wait on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    Load,
    Analyze,
    Modify,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Load => "load",
            Operation::Analyze => "analyze",
            Operation::Modify => "modify",
        })
    }
}

/// Coarse classification of a [`CacheError`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Timeout,
    LoadFailure,
    Disposed,
    Cancelled,
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Workspace not found: {path}")]
    NotFound { path: Utf8PathBuf },

    #[error("Timed out waiting to {operation} {path} after {elapsed:?} (deadline {deadline:?})")]
    Timeout {
        path: Utf8PathBuf,
        operation: Operation,
        elapsed: Duration,
        deadline: Duration,
    },

    #[error("Failed to load {path}: {message}")]
    LoadFailure { path: Utf8PathBuf, message: String },

    #[error("Workspace {path} was disposed; request a fresh handle")]
    Disposed { path: Utf8PathBuf },

    #[error("Cancelled {operation} of {path} after {elapsed:?}")]
    Cancelled {
        path: Utf8PathBuf,
        operation: Operation,
        elapsed: Duration,
    },
}

impl CacheError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            CacheError::NotFound { .. } => ErrorKind::NotFound,
            CacheError::Timeout { .. } => ErrorKind::Timeout,
            CacheError::LoadFailure { .. } => ErrorKind::LoadFailure,
            CacheError::Disposed { .. } => ErrorKind::Disposed,
            CacheError::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Utf8PathBuf {
        match self {
            CacheError::NotFound { path }
            | CacheError::Timeout { path, .. }
            | CacheError::LoadFailure { path, .. }
            | CacheError::Disposed { path }
            | CacheError::Cancelled { path, .. } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_carries_context() {
        let err = CacheError::Timeout {
            path: Utf8PathBuf::from("/src/App.sln"),
            operation: Operation::Load,
            elapsed: Duration::from_secs(30),
            deadline: Duration::from_secs(30),
        };
        let message = err.to_string();
        assert!(message.contains("load"));
        assert!(message.contains("/src/App.sln"));
        assert!(message.contains("30s"));
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[test]
    fn every_variant_exposes_its_path() {
        let path = Utf8PathBuf::from("/src/App.csproj");
        let err = CacheError::Disposed { path: path.clone() };
        assert_eq!(err.path(), &path);
        assert_eq!(err.kind(), ErrorKind::Disposed);
    }
}
