//! A reference loader that indexes a project's source files.
//!
//! `ScanLoader` stands in for a real compiler front end: it walks the
//! artifact's directory with the same filter the watcher uses, so the
//! resulting [`SourceTree`] reflects exactly the files whose changes
//! invalidate it.

use async_trait::async_trait;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use wsc_cache::AnalysisContext;
use wsc_cache::Deadline;
use wsc_cache::LoadError;
use wsc_cache::ProjectKind;
use wsc_cache::ProjectLoader;
use wsc_workspace::walk_files;
use wsc_workspace::ChangeFilter;

#[derive(Debug)]
pub struct SourceTree {
    pub root: Utf8PathBuf,
    pub kind: ProjectKind,
    pub files: Vec<Utf8PathBuf>,
    pub total_bytes: u64,
}

impl AnalysisContext for SourceTree {
    fn dispose(self) {
        tracing::debug!("Dropping index of {} files under {}", self.files.len(), self.root);
    }
}

#[derive(Clone, Debug)]
pub struct ScanLoader {
    filter: ChangeFilter,
}

impl ScanLoader {
    pub fn new(filter: ChangeFilter) -> Self {
        Self { filter }
    }
}

#[async_trait]
impl ProjectLoader for ScanLoader {
    type Context = SourceTree;

    async fn load(
        &self,
        path: &Utf8Path,
        kind: ProjectKind,
        _deadline: &Deadline,
    ) -> Result<SourceTree, LoadError> {
        let root = match path.parent() {
            Some(parent) if path.is_file() => parent.to_path_buf(),
            _ => path.to_path_buf(),
        };
        if !root.is_dir() {
            return Err(LoadError::NotFound);
        }

        let filter = self.filter.clone();
        // The cache abandons this future on timeout; the walk itself runs to
        // completion on the blocking pool and its result is dropped.
        let tree = tokio::task::spawn_blocking(move || {
            let files = walk_files(&root, &filter);
            let total_bytes = files
                .iter()
                .filter_map(|file| std::fs::metadata(file).ok())
                .map(|meta| meta.len())
                .sum();
            SourceTree {
                root,
                kind,
                files,
                total_bytes,
            }
        })
        .await
        .map_err(|err| LoadError::build_failure(format!("scan task failed: {err}")))?;

        Ok(tree)
    }
}
