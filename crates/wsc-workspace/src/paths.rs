//! Canonical workspace keys.
//!
//! Every cache entry is keyed by the canonical absolute path of its project
//! artifact (a solution file, a project file, or a directory). Two spellings
//! of the same artifact (relative vs. absolute, through a symlink, or with a
//! different case on case-insensitive platforms) must produce equal keys.

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;
use std::io;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use serde::Serialize;

/// Canonical identity of a cached workspace.
#[derive(Clone, Debug)]
pub struct WorkspaceKey {
    /// Canonical path as reported by the filesystem.
    path: Utf8PathBuf,
    /// Directory whose contents belong to this workspace.
    root: Utf8PathBuf,
    /// Comparison form of `path`, case-folded where the filesystem is.
    folded: String,
    folded_root: String,
}

impl WorkspaceKey {
    /// Resolve `path` to its canonical form.
    ///
    /// Fails with [`io::ErrorKind::NotFound`] when the artifact does not exist.
    pub fn canonicalize(path: impl AsRef<Utf8Path>) -> io::Result<Self> {
        let canonical = dunce::canonicalize(path.as_ref().as_std_path())?;
        let canonical = Utf8PathBuf::from_path_buf(canonical)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "non-UTF-8 path"))?;
        Ok(Self::from_canonical(canonical))
    }

    /// Build a key from a path that is already canonical.
    #[must_use]
    pub fn from_canonical(path: Utf8PathBuf) -> Self {
        let root = if path.is_dir() {
            path.clone()
        } else {
            path.parent().map_or_else(|| path.clone(), Utf8Path::to_path_buf)
        };
        let folded = fold(&path);
        let folded_root = fold(&root);
        Self {
            path,
            root,
            folded,
            folded_root,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// The directory watched for changes on behalf of this workspace.
    #[must_use]
    pub fn root_dir(&self) -> &Utf8Path {
        &self.root
    }

    /// Whether `changed` lives under this workspace's root directory.
    #[must_use]
    pub fn owns(&self, changed: &Utf8Path) -> bool {
        Utf8Path::new(&fold(changed)).starts_with(&self.folded_root)
    }

    /// Whether both keys share the same root directory.
    #[must_use]
    pub fn shares_root(&self, other: &WorkspaceKey) -> bool {
        self.folded_root == other.folded_root
    }
}

#[cfg(any(windows, target_os = "macos"))]
fn fold(path: &Utf8Path) -> String {
    path.as_str().to_lowercase()
}

#[cfg(not(any(windows, target_os = "macos")))]
fn fold(path: &Utf8Path) -> String {
    path.as_str().to_owned()
}

impl PartialEq for WorkspaceKey {
    fn eq(&self, other: &Self) -> bool {
        self.folded == other.folded
    }
}

impl Eq for WorkspaceKey {}

impl Hash for WorkspaceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded.hash(state);
    }
}

impl PartialOrd for WorkspaceKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WorkspaceKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded.cmp(&other.folded)
    }
}

impl fmt::Display for WorkspaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.path.fmt(f)
    }
}

/// Whether an artifact describes one project or a solution of several.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectKind {
    SingleProject,
    MultiProject,
}

impl ProjectKind {
    /// Classify an artifact by its extension.
    #[must_use]
    pub fn detect(path: &Utf8Path, solution_extensions: &[String]) -> Self {
        let is_solution = path.extension().is_some_and(|ext| {
            solution_extensions
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(ext))
        });
        if is_solution {
            ProjectKind::MultiProject
        } else {
            ProjectKind::SingleProject
        }
    }

    #[must_use]
    pub fn is_multi_project(self) -> bool {
        matches!(self, ProjectKind::MultiProject)
    }
}
