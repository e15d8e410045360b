mod filter;
mod paths;
mod walk;
mod watcher;

pub use filter::ChangeFilter;
pub use paths::ProjectKind;
pub use paths::WorkspaceKey;
pub use walk::walk_files;
pub use watcher::ChangeEvent;
pub use watcher::ChangeKind;
pub use watcher::FileChangeWatcher;
pub use watcher::WatchError;
