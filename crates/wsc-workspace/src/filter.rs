use camino::Utf8Path;
use rustc_hash::FxHashSet;
use wsc_conf::WatchSettings;

/// Decides which files are "interesting" to a workspace.
///
/// A path matches when its extension is in the configured set (or the set is
/// empty) and none of its components is an excluded directory name. Paths are
/// expected relative to the watched root, so that an excluded name above the
/// root (say, a checkout under `~/bin`) doesn't hide the whole workspace.
#[derive(Clone, Debug, Default)]
pub struct ChangeFilter {
    extensions: FxHashSet<String>,
    exclude_dirs: FxHashSet<String>,
}

impl ChangeFilter {
    #[must_use]
    pub fn new<E, D>(extensions: E, exclude_dirs: D) -> Self
    where
        E: IntoIterator,
        E::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            exclude_dirs: exclude_dirs
                .into_iter()
                .map(|dir| dir.as_ref().to_string())
                .collect(),
        }
    }

    #[must_use]
    pub fn from_settings(settings: &WatchSettings) -> Self {
        Self::new(&settings.extensions, &settings.exclude_dirs)
    }

    #[must_use]
    pub fn matches(&self, path: &Utf8Path) -> bool {
        if self.is_excluded(path) {
            return false;
        }

        if self.extensions.is_empty() {
            return true;
        }

        extension_of(path).is_some_and(|ext| self.extensions.contains(&ext.to_ascii_lowercase()))
    }

    /// Whether any component of `path` is an excluded directory.
    #[must_use]
    pub fn is_excluded(&self, path: &Utf8Path) -> bool {
        path.parent().is_some_and(|parent| {
            parent
                .components()
                .any(|component| self.exclude_dirs.contains(component.as_str()))
        })
    }

    #[must_use]
    pub fn is_excluded_dir(&self, name: &str) -> bool {
        self.exclude_dirs.contains(name)
    }
}

/// Extension of `path`, treating dotfiles like `.editorconfig` as all-extension.
fn extension_of(path: &Utf8Path) -> Option<&str> {
    path.extension().or_else(|| {
        path.file_name()
            .and_then(|name| name.strip_prefix('.'))
            .filter(|rest| !rest.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> ChangeFilter {
        ChangeFilter::from_settings(&WatchSettings::default())
    }

    #[test]
    fn includes_source_and_project_files() {
        let filter = filter();
        assert!(filter.matches(Utf8Path::new("src/Program.cs")));
        assert!(filter.matches(Utf8Path::new("App.csproj")));
        assert!(filter.matches(Utf8Path::new("App.SLN")));
        assert!(filter.matches(Utf8Path::new(".editorconfig")));
    }

    #[test]
    fn skips_uninteresting_extensions() {
        let filter = filter();
        assert!(!filter.matches(Utf8Path::new("README.md")));
        assert!(!filter.matches(Utf8Path::new("Makefile")));
    }

    #[test]
    fn skips_excluded_directories() {
        let filter = filter();
        assert!(!filter.matches(Utf8Path::new("obj/Debug/App.cs")));
        assert!(!filter.matches(Utf8Path::new("bin/App.csproj")));
        assert!(!filter.matches(Utf8Path::new(".git/index.cs")));
        // only whole components count
        assert!(filter.matches(Utf8Path::new("objects/App.cs")));
    }

    #[test]
    fn empty_extension_set_matches_everything_not_excluded() {
        let filter = ChangeFilter::new(Vec::<String>::new(), ["target"]);
        assert!(filter.matches(Utf8Path::new("notes.txt")));
        assert!(!filter.matches(Utf8Path::new("target/out.txt")));
    }

    #[test]
    fn leading_dots_in_configured_extensions_are_ignored() {
        let filter = ChangeFilter::new([".CS"], Vec::<String>::new());
        assert!(filter.matches(Utf8Path::new("a.cs")));
    }
}
