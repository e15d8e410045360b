use camino::Utf8Path;
use camino::Utf8PathBuf;
use ignore::WalkBuilder;

use crate::filter::ChangeFilter;

/// Collect every file under `root` that `filter` considers interesting.
///
/// Hidden files and `.gitignore`d paths are skipped (via the `ignore` crate),
/// and excluded directories are pruned without descending into them.
///
/// Returns a sorted, deduplicated list of paths.
#[must_use]
pub fn walk_files(root: &Utf8Path, filter: &ChangeFilter) -> Vec<Utf8PathBuf> {
    if root.is_file() {
        return if filter.matches(Utf8Path::new(root.file_name().unwrap_or_default())) {
            vec![root.to_path_buf()]
        } else {
            Vec::new()
        };
    }

    let prune = filter.clone();
    let walker = WalkBuilder::new(root.as_std_path())
        .standard_filters(true)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            !(is_dir && entry.depth() > 0 && prune.is_excluded_dir(&entry.file_name().to_string_lossy()))
        })
        .build();

    let mut files: Vec<Utf8PathBuf> = walker
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .filter_map(|entry| Utf8PathBuf::from_path_buf(entry.into_path()).ok())
        .filter(|path| {
            path.strip_prefix(root)
                .is_ok_and(|relative| filter.matches(relative))
        })
        .collect();

    files.sort();
    files.dedup();
    files
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn cs_filter() -> ChangeFilter {
        ChangeFilter::new(["cs", "csproj"], ["bin", "obj"])
    }

    #[test]
    fn walks_directory_with_filter() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();

        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("App.csproj"), "<Project />").unwrap();
        fs::write(root.join("src/Program.cs"), "class P {}").unwrap();
        fs::write(root.join("README.md"), "# app").unwrap();

        let files = walk_files(&root, &cs_filter());
        let names: Vec<&str> = files.iter().filter_map(|p| p.file_name()).collect();

        assert_eq!(names, vec!["App.csproj", "Program.cs"]);
    }

    #[test]
    fn prunes_excluded_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();

        fs::create_dir_all(root.join("obj/Debug")).unwrap();
        fs::write(root.join("obj/Debug/Generated.cs"), "").unwrap();
        fs::write(root.join("Program.cs"), "").unwrap();

        let files = walk_files(&root, &cs_filter());
        assert_eq!(files, vec![root.join("Program.cs")]);
    }

    #[test]
    fn single_file_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        fs::write(root.join("Program.cs"), "").unwrap();
        fs::write(root.join("notes.txt"), "").unwrap();

        assert_eq!(
            walk_files(&root.join("Program.cs"), &cs_filter()),
            vec![root.join("Program.cs")]
        );
        assert!(walk_files(&root.join("notes.txt"), &cs_filter()).is_empty());
    }
}
