//! Source file discovery.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Limits applied while walking a corpus root.
#[derive(Debug, Clone)]
pub struct CollectOptions {
    /// Directory or file names that prune the walk
    pub skip_segments: HashSet<String>,

    /// File names that are never collected
    pub skip_file_names: HashSet<String>,

    /// Lower-case extensions including the dot
    pub allowed_extensions: HashSet<String>,

    pub max_files: usize,

    pub max_file_bytes: u64,
}

fn set(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl CollectOptions {
    /// Limits for the live runtime corpus.
    pub fn runtime() -> Self {
        Self {
            skip_segments: set(&[".git", "node_modules", "stepbible-data"]),
            skip_file_names: HashSet::new(),
            allowed_extensions: set(&[".md", ".markdown", ".txt", ".json"]),
            max_files: 500,
            max_file_bytes: 4 * 1024 * 1024,
        }
    }

    /// Tighter limits for the deployable index artifact.
    pub fn artifact() -> Self {
        Self {
            skip_segments: set(&[".git", "node_modules", "stepbible-data", "bibles", "lexicons"]),
            skip_file_names: set(&["README.md", "readme.md", "CHANGELOG.md"]),
            allowed_extensions: set(&[".md", ".markdown", ".txt"]),
            max_files: 300,
            max_file_bytes: 4 * 1024 * 1024,
        }
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
}

/// Collect candidate files under `root` in a stable (name-sorted) order.
///
/// Unreadable entries and files above the byte ceiling are skipped; a
/// missing root yields an empty list.
pub fn collect_files(root: &Path, options: &CollectOptions) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if !root.exists() {
        return files;
    }

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !options
                    .skip_segments
                    .contains(entry.file_name().to_string_lossy().as_ref())
        });

    for entry in walker.filter_map(|e| e.ok()) {
        if files.len() >= options.max_files {
            break;
        }
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let allowed = extension_of(path)
            .map(|ext| options.allowed_extensions.contains(&ext))
            .unwrap_or(false);
        if !allowed {
            continue;
        }
        if options
            .skip_file_names
            .contains(entry.file_name().to_string_lossy().as_ref())
        {
            continue;
        }

        match entry.metadata() {
            Ok(meta) if meta.len() <= options.max_file_bytes => files.push(path.to_path_buf()),
            Ok(meta) => {
                tracing::debug!("Skipping oversized file {:?} ({} bytes)", path, meta.len());
            }
            Err(e) => {
                tracing::debug!("Skipping unreadable file {:?}: {}", path, e);
            }
        }
    }

    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_collect_respects_skips_and_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("commentaries")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join("commentaries/a.md"), "a").unwrap();
        fs::write(root.join("commentaries/b.pdf"), "b").unwrap();
        fs::write(root.join("notes.json"), "{}").unwrap();
        fs::write(root.join(".git/config.txt"), "x").unwrap();
        fs::write(root.join("node_modules/pkg/readme.md"), "x").unwrap();

        let files = collect_files(root, &CollectOptions::runtime());
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["commentaries/a.md", "notes.json"]);
    }

    #[test]
    fn test_collect_caps_file_count_and_size() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            fs::write(dir.path().join(format!("{i}.txt")), "words").unwrap();
        }
        fs::write(dir.path().join("big.txt"), "x".repeat(64)).unwrap();

        let mut options = CollectOptions::runtime();
        options.max_file_bytes = 32;
        options.max_files = 3;
        assert_eq!(collect_files(dir.path(), &options).len(), 3);

        options.max_files = 100;
        assert_eq!(collect_files(dir.path(), &options).len(), 5);
    }

    #[test]
    fn test_collect_missing_root() {
        let files = collect_files(Path::new("/no/such/root"), &CollectOptions::runtime());
        assert!(files.is_empty());
    }

    #[test]
    fn test_artifact_options_skip_readme() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("README.md"), "x").unwrap();
        fs::write(dir.path().join("essay.md"), "x").unwrap();
        let files = collect_files(dir.path(), &CollectOptions::artifact());
        assert_eq!(files.len(), 1);
    }
}
