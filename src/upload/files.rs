//! Local file set collection

use std::path::{Path, PathBuf};
use tracing::debug;

use super::TransferError;

/// A file queued for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute (or caller-relative) path on disk
    pub path: PathBuf,
    /// Path relative to the file set root, `/` separated
    pub name: String,
    pub size: u64,
}

/// Non-empty, name-sorted set of files under a root directory.
#[derive(Debug, Clone)]
pub struct FileSet {
    root: PathBuf,
    entries: Vec<FileEntry>,
}

impl FileSet {
    /// Walk `root` recursively, skipping anything matched by `ignore`.
    ///
    /// An ignore pattern matches an entry when it equals the entry's file
    /// name, its relative path, or a leading directory of its relative path.
    pub fn from_dir(root: impl AsRef<Path>, ignore: &[String]) -> Result<Self, TransferError> {
        let root = root.as_ref().to_path_buf();
        let mut entries = Vec::new();
        collect(&root, &root, ignore, &mut entries)?;
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        if entries.is_empty() {
            return Err(TransferError::EmptyFileSet(root.display().to_string()));
        }

        debug!(root = %root.display(), files = entries.len(), "Collected file set");
        Ok(Self { root, entries })
    }

    pub fn from_entries(root: PathBuf, entries: Vec<FileEntry>) -> Result<Self, TransferError> {
        if entries.is_empty() {
            return Err(TransferError::EmptyFileSet(root.display().to_string()));
        }
        Ok(Self { root, entries })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }
}

fn collect(
    root: &Path,
    dir: &Path,
    ignore: &[String],
    out: &mut Vec<FileEntry>,
) -> Result<(), TransferError> {
    let read_dir = std::fs::read_dir(dir).map_err(|e| TransferError::Io {
        path: dir.display().to_string(),
        source: e,
    })?;

    for entry in read_dir {
        let entry = entry.map_err(|e| TransferError::Io {
            path: dir.display().to_string(),
            source: e,
        })?;
        let path = entry.path();
        let name = relative_name(root, &path);

        if is_ignored(&name, ignore) {
            debug!(file = %name, "Ignoring file");
            continue;
        }

        let metadata = entry.metadata().map_err(|e| TransferError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        if metadata.is_dir() {
            collect(root, &path, ignore, out)?;
        } else if metadata.is_file() {
            out.push(FileEntry {
                path,
                name,
                size: metadata.len(),
            });
        }
    }
    Ok(())
}

fn relative_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn is_ignored(name: &str, ignore: &[String]) -> bool {
    let file_name = name.rsplit('/').next().unwrap_or(name);
    ignore.iter().any(|pattern| {
        let pattern = pattern.trim().trim_end_matches('/');
        !pattern.is_empty()
            && (pattern == name
                || pattern == file_name
                || name.starts_with(&format!("{}/", pattern)))
    })
}

/// Split a comma separated ignore list, dropping blanks.
pub fn parse_ignore_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("README.md"), b"# Book").unwrap();
        fs::write(dir.path().join("SUMMARY.md"), b"* [Intro](README.md)").unwrap();
        fs::create_dir_all(dir.path().join("chapters/drafts")).unwrap();
        fs::write(dir.path().join("chapters/one.md"), b"one").unwrap();
        fs::write(dir.path().join("chapters/drafts/wip.md"), b"wip").unwrap();
        dir
    }

    #[test]
    fn test_from_dir_walks_recursively_and_sorts() {
        let dir = fixture();
        let set = FileSet::from_dir(dir.path(), &[]).unwrap();

        let names: Vec<_> = set.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["README.md", "SUMMARY.md", "chapters/drafts/wip.md", "chapters/one.md"]
        );
        assert_eq!(set.total_size(), 6 + 20 + 3 + 3);
    }

    #[test]
    fn test_from_dir_applies_ignore_list() {
        let dir = fixture();
        let ignore = parse_ignore_list("SUMMARY.md, chapters/drafts ,");
        let set = FileSet::from_dir(dir.path(), &ignore).unwrap();

        let names: Vec<_> = set.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["README.md", "chapters/one.md"]);
    }

    #[test]
    fn test_empty_dir_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = FileSet::from_dir(dir.path(), &[]).unwrap_err();
        assert!(matches!(err, TransferError::EmptyFileSet(_)));
    }

    #[test]
    fn test_missing_dir_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = FileSet::from_dir(dir.path().join("nope"), &[]).unwrap_err();
        assert!(matches!(err, TransferError::Io { .. }));
    }
}
