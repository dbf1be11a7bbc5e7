//! In-memory mock filesystem for testing collectors without real `/sys`.
//!
//! `MockFs` simulates files, directories and symbolic links in memory,
//! allowing tests to run on any platform and in CI environments.

use crate::collector::traits::FileSystem;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory filesystem for testing.
///
/// Cloning a `MockFs` shares its read counter, so a test can hand a clone to
/// an `Inventory` and still observe how many reads the scans performed.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    /// Map from path to file contents.
    files: HashMap<PathBuf, String>,
    /// Set of directories (for read_dir support).
    directories: HashSet<PathBuf>,
    /// Map from symlink path to its raw target.
    links: HashMap<PathBuf, PathBuf>,
    /// Number of `read_to_string`, `read_dir` and `read_link` calls served.
    reads: Arc<AtomicUsize>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file with the given content.
    ///
    /// Parent directories are automatically created.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.files.insert(path, content.into());
    }

    /// Adds an empty directory.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.directories.insert(path);
    }

    /// Adds a symbolic link pointing at `target`.
    ///
    /// The target is stored verbatim and is not required to exist. Files added
    /// below `path` afterwards make the link behave like a link to a directory.
    pub fn add_symlink(&mut self, path: impl AsRef<Path>, target: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.links.insert(path, target.as_ref().to_path_buf());
    }

    /// Returns the number of read operations served so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn add_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                self.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
    }

    fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
    }
}

fn not_found(kind: &str, path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} not found: {:?}", kind, path),
    )
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.record_read();
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| not_found("file", path))
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
            || self.directories.contains(path)
            || self.links.contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.directories.contains(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        self.record_read();
        if !self.directories.contains(path) {
            return Err(not_found("directory", path));
        }

        let children = self
            .files
            .keys()
            .chain(self.directories.iter())
            .chain(self.links.keys())
            .filter(|child| child.parent().is_some_and(|parent| parent == path))
            .filter(|child| child.as_path() != path)
            .cloned()
            .collect::<HashSet<_>>();

        Ok(children.into_iter().collect())
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        self.record_read();
        self.links
            .get(path)
            .cloned()
            .ok_or_else(|| not_found("symlink", path))
    }
}
