//! Filesystem access used by the resolvers and the rebaser.
//!
//! The engine reads files and lists directories only through [`FileSystem`],
//! so hosts can serve stylesheets from memory and tests can count calls.

use crate::paths::normalize;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

pub use sassbase_util::fs::ListedEntry;

/// Read and list operations the engine needs from a filesystem.
///
/// Implementations should be thread-safe (Send + Sync).
pub trait FileSystem: Send + Sync + std::fmt::Debug {
    /// Read a whole file as text.
    fn read_file(&self, path: &Path) -> io::Result<String>;

    /// List the immediate children of a directory.
    fn list_directory(&self, path: &Path) -> io::Result<Vec<ListedEntry>>;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn read_file(&self, path: &Path) -> io::Result<String> {
        sassbase_util::fs::read_to_string_lossy(path)
    }

    fn list_directory(&self, path: &Path) -> io::Result<Vec<ListedEntry>> {
        sassbase_util::fs::list_dir(path)
    }
}

/// In-memory filesystem with call counters.
///
/// Adding a file implicitly creates all of its parent directories.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: RwLock<BTreeMap<PathBuf, String>>,
    dirs: RwLock<BTreeSet<PathBuf>>,
    list_calls: AtomicUsize,
    read_calls: AtomicUsize,
}

impl MemoryFileSystem {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a file.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = normalize(path.as_ref());
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        self.files
            .write()
            .unwrap()
            .insert(path, content.into());
    }

    /// Add an empty directory and its ancestors.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = normalize(path.as_ref());
        let mut dirs = self.dirs.write().unwrap();
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            dirs.insert(ancestor.to_path_buf());
        }
    }

    /// Remove a file, returning whether it existed.
    pub fn remove_file(&self, path: impl AsRef<Path>) -> bool {
        let path = normalize(path.as_ref());
        self.files.write().unwrap().remove(&path).is_some()
    }

    /// Number of `list_directory` calls served so far.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of `read_file` calls served so far.
    #[must_use]
    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_file(&self, path: &Path) -> io::Result<String> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        let path = normalize(path);
        self.files
            .read()
            .unwrap()
            .get(&path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn list_directory(&self, path: &Path) -> io::Result<Vec<ListedEntry>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let path = normalize(path);
        let dirs = self.dirs.read().unwrap();
        if !dirs.contains(&path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                path.display().to_string(),
            ));
        }

        let child_name = |p: &Path| -> Option<String> {
            if p.parent() == Some(path.as_path()) {
                p.file_name().map(|n| n.to_string_lossy().into_owned())
            } else {
                None
            }
        };

        let mut out: Vec<ListedEntry> = dirs
            .iter()
            .filter_map(|d| child_name(d))
            .map(|name| ListedEntry {
                name,
                is_file: false,
                is_dir: true,
            })
            .collect();
        out.extend(
            self.files
                .read()
                .unwrap()
                .keys()
                .filter_map(|f| child_name(f))
                .map(|name| ListedEntry {
                    name,
                    is_file: true,
                    is_dir: false,
                }),
        );
        Ok(out)
    }
}
