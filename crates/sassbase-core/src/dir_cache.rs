//! Directory entry cache.
//!
//! Resolution probes many sibling candidates (`foo.scss`, `_foo.scss`,
//! `foo.import.sass`, ...) in the same directory. Listing the directory once
//! and answering every probe from the snapshot turns dozens of `stat` calls
//! into one `readdir` per directory per build.
//!
//! A build is a closed-world snapshot: entries are never invalidated while it
//! runs. The cache handle is owned by whoever spans the build and may be
//! shared across several import graphs compiled together.

use crate::fs::{FileSystem, ListedEntry};
use crate::paths::normalize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::trace;

/// Snapshot of one directory's file and subdirectory names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirEntry {
    pub files: HashSet<String>,
    pub directories: HashSet<String>,
}

impl DirEntry {
    /// Classify a raw listing.
    #[must_use]
    pub fn from_listing(listing: Vec<ListedEntry>) -> Self {
        let mut entry = Self::default();
        for item in listing {
            if item.is_file {
                entry.files.insert(item.name);
            } else if item.is_dir {
                entry.directories.insert(item.name);
            }
        }
        entry
    }

    #[must_use]
    pub fn has_file(&self, name: &str) -> bool {
        self.files.contains(name)
    }

    #[must_use]
    pub fn has_directory(&self, name: &str) -> bool {
        self.directories.contains(name)
    }
}

/// Storage for directory snapshots, keyed by absolute directory path.
///
/// Implementations should be thread-safe (Send + Sync).
pub trait DirEntryCache: Send + Sync + std::fmt::Debug {
    /// Look up a cached snapshot.
    fn get(&self, dir: &Path) -> Option<Arc<DirEntry>>;

    /// Store a snapshot.
    fn set(&self, dir: &Path, entry: Arc<DirEntry>);
}

/// Cache backed by a `RwLock<HashMap>`, safe to share between concurrent jobs.
#[derive(Debug, Default)]
pub struct SharedDirCache {
    entries: RwLock<HashMap<PathBuf, Arc<DirEntry>>>,
}

impl SharedDirCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached directories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every snapshot, e.g. between two watch-mode builds.
    pub fn clear(&self) {
        self.entries.write().unwrap().clear();
    }
}

impl DirEntryCache for SharedDirCache {
    fn get(&self, dir: &Path) -> Option<Arc<DirEntry>> {
        self.entries.read().unwrap().get(dir).cloned()
    }

    fn set(&self, dir: &Path, entry: Arc<DirEntry>) {
        self.entries
            .write()
            .unwrap()
            .insert(dir.to_path_buf(), entry);
    }
}

/// No-op cache (always misses, never stores).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDirCache;

impl DirEntryCache for NoDirCache {
    fn get(&self, _dir: &Path) -> Option<Arc<DirEntry>> {
        None
    }

    fn set(&self, _dir: &Path, _entry: Arc<DirEntry>) {
        // No-op
    }
}

/// A cache paired with the filesystem that fills it.
#[derive(Debug, Clone)]
pub struct DirectoryIndex {
    cache: Arc<dyn DirEntryCache>,
    fs: Arc<dyn FileSystem>,
}

impl DirectoryIndex {
    #[must_use]
    pub fn new(cache: Arc<dyn DirEntryCache>, fs: Arc<dyn FileSystem>) -> Self {
        Self { cache, fs }
    }

    /// Cached snapshot for `dir`, without touching the filesystem.
    #[must_use]
    pub fn get(&self, dir: &Path) -> Option<Arc<DirEntry>> {
        self.cache.get(&normalize(dir))
    }

    /// List `dir` once and cache the snapshot.
    ///
    /// A failed listing is not cached: the directory may appear later in the
    /// build, and a missing directory simply means nothing matches.
    pub fn populate(&self, dir: &Path) -> Option<Arc<DirEntry>> {
        let dir = normalize(dir);
        let listing = match self.fs.list_directory(&dir) {
            Ok(listing) => listing,
            Err(e) => {
                trace!(dir = %dir.display(), error = %e, "directory listing failed");
                return None;
            }
        };
        let entry = Arc::new(DirEntry::from_listing(listing));
        trace!(
            dir = %dir.display(),
            files = entry.files.len(),
            directories = entry.directories.len(),
            "cached directory listing"
        );
        self.cache.set(&dir, Arc::clone(&entry));
        Some(entry)
    }

    /// Cached snapshot for `dir`, listing it on first use.
    pub fn lookup(&self, dir: &Path) -> Option<Arc<DirEntry>> {
        self.get(dir).or_else(|| self.populate(dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;

    fn index_over(mem: &Arc<MemoryFileSystem>, cache: Arc<dyn DirEntryCache>) -> DirectoryIndex {
        DirectoryIndex::new(cache, Arc::clone(mem) as Arc<dyn FileSystem>)
    }

    #[test]
    fn test_lookup_lists_once() {
        let mem = Arc::new(MemoryFileSystem::new());
        mem.add_file("/styles/_vars.scss", "");
        mem.add_dir("/styles/theme");
        let index = index_over(&mem, Arc::new(SharedDirCache::new()));

        let first = index.lookup(Path::new("/styles")).unwrap();
        let second = index.lookup(Path::new("/styles/./")).unwrap();

        assert!(first.has_file("_vars.scss"));
        assert!(first.has_directory("theme"));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(mem.list_calls(), 1);
    }

    #[test]
    fn test_failed_listing_not_cached() {
        let mem = Arc::new(MemoryFileSystem::new());
        let cache = Arc::new(SharedDirCache::new());
        let index = index_over(&mem, Arc::clone(&cache) as Arc<dyn DirEntryCache>);

        assert!(index.lookup(Path::new("/late")).is_none());
        assert!(cache.is_empty());

        mem.add_file("/late/a.scss", "");
        let entry = index.lookup(Path::new("/late")).unwrap();
        assert!(entry.has_file("a.scss"));
        assert_eq!(mem.list_calls(), 2);
    }

    #[test]
    fn test_empty_listing_is_cached() {
        let mem = Arc::new(MemoryFileSystem::new());
        mem.add_dir("/empty");
        let index = index_over(&mem, Arc::new(SharedDirCache::new()));

        assert!(index.lookup(Path::new("/empty")).unwrap().files.is_empty());
        assert!(index.lookup(Path::new("/empty")).is_some());
        assert_eq!(mem.list_calls(), 1);
    }

    #[test]
    fn test_no_cache_always_lists() {
        let mem = Arc::new(MemoryFileSystem::new());
        mem.add_dir("/d");
        let index = index_over(&mem, Arc::new(NoDirCache));

        index.lookup(Path::new("/d"));
        index.lookup(Path::new("/d"));
        assert_eq!(mem.list_calls(), 2);
        assert!(index.get(Path::new("/d")).is_none());
    }

    #[test]
    fn test_shared_cache_clear() {
        let mem = Arc::new(MemoryFileSystem::new());
        mem.add_dir("/d");
        let cache = Arc::new(SharedDirCache::new());
        let index = index_over(&mem, Arc::clone(&cache) as Arc<dyn DirEntryCache>);

        index.lookup(Path::new("/d"));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
