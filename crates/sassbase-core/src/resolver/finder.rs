use crate::dir_cache::{DirEntry, DirectoryIndex};
use crate::paths::file_url;
use std::path::{Path, PathBuf};
use tracing::trace;
use url::Url;

/// Context handed to a [`PackageFinder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindOptions {
    pub from_import: bool,
    /// Directory of the stylesheet containing the specifier.
    pub origin: PathBuf,
}

/// Maps a package-style specifier to a location on disk.
///
/// The returned location does not need an extension or partial prefix; the
/// module resolver probes it like any other relative location.
pub trait PackageFinder: Send + Sync {
    fn find(&self, specifier: &str, options: &FindOptions) -> Option<Url>;
}

impl<F> PackageFinder for F
where
    F: Fn(&str, &FindOptions) -> Option<Url> + Send + Sync,
{
    fn find(&self, specifier: &str, options: &FindOptions) -> Option<Url> {
        self(specifier, options)
    }
}

/// Looks packages up in `node_modules`, walking up from the origin.
///
/// `~bootstrap/scss/mixins` from `/app/src/styles` tries
/// `/app/src/styles/node_modules/bootstrap`, then `/app/src/node_modules/...`,
/// up to the root, and answers with the first package directory that exists.
#[derive(Debug, Clone)]
pub struct NodeModulesFinder {
    index: DirectoryIndex,
    prefixes: Vec<String>,
}

impl NodeModulesFinder {
    /// `prefixes` are stripped from the specifier before lookup (`~`, `pkg:`).
    #[must_use]
    pub fn new(index: DirectoryIndex, prefixes: Vec<String>) -> Self {
        Self { index, prefixes }
    }

    fn strip_prefix<'a>(&self, specifier: &'a str) -> &'a str {
        self.prefixes
            .iter()
            .find_map(|p| specifier.strip_prefix(p.as_str()))
            .unwrap_or(specifier)
    }
}

impl PackageFinder for NodeModulesFinder {
    fn find(&self, specifier: &str, options: &FindOptions) -> Option<Url> {
        let bare = self.strip_prefix(specifier);
        let package = package_name(bare)?;

        let mut current: Option<&Path> = Some(options.origin.as_path());
        while let Some(dir) = current {
            let modules = dir.join("node_modules");
            let found = self
                .index
                .lookup(&modules)
                .is_some_and(|entry| has_package(&self.index, &modules, &entry, package));
            if found {
                trace!(specifier, dir = %modules.display(), "found package");
                return file_url(&modules.join(bare));
            }
            current = dir.parent();
        }
        None
    }
}

/// `@scope/name` or `name`: the package part of a bare specifier.
fn package_name(bare: &str) -> Option<&str> {
    if bare.is_empty() || bare.starts_with('.') || bare.starts_with('/') {
        return None;
    }
    let mut slashes = bare.match_indices('/').map(|(i, _)| i);
    let end = if bare.starts_with('@') {
        slashes.nth(1)
    } else {
        slashes.next()
    };
    Some(end.map_or(bare, |i| &bare[..i]))
}

fn has_package(
    index: &DirectoryIndex,
    modules: &Path,
    entry: &DirEntry,
    package: &str,
) -> bool {
    match package.split_once('/') {
        Some((scope, name)) => {
            entry.has_directory(scope)
                && index
                    .lookup(&modules.join(scope))
                    .is_some_and(|e| e.has_directory(name))
        }
        None => entry.has_directory(package),
    }
}
