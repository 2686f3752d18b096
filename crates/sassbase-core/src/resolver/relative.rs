//! Relative resolution: the file, partial and extension probing algorithm.
//!
//! Given a concrete `file:` URL such as `file:///s/theme/buttons`, finds the
//! one stylesheet it names:
//!
//! - `.import` variants (`buttons.import.scss`) only for `@import`
//! - partials (`_buttons.scss`) alongside plain names
//! - `.sass`, `.scss` and `.css` when no extension is given
//! - `buttons/index.*` when `buttons` is a directory, one level deep
//!
//! More than one match is an error unless exactly one of them is a Sass
//! file, in which case it beats the generated or plain `.css` files.

use crate::dir_cache::{DirEntry, DirectoryIndex};
use crate::error::Error;
use crate::paths::{file_url, url_to_path};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use url::Url;

/// Stylesheet extensions, in probing order.
pub const STYLESHEET_EXTENSIONS: &[&str] = &[".sass", ".scss", ".css"];

/// Resolves concrete file locations against cached directory listings.
#[derive(Debug, Clone)]
pub struct RelativeResolver {
    index: DirectoryIndex,
}

impl RelativeResolver {
    #[must_use]
    pub fn new(index: DirectoryIndex) -> Self {
        Self { index }
    }

    /// Resolve a `file:` URL to the single stylesheet it names.
    ///
    /// Returns `Ok(None)` when nothing matches (including non-`file:` input
    /// and missing directories) and [`Error::AmbiguousImport`] when several
    /// files are equally eligible.
    pub fn resolve(
        &self,
        location: &Url,
        from_import: bool,
        allow_index: bool,
    ) -> Result<Option<Url>, Error> {
        let Some(path) = url_to_path(location) else {
            return Ok(None);
        };
        let (Some(directory), Some(file_name)) =
            (path.parent(), path.file_name().and_then(|n| n.to_str()))
        else {
            return Ok(None);
        };

        let extension = recognized_extension(file_name);
        let (name, extensions) = match extension {
            Some(i) => (
                &file_name[..file_name.len() - STYLESHEET_EXTENSIONS[i].len()],
                &STYLESHEET_EXTENSIONS[i..=i],
            ),
            None => (file_name, STYLESHEET_EXTENSIONS),
        };

        let Some(entry) = self.index.lookup(directory) else {
            trace!(dir = %directory.display(), "directory not found");
            return Ok(None);
        };

        let import_candidates = if from_import {
            candidates(name, ".import", extensions)
        } else {
            Vec::new()
        };
        let default_candidates = candidates(name, "", extensions);

        let found_imports = matching(&entry, &import_candidates);
        let found_defaults = matching(&entry, &default_candidates);
        trace!(
            url = %location,
            imports = ?found_imports,
            defaults = ?found_defaults,
            "probed candidates"
        );

        let found = if found_imports.is_empty() {
            found_defaults
        } else {
            found_imports
        };

        if let Some(chosen) = disambiguate(location, directory, found)? {
            let resolved = file_url(&directory.join(chosen));
            if let Some(ref url) = resolved {
                debug!(specifier = %location, resolved = %url, "resolved stylesheet");
            }
            return Ok(resolved);
        }

        let has_potential_index =
            allow_index && extension.is_none() && entry.has_directory(file_name);
        if has_potential_index {
            let Some(index_url) = file_url(&path.join("index")) else {
                return Ok(None);
            };
            trace!(url = %index_url, "trying directory index");
            return self.resolve(&index_url, from_import, false);
        }

        Ok(None)
    }
}

/// Index into [`STYLESHEET_EXTENSIONS`] of the extension `file_name` ends with.
fn recognized_extension(file_name: &str) -> Option<usize> {
    STYLESHEET_EXTENSIONS
        .iter()
        .position(|ext| file_name.len() > ext.len() && file_name.ends_with(ext))
}

/// `<name><infix><ext>` and `_<name><infix><ext>` for every extension.
fn candidates(name: &str, infix: &str, extensions: &[&str]) -> Vec<String> {
    let mut out = Vec::with_capacity(extensions.len() * 2);
    for ext in extensions {
        out.push(format!("{name}{infix}{ext}"));
        out.push(format!("_{name}{infix}{ext}"));
    }
    out
}

fn matching(entry: &DirEntry, candidates: &[String]) -> Vec<String> {
    candidates
        .iter()
        .filter(|c| entry.has_file(c))
        .cloned()
        .collect()
}

/// Pick the one file from a candidate set.
///
/// A lone Sass file wins over any number of `.css` files; every other
/// multi-match is ambiguous.
fn disambiguate(
    location: &Url,
    directory: &Path,
    mut found: Vec<String>,
) -> Result<Option<String>, Error> {
    match found.len() {
        0 => Ok(None),
        1 => Ok(found.pop()),
        _ => {
            let mut non_css = found.iter().filter(|f| !f.ends_with(".css"));
            if let (Some(only), None) = (non_css.next(), non_css.next()) {
                return Ok(Some(only.clone()));
            }
            let candidates: Vec<PathBuf> = found.iter().map(|f| directory.join(f)).collect();
            debug!(specifier = %location, count = candidates.len(), "ambiguous import");
            Err(Error::AmbiguousImport {
                specifier: location.to_string(),
                candidates,
            })
        }
    }
}
