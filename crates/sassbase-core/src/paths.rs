//! Path and `file:` URL helpers.
//!
//! All comparisons are lexical: nothing here touches the filesystem, so the
//! same inputs always produce the same canonical locations.

use std::path::{Component, Path, PathBuf};
use url::Url;

/// Lexically normalize a path, dropping `.` and folding `..` into its parent.
///
/// `..` never climbs above the root of an absolute path; leading `..` of a
/// relative path are kept.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().collect()
}

/// Express `target` relative to the directory `base`.
///
/// Both paths are normalized first. When they share no root (different
/// Windows drives) the normalized target is returned unchanged.
#[must_use]
pub fn relative_to(target: &Path, base: &Path) -> PathBuf {
    let target = normalize(target);
    let base = normalize(base);

    let target_parts: Vec<Component<'_>> = target.components().collect();
    let base_parts: Vec<Component<'_>> = base.components().collect();

    if target_parts.first() != base_parts.first() && target.is_absolute() {
        return target;
    }

    let common = target_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..base_parts.len() {
        rel.push("..");
    }
    for part in &target_parts[common..] {
        rel.push(part.as_os_str());
    }
    rel
}

/// Render a relative path with forward slashes regardless of platform.
#[must_use]
pub fn to_slash(path: &Path) -> String {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::ParentDir => parts.push("..".to_string()),
            Component::CurDir => parts.push(".".to_string()),
            Component::Normal(s) => parts.push(s.to_string_lossy().into_owned()),
            Component::RootDir | Component::Prefix(_) => {}
        }
    }
    parts.join("/")
}

/// Convert an absolute path into a normalized `file:` URL.
#[must_use]
pub fn file_url(path: &Path) -> Option<Url> {
    Url::from_file_path(normalize(path)).ok()
}

/// Interpret a specifier as a concrete file location, if it is one.
///
/// Accepts `file:` URLs and absolute filesystem paths. Anything else
/// (relative paths, bare package names, other schemes) yields `None`.
#[must_use]
pub fn as_file_url(specifier: &str) -> Option<Url> {
    if let Ok(url) = Url::parse(specifier) {
        if url.scheme() == "file" {
            return Some(url);
        }
    }
    let path = Path::new(specifier);
    if path.is_absolute() {
        return file_url(path);
    }
    None
}

/// The filesystem path behind a `file:` URL.
#[must_use]
pub fn url_to_path(url: &Url) -> Option<PathBuf> {
    if url.scheme() != "file" {
        return None;
    }
    url.to_file_path().ok()
}
