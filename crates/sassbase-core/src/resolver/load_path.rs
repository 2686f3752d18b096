use super::relative::RelativeResolver;
use super::{Canonicalize, CanonicalizeOptions};
use crate::error::Error;
use crate::paths::{as_file_url, file_url};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, trace};
use url::Url;

/// Resolves bare specifiers against an ordered list of search directories.
#[derive(Debug, Clone)]
pub struct LoadPathResolver {
    relative: Arc<RelativeResolver>,
    load_paths: Vec<PathBuf>,
}

impl LoadPathResolver {
    #[must_use]
    pub fn new(relative: Arc<RelativeResolver>, load_paths: Vec<PathBuf>) -> Self {
        Self {
            relative,
            load_paths,
        }
    }
}

impl Canonicalize for LoadPathResolver {
    fn canonicalize(
        &self,
        specifier: &str,
        options: CanonicalizeOptions,
    ) -> Result<Option<Url>, Error> {
        if let Some(url) = as_file_url(specifier) {
            return self.relative.resolve(&url, options.from_import, true);
        }

        for dir in &self.load_paths {
            let Some(candidate) = file_url(&dir.join(specifier)) else {
                continue;
            };
            trace!(specifier, load_path = %dir.display(), "probing load path");
            if let Some(found) = self
                .relative
                .resolve(&candidate, options.from_import, true)?
            {
                debug!(specifier, resolved = %found, "resolved via load path");
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}
