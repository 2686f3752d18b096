use super::finder::{FindOptions, PackageFinder};
use super::relative::RelativeResolver;
use super::{Canonicalize, CanonicalizeOptions};
use crate::error::Error;
use crate::paths::as_file_url;
use crate::specifier::PackedSpecifier;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Resolves packed package specifiers through a [`PackageFinder`].
///
/// Concrete file locations go straight to the relative resolver. Packed
/// specifiers are unpacked to recover the importing directory, handed to the
/// finder, and whatever it returns is probed again for partials and
/// extensions.
#[derive(Clone)]
pub struct ModuleResolver {
    relative: Arc<RelativeResolver>,
    finder: Arc<dyn PackageFinder>,
}

impl ModuleResolver {
    #[must_use]
    pub fn new(relative: Arc<RelativeResolver>, finder: Arc<dyn PackageFinder>) -> Self {
        Self { relative, finder }
    }
}

impl std::fmt::Debug for ModuleResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleResolver")
            .field("relative", &self.relative)
            .finish_non_exhaustive()
    }
}

impl Canonicalize for ModuleResolver {
    fn canonicalize(
        &self,
        specifier: &str,
        options: CanonicalizeOptions,
    ) -> Result<Option<Url>, Error> {
        if let Some(url) = as_file_url(specifier) {
            return self.relative.resolve(&url, options.from_import, true);
        }

        let Some(packed) = PackedSpecifier::decode(specifier) else {
            return Ok(None);
        };

        let find_options = FindOptions {
            from_import: options.from_import,
            origin: packed.origin.clone(),
        };
        let Some(candidate) = self.finder.find(&packed.specifier, &find_options) else {
            debug!(specifier = %packed.specifier, origin = %packed.origin.display(), "package not found");
            return Ok(None);
        };
        if candidate.scheme() != "file" {
            return Ok(None);
        }

        self.relative
            .resolve(&candidate, options.from_import, true)
    }
}
