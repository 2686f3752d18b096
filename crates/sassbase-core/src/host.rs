//! The boundary with the host stylesheet compiler.
//!
//! Hosts call two operations per stylesheet: `canonicalize` to turn a raw
//! specifier into a canonical location, and `load` to fetch its contents.
//! [`Importer`] is that pair. [`HostCallbacks`] binds an importer into two
//! free-standing closures for hosts that store callbacks without their
//! receiver.

use crate::error::Error;
use crate::rebase::{LoadResult, Rebaser};
use crate::resolver::{Canonicalize, CanonicalizeOptions};
use std::sync::Arc;
use tracing::trace;
use url::Url;

/// The canonicalize/load pair a host compiler calls into.
///
/// Both operations are reentrant: loading one stylesheet may trigger nested
/// calls for its imports before the outer call returns.
pub trait Importer: Send + Sync {
    fn canonicalize(
        &self,
        specifier: &str,
        options: CanonicalizeOptions,
    ) -> Result<Option<Url>, Error>;

    fn load(&self, canonical: &Url) -> Result<Option<LoadResult>, Error>;
}

/// An importer built from one resolution strategy and the shared rebaser.
#[derive(Debug, Clone)]
pub struct StylesheetImporter {
    resolver: Arc<dyn Canonicalize>,
    rebaser: Arc<Rebaser>,
}

impl StylesheetImporter {
    #[must_use]
    pub fn new(resolver: Arc<dyn Canonicalize>, rebaser: Arc<Rebaser>) -> Self {
        Self { resolver, rebaser }
    }
}

impl Importer for StylesheetImporter {
    fn canonicalize(
        &self,
        specifier: &str,
        options: CanonicalizeOptions,
    ) -> Result<Option<Url>, Error> {
        self.resolver.canonicalize(specifier, options)
    }

    fn load(&self, canonical: &Url) -> Result<Option<LoadResult>, Error> {
        Ok(self.rebaser.load(canonical))
    }
}

/// Importers tried in order, the way a host walks its configured strategies.
#[derive(Clone, Default)]
pub struct ImporterChain {
    importers: Vec<Arc<dyn Importer>>,
}

impl ImporterChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, importer: Arc<dyn Importer>) -> Self {
        self.importers.push(importer);
        self
    }

    pub fn push(&mut self, importer: Arc<dyn Importer>) {
        self.importers.push(importer);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.importers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.importers.is_empty()
    }
}

impl std::fmt::Debug for ImporterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImporterChain")
            .field("importers", &self.importers.len())
            .finish()
    }
}

impl Importer for ImporterChain {
    /// First importer with an answer wins; an error stops the walk.
    fn canonicalize(
        &self,
        specifier: &str,
        options: CanonicalizeOptions,
    ) -> Result<Option<Url>, Error> {
        for (i, importer) in self.importers.iter().enumerate() {
            if let Some(url) = importer.canonicalize(specifier, options)? {
                trace!(specifier, importer = i, resolved = %url, "canonicalized");
                return Ok(Some(url));
            }
        }
        Ok(None)
    }

    fn load(&self, canonical: &Url) -> Result<Option<LoadResult>, Error> {
        for importer in &self.importers {
            if let Some(loaded) = importer.load(canonical)? {
                return Ok(Some(loaded));
            }
        }
        Ok(None)
    }
}

/// Shared `canonicalize` callback.
pub type CanonicalizeFn =
    Arc<dyn Fn(&str, CanonicalizeOptions) -> Result<Option<Url>, Error> + Send + Sync>;

/// Shared `load` callback.
pub type LoadFn = Arc<dyn Fn(&Url) -> Result<Option<LoadResult>, Error> + Send + Sync>;

/// `canonicalize` and `load`, each bound to its importer at construction.
///
/// The closures own a reference to the importer, so either one can be
/// cloned, stored apart from the other, or moved to another thread and still
/// work.
#[derive(Clone)]
pub struct HostCallbacks {
    pub canonicalize: CanonicalizeFn,
    pub load: LoadFn,
}

impl HostCallbacks {
    #[must_use]
    pub fn bind(importer: Arc<dyn Importer>) -> Self {
        let for_canonicalize = Arc::clone(&importer);
        let for_load = importer;
        Self {
            canonicalize: Arc::new(move |specifier: &str, options: CanonicalizeOptions| {
                for_canonicalize.canonicalize(specifier, options)
            }),
            load: Arc::new(move |canonical: &Url| for_load.load(canonical)),
        }
    }
}

impl std::fmt::Debug for HostCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostCallbacks").finish_non_exhaustive()
    }
}
