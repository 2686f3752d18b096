//! Stylesheet resolvers.
//!
//! [`RelativeResolver`] implements the probing algorithm for concrete file
//! locations. [`ModuleResolver`] and [`LoadPathResolver`] handle everything
//! else and hand their candidates back to a shared relative resolver.

mod finder;
mod load_path;
mod module;
mod relative;

pub use finder::{FindOptions, NodeModulesFinder, PackageFinder};
pub use load_path::LoadPathResolver;
pub use module::ModuleResolver;
pub use relative::{RelativeResolver, STYLESHEET_EXTENSIONS};

use crate::error::Error;
use crate::paths::as_file_url;
use url::Url;

/// Options the host passes with every canonicalize call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CanonicalizeOptions {
    /// The specifier came from an `@import` rule rather than `@use`/`@forward`.
    pub from_import: bool,
}

impl CanonicalizeOptions {
    #[must_use]
    pub fn import() -> Self {
        Self { from_import: true }
    }
}

/// A resolution strategy: raw specifier in, canonical location out.
///
/// `Ok(None)` means "not mine", letting the host try its next strategy.
pub trait Canonicalize: Send + Sync + std::fmt::Debug {
    fn canonicalize(
        &self,
        specifier: &str,
        options: CanonicalizeOptions,
    ) -> Result<Option<Url>, Error>;
}

impl Canonicalize for RelativeResolver {
    fn canonicalize(
        &self,
        specifier: &str,
        options: CanonicalizeOptions,
    ) -> Result<Option<Url>, Error> {
        match as_file_url(specifier) {
            Some(url) => self.resolve(&url, options.from_import, true),
            None => Ok(None),
        }
    }
}
