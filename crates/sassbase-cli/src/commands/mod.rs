pub mod check;
pub mod graph;
pub mod load;
pub mod resolve;
pub mod version;

use miette::{IntoDiagnostic, Result};
use sassbase_core::paths::{as_file_url, normalize, url_to_path};
use sassbase_core::{
    CanonicalizeOptions, Config, Engine, EngineConfig, Error, Importer, PackedSpecifier,
};
use std::path::{Path, PathBuf};
use url::Url;

/// Resolve `path` against the working directory.
pub fn absolutize(cwd: &Path, path: &Path) -> PathBuf {
    normalize(&cwd.join(path))
}

/// `sassbase.json` from the working directory, or defaults.
pub fn engine_config(config: &Config) -> Result<EngineConfig> {
    EngineConfig::discover(&config.cwd).into_diagnostic()
}

/// Build an engine, anchoring rebasing at `fallback_dir` when no entry is
/// configured.
pub fn build_engine(engine_config: EngineConfig, fallback_dir: &Path) -> Result<Engine> {
    let mut builder = Engine::builder(engine_config.clone());
    if engine_config.entry.is_none() {
        builder = builder.entry_dir(fallback_dir);
    }
    builder.build().into_diagnostic()
}

/// Canonicalize `specifier` as written in the stylesheet at `containing`.
///
/// Like a host compiler, tries the specifier relative to the containing
/// stylesheet first and falls back to the importer chain.
pub fn canonicalize_from(
    importer: &dyn Importer,
    specifier: &str,
    containing: &Url,
    options: CanonicalizeOptions,
) -> Result<Option<Url>, Error> {
    if as_file_url(specifier).is_none() && Url::parse(specifier).is_err() {
        if let Ok(joined) = containing.join(specifier) {
            if let Some(url) = importer.canonicalize(joined.as_str(), options)? {
                return Ok(Some(url));
            }
        }
    }
    importer.canonicalize(specifier, options)
}

/// A canonical location for humans: the file path when there is one.
pub fn display_url(url: &Url) -> String {
    url_to_path(url).map_or_else(|| url.to_string(), |p| p.display().to_string())
}

/// A specifier for humans: packed package specifiers show what was written.
pub fn display_specifier(specifier: &str) -> String {
    PackedSpecifier::decode(specifier).map_or_else(|| specifier.to_string(), |p| p.specifier)
}
