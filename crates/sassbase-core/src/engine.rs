//! Wiring for one build.
//!
//! An [`Engine`] owns the pieces that live as long as a build: the directory
//! cache, the shared relative resolver, the rebaser anchored at the entry
//! directory, and the offset-map registry. Several import graphs compiled
//! together can share one engine, or share just its cache by passing it to
//! another builder.

use crate::config::EngineConfig;
use crate::dir_cache::{DirEntryCache, DirectoryIndex, SharedDirCache};
use crate::error::Error;
use crate::fs::{FileSystem, OsFileSystem};
use crate::host::{HostCallbacks, ImporterChain, StylesheetImporter};
use crate::rebase::Rebaser;
use crate::resolver::{
    LoadPathResolver, ModuleResolver, NodeModulesFinder, PackageFinder, RelativeResolver,
};
use crate::source_map::{SourceMapRegistry, SourceMapSink};
use std::path::PathBuf;
use std::sync::Arc;

/// Builder for [`Engine`].
pub struct EngineBuilder {
    config: EngineConfig,
    entry_dir: Option<PathBuf>,
    fs: Option<Arc<dyn FileSystem>>,
    cache: Option<Arc<dyn DirEntryCache>>,
    finder: Option<Arc<dyn PackageFinder>>,
}

impl EngineBuilder {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            entry_dir: None,
            fs: None,
            cache: None,
            finder: None,
        }
    }

    /// Anchor rebasing here instead of at the configured entry's directory.
    #[must_use]
    pub fn entry_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.entry_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = Some(fs);
        self
    }

    /// Share a directory cache with other builds.
    #[must_use]
    pub fn cache(mut self, cache: Arc<dyn DirEntryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replace the `node_modules` package finder.
    #[must_use]
    pub fn finder(mut self, finder: Arc<dyn PackageFinder>) -> Self {
        self.finder = Some(finder);
        self
    }

    pub fn build(self) -> Result<Engine, Error> {
        let entry_dir = self
            .entry_dir
            .or_else(|| self.config.entry_dir())
            .ok_or_else(|| Error::other("no entry stylesheet configured"))?;

        let fs = self.fs.unwrap_or_else(|| Arc::new(OsFileSystem));
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(SharedDirCache::new()));
        let index = DirectoryIndex::new(Arc::clone(&cache), Arc::clone(&fs));

        let finder = self.finder.unwrap_or_else(|| {
            Arc::new(NodeModulesFinder::new(
                index.clone(),
                self.config.package_prefixes.clone(),
            ))
        });

        let source_maps = Arc::new(SourceMapRegistry::new());
        let mut rebaser = Rebaser::new(Arc::clone(&fs), &entry_dir)
            .with_package_prefixes(self.config.package_prefixes.clone());
        if self.config.source_maps {
            let sink: Arc<dyn SourceMapSink> = source_maps.clone();
            rebaser = rebaser.with_source_maps(sink);
        }

        Ok(Engine {
            config: self.config,
            cache,
            relative: Arc::new(RelativeResolver::new(index)),
            rebaser: Arc::new(rebaser),
            finder,
            source_maps,
        })
    }
}

/// Everything one build needs to answer canonicalize and load calls.
pub struct Engine {
    config: EngineConfig,
    cache: Arc<dyn DirEntryCache>,
    relative: Arc<RelativeResolver>,
    rebaser: Arc<Rebaser>,
    finder: Arc<dyn PackageFinder>,
    source_maps: Arc<SourceMapRegistry>,
}

impl Engine {
    #[must_use]
    pub fn builder(config: EngineConfig) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    /// The build's directory cache, for sharing with another engine.
    #[must_use]
    pub fn cache(&self) -> Arc<dyn DirEntryCache> {
        Arc::clone(&self.cache)
    }

    #[must_use]
    pub fn relative(&self) -> Arc<RelativeResolver> {
        Arc::clone(&self.relative)
    }

    #[must_use]
    pub fn rebaser(&self) -> Arc<Rebaser> {
        Arc::clone(&self.rebaser)
    }

    /// Offset maps recorded so far (empty unless source maps are enabled).
    #[must_use]
    pub fn source_maps(&self) -> &Arc<SourceMapRegistry> {
        &self.source_maps
    }

    /// Relative, then load paths (when configured), then packages.
    #[must_use]
    pub fn importers(&self) -> ImporterChain {
        let mut chain = ImporterChain::new().with(Arc::new(StylesheetImporter::new(
            self.relative.clone(),
            Arc::clone(&self.rebaser),
        )));
        if !self.config.load_paths.is_empty() {
            let load_paths =
                LoadPathResolver::new(Arc::clone(&self.relative), self.config.load_paths.clone());
            chain.push(Arc::new(StylesheetImporter::new(
                Arc::new(load_paths),
                Arc::clone(&self.rebaser),
            )));
        }
        let modules = ModuleResolver::new(Arc::clone(&self.relative), Arc::clone(&self.finder));
        chain.push(Arc::new(StylesheetImporter::new(
            Arc::new(modules),
            Arc::clone(&self.rebaser),
        )));
        chain
    }

    /// Pre-bound host callbacks over [`Engine::importers`].
    #[must_use]
    pub fn callbacks(&self) -> HostCallbacks {
        HostCallbacks::bind(Arc::new(self.importers()))
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("entry_dir", &self.rebaser.entry_dir())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use crate::host::Importer;
    use crate::paths::file_url;
    use crate::resolver::CanonicalizeOptions;

    fn root() -> PathBuf {
        std::env::temp_dir().join("sassbase-engine")
    }

    fn project() -> Arc<MemoryFileSystem> {
        let mem = Arc::new(MemoryFileSystem::new());
        mem.add_file(
            root().join("src/main.scss"),
            "@use '~theme/colors';\n@import 'shared';\n.a { b: url(img/logo.png) }\n",
        );
        mem.add_file(
            root().join("src/parts/_nav.scss"),
            ".nav { b: url(../img/nav.png) }",
        );
        mem.add_file(root().join("vendor/_shared.scss"), "$s: 1;");
        mem.add_file(root().join("node_modules/theme/_colors.scss"), "$c: red;");
        mem
    }

    fn engine(mem: &Arc<MemoryFileSystem>, config: EngineConfig) -> Engine {
        Engine::builder(config)
            .fs(Arc::clone(mem) as Arc<dyn FileSystem>)
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_requires_entry() {
        let err = Engine::builder(EngineConfig::default()).build().unwrap_err();
        assert!(err.to_string().contains("entry"));
    }

    #[test]
    fn test_end_to_end_package_resolution() {
        let mem = project();
        let engine = engine(
            &mem,
            EngineConfig::default().with_entry(root().join("src/main.scss")),
        );
        let callbacks = engine.callbacks();

        let main = (callbacks.canonicalize)(
            file_url(&root().join("src/main.scss")).unwrap().as_str(),
            CanonicalizeOptions::default(),
        )
        .unwrap()
        .unwrap();
        let loaded = (callbacks.load)(&main).unwrap().unwrap();
        assert_eq!(loaded.rewrites, 1);

        // The host hands the packed specifier straight back to canonicalize.
        let packed = loaded
            .content
            .split('"')
            .find(|s| s.starts_with("sassbase-pkg:"))
            .unwrap()
            .to_string();
        let colors = (callbacks.canonicalize)(&packed, CanonicalizeOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(
            colors,
            file_url(&root().join("node_modules/theme/_colors.scss")).unwrap()
        );
    }

    #[test]
    fn test_load_paths_join_the_chain() {
        let mem = project();
        let config = EngineConfig::default()
            .with_entry(root().join("src/main.scss"))
            .with_load_path(root().join("vendor"));
        let engine = engine(&mem, config);
        let chain = engine.importers();
        assert_eq!(chain.len(), 3);
        assert_eq!(
            chain
                .canonicalize("shared", CanonicalizeOptions::import())
                .unwrap(),
            file_url(&root().join("vendor/_shared.scss"))
        );
    }

    #[test]
    fn test_source_maps_recorded_when_enabled() {
        let mem = project();
        let config = EngineConfig::default()
            .with_entry(root().join("src/main.scss"))
            .with_source_maps(true);
        let engine = engine(&mem, config);

        let nav = file_url(&root().join("src/parts/_nav.scss")).unwrap();
        let loaded = engine.importers().load(&nav).unwrap().unwrap();
        assert_eq!(loaded.content, ".nav { b: url(img/nav.png) }");
        assert!(engine.source_maps().get(&nav).is_some());
    }

    #[test]
    fn test_engines_can_share_a_cache() {
        let mem = project();
        let first = engine(
            &mem,
            EngineConfig::default().with_entry(root().join("src/main.scss")),
        );
        let second = Engine::builder(EngineConfig::default())
            .entry_dir(root().join("src/parts"))
            .fs(Arc::clone(&mem) as Arc<dyn FileSystem>)
            .cache(first.cache())
            .build()
            .unwrap();

        let nav = file_url(&root().join("src/parts/nav")).unwrap();
        first
            .relative()
            .resolve(&nav, false, true)
            .unwrap()
            .unwrap();
        second
            .relative()
            .resolve(&nav, false, true)
            .unwrap()
            .unwrap();
        assert_eq!(mem.list_calls(), 1);
    }
}
