#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

//! Import resolution and `url()` rebasing for Sass stylesheets.
//!
//! The engine answers a host compiler's `canonicalize` and `load` calls:
//! specifiers resolve to concrete files (relative, load-path and package
//! lookups), and loaded contents have their relative `url()` references
//! rewritten against the entry stylesheet's directory.

pub mod config;
pub mod dir_cache;
pub mod engine;
pub mod error;
pub mod fs;
pub mod host;
pub mod paths;
pub mod rebase;
pub mod resolver;
pub mod scan;
pub mod source_map;
pub mod specifier;
pub mod version;

pub use config::{Config, EngineConfig, CONFIG_FILE_NAME};
pub use dir_cache::{DirEntry, DirEntryCache, DirectoryIndex, NoDirCache, SharedDirCache};
pub use engine::{Engine, EngineBuilder};
pub use error::Error;
pub use fs::{FileSystem, MemoryFileSystem, OsFileSystem};
pub use host::{HostCallbacks, Importer, ImporterChain, StylesheetImporter};
pub use rebase::{Dialect, LoadResult, Rebaser};
pub use resolver::{
    Canonicalize, CanonicalizeOptions, FindOptions, LoadPathResolver, ModuleResolver,
    NodeModulesFinder, PackageFinder, RelativeResolver,
};
pub use scan::{LexicalScanner, Scanner};
pub use source_map::{OffsetMap, SourceMapRegistry, SourceMapSink};
pub use specifier::PackedSpecifier;
pub use version::VERSION;
