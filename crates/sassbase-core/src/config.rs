use crate::error::Error;
use crate::paths::normalize;
use crate::rebase::DEFAULT_PACKAGE_PREFIXES;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name looked up by [`EngineConfig::discover`].
pub const CONFIG_FILE_NAME: &str = "sassbase.json";

/// Runtime configuration for the sassbase CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Current working directory.
    pub cwd: PathBuf,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            json_logs: false,
            verbosity: 0,
        }
    }
}

impl Config {
    /// Create a new config with the given working directory.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }
}

/// Settings for one build: where it starts, where to search, what to pack.
///
/// Read from `sassbase.json`:
///
/// ```json
/// {
///   "entry": "src/main.scss",
///   "loadPaths": ["src/shared", "vendor"],
///   "packagePrefixes": ["~", "pkg:"],
///   "sourceMaps": true
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Entry stylesheet; its directory anchors `url()` rebasing.
    pub entry: Option<PathBuf>,

    /// Search directories for bare specifiers, in priority order.
    pub load_paths: Vec<PathBuf>,

    /// Specifier prefixes that mark package lookups.
    pub package_prefixes: Vec<String>,

    /// Record offset maps for rewritten files.
    pub source_maps: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            entry: None,
            load_paths: Vec::new(),
            package_prefixes: DEFAULT_PACKAGE_PREFIXES
                .iter()
                .map(ToString::to_string)
                .collect(),
            source_maps: false,
        }
    }
}

impl EngineConfig {
    /// Load a config file. Relative paths inside it are resolved against the
    /// file's directory.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or(Path::new("."));
        Ok(config.resolve_relative_to(base))
    }

    /// Load `sassbase.json` from `cwd` if present, defaults otherwise.
    pub fn discover(cwd: &Path) -> Result<Self, Error> {
        let path = cwd.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Make every relative path absolute against `base`.
    #[must_use]
    pub fn resolve_relative_to(mut self, base: &Path) -> Self {
        let absolutize = |p: &Path| normalize(&base.join(p));
        self.entry = self.entry.as_deref().map(absolutize);
        self.load_paths = self.load_paths.iter().map(|p| absolutize(p)).collect();
        self
    }

    /// Directory of the entry stylesheet, if one is configured.
    #[must_use]
    pub fn entry_dir(&self) -> Option<PathBuf> {
        self.entry
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
    }

    #[must_use]
    pub fn with_entry(mut self, entry: impl Into<PathBuf>) -> Self {
        self.entry = Some(entry.into());
        self
    }

    #[must_use]
    pub fn with_load_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.load_paths.push(dir.into());
        self
    }

    #[must_use]
    pub fn with_package_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.package_prefixes = prefixes;
        self
    }

    #[must_use]
    pub fn with_source_maps(mut self, enabled: bool) -> Self {
        self.source_maps = enabled;
        self
    }
}
