use std::path::PathBuf;
use thiserror::Error;

/// Core error type for sassbase operations.
///
/// A specifier that matches nothing is not an error; resolvers return
/// `Ok(None)` for it so the host can try its next strategy.
#[derive(Error, Debug)]
pub enum Error {
    #[error(
        "It's not clear which file to import for \"{specifier}\". Found:\n{}",
        format_candidates(candidates)
    )]
    AmbiguousImport {
        specifier: String,
        candidates: Vec<PathBuf>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    #[must_use]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Whether this error must abort compilation of the current stylesheet.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AmbiguousImport { .. })
    }
}

fn format_candidates(candidates: &[PathBuf]) -> String {
    candidates
        .iter()
        .map(|c| format!("  {}", c.display()))
        .collect::<Vec<_>>()
        .join("\n")
}
