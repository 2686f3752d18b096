//! Packed specifiers.
//!
//! The host's `canonicalize` callback only receives the raw specifier, never
//! the file it was written in. Package lookups need that origin, so the
//! rebaser replaces package-style specifiers with a packed form carrying the
//! origin directory along, and the module resolver unpacks it on the way back.
//!
//! Wire form (internal to this crate, not a public format):
//!
//! ```text
//! sassbase-pkg:?origin=<form-urlencoded dir>&spec=<form-urlencoded specifier>
//! ```
//!
//! The scheme makes the string an absolute URL, so hosts never try to resolve
//! it relative to the importing file. Form encoding removes quotes, spaces and
//! parentheses, so the packed string is safe inside a quoted specifier.

use std::fmt;
use std::path::PathBuf;
use url::form_urlencoded;

/// Marker scheme for packed specifiers.
pub const PACKED_SCHEME: &str = "sassbase-pkg";

const ORIGIN_KEY: &str = "origin";
const SPEC_KEY: &str = "spec";

/// A specifier that needs module resolution from a known origin directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedSpecifier {
    /// Directory of the stylesheet the specifier was written in.
    pub origin: PathBuf,
    /// The specifier exactly as written.
    pub specifier: String,
}

impl PackedSpecifier {
    pub fn new(origin: impl Into<PathBuf>, specifier: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            specifier: specifier.into(),
        }
    }

    /// Serialize into the opaque string form.
    #[must_use]
    pub fn encode(&self) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair(ORIGIN_KEY, &self.origin.to_string_lossy())
            .append_pair(SPEC_KEY, &self.specifier)
            .finish();
        format!("{PACKED_SCHEME}:?{query}")
    }

    /// The encoded form wrapped in double quotes, ready to splice into a
    /// stylesheet in place of the original quoted specifier.
    #[must_use]
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.encode())
    }

    /// Parse a packed specifier. Returns `None` for anything else.
    #[must_use]
    pub fn decode(raw: &str) -> Option<Self> {
        let query = raw
            .strip_prefix(PACKED_SCHEME)
            .and_then(|rest| rest.strip_prefix(":?"))?;

        let mut origin = None;
        let mut specifier = None;
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                ORIGIN_KEY => origin = Some(PathBuf::from(value.into_owned())),
                SPEC_KEY => specifier = Some(value.into_owned()),
                _ => {}
            }
        }

        Some(Self {
            origin: origin?,
            specifier: specifier?,
        })
    }

    /// Cheap check for the marker without a full decode.
    #[must_use]
    pub fn is_packed(raw: &str) -> bool {
        raw.starts_with(PACKED_SCHEME) && raw[PACKED_SCHEME.len()..].starts_with(":?")
    }
}

impl fmt::Display for PackedSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
