//! Offset mappings for rewritten stylesheets.
//!
//! When the rebaser changes a file, the host's source map positions point
//! into the rewritten text. An [`OffsetMap`] translates those byte offsets
//! back into the file as it exists on disk; composing the final source map is
//! left to whoever implements [`SourceMapSink`].

use std::collections::HashMap;
use std::ops::Range;
use std::sync::RwLock;
use url::Url;

/// One region of the original text that was replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    /// Byte range in the original text.
    pub original: Range<usize>,
    /// Byte range of the replacement in the rewritten text.
    pub generated: Range<usize>,
}

/// Maps byte offsets in rewritten text back to the original text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetMap {
    replacements: Vec<Replacement>,
    /// Generated minus original length, accumulated over all replacements.
    delta: isize,
}

impl OffsetMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `original` was replaced by `replacement_len` bytes.
    ///
    /// Replacements must be pushed in ascending, non-overlapping order.
    pub fn push(&mut self, original: Range<usize>, replacement_len: usize) {
        debug_assert!(self
            .replacements
            .last()
            .map_or(true, |last| last.original.end <= original.start));

        let start = shift(original.start, self.delta);
        self.delta += replacement_len as isize - original.len() as isize;
        self.replacements.push(Replacement {
            original,
            generated: start..start + replacement_len,
        });
    }

    /// Offset in the original text for `generated`.
    ///
    /// Offsets inside a replaced region map to the start of the region they
    /// replaced; everything else shifts by the replacements before it.
    #[must_use]
    pub fn original_offset(&self, generated: usize) -> usize {
        let mut delta = 0isize;
        for r in &self.replacements {
            if generated < r.generated.start {
                break;
            }
            if generated < r.generated.end {
                return r.original.start;
            }
            delta += r.generated.len() as isize - r.original.len() as isize;
        }
        shift(generated, -delta)
    }

    #[must_use]
    pub fn replacements(&self) -> &[Replacement] {
        &self.replacements
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.replacements.len()
    }
}

#[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
fn shift(offset: usize, delta: isize) -> usize {
    (offset as isize + delta).max(0) as usize
}

/// Receives offset maps for rewritten files, keyed by canonical location.
///
/// Implementations should be thread-safe (Send + Sync).
pub trait SourceMapSink: Send + Sync + std::fmt::Debug {
    fn record(&self, canonical: &Url, map: OffsetMap);
}

/// Sink that keeps every map in memory.
#[derive(Debug, Default)]
pub struct SourceMapRegistry {
    maps: RwLock<HashMap<Url, OffsetMap>>,
}

impl SourceMapRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, canonical: &Url) -> Option<OffsetMap> {
        self.maps.read().unwrap().get(canonical).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.maps.read().unwrap().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SourceMapSink for SourceMapRegistry {
    fn record(&self, canonical: &Url, map: OffsetMap) {
        self.maps.write().unwrap().insert(canonical.clone(), map);
    }
}
