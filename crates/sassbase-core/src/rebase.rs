//! Content rebasing.
//!
//! Stylesheets are compiled into one output whose relative `url()`s are
//! interpreted against the entry stylesheet's directory, not the directory
//! of the file they were written in. Before handing a file to the host, the
//! rebaser rewrites each relative `url()` so it points at the same resource
//! from the entry directory, and packs package-style specifiers so the module
//! resolver later knows where they were imported from.

use crate::fs::FileSystem;
use crate::paths::{normalize, relative_to, to_slash, url_to_path};
use crate::scan::{LexicalScanner, Scanner};
use crate::source_map::{OffsetMap, SourceMapSink};
use crate::specifier::PackedSpecifier;
use regex_lite::Regex;
use serde::Serialize;
use std::ops::Range;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::debug;
use url::Url;

/// Stylesheet syntax, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Plain CSS (`.css`).
    Css,
    /// Indented syntax (`.sass`).
    Indented,
    /// Nested, brace-delimited syntax (`.scss` and anything else).
    Scss,
}

impl Dialect {
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("css") => Self::Css,
            Some("sass") => Self::Indented,
            _ => Self::Scss,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Css => "css",
            Self::Indented => "indented",
            Self::Scss => "scss",
        }
    }
}

/// A loaded stylesheet, ready for the host to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadResult {
    pub content: String,
    pub dialect: Dialect,
    /// Location the host should use in source maps and for nested imports.
    pub canonical: Url,
    /// Number of spans rewritten.
    pub rewrites: usize,
}

/// Default specifier prefixes that mark package lookups.
pub const DEFAULT_PACKAGE_PREFIXES: &[&str] = &["~", "pkg:"];

/// Loads stylesheets and rebases their content onto the entry directory.
#[derive(Debug, Clone)]
pub struct Rebaser {
    fs: Arc<dyn FileSystem>,
    scanner: Arc<dyn Scanner>,
    entry_dir: PathBuf,
    package_prefixes: Vec<String>,
    source_maps: Option<Arc<dyn SourceMapSink>>,
}

impl Rebaser {
    /// Create a rebaser anchored at `entry_dir`, the directory of the build's
    /// entry stylesheet.
    #[must_use]
    pub fn new(fs: Arc<dyn FileSystem>, entry_dir: impl AsRef<Path>) -> Self {
        Self {
            fs,
            scanner: Arc::new(LexicalScanner),
            entry_dir: normalize(entry_dir.as_ref()),
            package_prefixes: DEFAULT_PACKAGE_PREFIXES
                .iter()
                .map(ToString::to_string)
                .collect(),
            source_maps: None,
        }
    }

    /// Replace the lexical scanner.
    #[must_use]
    pub fn with_scanner(mut self, scanner: Arc<dyn Scanner>) -> Self {
        self.scanner = scanner;
        self
    }

    /// Replace the set of package prefixes.
    #[must_use]
    pub fn with_package_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.package_prefixes = prefixes;
        self
    }

    /// Record offset maps for rewritten files.
    #[must_use]
    pub fn with_source_maps(mut self, sink: Arc<dyn SourceMapSink>) -> Self {
        self.source_maps = Some(sink);
        self
    }

    #[must_use]
    pub fn entry_dir(&self) -> &Path {
        &self.entry_dir
    }

    /// Read and rebase the stylesheet at `canonical`.
    ///
    /// Returns `None` when the file cannot be read, e.g. because a watcher
    /// removed it after it was resolved.
    #[must_use]
    pub fn load(&self, canonical: &Url) -> Option<LoadResult> {
        let path = url_to_path(canonical)?;
        let text = match self.fs.read_file(&path) {
            Ok(text) => text,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "stylesheet unreadable");
                return None;
            }
        };
        let file_dir = path.parent().unwrap_or(Path::new("/"));

        let (content, map) = self.rebase(&text, file_dir);
        let rewrites = map.len();
        if rewrites > 0 {
            debug!(url = %canonical, rewrites, "rebased stylesheet");
            if let Some(sink) = &self.source_maps {
                sink.record(canonical, map);
            }
        }

        Some(LoadResult {
            content,
            dialect: Dialect::from_path(&path),
            canonical: canonical.clone(),
            rewrites,
        })
    }

    /// Rebase `text`, written in `file_dir`. Returns the new text and the
    /// offset map of every span that changed.
    #[must_use]
    pub fn rebase(&self, text: &str, file_dir: &Path) -> (String, OffsetMap) {
        let mut edits: Vec<(Range<usize>, String)> = Vec::new();

        for span in self.scanner.find_url_spans(text) {
            if text.get(span.start..span.end).is_some_and(is_function_call) {
                continue;
            }
            let Some(rebased) = rebase_url(&span.value, file_dir, &self.entry_dir) else {
                continue;
            };
            if text.get(span.start..span.end) != Some(rebased.as_str()) {
                edits.push((span.start..span.end, rebased));
            }
        }

        for span in self.scanner.find_specifier_spans(text) {
            if self.is_package_specifier(&span.specifier) {
                let packed = PackedSpecifier::new(file_dir, span.specifier);
                edits.push((span.start..span.end, packed.quoted()));
            }
        }

        apply_edits(text, edits)
    }

    /// Whether `specifier` starts with one of the package prefixes.
    #[must_use]
    pub fn is_package_specifier(&self, specifier: &str) -> bool {
        self.package_prefixes
            .iter()
            .any(|p| !p.is_empty() && specifier.starts_with(p.as_str()))
    }
}

/// Splice non-overlapping edits into `text`, in offset order.
fn apply_edits(text: &str, mut edits: Vec<(Range<usize>, String)>) -> (String, OffsetMap) {
    edits.sort_by_key(|(range, _)| range.start);

    let mut out = String::with_capacity(text.len());
    let mut map = OffsetMap::new();
    let mut cursor = 0;
    for (range, replacement) in edits {
        if range.start < cursor || range.end > text.len() {
            continue;
        }
        out.push_str(&text[cursor..range.start]);
        out.push_str(&replacement);
        map.push(range.clone(), replacement.len());
        cursor = range.end;
    }
    out.push_str(&text[cursor..]);
    (out, map)
}

fn scheme_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").expect("scheme pattern is valid")
    })
}

fn function_call_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^-?[A-Za-z_][A-Za-z0-9_\-]*\(").expect("function call pattern is valid")
    })
}

/// Whether the raw, still-escaped `url()` argument is a function call such
/// as `var(--bg)` or `map-get($m, k)`.
fn is_function_call(raw: &str) -> bool {
    function_call_pattern().is_match(raw)
}

/// Whether a `url()` argument must be left alone.
///
/// Covers empty arguments, anything mentioning a variable, interpolation, root-relative and
/// protocol-relative paths, fragments, and anything with a scheme
/// (`http:`, `data:`, `javascript:`, drive letters).
#[must_use]
pub fn is_skipped_url(value: &str) -> bool {
    value.is_empty()
        || value.contains('$')
        || value.starts_with('/')
        || value.starts_with('\\')
        || value.starts_with('#')
        || value.contains("#{")
        || scheme_pattern().is_match(value)
}

/// Rewrite a relative `url()` argument found in `file_dir` so it resolves
/// the same way from `entry_dir`. Returns `None` for skipped arguments.
#[must_use]
pub fn rebase_url(value: &str, file_dir: &Path, entry_dir: &Path) -> Option<String> {
    if is_skipped_url(value) {
        return None;
    }
    let joined = file_dir.join(value);
    if climbs_above_root(&joined) {
        return None;
    }
    let target = normalize(&joined);
    let relative = to_slash(&relative_to(&target, entry_dir));
    let relative = if relative.is_empty() {
        ".".to_string()
    } else {
        relative
    };
    Some(escape_url(&relative))
}

/// Whether `..` segments in `path` climb above the filesystem root.
fn climbs_above_root(path: &Path) -> bool {
    let mut depth = 0usize;
    for component in path.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::ParentDir if depth == 0 => return true,
            Component::ParentDir => depth -= 1,
            _ => {}
        }
    }
    false
}

/// Backslash-escape characters that end or break an unquoted `url()`.
fn escape_url(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '(' | ')' | '\'' | '"' | '\\') || c.is_whitespace() {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use crate::paths::file_url;
    use crate::scan::{SpecifierSpan, UrlSpan};
    use crate::source_map::SourceMapRegistry;

    fn root() -> PathBuf {
        std::env::temp_dir().join("sassbase-rebase")
    }

    fn rebaser(mem: &Arc<MemoryFileSystem>) -> Rebaser {
        Rebaser::new(Arc::clone(mem) as Arc<dyn FileSystem>, root())
    }

    #[test]
    fn test_dialect_from_extension() {
        assert_eq!(Dialect::from_path(Path::new("a.css")), Dialect::Css);
        assert_eq!(Dialect::from_path(Path::new("a.sass")), Dialect::Indented);
        assert_eq!(Dialect::from_path(Path::new("a.scss")), Dialect::Scss);
        assert_eq!(Dialect::from_path(Path::new("a.import.less")), Dialect::Scss);
    }

    #[test]
    fn test_skip_rules() {
        for value in [
            "",
            "$var",
            "http://x",
            "data:image/png;base64,AAAA",
            "#frag",
            "/abs",
            "//cdn.example.com/a.png",
            "javascript:void(0)",
            "#{$base}/a.png",
            "img/#{$name}.png",
        ] {
            assert!(is_skipped_url(value), "{value} should be skipped");
        }
        assert!(!is_skipped_url("../img/a.png"));
        assert!(!is_skipped_url("img/a.png"));
    }

    #[test]
    fn test_rebase_url_relative_to_entry() {
        let entry = root();
        let file_dir = root().join("partials/buttons");
        assert_eq!(
            rebase_url("../img/a.png", &file_dir, &entry).unwrap(),
            "partials/img/a.png"
        );
        assert_eq!(
            rebase_url("../../../fonts/x.woff", &file_dir, &entry).unwrap(),
            "../fonts/x.woff"
        );
    }

    #[test]
    fn test_rebase_url_above_root_left_alone() {
        let file_dir = root().join("sub");
        let climb = "../".repeat(64) + "x.png";
        assert_eq!(rebase_url(&climb, &file_dir, &root()), None);

        let mem = Arc::new(MemoryFileSystem::new());
        let text = format!("a {{ b: url({climb}) }}");
        let (out, map) = rebaser(&mem).rebase(&text, &file_dir);
        assert_eq!(out, text);
        assert!(map.is_empty());
    }

    #[test]
    fn test_function_call_and_variable_arguments_untouched() {
        let mem = Arc::new(MemoryFileSystem::new());
        let text = "a { b: url(var(--bg)); c: url(map-get($m, k)); d: url(img/$name.png); e: url(x.png) }";
        let (out, map) = rebaser(&mem).rebase(text, &root().join("sub"));
        assert_eq!(
            out,
            "a { b: url(var(--bg)); c: url(map-get($m, k)); d: url(img/$name.png); e: url(sub/x.png) }"
        );
        assert_eq!(map.len(), 1);
        assert!(is_skipped_url("img/$name.png"));
        assert!(is_function_call("var(--bg)"));
        assert!(!is_function_call(r"a\(1\).png"));
    }

    #[test]
    fn test_rebase_url_escapes_grammar_characters() {
        let file_dir = root().join("sub");
        assert_eq!(
            rebase_url("my img (1).png", &file_dir, &root()).unwrap(),
            r"sub/my\ img\ \(1\).png"
        );
    }

    #[test]
    fn test_rebase_rewrites_only_eligible_urls() {
        let mem = Arc::new(MemoryFileSystem::new());
        let r = rebaser(&mem);
        let text = "a { b: url($var); c: url(); d: url(http://x); e: url(data:x); f: url(#frag); g: url(/abs); h: url(../img/a.png); }";
        let (out, map) = r.rebase(text, &root().join("sub"));
        assert_eq!(
            out,
            "a { b: url($var); c: url(); d: url(http://x); e: url(data:x); f: url(#frag); g: url(/abs); h: url(img/a.png); }"
        );
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_quoted_url_becomes_unquoted() {
        let mem = Arc::new(MemoryFileSystem::new());
        let r = rebaser(&mem);
        let (out, _) = r.rebase("a { b: url('x y.png') }", &root().join("s"));
        assert_eq!(out, r"a { b: url(s/x\ y.png) }");
    }

    #[test]
    fn test_rebase_is_idempotent_at_entry_dir() {
        let mem = Arc::new(MemoryFileSystem::new());
        let r = rebaser(&mem);
        let text = "a { b: url(\"../img/a.png\"); c: url(./fonts/f.woff) }";
        let (once, first_map) = r.rebase(text, &root());
        let (twice, second_map) = r.rebase(&once, &root());
        assert_eq!(once, "a { b: url(../img/a.png); c: url(fonts/f.woff) }");
        assert_eq!(once, twice);
        assert_eq!(first_map.len(), 2);
        assert!(second_map.is_empty());
    }

    #[test]
    fn test_package_specifiers_are_packed() {
        let mem = Arc::new(MemoryFileSystem::new());
        let r = rebaser(&mem);
        let dir = root().join("src");
        let text = "@use \"~theme/colors\" as c;\n@import 'local', 'pkg:grid';\n";
        let (out, map) = r.rebase(text, &dir);

        let colors = PackedSpecifier::new(&dir, "~theme/colors").quoted();
        let grid = PackedSpecifier::new(&dir, "pkg:grid").quoted();
        assert_eq!(
            out,
            format!("@use {colors} as c;\n@import 'local', {grid};\n")
        );
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_multiline_import_list_packed() {
        let mem = Arc::new(MemoryFileSystem::new());
        let dir = root().join("src");
        let text = "@import 'local',\n  '~theme/colors';\n";
        let (out, map) = rebaser(&mem).rebase(text, &dir);

        let colors = PackedSpecifier::new(&dir, "~theme/colors").quoted();
        assert_eq!(out, format!("@import 'local',\n  {colors};\n"));
        assert_eq!(map.len(), 1);
    }

    /// Reports fixed spans, deliberately out of order.
    #[derive(Debug)]
    struct FixedScanner;

    impl Scanner for FixedScanner {
        fn find_url_spans(&self, _text: &str) -> Vec<UrlSpan> {
            vec![
                UrlSpan {
                    start: 6,
                    end: 11,
                    value: "b.png".to_string(),
                },
                UrlSpan {
                    start: 0,
                    end: 5,
                    value: "a.png".to_string(),
                },
            ]
        }

        fn find_specifier_spans(&self, _text: &str) -> Vec<SpecifierSpan> {
            vec![SpecifierSpan {
                start: 12,
                end: 16,
                specifier: "~lib".to_string(),
                from_import: false,
            }]
        }
    }

    #[test]
    fn test_injected_scanner_supplies_spans() {
        let mem = Arc::new(MemoryFileSystem::new());
        let r = rebaser(&mem).with_scanner(Arc::new(FixedScanner));
        let dir = root().join("sub");
        // The default scanner would also report `url(c.png)`.
        let text = "a.png|b.png|~lib|url(c.png)";
        let (out, map) = r.rebase(text, &dir);

        let lib = PackedSpecifier::new(&dir, "~lib").quoted();
        assert_eq!(out, format!("sub/a.png|sub/b.png|{lib}|url(c.png)"));
        let originals: Vec<_> = map
            .replacements()
            .iter()
            .map(|r| r.original.clone())
            .collect();
        assert_eq!(originals, vec![0..5, 6..11, 12..16]);
    }

    #[test]
    fn test_custom_package_prefixes() {
        let mem = Arc::new(MemoryFileSystem::new());
        let r = rebaser(&mem).with_package_prefixes(vec!["@npm/".to_string()]);
        let (out, map) = r.rebase("@use '~theme';\n@use '@npm/grid';", &root());
        assert!(out.starts_with("@use '~theme';"));
        assert!(out.contains("sassbase-pkg:?"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_load_records_offset_map_only_when_rewritten() {
        let mem = Arc::new(MemoryFileSystem::new());
        mem.add_file(root().join("sub/a.scss"), "a { b: url(x.png) }");
        mem.add_file(root().join("b.scss"), "a { b: url(x.png) }");
        let registry = Arc::new(SourceMapRegistry::new());
        let r = rebaser(&mem).with_source_maps(Arc::clone(&registry) as Arc<dyn SourceMapSink>);

        let a_url = file_url(&root().join("sub/a.scss")).unwrap();
        let a = r.load(&a_url).unwrap();
        assert_eq!(a.content, "a { b: url(sub/x.png) }");
        assert_eq!(a.dialect, Dialect::Scss);
        assert_eq!(a.rewrites, 1);
        let map = registry.get(&a_url).unwrap();
        // Offsets after the rewrite shift back by its growth.
        assert_eq!(map.original_offset(21), 17);

        let b_url = file_url(&root().join("b.scss")).unwrap();
        let b = r.load(&b_url).unwrap();
        assert_eq!(b.content, "a { b: url(x.png) }");
        assert_eq!(b.rewrites, 0);
        assert!(registry.get(&b_url).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_load_without_source_maps() {
        let mem = Arc::new(MemoryFileSystem::new());
        mem.add_file(root().join("sub/a.sass"), ".a\n  b: url(x.png)\n");
        let r = rebaser(&mem);
        let loaded = r
            .load(&file_url(&root().join("sub/a.sass")).unwrap())
            .unwrap();
        assert_eq!(loaded.dialect, Dialect::Indented);
        assert_eq!(loaded.content, ".a\n  b: url(sub/x.png)\n");
    }

    #[test]
    fn test_load_missing_file_is_none() {
        let mem = Arc::new(MemoryFileSystem::new());
        mem.add_file(root().join("gone.css"), "");
        let r = rebaser(&mem);
        let url = file_url(&root().join("gone.css")).unwrap();
        assert!(r.load(&url).is_some());
        mem.remove_file(root().join("gone.css"));
        assert!(r.load(&url).is_none());
    }

    #[test]
    fn test_overlapping_edits_keep_first() {
        let (out, map) = apply_edits(
            "abcdef",
            vec![(1..4, "X".to_string()), (2..3, "Y".to_string())],
        );
        assert_eq!(out, "aXef");
        assert_eq!(map.len(), 1);
    }
}
