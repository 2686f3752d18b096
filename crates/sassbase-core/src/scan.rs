//! Stylesheet specifier scanner.
//!
//! Finds `url(...)` arguments and `@import`/`@use`/`@forward` specifiers in
//! raw stylesheet text without parsing it. Comments and unrelated string
//! literals are skipped so their contents are never reported.
//!
//! Offsets are byte offsets into the scanned text. All delimiters the scanner
//! looks for are ASCII, so every reported offset is a char boundary.

/// A `url(...)` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlSpan {
    /// Start of the argument (the opening quote, for quoted arguments).
    pub start: usize,
    /// End of the argument (past the closing quote, for quoted arguments).
    pub end: usize,
    /// The argument with quotes removed and escapes resolved.
    pub value: String,
}

/// A specifier of an `@import`, `@use` or `@forward` rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecifierSpan {
    /// Start of the specifier, including its opening quote when quoted.
    pub start: usize,
    /// End of the specifier, including its closing quote when quoted.
    pub end: usize,
    /// The specifier text without quotes.
    pub specifier: String,
    /// Found in an `@import` rule rather than `@use`/`@forward`.
    pub from_import: bool,
}

/// Lexical scanning collaborator used by the rebaser.
///
/// Both methods return spans in ascending `start` order and hold no state
/// between calls.
pub trait Scanner: Send + Sync + std::fmt::Debug {
    fn find_url_spans(&self, text: &str) -> Vec<UrlSpan>;

    fn find_specifier_spans(&self, text: &str) -> Vec<SpecifierSpan>;
}

/// Default scanner for SCSS, indented Sass and plain CSS.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalScanner;

impl Scanner for LexicalScanner {
    fn find_url_spans(&self, text: &str) -> Vec<UrlSpan> {
        scan(text).urls
    }

    fn find_specifier_spans(&self, text: &str) -> Vec<SpecifierSpan> {
        scan(text).specifiers
    }
}

/// Everything found in one pass over the text.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub urls: Vec<UrlSpan>,
    pub specifiers: Vec<SpecifierSpan>,
}

/// Scan text for `url()` arguments and rule specifiers.
#[must_use]
pub fn scan(text: &str) -> ScanResult {
    let bytes = text.as_bytes();
    let len = bytes.len();
    let mut result = ScanResult::default();
    let mut i = 0;

    while i < len {
        // Block comment
        if bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'*') {
            i = skip_block_comment(bytes, i);
            continue;
        }

        // Line comment
        if bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'/') {
            while i < len && bytes[i] != b'\n' {
                i += 1;
            }
            continue;
        }

        if bytes[i] == b'"' || bytes[i] == b'\'' {
            i = skip_string(bytes, i).unwrap_or(len);
            continue;
        }

        if bytes[i] == b'@' {
            if let Some(keyword) = rule_keyword(bytes, i + 1) {
                i = scan_rule_prelude(text, i + 1 + keyword.len(), keyword, &mut result);
                continue;
            }
        }

        if starts_with_ignore_case(bytes, i, b"url(") && !is_ident_byte_before(bytes, i) {
            if let Some((span, end)) = scan_url_argument(text, i + 4) {
                result.urls.push(span);
                i = end;
                continue;
            }
        }

        i += 1;
    }

    result
}

const RULE_KEYWORDS: &[&str] = &["import", "use", "forward"];

/// Match `import`, `use` or `forward` at `pos`, followed by a non-ident byte.
fn rule_keyword(bytes: &[u8], pos: usize) -> Option<&'static str> {
    RULE_KEYWORDS.iter().copied().find(|kw| {
        let end = pos + kw.len();
        bytes.get(pos..end) == Some(kw.as_bytes())
            && bytes.get(end).map_or(true, |b| !is_ident_byte(*b))
    })
}

/// Collect specifiers after an at-rule keyword. Returns where scanning resumes.
fn scan_rule_prelude(
    text: &str,
    mut i: usize,
    keyword: &str,
    result: &mut ScanResult,
) -> usize {
    let bytes = text.as_bytes();
    let len = bytes.len();
    let allows_list = keyword == "import";

    // The prelude may span lines (`@import 'a',\n  'b';`); only a
    // specifier followed by something other than a comma ends it.
    loop {
        i = skip_whitespace_and_comments(bytes, i);
        if i >= len {
            return i;
        }

        match bytes[i] {
            b'"' | b'\'' => {
                let Some(end) = skip_string(bytes, i) else {
                    return len;
                };
                result.specifiers.push(SpecifierSpan {
                    start: i,
                    end,
                    specifier: text[i + 1..end - 1].to_string(),
                    from_import: allows_list,
                });
                i = end;
            }
            // Plain-CSS `@import url(...)` is left to the url pass.
            _ if starts_with_ignore_case(bytes, i, b"url(") => return i,
            b';' | b'{' | b'}' | b',' | b'#' | b'$' => return i,
            _ => {
                // Unquoted specifier, only valid in the indented syntax.
                let start = i;
                while i < len && !matches!(bytes[i], b';' | b',' | b'{' | b'}') {
                    if bytes[i].is_ascii_whitespace() {
                        break;
                    }
                    i += 1;
                }
                if i == start {
                    return i;
                }
                result.specifiers.push(SpecifierSpan {
                    start,
                    end: i,
                    specifier: text[start..i].to_string(),
                    from_import: allows_list,
                });
            }
        }

        if !allows_list {
            return i;
        }
        let next = skip_whitespace_and_comments(bytes, i);
        if bytes.get(next) == Some(&b',') {
            i = next + 1;
        } else {
            return i;
        }
    }
}

/// Parse a `url(` argument starting just after the opening parenthesis.
///
/// Returns the span and the position after the closing parenthesis.
fn scan_url_argument(text: &str, open: usize) -> Option<(UrlSpan, usize)> {
    let bytes = text.as_bytes();
    let len = bytes.len();
    let mut i = open;
    while i < len && bytes[i].is_ascii_whitespace() {
        i += 1;
    }

    if i < len && (bytes[i] == b'"' || bytes[i] == b'\'') {
        let start = i;
        let end = skip_string(bytes, i)?;
        let mut j = end;
        while j < len && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if bytes.get(j) != Some(&b')') {
            return None;
        }
        let span = UrlSpan {
            start,
            end,
            value: unescape(&text[start + 1..end - 1]),
        };
        return Some((span, j + 1));
    }

    let start = i;
    let mut interpolation = 0usize;
    let mut parens = 0usize;
    while i < len {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'#' if bytes.get(i + 1) == Some(&b'{') => {
                interpolation += 1;
                i += 2;
                continue;
            }
            b'}' if interpolation > 0 => interpolation -= 1,
            // Nested calls such as `url(var(--bg))`.
            b'(' if interpolation == 0 => parens += 1,
            b')' if interpolation == 0 && parens > 0 => parens -= 1,
            b')' if interpolation == 0 => break,
            b'\n' if interpolation == 0 && parens == 0 => return None,
            _ => {}
        }
        i += 1;
    }
    if i >= len {
        return None;
    }

    let mut end = i;
    while end > start && bytes[end - 1].is_ascii_whitespace() {
        end -= 1;
    }
    let span = UrlSpan {
        start,
        end,
        value: unescape(&text[start..end]),
    };
    Some((span, i + 1))
}

/// Resolve backslash escapes of the form `\X` to `X`.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Skip a quoted string starting at `start`; returns the position after the
/// closing quote, or `None` if the string is unterminated.
fn skip_string(bytes: &[u8], start: usize) -> Option<usize> {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return None,
            b if b == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 2;
    while i + 1 < bytes.len() {
        if bytes[i] == b'*' && bytes[i + 1] == b'/' {
            return i + 2;
        }
        i += 1;
    }
    bytes.len()
}

fn skip_whitespace_and_comments(bytes: &[u8], mut i: usize) -> usize {
    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match (bytes.get(i), bytes.get(i + 1)) {
            (Some(b'/'), Some(b'*')) => i = skip_block_comment(bytes, i),
            (Some(b'/'), Some(b'/')) => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            _ => return i,
        }
    }
}

fn starts_with_ignore_case(bytes: &[u8], pos: usize, needle: &[u8]) -> bool {
    bytes
        .get(pos..pos + needle.len())
        .is_some_and(|s| s.eq_ignore_ascii_case(needle))
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b >= 0x80
}

fn is_ident_byte_before(bytes: &[u8], pos: usize) -> bool {
    pos > 0 && is_ident_byte(bytes[pos - 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(text: &str) -> Vec<String> {
        LexicalScanner
            .find_url_spans(text)
            .into_iter()
            .map(|s| s.value)
            .collect()
    }

    fn specs(text: &str) -> Vec<String> {
        LexicalScanner
            .find_specifier_spans(text)
            .into_iter()
            .map(|s| s.specifier)
            .collect()
    }

    #[test]
    fn test_unquoted_and_quoted_urls() {
        let text = "a { background: url(../img/a.png); } b { src: url( \"x y.woff\" ) }";
        let spans = LexicalScanner.find_url_spans(text);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].value, "../img/a.png");
        assert_eq!(&text[spans[0].start..spans[0].end], "../img/a.png");
        assert_eq!(spans[1].value, "x y.woff");
        assert_eq!(&text[spans[1].start..spans[1].end], "\"x y.woff\"");
    }

    #[test]
    fn test_url_escapes_resolved() {
        assert_eq!(urls(r"a { b: url(img/a\(1\).png) }"), vec!["img/a(1).png"]);
    }

    #[test]
    fn test_url_with_interpolation_kept_whole() {
        assert_eq!(
            urls("a { b: url(#{$base}/a.png) }"),
            vec!["#{$base}/a.png"]
        );
    }

    #[test]
    fn test_url_requires_word_boundary() {
        assert!(urls("a { b: myurl(x.png) }").is_empty());
        assert_eq!(urls("a { b: URL(x.png) }"), vec!["x.png"]);
    }

    #[test]
    fn test_comments_and_strings_skipped() {
        let text = "/* url(a.png) @import 'x'; */\n// url(b.png)\na { content: \"url(c.png)\"; }";
        assert!(urls(text).is_empty());
        assert!(specs(text).is_empty());
    }

    #[test]
    fn test_protocol_url_not_a_comment() {
        assert_eq!(urls("a { b: url(http://x/y.png) }"), vec!["http://x/y.png"]);
    }

    #[test]
    fn test_import_list_and_use_forward() {
        let text = "@import \"a\", 'b';\n@use \"~lib/mixins\" as m;\n@forward 'c' show d;";
        assert_eq!(specs(text), vec!["a", "b", "~lib/mixins", "c"]);
        let spans = LexicalScanner.find_specifier_spans(text);
        assert_eq!(&text[spans[0].start..spans[0].end], "\"a\"");
    }

    #[test]
    fn test_import_list_across_lines() {
        let text = "@import 'a',\n  '~pkg/b', // trailing note\n  /* c */ 'c';\n@import\n  'd';\n.x { y: z }";
        assert_eq!(specs(text), vec!["a", "~pkg/b", "c", "d"]);
        let spans = LexicalScanner.find_specifier_spans(text);
        assert_eq!(&text[spans[1].start..spans[1].end], "'~pkg/b'");
    }

    #[test]
    fn test_nested_calls_in_unquoted_url() {
        let text = "a { b: url(var(--bg)); c: url(map-get($m, k)); d: url(e.png) }";
        let spans = LexicalScanner.find_url_spans(text);
        let values: Vec<_> = spans.iter().map(|s| s.value.as_str()).collect();
        assert_eq!(values, vec!["var(--bg)", "map-get($m, k)", "e.png"]);
        assert_eq!(&text[spans[0].start..spans[0].end], "var(--bg)");
    }

    #[test]
    fn test_rule_kind_recorded() {
        let found = scan("@use 'a';\n@import 'b', 'c';").specifiers;
        let kinds: Vec<_> = found.iter().map(|s| s.from_import).collect();
        assert_eq!(kinds, vec![false, true, true]);
    }

    #[test]
    fn test_import_media_query_not_reported() {
        assert_eq!(specs("@import \"print\" print;"), vec!["print"]);
    }

    #[test]
    fn test_plain_css_url_import_left_to_url_pass() {
        let text = "@import url(theme.css);";
        assert!(specs(text).is_empty());
        assert_eq!(urls(text), vec!["theme.css"]);
    }

    #[test]
    fn test_indented_unquoted_import() {
        let text = "@import ~lib/base, partials/nav\n.a\n  color: red\n";
        assert_eq!(specs(text), vec!["~lib/base", "partials/nav"]);
    }

    #[test]
    fn test_spans_ascending() {
        let text = "@import 'a';\nb { c: url(d.png) }\n@import 'e';";
        let s = LexicalScanner.find_specifier_spans(text);
        assert!(s[0].start < s[1].start);
    }

    #[test]
    fn test_unterminated_url_ignored() {
        assert!(urls("a { b: url(x.png\n }").is_empty());
    }

    #[test]
    fn test_non_ascii_text() {
        let text = "/* ünïcödé */ a::before { content: \"→\"; b: url(imäge.png) }";
        let spans = LexicalScanner.find_url_spans(text);
        assert_eq!(spans[0].value, "imäge.png");
        assert_eq!(&text[spans[0].start..spans[0].end], "imäge.png");
    }
}
