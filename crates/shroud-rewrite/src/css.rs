use crate::links::{resolve_reference, LinkBuilder, Resolution};
use shroud_types::{RewriteReport, RewriteTarget};
use tracing::{debug, warn};
use url::Url;

/// One `url(...)` occurrence found in a stylesheet.
///
/// `start..end` spans the whole occurrence including `url(` and `)`;
/// `value` is the raw text between the optional quotes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UrlToken<'s> {
    pub start: usize,
    pub end: usize,
    pub value: &'s str,
    pub quote: Option<char>,
}

/// Scans `css` left to right for non-overlapping `url(...)` occurrences.
pub fn find_url_tokens(css: &str) -> Vec<UrlToken<'_>> {
    let bytes = css.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while let Some(offset) = find_url_open(&bytes[pos..]) {
        let start = pos + offset;
        let body_start = start + 4;

        if start > 0 && is_ident_byte(bytes[start - 1]) {
            pos = body_start;
            continue;
        }

        match scan_url_body(bytes, body_start) {
            Some((value_start, value_end, quote, end)) => {
                tokens.push(UrlToken {
                    start,
                    end,
                    value: &css[value_start..value_end],
                    quote,
                });
                pos = end;
            }
            None => pos = body_start,
        }
    }

    tokens
}

fn find_url_open(bytes: &[u8]) -> Option<usize> {
    bytes.windows(4).position(|w| w.eq_ignore_ascii_case(b"url("))
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'\\'
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while bytes.get(i).map_or(false, |b| b.is_ascii_whitespace()) {
        i += 1;
    }
    i
}

// Returns (value_start, value_end, quote, end_after_paren). All indices sit on
// ASCII delimiters, so they are valid char boundaries.
fn scan_url_body(bytes: &[u8], body_start: usize) -> Option<(usize, usize, Option<char>, usize)> {
    let i = skip_whitespace(bytes, body_start);

    match bytes.get(i) {
        Some(&q) if q == b'"' || q == b'\'' => {
            let value_start = i + 1;
            let mut j = value_start;
            loop {
                match *bytes.get(j)? {
                    b'\\' => j += 2,
                    b'\n' | b'\r' => return None,
                    c if c == q => break,
                    _ => j += 1,
                }
            }
            let close = skip_whitespace(bytes, j + 1);
            if bytes.get(close) != Some(&b')') {
                return None;
            }
            Some((value_start, j, Some(q as char), close + 1))
        }
        _ => {
            let value_start = i;
            let mut j = i;
            loop {
                match *bytes.get(j)? {
                    b'\\' => j += 2,
                    b')' => break,
                    b'\n' | b'\r' | b'"' | b'\'' | b'(' => return None,
                    _ => j += 1,
                }
            }
            let mut value_end = j;
            while value_end > value_start && bytes[value_end - 1].is_ascii_whitespace() {
                value_end -= 1;
            }
            if bytes[value_start..value_end].iter().any(u8::is_ascii_whitespace) {
                return None;
            }
            Some((value_start, value_end, None, j + 1))
        }
    }
}

/// Resolves CSS backslash escapes (`\28`, `\)` ...) in a url value.
fn unescape(value: &str) -> String {
    if !value.contains('\\') {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        let mut hex = String::new();
        while hex.len() < 6 {
            match chars.peek() {
                Some(h) if h.is_ascii_hexdigit() => {
                    hex.push(*h);
                    chars.next();
                }
                _ => break,
            }
        }

        if hex.is_empty() {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            if chars.peek().map_or(false, |c| c.is_ascii_whitespace()) {
                chars.next();
            }
            let decoded = u32::from_str_radix(&hex, 16)
                .ok()
                .and_then(char::from_u32)
                .unwrap_or(char::REPLACEMENT_CHARACTER);
            out.push(decoded);
        }
    }
    out
}

/// Rewrites every resolvable `url()` in a stylesheet to a signed image
/// endpoint reference. Text outside the matched occurrences is copied
/// through byte for byte.
pub struct CssRewriter<'a> {
    links: &'a LinkBuilder,
}

impl<'a> CssRewriter<'a> {
    pub fn new(links: &'a LinkBuilder) -> Self {
        Self { links }
    }

    pub fn rewrite(&self, base: &Url, css: &str) -> String {
        let mut report = RewriteReport::default();
        self.rewrite_with_report(base, css, &mut report)
    }

    pub fn rewrite_with_report(&self, base: &Url, css: &str, report: &mut RewriteReport) -> String {
        let tokens = find_url_tokens(css);
        if tokens.is_empty() {
            return css.to_string();
        }

        let mut out = String::with_capacity(css.len() + tokens.len() * 64);
        let mut cursor = 0;

        for token in tokens {
            out.push_str(&css[cursor..token.start]);
            let original = &css[token.start..token.end];

            match resolve_reference(base, &unescape(token.value)) {
                Resolution::Rewrite(url) => {
                    let link = self.links.build(RewriteTarget::StylesheetResource, &url);
                    out.push_str("url(\"");
                    out.push_str(&link);
                    out.push_str("\")");
                    report.record(RewriteTarget::StylesheetResource);
                }
                Resolution::Failed(reason) => {
                    warn!("Leaving unresolvable CSS url() in place: {}", reason);
                    report.skip();
                    out.push_str(original);
                }
                Resolution::Untouched | Resolution::Executable => {
                    debug!("CSS url() passed through: {}", token.value);
                    out.push_str(original);
                }
            }

            cursor = token.end;
        }

        out.push_str(&css[cursor..]);
        out
    }
}
