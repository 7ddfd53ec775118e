//! HTML fragment helpers
//!
//! Text blocks store an HTML fragment produced by inline formatting. These
//! helpers reduce a fragment to the plain text a caret moves through, and
//! translate caret offsets (counted in visible characters) back into the
//! fragment so splits and inline wraps never cut through a tag.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

static BREAK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Named and numeric entities the editor surface emits
const ENTITIES: [(&str, &str); 6] = [
    ("&nbsp;", "\u{a0}"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    // Must stay last so "&amp;lt;" decodes to "&lt;" and not "<"
    ("&amp;", "&"),
];

/// Reduce an HTML fragment to plain text
///
/// `<br>` becomes a newline, every other tag is dropped and common entities
/// are decoded.
///
/// # Examples
///
/// ```
/// use agentboard_core::utils::html::to_plain_text;
///
/// assert_eq!(to_plain_text("<b>bold</b> &amp; plain"), "bold & plain");
/// assert_eq!(to_plain_text("line<br>next"), "line\nnext");
/// ```
pub fn to_plain_text(fragment: &str) -> String {
    if !fragment.contains('<') && !fragment.contains('&') {
        return fragment.to_string();
    }

    let with_breaks = BREAK_RE.replace_all(fragment, "\n");
    let mut text = TAG_RE.replace_all(&with_breaks, "").to_string();
    for (entity, replacement) in ENTITIES {
        text = text.replace(entity, replacement);
    }
    text
}

/// Whether a fragment renders as nothing but whitespace
pub fn is_blank(fragment: &str) -> bool {
    to_plain_text(fragment).trim().is_empty()
}

/// Number of visible characters in a fragment
///
/// Agrees with `to_plain_text(fragment).chars().count()`.
pub fn plain_len(fragment: &str) -> usize {
    pieces(fragment)
        .iter()
        .filter(|(_, piece)| *piece == Piece::Char)
        .count()
}

/// Split a fragment before the visible character at `offset`
///
/// Both halves stay well formed: tags open at the split point are closed at
/// the end of the head and reopened at the start of the tail. Closing tags
/// that sit exactly on the boundary stay with the head.
///
/// # Examples
///
/// ```
/// use agentboard_core::utils::html::split_at_plain;
///
/// let (head, tail) = split_at_plain("<b>hello</b> world", 2);
/// assert_eq!(head, "<b>he</b>");
/// assert_eq!(tail, "<b>llo</b> world");
/// ```
pub fn split_at_plain(fragment: &str, offset: usize) -> (String, String) {
    let mut open: Vec<(&str, Range<usize>)> = Vec::new();
    let mut seen = 0;

    for (range, piece) in pieces(fragment) {
        match piece {
            Piece::Close(name) => {
                if let Some(index) = open
                    .iter()
                    .rposition(|(opened, _)| opened.eq_ignore_ascii_case(name))
                {
                    open.truncate(index);
                }
            }
            _ if seen == offset => {
                let mut head = fragment[..range.start].to_string();
                for (name, _) in open.iter().rev() {
                    head.push_str(&format!("</{}>", name));
                }
                let mut tail: String = open
                    .iter()
                    .map(|(_, opening)| &fragment[opening.clone()])
                    .collect();
                tail.push_str(&fragment[range.start..]);
                return (head, tail);
            }
            Piece::Open(name) => open.push((name, range)),
            Piece::Char => seen += 1,
            Piece::Void => {}
        }
    }
    (fragment.to_string(), String::new())
}

/// Wrap the visible characters `start..end` in `<tag>`
///
/// Each run of text between existing tags is wrapped on its own, so the
/// result nests correctly whatever markup the range crosses.
///
/// # Examples
///
/// ```
/// use agentboard_core::utils::html::wrap_plain_range;
///
/// assert_eq!(wrap_plain_range("a<i>bc</i>d", 0, 2, "b"), "<b>a</b><i><b>b</b>c</i>d");
/// ```
pub fn wrap_plain_range(fragment: &str, start: usize, end: usize, tag: &str) -> String {
    let (start, end) = if start <= end { (start, end) } else { (end, start) };
    if start == end {
        return fragment.to_string();
    }

    let mut wrapped = String::with_capacity(fragment.len() + 8 * tag.len());
    let mut seen = 0;
    let mut wrapping = false;
    for (range, piece) in pieces(fragment) {
        let inside = piece == Piece::Char && (start..end).contains(&seen);
        if inside && !wrapping {
            wrapped.push_str(&format!("<{}>", tag));
        } else if !inside && wrapping {
            wrapped.push_str(&format!("</{}>", tag));
        }
        wrapping = inside;
        wrapped.push_str(&fragment[range]);
        if piece == Piece::Char {
            seen += 1;
        }
    }
    if wrapping {
        wrapped.push_str(&format!("</{}>", tag));
    }
    wrapped
}

/// One lexical piece of a fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Piece<'a> {
    /// A visible character: a literal char, a known entity or `<br>`
    Char,
    Open(&'a str),
    Close(&'a str),
    /// A tag with no closing partner
    Void,
}

const VOID_TAGS: [&str; 4] = ["img", "hr", "wbr", "input"];

fn pieces(fragment: &str) -> Vec<(Range<usize>, Piece<'_>)> {
    let mut pieces = Vec::new();
    let mut index = 0;

    while let Some(c) = fragment[index..].chars().next() {
        let rest = &fragment[index..];
        let (len, piece) = match c {
            '<' => match rest.find('>') {
                Some(close) if close > 1 => (close + 1, classify_tag(&rest[1..close])),
                _ => (1, Piece::Char),
            },
            '&' => match ENTITIES.iter().find(|(entity, _)| rest.starts_with(entity)) {
                Some((entity, _)) => (entity.len(), Piece::Char),
                None => (1, Piece::Char),
            },
            other => (other.len_utf8(), Piece::Char),
        };
        pieces.push((index..index + len, piece));
        index += len;
    }
    pieces
}

fn classify_tag(inner: &str) -> Piece<'_> {
    let inner = inner.trim();
    if let Some(closing) = inner.strip_prefix('/') {
        return Piece::Close(tag_name(closing));
    }
    let name = tag_name(inner);
    if name.eq_ignore_ascii_case("br") {
        Piece::Char
    } else if inner.ends_with('/') || VOID_TAGS.iter().any(|v| name.eq_ignore_ascii_case(v)) {
        Piece::Void
    } else {
        Piece::Open(name)
    }
}

fn tag_name(inner: &str) -> &str {
    let inner = inner.trim_start();
    let end = inner
        .find(|c: char| c.is_whitespace() || c == '/')
        .unwrap_or(inner.len());
    &inner[..end]
}

/// Escape text for embedding inside HTML
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
