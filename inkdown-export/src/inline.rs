//! Line classification and inline formatting (Markdown → plain text + style spans)
//!
//! Prose is handled one line at a time. [`classify`] decides what a line is
//! (heading, list item, blank, plain paragraph) and [`format_inline`] turns the
//! line's content into plain text plus a list of [`StyleSpan`]s.
//!
//! The inline pass is a precedence-ordered sequential matcher: it walks the
//! line left to right and, at each position, tries the longest construct
//! first (bold before italic, then links). Matches never overlap and inner
//! text is not re-scanned, so `**a *b* c**` yields one bold span over the
//! literal `a *b* c`. Offsets are counted in characters, the unit the
//! document cursor advances in.

/// A style attribute applied to a range of inserted text.
#[derive(Debug, Clone, PartialEq)]
pub enum Style {
    Bold,
    Italic,
    /// Link target; the span covers the visible label text.
    Link(String),
    /// Heading level (1-6); the span covers the heading text.
    Heading(usize),
    /// Monospace/code chrome; the span covers a whole fenced block.
    CodeBlock,
}

/// A half-open character range `[start, end)` plus the style to apply to it.
///
/// Offsets are relative to the plain text returned alongside the spans.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleSpan {
    pub start: usize,
    pub end: usize,
    pub style: Style,
}

/// Structural classification of a single prose line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineKind<'a> {
    /// Whitespace-only line.
    Blank,
    /// `#`-prefixed heading; 1 to 6 hashes followed by whitespace.
    Heading { level: usize, text: &'a str },
    /// `*` or `-` list item. `indent` counts the leading whitespace characters.
    Bullet { indent: usize, text: &'a str },
    /// `1.`-style list item. The literal numeral is preserved.
    Numbered {
        indent: usize,
        number: &'a str,
        text: &'a str,
    },
    /// Anything else.
    Paragraph { text: &'a str },
}

/// Classify one line of prose.
///
/// Heading markers must start at column zero; list markers may be indented.
/// Seven or more hashes, or hashes without trailing whitespace, are not a
/// heading and fall through to [`LineKind::Paragraph`].
pub fn classify(line: &str) -> LineKind<'_> {
    if line.trim().is_empty() {
        return LineKind::Blank;
    }

    let hashes = line.chars().take_while(|&c| c == '#').count();
    if (1..=6).contains(&hashes) {
        let rest = &line[hashes..];
        if rest.starts_with(|c: char| c.is_whitespace()) {
            return LineKind::Heading {
                level: hashes,
                text: rest.trim_start(),
            };
        }
    }

    let indent_end = line
        .char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .map(|(i, _)| i)
        .unwrap_or(line.len());
    let indent = line[..indent_end].chars().count();
    let rest = &line[indent_end..];

    if let Some(after_marker) = rest.strip_prefix('*').or_else(|| rest.strip_prefix('-')) {
        if after_marker.starts_with(|c: char| c.is_whitespace()) {
            return LineKind::Bullet {
                indent,
                text: after_marker.trim_start(),
            };
        }
    }

    let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let after_digits = &rest[digits..];
        if let Some(after_dot) = after_digits.strip_prefix('.') {
            if after_dot.starts_with(|c: char| c.is_whitespace()) {
                return LineKind::Numbered {
                    indent,
                    number: &rest[..digits],
                    text: after_dot.trim_start(),
                };
            }
        }
    }

    LineKind::Paragraph { text: line }
}

/// Strip inline markers from `text` and report what was styled where.
///
/// Returns the plain text with all recognized markers removed and one span
/// per recognized construct. Unmatched markers stay literal.
pub fn format_inline(text: &str) -> (String, Vec<StyleSpan>) {
    let chars: Vec<char> = text.chars().collect();
    let mut plain = String::with_capacity(text.len());
    let mut plain_len = 0usize;
    let mut spans = Vec::new();
    let mut i = 0usize;

    while i < chars.len() {
        if let Some(m) = match_construct(&chars[i..]) {
            let start = plain_len;
            for &c in m.inner {
                plain.push(c);
            }
            plain_len += m.inner.len();
            spans.push(StyleSpan {
                start,
                end: plain_len,
                style: m.style,
            });
            i += m.consumed;
        } else {
            plain.push(chars[i]);
            plain_len += 1;
            i += 1;
        }
    }

    (plain, spans)
}

/// One recognized inline construct at the head of a character slice.
struct InlineMatch<'a> {
    /// Characters consumed from the input, markers included.
    consumed: usize,
    /// The visible text between the markers.
    inner: &'a [char],
    style: Style,
}

fn match_construct(rest: &[char]) -> Option<InlineMatch<'_>> {
    match_delimited(rest, &['*', '*'])
        .or_else(|| match_delimited(rest, &['_', '_']))
        .map(|(consumed, inner)| InlineMatch {
            consumed,
            inner,
            style: Style::Bold,
        })
        .or_else(|| {
            match_single(rest, '*')
                .or_else(|| match_single(rest, '_'))
                .map(|(consumed, inner)| InlineMatch {
                    consumed,
                    inner,
                    style: Style::Italic,
                })
        })
        .or_else(|| match_link(rest))
}

/// Match a two-character delimiter pair (`**bold**`, `__bold__`).
///
/// The closing delimiter is the first occurrence after at least one inner
/// character; nothing inside is re-scanned.
fn match_delimited<'a>(rest: &'a [char], delim: &[char; 2]) -> Option<(usize, &'a [char])> {
    if rest.len() < 5 || rest[0] != delim[0] || rest[1] != delim[1] {
        return None;
    }
    let close = (3..rest.len() - 1)
        .find(|&j| rest[j] == delim[0] && rest[j + 1] == delim[1])?;
    Some((close + 2, &rest[2..close]))
}

/// Match a single-character delimiter pair (`*italic*`, `_italic_`).
///
/// A doubled delimiter is never an opener here; that case belongs to the
/// bold matcher, which runs first.
fn match_single(rest: &[char], delim: char) -> Option<(usize, &[char])> {
    if rest.len() < 3 || rest[0] != delim || rest[1] == delim {
        return None;
    }
    let close = (2..rest.len()).find(|&j| rest[j] == delim)?;
    Some((close + 1, &rest[1..close]))
}

/// Match `[label](url)`. The label becomes visible text and is not scanned
/// for further formatting; the span carries the url.
fn match_link(rest: &[char]) -> Option<InlineMatch<'_>> {
    if rest.first() != Some(&'[') {
        return None;
    }
    let label_end = (2..rest.len()).find(|&j| rest[j] == ']')?;
    if rest.get(label_end + 1) != Some(&'(') {
        return None;
    }
    let url_start = label_end + 2;
    let url_end = (url_start + 1..rest.len()).find(|&j| rest[j] == ')')?;
    let url: String = rest[url_start..url_end].iter().collect();
    Some(InlineMatch {
        consumed: url_end + 1,
        inner: &rest[1..label_end],
        style: Style::Link(url),
    })
}
