//! Response formatting: assistant prose → typed content blocks
//!
//! Replies arrive as loosely-formatted prose sprinkled with markdown-ish
//! noise (emphasis fences, heading markers, decorative rules, ragged
//! whitespace). Formatting is a pure projection: normalize the text, split
//! into paragraphs, classify each line into a typed block. It is recomputed
//! on every render, including once per delta on a still-growing buffer, so
//! the whole pipeline is deterministic, stateless, and single-pass.
//!
//! Blocks carry structured data only. Inline emphasis becomes
//! [`InlineSpan`]s, never markup strings; the widget layer decides how
//! emphasis looks.

use regex::Regex;
use std::sync::LazyLock;

/// Inline emphasis applied to a span of plain text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emphasis {
    None,
    Strong,
    Emph,
}

/// A run of text with a single emphasis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineSpan {
    pub text: String,
    pub emphasis: Emphasis,
}

impl InlineSpan {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emphasis: Emphasis::None,
        }
    }

    fn strong(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emphasis: Emphasis::Strong,
        }
    }

    fn emph(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emphasis: Emphasis::Emph,
        }
    }
}

/// A typed, renderable unit of a formatted reply.
///
/// Never persisted: a projection of message text, recomputed per render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    /// Section heading lifted from an emphasis-wrapped paragraph lead
    Header { text: String },
    /// Ordered group of line blocks from one paragraph
    Paragraph { blocks: Vec<ContentBlock> },
    /// Bulleted item
    Bullet { text: String },
    /// Numbered item; the index is kept as given, not reparsed
    Numbered { index: String, text: String },
    /// One row of a pipe-separated comparison
    ComparisonRow { cells: Vec<String> },
    /// Plain line as inline emphasis spans
    Plain { spans: Vec<InlineSpan> },
}

static STAR_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*{3,}").unwrap());
static HEADING_MARKS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#+\s*").unwrap());
static DASH_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-{3,}").unwrap());
static UNDERSCORE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_{3,}").unwrap());
static SPACE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{3,}").unwrap());
static NEWLINE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());
static NUMBERED_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)\.\s*(.+)").unwrap());
static HEADER_LEAD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\*\*(.*?)\*\*").unwrap());
static EMPHASIS_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*|\*([^*]+)\*").unwrap());

/// Strip decorative markup noise and collapse whitespace.
///
/// Global replaces, in order: runs of 3+ `*` removed (single/double `*` are
/// left for emphasis handling), heading markers removed, runs of 3+ `-`/`_`
/// removed, runs of 3+ whitespace collapsed to one space, runs of 3+
/// newlines collapsed to the paragraph separator, then trimmed. Stray pipes
/// are handled at line level, after comparison-row detection has had its
/// chance. Total function; idempotent.
pub fn normalize(raw: &str) -> String {
    let text = STAR_RUNS.replace_all(raw, "");
    let text = HEADING_MARKS.replace_all(&text, "");
    let text = DASH_RUNS.replace_all(&text, "");
    let text = UNDERSCORE_RUNS.replace_all(&text, "");
    let text = SPACE_RUNS.replace_all(&text, " ");
    let text = NEWLINE_RUNS.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Classify one cleaned line; `None` means the line renders as nothing.
///
/// First match wins: bullet, numbered, comparison row, plain. (Headers are
/// detected at paragraph scope by [`format_response`].)
pub fn classify_line(line: &str) -> Option<ContentBlock> {
    let trimmed = line.trim().trim_matches('|').trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(rest) = trimmed
        .strip_prefix('•')
        .or_else(|| trimmed.strip_prefix('-'))
    {
        let text = rest.trim();
        if text.is_empty() {
            return None;
        }
        return Some(ContentBlock::Bullet {
            text: text.to_string(),
        });
    }

    if let Some(caps) = NUMBERED_LINE.captures(trimmed) {
        return Some(ContentBlock::Numbered {
            index: caps[1].to_string(),
            text: caps[2].trim().to_string(),
        });
    }

    if trimmed.contains('|') {
        let cells: Vec<String> = trimmed
            .split('|')
            .map(str::trim)
            .filter(|cell| !cell.is_empty())
            .map(str::to_string)
            .collect();
        if cells.len() > 2 {
            return Some(ContentBlock::ComparisonRow { cells });
        }
    }

    // Not a comparison row, so any remaining pipe is pure decoration.
    let cleaned: String = trimmed.chars().filter(|&c| c != '|').collect();
    Some(ContentBlock::Plain {
        spans: parse_inline(&cleaned),
    })
}

/// Split a line into emphasis spans: `**x**` strong, `*x*` emph
fn parse_inline(text: &str) -> Vec<InlineSpan> {
    let mut spans = Vec::new();
    let mut last = 0;
    for caps in EMPHASIS_SPAN.captures_iter(text) {
        let whole = caps.get(0).expect("match has a whole group");
        if whole.start() > last {
            spans.push(InlineSpan::plain(&text[last..whole.start()]));
        }
        if let Some(strong) = caps.get(1) {
            spans.push(InlineSpan::strong(strong.as_str()));
        } else if let Some(emph) = caps.get(2) {
            spans.push(InlineSpan::emph(emph.as_str()));
        }
        last = whole.end();
    }
    if last < text.len() {
        spans.push(InlineSpan::plain(&text[last..]));
    }
    spans
}

/// Format a full reply (or a still-growing buffer) into content blocks.
///
/// Normalizes, splits on the paragraph separator, and classifies each
/// paragraph: an emphasis-wrapped lead becomes a `Header` followed by the
/// remainder as a nested `Paragraph`; anything else becomes a `Paragraph`
/// of classified lines. Empty input yields an empty sequence.
pub fn format_response(raw: &str) -> Vec<ContentBlock> {
    let normalized = normalize(raw);
    if normalized.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();
    for paragraph in normalized.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }

        if let Some(caps) = HEADER_LEAD.captures(paragraph) {
            let title = caps[1].trim().to_string();
            if !title.is_empty() {
                out.push(ContentBlock::Header { text: title });
                let rest = paragraph[caps.get(0).expect("match has a whole group").end()..].trim();
                if !rest.is_empty() {
                    let blocks = classify_lines(rest);
                    if !blocks.is_empty() {
                        out.push(ContentBlock::Paragraph { blocks });
                    }
                }
                continue;
            }
        }

        let blocks = classify_lines(paragraph);
        if !blocks.is_empty() {
            out.push(ContentBlock::Paragraph { blocks });
        }
    }
    out
}

fn classify_lines(text: &str) -> Vec<ContentBlock> {
    text.lines().filter_map(classify_line).collect()
}
