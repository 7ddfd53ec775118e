//! Markdown import and export
//!
//! Export walks the rendered block views, so list numbering and per-type
//! metadata match what the editor shows. Inline HTML produced by the toolbar
//! maps back to markdown emphasis. Markdown has no underline, so `<u>` stays
//! inline HTML and is read back on import; any other markup is stripped.
//!
//! Import is line based and meant for paste: every non-blank line becomes one
//! block, except fenced code and pipe tables which span several lines.

use regex::Regex;
use std::sync::LazyLock;

use crate::editor::render::{render_blocks, BlockView};
use crate::models::{BlockDraft, BlockMeta, BlockType, Document, TableData};
use crate::utils::html;

/// Toolbar markup and its markdown spelling, applied before stripping tags
static INLINE_TO_MARKDOWN: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r#"(?is)<a\s[^>]*href="([^"]*)"[^>]*>(.*?)</a>"#).unwrap(),
            "[$2]($1)",
        ),
        (Regex::new(r"(?is)<(?:b|strong)>(.*?)</(?:b|strong)>").unwrap(), "**$1**"),
        (Regex::new(r"(?is)<(?:i|em)>(.*?)</(?:i|em)>").unwrap(), "_${1}_"),
        (Regex::new(r"(?is)<(?:s|del|strike)>(.*?)</(?:s|del|strike)>").unwrap(), "~~$1~~"),
        (Regex::new(r"(?is)<code>(.*?)</code>").unwrap(), "`$1`"),
        (
            Regex::new(r"(?is)<u>(.*?)</u>").unwrap(),
            "\u{e000}${1}\u{e001}",
        ),
    ]
});

/// Stand-ins that carry `<u>` through tag stripping
const UNDERLINE_OPEN: char = '\u{e000}';
const UNDERLINE_CLOSE: char = '\u{e001}';

/// Markdown emphasis and the markup the editor stores, applied to escaped text
static MARKDOWN_TO_INLINE: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"`([^`]+)`").unwrap(), "<code>$1</code>"),
        (Regex::new(r"\[([^\]]+)\]\(([^)\s]+)\)").unwrap(), r#"<a href="$2">$1</a>"#),
        (Regex::new(r"\*\*([^*]+)\*\*").unwrap(), "<b>$1</b>"),
        (Regex::new(r"__([^_]+)__").unwrap(), "<b>$1</b>"),
        (Regex::new(r"~~([^~]+)~~").unwrap(), "<s>$1</s>"),
        (Regex::new(r"\*([^*]+)\*").unwrap(), "<i>$1</i>"),
        (Regex::new(r"\b_([^_]+)_\b").unwrap(), "<i>$1</i>"),
        (Regex::new(r"&lt;u&gt;(.*?)&lt;/u&gt;").unwrap(), "<u>$1</u>"),
    ]
});

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.*)$").unwrap());

static TODO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-*+]\s+\[([ xX])\]\s?(.*)$").unwrap());

static BULLET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-*+]\s+(.*)$").unwrap());

static NUMBERED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+[.)]\s+(.*)$").unwrap());

static DIVIDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:-{3,}|\*{3,}|_{3,})$").unwrap());

static AGENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<!--\s*agent(?::\s*([^\s]+))?\s*-->$").unwrap());

static TABLE_SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\|?\s*:?-{3,}:?\s*(\|\s*:?-{3,}:?\s*)*\|?$").unwrap());

/// Indentation unit for nested list items
const INDENT: &str = "  ";

/// Convert stored inline HTML to markdown text
pub fn inline_to_markdown(fragment: &str) -> String {
    let mut text = fragment.to_string();
    for (pattern, replacement) in INLINE_TO_MARKDOWN.iter() {
        text = pattern.replace_all(&text, *replacement).into_owned();
    }
    html::to_plain_text(&text)
        .replace(UNDERLINE_OPEN, "<u>")
        .replace(UNDERLINE_CLOSE, "</u>")
}

/// Convert markdown inline emphasis to the HTML the editor stores
pub fn markdown_to_inline(text: &str) -> String {
    let mut fragment = html::escape(text);
    for (pattern, replacement) in MARKDOWN_TO_INLINE.iter() {
        fragment = pattern.replace_all(&fragment, *replacement).into_owned();
    }
    fragment
}

/// Render a whole document as markdown
///
/// # Examples
///
/// ```
/// use agentboard_core::markdown::document_to_markdown;
/// use agentboard_core::models::{Block, BlockType, Document};
///
/// let mut doc = Document::new("doc-1", "Plan");
/// doc.blocks.push(Block::transient("doc-1", BlockType::BulletList, "<b>Ship</b> it", 1.0));
///
/// assert_eq!(document_to_markdown(&doc), "# Plan\n\n- **Ship** it\n");
/// ```
pub fn document_to_markdown(document: &Document) -> String {
    let mut out = String::new();
    if !document.title.trim().is_empty() {
        out.push_str("# ");
        out.push_str(document.title.trim());
        out.push('\n');
    }

    let views = render_blocks(&document.blocks);
    let mut previous_was_list = false;
    for view in &views {
        let is_list = matches!(
            view,
            BlockView::BulletItem { .. } | BlockView::NumberedItem { .. } | BlockView::Todo { .. }
        );
        if !out.is_empty() {
            out.push_str(if is_list && previous_was_list { "" } else { "\n" });
        }
        out.push_str(&view_to_markdown(view));
        out.push('\n');
        previous_was_list = is_list;
    }
    out
}

fn view_to_markdown(view: &BlockView<'_>) -> String {
    match view {
        BlockView::Paragraph { html, .. } => inline_to_markdown(html),
        BlockView::Heading { level, html, .. } => {
            format!("{} {}", "#".repeat(*level as usize), inline_to_markdown(html))
        }
        BlockView::BulletItem { html, indent } => {
            format!("{}- {}", INDENT.repeat(*indent as usize), inline_to_markdown(html))
        }
        BlockView::NumberedItem {
            html,
            indent,
            number,
        } => format!(
            "{}{}. {}",
            INDENT.repeat(*indent as usize),
            number,
            inline_to_markdown(html)
        ),
        BlockView::Todo {
            html,
            checked,
            indent,
        } => format!(
            "{}- [{}] {}",
            INDENT.repeat(*indent as usize),
            if *checked { "x" } else { " " },
            inline_to_markdown(html)
        ),
        BlockView::Code { text, language } => format!(
            "```{}\n{}\n```",
            language.unwrap_or_default(),
            html::to_plain_text(text)
        ),
        BlockView::Quote { html, .. } => inline_to_markdown(html)
            .lines()
            .map(|line| format!("> {}", line))
            .collect::<Vec<_>>()
            .join("\n"),
        BlockView::Divider => "---".to_string(),
        BlockView::Table(table) => table_to_markdown(table),
        BlockView::AgentEmbed { agent_id } => match agent_id {
            Some(id) => format!("<!-- agent: {} -->", id),
            None => "<!-- agent -->".to_string(),
        },
    }
}

fn table_to_markdown(table: &TableData) -> String {
    let row_line = |row: &[String]| {
        let cells: Vec<String> = row
            .iter()
            .map(|cell| inline_to_markdown(cell).replace('|', "\\|").replace('\n', " "))
            .collect();
        format!("| {} |", cells.join(" | "))
    };

    let mut lines = Vec::with_capacity(table.row_count() + 1);
    for (index, row) in table.rows().iter().enumerate() {
        lines.push(row_line(row));
        if index == 0 {
            lines.push(format!("|{}", " --- |".repeat(table.column_count())));
        }
    }
    lines.join("\n")
}

/// Parse pasted markdown into block drafts
///
/// Drafts carry sort orders `1.0, 2.0, ...`; the editor re-places them when
/// they are inserted.
pub fn blocks_from_markdown(markdown: &str) -> Vec<BlockDraft> {
    let mut drafts = Vec::new();
    let mut lines = markdown.lines().peekable();

    while let Some(raw) = lines.next() {
        let (indent, line) = split_indent(raw);
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        let draft = if let Some(fence) = line.strip_prefix("```") {
            let mut body = Vec::new();
            for code_line in lines.by_ref() {
                if code_line.trim_start().starts_with("```") {
                    break;
                }
                body.push(code_line);
            }
            let mut draft = draft(BlockType::Code, body.join("\n"));
            let language = fence.trim();
            if !language.is_empty() {
                draft.meta.language = Some(language.to_string());
            }
            draft
        } else if line.starts_with('|') {
            let mut rows = vec![parse_table_row(line)];
            while let Some(next) = lines.peek() {
                let next = next.trim();
                if !next.starts_with('|') {
                    break;
                }
                if !TABLE_SEPARATOR_RE.is_match(next) {
                    rows.push(parse_table_row(next));
                }
                lines.next();
            }
            let mut draft = draft(BlockType::Table, String::new());
            draft.meta.rows = Some(TableData::from_rows(rows).into_rows());
            draft
        } else {
            parse_line(line, indent)
        };
        drafts.push(draft);
    }

    for (index, draft) in drafts.iter_mut().enumerate() {
        draft.sort_order = (index + 1) as f64;
    }
    drafts
}

fn parse_line(line: &str, indent: u32) -> BlockDraft {
    if let Some(caps) = HEADING_RE.captures(line) {
        let block_type = match caps[1].len() {
            1 => BlockType::Heading1,
            2 => BlockType::Heading2,
            _ => BlockType::Heading3,
        };
        return draft(block_type, markdown_to_inline(&caps[2]));
    }
    if DIVIDER_RE.is_match(line) {
        return draft(BlockType::Divider, String::new());
    }
    if let Some(caps) = TODO_RE.captures(line) {
        let mut todo = draft(BlockType::Todo, markdown_to_inline(&caps[2]));
        todo.meta.checked = Some(!caps[1].trim().is_empty());
        todo.indent_level = indent;
        return todo;
    }
    if let Some(caps) = BULLET_RE.captures(line) {
        let mut item = draft(BlockType::BulletList, markdown_to_inline(&caps[1]));
        item.indent_level = indent;
        return item;
    }
    if let Some(caps) = NUMBERED_RE.captures(line) {
        let mut item = draft(BlockType::NumberedList, markdown_to_inline(&caps[1]));
        item.indent_level = indent;
        return item;
    }
    if let Some(quote) = line.strip_prefix('>') {
        return draft(BlockType::Quote, markdown_to_inline(quote.trim_start()));
    }
    if let Some(caps) = AGENT_RE.captures(line) {
        let mut embed = draft(BlockType::AgentEmbed, String::new());
        embed.meta.agent_id = caps.get(1).map(|m| m.as_str().to_string());
        return embed;
    }
    draft(BlockType::Paragraph, markdown_to_inline(line))
}

fn draft(block_type: BlockType, content: String) -> BlockDraft {
    BlockDraft {
        block_type,
        content,
        sort_order: 0.0,
        indent_level: 0,
        meta: BlockMeta::default(),
    }
}

/// Leading indentation as a nesting level: two spaces or one tab per level
fn split_indent(line: &str) -> (u32, &str) {
    let trimmed = line.trim_start_matches([' ', '\t']);
    let width: usize = line[..line.len() - trimmed.len()]
        .chars()
        .map(|c| if c == '\t' { 2 } else { 1 })
        .sum();
    ((width / INDENT.len()) as u32, trimmed)
}

fn parse_table_row(line: &str) -> Vec<String> {
    let inner = line.trim().trim_start_matches('|');
    let inner = inner.strip_suffix('|').unwrap_or(inner);

    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                cell.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut cell)),
            other => cell.push(other),
        }
    }
    cells.push(cell);
    cells
        .into_iter()
        .map(|cell| markdown_to_inline(cell.trim()))
        .collect()
}
