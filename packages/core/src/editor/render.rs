//! Block views
//!
//! `BlockView` is the render-ready form of a block: one variant per block
//! type, built by an exhaustive match so a new type cannot be forgotten.
//! Views drive the host's renderer and the static HTML used for previews.

use crate::models::{Block, BlockType, TableData, TextAlign};
use crate::utils::html;

/// Presentation attributes shared by text blocks
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextStyle<'a> {
    pub align: Option<TextAlign>,
    pub color: Option<&'a str>,
}

impl TextStyle<'_> {
    fn attr(&self) -> String {
        let mut rules = Vec::new();
        match self.align {
            Some(TextAlign::Center) => rules.push("text-align:center".to_string()),
            Some(TextAlign::Right) => rules.push("text-align:right".to_string()),
            Some(TextAlign::Left) | None => {}
        }
        if let Some(color) = self.color {
            rules.push(format!("color:{}", html::escape(color)));
        }
        if rules.is_empty() {
            String::new()
        } else {
            format!(" style=\"{}\"", rules.join(";"))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockView<'a> {
    Paragraph {
        html: &'a str,
        style: TextStyle<'a>,
    },
    Heading {
        level: u8,
        html: &'a str,
        style: TextStyle<'a>,
    },
    BulletItem {
        html: &'a str,
        indent: u32,
    },
    NumberedItem {
        html: &'a str,
        indent: u32,
        number: usize,
    },
    Todo {
        html: &'a str,
        checked: bool,
        indent: u32,
    },
    Code {
        text: &'a str,
        language: Option<&'a str>,
    },
    Quote {
        html: &'a str,
        style: TextStyle<'a>,
    },
    Divider,
    Table(TableData),
    AgentEmbed {
        agent_id: Option<&'a str>,
    },
}

impl<'a> BlockView<'a> {
    /// Build the view for one block; `number` is its position in a numbered run
    pub fn from_block(block: &'a Block, number: usize) -> Self {
        let style = TextStyle {
            align: block.meta.align,
            color: block.meta.color.as_deref(),
        };
        let html = block.content.as_str();

        match block.block_type {
            BlockType::Paragraph => BlockView::Paragraph { html, style },
            BlockType::Heading1 | BlockType::Heading2 | BlockType::Heading3 => {
                BlockView::Heading {
                    level: block.block_type.heading_level().unwrap_or(1),
                    html,
                    style,
                }
            }
            BlockType::BulletList => BlockView::BulletItem {
                html,
                indent: block.indent_level,
            },
            BlockType::NumberedList => BlockView::NumberedItem {
                html,
                indent: block.indent_level,
                number,
            },
            BlockType::Todo => BlockView::Todo {
                html,
                checked: block.meta.is_checked(),
                indent: block.indent_level,
            },
            BlockType::Code => BlockView::Code {
                text: html,
                language: block.meta.language.as_deref(),
            },
            BlockType::Quote => BlockView::Quote { html, style },
            BlockType::Divider => BlockView::Divider,
            BlockType::Table => BlockView::Table(
                block
                    .meta
                    .rows
                    .clone()
                    .map(TableData::from_rows)
                    .unwrap_or_default(),
            ),
            BlockType::AgentEmbed => BlockView::AgentEmbed {
                agent_id: block.meta.agent_id.as_deref(),
            },
        }
    }

    /// Whether the view has a caret-bearing text surface
    pub fn is_editable(&self) -> bool {
        !matches!(
            self,
            BlockView::Divider | BlockView::Table(_) | BlockView::AgentEmbed { .. }
        )
    }

    pub fn to_html(&self) -> String {
        match self {
            BlockView::Paragraph { html, style } => format!("<p{}>{}</p>", style.attr(), html),
            BlockView::Heading { level, html, style } => {
                format!("<h{level}{}>{}</h{level}>", style.attr(), html)
            }
            BlockView::BulletItem { html, indent } => {
                format!("<ul data-indent=\"{}\"><li>{}</li></ul>", indent, html)
            }
            BlockView::NumberedItem {
                html,
                indent,
                number,
            } => format!(
                "<ol start=\"{}\" data-indent=\"{}\"><li>{}</li></ol>",
                number, indent, html
            ),
            BlockView::Todo {
                html,
                checked,
                indent,
            } => format!(
                "<div class=\"todo\" data-indent=\"{}\"><input type=\"checkbox\" disabled{}> {}</div>",
                indent,
                if *checked { " checked" } else { "" },
                html
            ),
            BlockView::Code { text, language } => match language {
                Some(language) => format!(
                    "<pre><code class=\"language-{}\">{}</code></pre>",
                    html::escape(language),
                    html::escape(text)
                ),
                None => format!("<pre><code>{}</code></pre>", html::escape(text)),
            },
            BlockView::Quote { html, style } => {
                format!("<blockquote{}>{}</blockquote>", style.attr(), html)
            }
            BlockView::Divider => "<hr>".to_string(),
            BlockView::Table(table) => {
                let mut out = String::from("<table><tbody>");
                for row in table.rows() {
                    out.push_str("<tr>");
                    for cell in row {
                        out.push_str("<td>");
                        out.push_str(&html::escape(cell));
                        out.push_str("</td>");
                    }
                    out.push_str("</tr>");
                }
                out.push_str("</tbody></table>");
                out
            }
            BlockView::AgentEmbed { agent_id } => format!(
                "<div class=\"agent-embed\" data-agent-id=\"{}\"></div>",
                html::escape(agent_id.unwrap_or_default())
            ),
        }
    }
}

/// Views for a whole document, numbering each run of numbered items per indent
pub fn render_blocks(blocks: &[Block]) -> Vec<BlockView<'_>> {
    let mut counters: Vec<usize> = Vec::new();
    blocks
        .iter()
        .map(|block| {
            let level = block.indent_level as usize;
            let number = if block.block_type == BlockType::NumberedList {
                counters.truncate(level + 1);
                counters.resize(level + 1, 0);
                counters[level] += 1;
                counters[level]
            } else {
                counters.truncate(level);
                0
            };
            BlockView::from_block(block, number)
        })
        .collect()
}

/// Static HTML for a whole document body
pub fn render_html(blocks: &[Block]) -> String {
    render_blocks(blocks)
        .iter()
        .map(BlockView::to_html)
        .collect::<Vec<_>>()
        .join("\n")
}
