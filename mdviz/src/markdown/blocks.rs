//! Block-level markdown elements
//!
//! This module defines the structured representation of markdown content
//! at the block level (paragraphs, headings, lists, code blocks, etc.)

use super::text_run::TextRun;
use super::types::Alignment;

/// Block-level markdown element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkdownBlock {
    /// A heading with level and formatted text
    Heading {
        /// Heading level (1 = h1, 2 = h2, etc.)
        level: usize,
        /// Formatted text runs comprising the heading content
        runs: Vec<TextRun>,
    },

    /// A paragraph of formatted text
    Paragraph(Vec<TextRun>),

    /// A code block
    CodeBlock {
        /// Language tag of a fenced block (e.g., "rust", "python")
        language: Option<String>,
        /// Raw code content
        code: String,
    },

    /// A block quote containing other blocks
    BlockQuote(Vec<MarkdownBlock>),

    /// An ordered or unordered list
    List {
        /// Starting number for ordered lists (e.g., Some(1)), None for unordered lists
        start: Option<u64>,
        /// List items, each containing nested blocks
        items: Vec<ListItem>,
    },

    /// A pipe table
    Table {
        /// Column alignment specifications
        alignments: Vec<Alignment>,
        /// Header row cells, each cell containing formatted text runs
        headers: Vec<Vec<TextRun>>,
        /// Data rows, where each row contains cells, and each cell contains text runs
        rows: Vec<Vec<Vec<TextRun>>>,
    },

    /// A horizontal rule (thematic break)
    Rule,
}

/// A list item, which may contain multiple blocks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListItem {
    /// Task list state: `Some(checked)` for `- [ ]` / `- [x]` items
    pub task_list: Option<bool>,

    /// The content of the list item (can be multiple blocks)
    pub content: Vec<MarkdownBlock>,
}

impl ListItem {
    /// Create a new list item with a single paragraph
    pub fn with_paragraph(runs: Vec<TextRun>) -> Self {
        Self {
            task_list: None,
            content: vec![MarkdownBlock::Paragraph(runs)],
        }
    }
}
