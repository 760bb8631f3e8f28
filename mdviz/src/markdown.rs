//! Markdown parsing
//!
//! Markdown is a delegated capability: the renderer only depends on the
//! [`MarkdownParser`] contract (text in, layout markup out). The default
//! implementation, [`PulldownParser`], parses with pulldown-cmark into a
//! typed block model and emits Typst markup from it.

use pulldown_cmark::Options;
use thiserror::Error;

// Submodules
mod blocks;
mod markup;
mod parser;
mod text_run;
mod types;

// Re-export public types
pub use blocks::{ListItem, MarkdownBlock};
pub use markup::{blocks_to_markup, runs_to_markup, typst_string};
pub use parser::BlockParser;
pub use text_run::{TextFormatting, TextRun};
pub use types::Alignment;

/// Error raised by a markdown parser implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("markdown parsing failed: {message}")]
pub struct ParseError {
    /// Description of the failure
    pub message: String,
}

impl ParseError {
    /// Create a parse error with the given message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Converts raw markdown text into the markup the renderer lays out
///
/// Implementations must be pure: the same text always yields the same
/// markup, and no state is shared between calls.
pub trait MarkdownParser: Send + Sync {
    /// Convert markdown text into Typst markup
    fn to_markup(&self, text: &str) -> Result<String, ParseError>;
}

/// Default parser backed by pulldown-cmark
#[derive(Debug, Clone, Copy, Default)]
pub struct PulldownParser;

impl MarkdownParser for PulldownParser {
    fn to_markup(&self, text: &str) -> Result<String, ParseError> {
        let blocks = BlockParser::parse(text);
        log::debug!("Parsed {} top-level markdown blocks", blocks.len());
        Ok(blocks_to_markup(&blocks))
    }
}

/// Markdown extensions enabled for both export and preview
pub fn parser_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}
