//! Text run representation with formatting
//!
//! A text run is a span of text with consistent formatting applied.
//! This is the unit the markup emitter works with inside paragraphs,
//! headings and table cells.

/// A span of text with consistent formatting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    /// The text content
    pub text: String,

    /// Bold formatting
    pub bold: bool,

    /// Italic formatting
    pub italic: bool,

    /// Inline code formatting
    pub code: bool,

    /// Strikethrough formatting
    pub strikethrough: bool,

    /// Superscript formatting
    pub superscript: bool,

    /// Subscript formatting
    pub subscript: bool,

    /// Hard line break (the text is ignored)
    pub line_break: bool,

    /// Link URL (if this text is part of a hyperlink)
    pub link_url: Option<String>,
}

impl TextRun {
    /// Create a new plain text run
    pub fn new(text: String) -> Self {
        Self {
            text,
            bold: false,
            italic: false,
            code: false,
            strikethrough: false,
            superscript: false,
            subscript: false,
            line_break: false,
            link_url: None,
        }
    }

    /// Create a hard line break
    pub fn line_break() -> Self {
        Self {
            line_break: true,
            ..Self::new(String::new())
        }
    }

    /// Create a new text run with the specified formatting
    pub fn with_formatting(text: String, formatting: &TextFormatting) -> Self {
        Self {
            text,
            bold: formatting.bold,
            italic: formatting.italic,
            code: formatting.code,
            strikethrough: formatting.strikethrough,
            superscript: formatting.superscript,
            subscript: formatting.subscript,
            line_break: false,
            link_url: formatting.link_url.clone(),
        }
    }

    /// Check if this text run has any formatting applied
    pub fn has_formatting(&self) -> bool {
        self.bold
            || self.italic
            || self.code
            || self.strikethrough
            || self.superscript
            || self.subscript
            || self.link_url.is_some()
    }
}

/// Concatenate the plain text of a sequence of runs
pub fn plain_text(runs: &[TextRun]) -> String {
    runs.iter()
        .map(|run| if run.line_break { "\n" } else { run.text.as_str() })
        .collect()
}

/// Active formatting state during parsing
///
/// Toggled on and off as the markdown event stream opens and closes
/// inline tags.
#[derive(Debug, Clone, Default)]
pub struct TextFormatting {
    /// Bold formatting active
    pub bold: bool,

    /// Italic formatting active
    pub italic: bool,

    /// Inline code formatting active
    pub code: bool,

    /// Strikethrough formatting active
    pub strikethrough: bool,

    /// Superscript formatting active
    pub superscript: bool,

    /// Subscript formatting active
    pub subscript: bool,

    /// Link URL (if inside a link)
    pub link_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_formatting_copies_state() {
        let formatting = TextFormatting {
            bold: true,
            link_url: Some("https://example.com".to_string()),
            ..TextFormatting::default()
        };

        let run = TextRun::with_formatting("hello".to_string(), &formatting);

        assert!(run.bold);
        assert!(!run.italic);
        assert!(run.has_formatting());
        assert_eq!(run.link_url.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_plain_text_keeps_line_breaks() {
        let runs = vec![
            TextRun::new("one".to_string()),
            TextRun::line_break(),
            TextRun::new("two".to_string()),
        ];

        assert_eq!(plain_text(&runs), "one\ntwo");
        assert!(!runs[0].has_formatting());
    }
}
