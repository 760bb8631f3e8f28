//! Markdown event stream parser
//!
//! Converts pulldown-cmark's event stream into structured blocks with formatted text runs.

use super::blocks::{ListItem, MarkdownBlock};
use super::text_run::{plain_text, TextFormatting, TextRun};
use super::types::Alignment;
use pulldown_cmark::{CodeBlockKind, Event, Tag, TagEnd};

/// Parser state for converting markdown events to blocks
#[derive(Debug, Default)]
pub struct BlockParser {
    /// Current formatting state
    formatting: TextFormatting,

    /// Text runs of the paragraph, heading or table cell being built
    current_runs: Vec<TextRun>,

    /// Completed top-level blocks
    blocks: Vec<MarkdownBlock>,

    /// Open block quotes and lists, innermost last
    containers: Vec<Container>,

    /// Table being built (tables do not nest)
    table: Option<TableContext>,

    /// Code block being built
    code_block: Option<CodeBlockContext>,

    /// Index into `current_runs` where the alt text of an open image starts
    image_mark: Option<usize>,

    /// Level of the heading being built
    heading_level: Option<usize>,
}

/// A block container that collects nested blocks
#[derive(Debug)]
enum Container {
    Quote(Vec<MarkdownBlock>),
    List(ListContext),
}

/// Context for building a list
#[derive(Debug)]
struct ListContext {
    /// Starting number for ordered lists
    start: Option<u64>,
    /// Finished list items
    items: Vec<ListItem>,
    /// Current item being built
    current_item: Option<ListItem>,
}

/// Context for building a table
#[derive(Debug, Default)]
struct TableContext {
    alignments: Vec<Alignment>,
    headers: Vec<Vec<TextRun>>,
    rows: Vec<Vec<Vec<TextRun>>>,
    current_row: Vec<Vec<TextRun>>,
}

#[derive(Debug)]
struct CodeBlockContext {
    language: Option<String>,
    code: String,
}

impl BlockParser {
    /// Parse markdown content into blocks
    ///
    /// # Parameters
    /// * `content` - Raw markdown content to parse
    ///
    /// # Returns
    /// * `Vec<MarkdownBlock>` - Top-level blocks in document order
    pub fn parse(content: &str) -> Vec<MarkdownBlock> {
        let mut parser = Self::default();
        let md_parser = pulldown_cmark::Parser::new_ext(content, super::parser_options());

        for event in md_parser {
            parser.process_event(event);
        }

        parser.finish()
    }

    /// Process a single markdown event
    fn process_event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.handle_start_tag(tag),
            Event::End(tag_end) => self.handle_end_tag(tag_end),
            Event::Text(text) => self.handle_text(text.to_string()),
            Event::Code(code) => self.handle_inline_code(code.to_string()),
            // Math is shown verbatim
            Event::InlineMath(math) | Event::DisplayMath(math) => {
                self.handle_inline_code(math.to_string());
            }
            Event::SoftBreak => self.current_runs.push(TextRun::new(" ".to_string())),
            Event::HardBreak => self.current_runs.push(TextRun::line_break()),
            Event::Rule => {
                self.flush_paragraph();
                self.push_block(MarkdownBlock::Rule);
            }
            Event::TaskListMarker(checked) => self.handle_task_marker(checked),
            // Raw HTML is not part of the exported document
            Event::Html(_) | Event::InlineHtml(_) | Event::FootnoteReference(_) => {}
        }
    }

    /// Handle opening tags
    fn handle_start_tag(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.flush_paragraph(),
            Tag::Heading { level, .. } => {
                self.flush_paragraph();
                self.heading_level = Some(level as usize);
            }
            Tag::BlockQuote(_) => {
                self.flush_paragraph();
                self.containers.push(Container::Quote(Vec::new()));
            }
            Tag::CodeBlock(kind) => {
                self.flush_paragraph();
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(ToString::to_string),
                    CodeBlockKind::Indented => None,
                };
                self.code_block = Some(CodeBlockContext {
                    language,
                    code: String::new(),
                });
            }
            Tag::List(start) => {
                self.flush_paragraph();
                self.containers.push(Container::List(ListContext {
                    start,
                    items: Vec::new(),
                    current_item: None,
                }));
            }
            Tag::Item => {
                self.flush_paragraph();
                if let Some(Container::List(list)) = self.containers.last_mut() {
                    list.current_item = Some(ListItem::default());
                }
            }
            Tag::Table(alignments) => {
                self.flush_paragraph();
                self.table = Some(TableContext {
                    alignments: alignments.into_iter().map(Alignment::from).collect(),
                    ..TableContext::default()
                });
            }
            Tag::TableHead | Tag::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    table.current_row.clear();
                }
            }
            Tag::TableCell => self.current_runs.clear(),
            Tag::Emphasis => self.formatting.italic = true,
            Tag::Strong => self.formatting.bold = true,
            Tag::Strikethrough => self.formatting.strikethrough = true,
            Tag::Superscript => self.formatting.superscript = true,
            Tag::Subscript => self.formatting.subscript = true,
            Tag::Link { dest_url, .. } => {
                self.formatting.link_url = Some(dest_url.to_string());
            }
            Tag::Image { .. } => self.image_mark = Some(self.current_runs.len()),
            Tag::FootnoteDefinition(_)
            | Tag::HtmlBlock
            | Tag::DefinitionList
            | Tag::DefinitionListTitle
            | Tag::DefinitionListDefinition
            | Tag::MetadataBlock(_) => {}
        }
    }

    /// Handle closing tags
    fn handle_end_tag(&mut self, tag_end: TagEnd) {
        match tag_end {
            TagEnd::Paragraph => self.flush_paragraph(),
            TagEnd::Heading(_) => self.finish_heading(),
            TagEnd::BlockQuote(_) => self.finish_blockquote(),
            TagEnd::CodeBlock => self.finish_code_block(),
            TagEnd::List(_) => self.finish_list(),
            TagEnd::Item => self.finish_list_item(),
            TagEnd::Table => self.finish_table(),
            TagEnd::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    table.headers = std::mem::take(&mut table.current_row);
                }
            }
            TagEnd::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    let row = std::mem::take(&mut table.current_row);
                    table.rows.push(row);
                }
            }
            TagEnd::TableCell => {
                let cell = std::mem::take(&mut self.current_runs);
                if let Some(table) = self.table.as_mut() {
                    table.current_row.push(cell);
                }
            }
            TagEnd::Emphasis => self.formatting.italic = false,
            TagEnd::Strong => self.formatting.bold = false,
            TagEnd::Strikethrough => self.formatting.strikethrough = false,
            TagEnd::Superscript => self.formatting.superscript = false,
            TagEnd::Subscript => self.formatting.subscript = false,
            TagEnd::Link => self.formatting.link_url = None,
            TagEnd::Image => self.finish_image(),
            TagEnd::FootnoteDefinition
            | TagEnd::HtmlBlock
            | TagEnd::DefinitionList
            | TagEnd::DefinitionListTitle
            | TagEnd::DefinitionListDefinition
            | TagEnd::MetadataBlock(_) => {}
        }
    }

    /// Handle text content
    fn handle_text(&mut self, text: String) {
        if let Some(code_block) = self.code_block.as_mut() {
            code_block.code.push_str(&text);
            return;
        }

        if text.is_empty() {
            return;
        }

        let run = TextRun::with_formatting(text, &self.formatting);
        self.current_runs.push(run);
    }

    /// Handle inline code
    fn handle_inline_code(&mut self, code: String) {
        let mut run = TextRun::with_formatting(code, &self.formatting);
        run.code = true;
        self.current_runs.push(run);
    }

    /// Mark the list item being built as a task
    fn handle_task_marker(&mut self, checked: bool) {
        let Some(Container::List(list)) = self.containers.last_mut() else {
            return;
        };

        if let Some(item) = list.current_item.as_mut() {
            item.task_list = Some(checked);
        }
    }

    /// Replace the alt text runs of an image with a placeholder run
    ///
    /// Referenced image files are never loaded.
    fn finish_image(&mut self) {
        let Some(mark) = self.image_mark.take() else {
            return;
        };

        let alt_runs: Vec<TextRun> = self.current_runs.drain(mark..).collect();
        let alt_text = plain_text(&alt_runs);
        let label = if alt_text.trim().is_empty() {
            "[Image]".to_string()
        } else {
            format!("[Image: {}]", alt_text.trim())
        };

        let mut run = TextRun::with_formatting(label, &self.formatting);
        run.italic = true;
        self.current_runs.push(run);
    }

    /// Finish a heading
    fn finish_heading(&mut self) {
        let runs = std::mem::take(&mut self.current_runs);
        let level = self.heading_level.take().unwrap_or(1);
        self.push_block(MarkdownBlock::Heading { level, runs });
    }

    /// Turn pending text runs into a paragraph
    fn flush_paragraph(&mut self) {
        if self.current_runs.is_empty() {
            return;
        }

        let runs = std::mem::take(&mut self.current_runs);
        self.push_block(MarkdownBlock::Paragraph(runs));
    }

    /// Finish a code block
    fn finish_code_block(&mut self) {
        let Some(context) = self.code_block.take() else {
            return;
        };

        let code = context.code.strip_suffix('\n').unwrap_or(&context.code);
        self.push_block(MarkdownBlock::CodeBlock {
            language: context.language,
            code: code.to_string(),
        });
    }

    /// Finish a blockquote
    fn finish_blockquote(&mut self) {
        self.flush_paragraph();

        let Some(Container::Quote(blocks)) = self.containers.pop() else {
            return;
        };

        self.push_block(MarkdownBlock::BlockQuote(blocks));
    }

    /// Finish a list item
    fn finish_list_item(&mut self) {
        // Tight list items carry their text without a paragraph tag
        self.flush_paragraph();

        let Some(Container::List(list)) = self.containers.last_mut() else {
            return;
        };

        if let Some(item) = list.current_item.take() {
            list.items.push(item);
        }
    }

    /// Finish a list
    fn finish_list(&mut self) {
        self.flush_paragraph();

        let Some(Container::List(list)) = self.containers.pop() else {
            return;
        };

        self.push_block(MarkdownBlock::List {
            start: list.start,
            items: list.items,
        });
    }

    /// Finish a table
    fn finish_table(&mut self) {
        let Some(table) = self.table.take() else {
            return;
        };

        self.push_block(MarkdownBlock::Table {
            alignments: table.alignments,
            headers: table.headers,
            rows: table.rows,
        });
    }

    /// Add a block to the innermost open container
    fn push_block(&mut self, block: MarkdownBlock) {
        match self.containers.last_mut() {
            Some(Container::Quote(blocks)) => blocks.push(block),
            Some(Container::List(list)) => list
                .current_item
                .get_or_insert_with(ListItem::default)
                .content
                .push(block),
            None => self.blocks.push(block),
        }
    }

    /// Close anything still open and return the top-level blocks
    fn finish(mut self) -> Vec<MarkdownBlock> {
        self.flush_paragraph();
        while let Some(container) = self.containers.last() {
            if matches!(container, Container::Quote(_)) {
                self.finish_blockquote();
            } else {
                self.finish_list_item();
                self.finish_list();
            }
        }
        self.blocks
    }
}
