//! Typst markup generation for parsed markdown blocks
//!
//! Every piece of user text is emitted as a Typst string literal
//! (`#"..."`), so markdown content can never be interpreted as markup.

use super::blocks::{ListItem, MarkdownBlock};
use super::text_run::TextRun;
use super::types::Alignment;
use itertools::Itertools;

/// Generate Typst markup for a sequence of blocks
pub fn blocks_to_markup(blocks: &[MarkdownBlock]) -> String {
    blocks.iter().map(generate_block).collect()
}

/// Generate Typst markup for a block
fn generate_block(block: &MarkdownBlock) -> String {
    match block {
        MarkdownBlock::Paragraph(runs) => format!("{}\n\n", runs_to_markup(runs)),

        MarkdownBlock::Heading { level, runs } => {
            format!(
                "#heading(level: {})[{}]\n\n",
                (*level).clamp(1, 6),
                runs_to_markup(runs)
            )
        }

        MarkdownBlock::CodeBlock { language, code } => match language {
            Some(lang) => format!(
                "#raw(block: true, lang: {}, {})\n\n",
                typst_string(lang),
                typst_string(code)
            ),
            None => format!("#raw(block: true, {})\n\n", typst_string(code)),
        },

        MarkdownBlock::BlockQuote(blocks) => {
            format!(
                "#quote(block: true)[{}]\n\n",
                blocks_to_markup(blocks).trim_end()
            )
        }

        MarkdownBlock::List { start, items } => generate_list(*start, items),

        MarkdownBlock::Table {
            alignments,
            headers,
            rows,
        } => generate_table(alignments, headers, rows),

        MarkdownBlock::Rule => "#line(length: 100%)\n\n".to_string(),
    }
}

/// Generate Typst markup for a bullet or numbered list
fn generate_list(start: Option<u64>, items: &[ListItem]) -> String {
    let head = match start {
        Some(number) => format!("#enum(start: {number},"),
        None => "#list(".to_string(),
    };

    let body = items
        .iter()
        .map(|item| format!("  [{}],", generate_list_item(item)))
        .join("\n");

    format!("{head}\n{body}\n)\n\n")
}

/// Generate Typst markup for the content of a list item
fn generate_list_item(item: &ListItem) -> String {
    let content = blocks_to_markup(&item.content);
    let content = content.trim_end();

    match item.task_list {
        Some(true) => format!("{}{}", typst_text("\u{2611} "), content),
        Some(false) => format!("{}{}", typst_text("\u{2610} "), content),
        None => content.to_string(),
    }
}

/// Generate Typst markup for a table
fn generate_table(
    alignments: &[Alignment],
    headers: &[Vec<TextRun>],
    rows: &[Vec<Vec<TextRun>>],
) -> String {
    let num_cols = headers.len();
    if num_cols == 0 {
        return String::new();
    }

    let mut output = format!("#table(\n  columns: {num_cols},\n");

    if alignments.len() == num_cols {
        output.push_str(&format!(
            "  align: ({}),\n",
            alignments.iter().map(|a| a.as_typst()).join(", ")
        ));
    }

    output.push_str(&format!(
        "  table.header({}),\n",
        headers
            .iter()
            .map(|cell| format!("[#strong[{}]]", runs_to_markup(cell)))
            .join(", ")
    ));

    for row in rows {
        let cells = (0..num_cols)
            .map(|idx| match row.get(idx) {
                Some(cell) => format!("[{}]", runs_to_markup(cell)),
                None => "[]".to_string(),
            })
            .join(", ");
        output.push_str(&format!("  {cells},\n"));
    }

    output.push_str(")\n\n");
    output
}

/// Convert text runs to Typst markup
pub fn runs_to_markup(runs: &[TextRun]) -> String {
    runs.iter().map(run_to_markup).collect()
}

fn run_to_markup(run: &TextRun) -> String {
    if run.line_break {
        return "#linebreak()".to_string();
    }

    if !run.has_formatting() {
        return typst_text(&run.text);
    }

    let mut text = if run.code {
        format!("#raw({})", typst_string(&run.text))
    } else {
        typst_text(&run.text)
    };

    if !run.code {
        if run.bold {
            text = format!("#strong[{text}]");
        }
        if run.italic {
            text = format!("#emph[{text}]");
        }
    }

    if run.strikethrough {
        text = format!("#strike[{text}]");
    }

    if run.superscript {
        text = format!("#super[{text}]");
    }

    if run.subscript {
        text = format!("#sub[{text}]");
    }

    // Pages are images, so a link only needs to look like one
    if run.link_url.is_some() {
        text = format!("#underline[#text(fill: {LINK_COLOR})[{text}]]");
    }

    text
}

const LINK_COLOR: &str = "rgb(\"#1d4ed8\")";

/// Embed text into markup as a string literal expression
fn typst_text(s: &str) -> String {
    format!("#{}", typst_string(s))
}

/// Quote a string as a Typst string literal
pub fn typst_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => {}
            c if c.is_control() => out.push_str(&format!("\\u{{{:x}}}", u32::from(c))),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
