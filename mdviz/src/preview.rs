//! Live preview
//!
//! HTML rendering of the document for the preview pane. Uses the same
//! markdown extensions as the export parser so both agree on structure.

use crate::markdown::parser_options;
use pulldown_cmark::{html, Parser};

const PREVIEW_CSS: &str = r#"
body { max-width: 800px; margin: 2rem auto; padding: 0 20px; font-family: Georgia, serif; font-size: 14px; line-height: 1.6; color: #1f2937; background: #ffffff; }
h1 { font-size: 1.875rem; font-weight: 700; margin-bottom: 1rem; }
h2 { font-size: 1.5rem; font-weight: 600; margin-bottom: 0.75rem; }
h3 { font-size: 1.25rem; font-weight: 500; margin-bottom: 0.5rem; }
blockquote { border-left: 4px solid #d1d5db; padding-left: 1rem; font-style: italic; color: #4b5563; margin: 0.5rem 0; }
pre { background: #f5f5f5; padding: 8px; border-radius: 4px; overflow-x: auto; }
code { font-family: "DejaVu Sans Mono", monospace; font-size: 0.9em; }
table { border-collapse: collapse; }
th, td { border: 1px solid #d1d5db; padding: 4px 8px; }
"#;

/// Render markdown to an HTML fragment
pub fn to_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, parser_options());
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Render markdown to a standalone HTML page
pub fn to_html_page(markdown: &str, title: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape_html(title),
        PREVIEW_CSS,
        to_html(markdown)
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
