//! Renderer adapter
//!
//! Turns markdown into an off-screen [`Fragment`]: the markup is wrapped in
//! a styling container and laid out at a fixed width with a height that
//! follows the content. Fragments are counted while alive so that callers
//! (and tests) can verify every fragment is released.

use crate::config::RenderStyle;
use crate::markdown::{typst_string, MarkdownParser, ParseError};
use crate::world::{FontStore, LayoutWorld};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use typst::layout::Page;

/// Rendering errors
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Layout failed:\n{0}")]
    Layout(String),

    #[error("Layout produced {0} pages instead of one continuous fragment")]
    PageCount(usize),

    #[error("Render task did not complete: {0}")]
    Interrupted(String),
}

/// A laid-out, never displayed rendering of the document
///
/// Dropping the fragment detaches it from its renderer.
pub struct Fragment {
    page: Page,
    attached: Arc<AtomicUsize>,
}

impl Fragment {
    /// The single page holding the whole document
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Layout width in points
    pub fn width_pt(&self) -> f64 {
        self.page.frame.width().to_pt()
    }

    /// Content-determined height in points
    pub fn height_pt(&self) -> f64 {
        self.page.frame.height().to_pt()
    }
}

impl Drop for Fragment {
    fn drop(&mut self) {
        self.attached.fetch_sub(1, Ordering::SeqCst);
        log::debug!("Released render fragment");
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fragment")
            .field("width_pt", &self.width_pt())
            .field("height_pt", &self.height_pt())
            .finish()
    }
}

/// Lays out markdown with a fixed style
pub struct Renderer {
    parser: Arc<dyn MarkdownParser>,
    style: RenderStyle,
    fonts: Arc<FontStore>,
    attached: Arc<AtomicUsize>,
}

impl Renderer {
    /// Create a renderer
    ///
    /// # Parameters
    /// * `parser` - Markdown parser producing the markup to lay out
    /// * `style` - Styling container applied around the markup
    /// * `fonts` - Fonts available to the layout engine
    pub fn new(parser: Arc<dyn MarkdownParser>, style: RenderStyle, fonts: Arc<FontStore>) -> Self {
        Self {
            parser,
            style,
            fonts,
            attached: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The style applied to every fragment
    pub fn style(&self) -> &RenderStyle {
        &self.style
    }

    /// Fonts shared with the layout engine
    pub fn fonts(&self) -> &Arc<FontStore> {
        &self.fonts
    }

    /// Number of fragments currently alive
    pub fn attached_fragments(&self) -> usize {
        self.attached.load(Ordering::SeqCst)
    }

    /// Render markdown into a fragment
    ///
    /// # Parameters
    /// * `markdown` - Raw markdown text of any length
    ///
    /// # Returns
    /// * `Ok(Fragment)` - The laid-out document
    /// * `Err(RenderError)` - The parser or the layout engine failed
    pub fn render(&self, markdown: &str) -> Result<Fragment, RenderError> {
        let markup = self.parser.to_markup(markdown)?;
        let source = container_markup(&self.style, &markup);

        let world = LayoutWorld::new(source, &self.fonts);
        let document = world.compile().map_err(RenderError::Layout)?;

        let page_count = document.pages.len();
        let mut pages = document.pages.into_iter();
        let (Some(page), None) = (pages.next(), pages.next()) else {
            return Err(RenderError::PageCount(page_count));
        };

        self.attached.fetch_add(1, Ordering::SeqCst);
        let fragment = Fragment {
            page,
            attached: Arc::clone(&self.attached),
        };
        log::debug!(
            "Attached render fragment of {:.1}x{:.1}pt",
            fragment.width_pt(),
            fragment.height_pt()
        );

        Ok(fragment)
    }

    /// Render a fragment, hand it to `use_fragment`, and release it
    ///
    /// The fragment is released when `use_fragment` returns, whatever the
    /// outcome.
    pub fn with_fragment<R>(
        &self,
        markdown: &str,
        use_fragment: impl FnOnce(&Fragment) -> R,
    ) -> Result<R, RenderError> {
        let fragment = self.render(markdown)?;
        Ok(use_fragment(&fragment))
    }
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("style", &self.style)
            .field("attached", &self.attached_fragments())
            .finish_non_exhaustive()
    }
}

/// Wrap body markup in the styling container
///
/// The page is exactly `width_pt` wide and as tall as its content; the
/// padding keeps even an empty document a few points tall.
pub fn container_markup(style: &RenderStyle, body: &str) -> String {
    // CSS line height includes the glyph box, Typst leading is only the gap
    let leading_em = (style.line_height - 1.0).max(0.0);

    format!(
        r#"#set page(width: {width:.3}pt, height: auto, margin: {padding:.3}pt, fill: {background}, header: none, footer: none)
#set text(font: {font}, size: {size:.3}pt, fill: {color})
#set par(leading: {leading:.3}em, spacing: {spacing:.3}em)
#show raw: set text(font: {code_font}, size: 0.9em)
#show raw.where(block: true): it => block(
  fill: luma(245),
  inset: 8pt,
  radius: 4pt,
  width: 100%,
)[#set par(leading: 0.5em); #it]
#show quote.where(block: true): it => block(
  stroke: (left: 3pt + luma(200)),
  inset: (left: 12pt, y: 4pt),
)[#set text(fill: luma(90), style: "italic"); #it.body]

{body}"#,
        width = style.width_pt,
        padding = style.padding_pt,
        background = style.background.to_typst(),
        font = typst_string(&style.font_family),
        size = style.font_size_pt,
        color = style.text_color.to_typst(),
        leading = leading_em,
        spacing = leading_em + 0.6,
        code_font = typst_string(&style.code_font_family),
        body = body,
    )
}
