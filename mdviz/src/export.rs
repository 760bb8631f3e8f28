//! Paginating export engine
//!
//! One export runs the whole pipeline for the current markdown text:
//! render off-screen, rasterize once, slice into page bands, assemble the
//! PDF and hand it to the sink. The two CPU-bound halves run on tokio's
//! blocking pool, one after the other.

use crate::config::{ConfigError, ExportConfig};
use crate::markdown::{MarkdownParser, PulldownParser};
use crate::output::OutputDocument;
use crate::pagination::{PageGeometry, PageLayout, PageSlice};
use crate::persist::{current_millis, export_file_name, DocumentSink, PersistError};
use crate::raster::{rasterize_guarded, Bitmap, RasterError, Rasterizer, TypstRasterizer};
use crate::renderer::{RenderError, Renderer};
use crate::world::{FontError, FontStore};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Memoized layout results older than this many evictions are dropped
const CACHE_MAX_AGE: usize = 10;

/// Why an export failed
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Rendering failed: {0}")]
    RenderFailure(#[from] RenderError),

    #[error("Rasterization failed: {0}")]
    RasterFailure(#[from] RasterError),

    #[error("Saving the PDF failed: {0}")]
    PersistFailure(#[from] PersistError),
}

/// Errors while setting up an engine
#[derive(Error, Debug)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fonts(#[from] FontError),
}

/// A successfully written PDF
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedDocument {
    /// Generated file name, `markdown-document-<epoch-millis>.pdf`
    pub file_name: String,
    /// Where the sink stored the file
    pub path: PathBuf,
    pub page_count: usize,
    pub layout: PageLayout,
    pub slices: Vec<PageSlice>,
}

/// Runs exports
pub struct ExportEngine {
    renderer: Arc<Renderer>,
    rasterizer: Arc<dyn Rasterizer>,
    sink: Arc<dyn DocumentSink>,
    geometry: PageGeometry,
}

impl ExportEngine {
    /// Assemble an engine from its parts
    pub fn new(
        renderer: Renderer,
        rasterizer: Arc<dyn Rasterizer>,
        sink: Arc<dyn DocumentSink>,
        geometry: PageGeometry,
    ) -> Self {
        Self {
            renderer: Arc::new(renderer),
            rasterizer,
            sink,
            geometry,
        }
    }

    /// Build the standard engine for a configuration
    ///
    /// Uses the pulldown-cmark parser and the typst rasterizer. The
    /// configuration is validated and fonts are loaded once here.
    pub fn from_config(
        config: &ExportConfig,
        sink: Arc<dyn DocumentSink>,
    ) -> Result<Self, SetupError> {
        Self::with_parser(config, Arc::new(PulldownParser), sink)
    }

    /// Like [`ExportEngine::from_config`] with a custom markdown parser
    pub fn with_parser(
        config: &ExportConfig,
        parser: Arc<dyn MarkdownParser>,
        sink: Arc<dyn DocumentSink>,
    ) -> Result<Self, SetupError> {
        config.validate()?;

        let fonts = Arc::new(FontStore::load(
            config.style.include_system_fonts,
            &config.style.font_dirs,
        )?);
        log::debug!("Loaded {} font faces", fonts.len());
        for family in [&config.style.font_family, &config.style.code_font_family] {
            if !fonts.has_family(family) {
                log::warn!("Font family '{}' not found, falling back", family);
            }
        }

        let renderer = Renderer::new(parser, config.style.clone(), fonts);
        let rasterizer = Arc::new(TypstRasterizer::new(config.raster.clone()));

        Ok(Self::new(renderer, rasterizer, sink, config.page))
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    /// Export markdown as a multi-page PDF
    ///
    /// # Parameters
    /// * `markdown` - The document text at the moment export was triggered
    ///
    /// # Returns
    /// * `Ok(ExportedDocument)` - The file was written
    /// * `Err(ExportError)` - Nothing was written
    pub async fn export_to_pdf(&self, markdown: &str) -> Result<ExportedDocument, ExportError> {
        let started = current_millis();
        log::info!("Starting PDF export of {} bytes of markdown", markdown.len());

        let result = self.run(markdown.to_owned(), started).await;
        comemo::evict(CACHE_MAX_AGE);

        match &result {
            Ok(exported) => log::info!(
                "Exported {} page(s) to {}",
                exported.page_count,
                exported.path.display()
            ),
            Err(e) => log::debug!("Export aborted: {}", e),
        }
        result
    }

    async fn run(&self, markdown: String, started: u128) -> Result<ExportedDocument, ExportError> {
        // Step 1: Render and rasterize; the fragment is released inside the task
        let renderer = Arc::clone(&self.renderer);
        let rasterizer = Arc::clone(&self.rasterizer);
        let bitmap = tokio::task::spawn_blocking(move || -> Result<Bitmap, ExportError> {
            let bitmap = renderer
                .with_fragment(&markdown, |fragment| {
                    rasterize_guarded(rasterizer.as_ref(), fragment)
                })??;
            Ok(bitmap)
        })
        .await
        .map_err(|e| RenderError::Interrupted(e.to_string()))??;

        // Step 2: Paginate
        let layout = PageLayout::compute(bitmap.width(), bitmap.height(), &self.geometry);
        let slices = layout.slices();
        log::debug!(
            "Bitmap {}x{} at {:.3} px/mm: {} page(s) of {} rows",
            layout.bitmap_width,
            layout.bitmap_height,
            layout.pixels_per_mm,
            layout.page_count,
            layout.band_height
        );

        // Step 3: Assemble and persist
        let file_name = export_file_name(started);
        let geometry = self.geometry;
        let fonts = Arc::clone(self.renderer.fonts());
        let sink = Arc::clone(&self.sink);
        let name = file_name.clone();
        let path = tokio::task::spawn_blocking(move || -> Result<PathBuf, PersistError> {
            let document = OutputDocument::from_bitmap(&bitmap, &layout, geometry)?;
            let pdf = document.to_pdf(&fonts)?;
            sink.persist(&name, &pdf)
        })
        .await
        .map_err(|e| PersistError::Interrupted(e.to_string()))??;

        Ok(ExportedDocument {
            file_name,
            path,
            page_count: slices.len(),
            layout,
            slices,
        })
    }
}
