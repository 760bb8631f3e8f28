//! Output document assembly
//!
//! Each page band becomes one PNG placed at the page margin and stretched to
//! the content width. The pages are laid out with Typst and exported with
//! typst-pdf.

use crate::pagination::{PageGeometry, PageLayout};
use crate::raster::Bitmap;
use crate::world::{FontStore, LayoutWorld};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use thiserror::Error;
use typst::layout::PagedDocument;

/// Errors while building the output document
#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error("Failed to encode page {page} as PNG: {source}")]
    Encode {
        page: usize,
        #[source]
        source: image::ImageError,
    },

    #[error("Page layout does not match a {width}x{height} bitmap")]
    LayoutMismatch { width: u32, height: u32 },

    #[error("PDF compilation failed:\n{0}")]
    Compile(String),

    #[error("PDF export failed: {0}")]
    Export(String),
}

/// One placed page image, in millimetres from the top-left page corner
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPage {
    pub png: Vec<u8>,
    pub x_mm: f64,
    pub y_mm: f64,
    pub width_mm: f64,
    pub height_mm: f64,
}

/// An ordered list of portrait pages, each holding one image
#[derive(Debug, Clone, PartialEq)]
pub struct OutputDocument {
    geometry: PageGeometry,
    pages: Vec<OutputPage>,
}

impl OutputDocument {
    /// Create an empty document with the given page size
    pub fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            pages: Vec::new(),
        }
    }

    /// Cut `bitmap` into the bands described by `layout` and add one page per band
    ///
    /// # Returns
    /// * `Ok(OutputDocument)` - One page per slice, in slice order
    /// * `Err(AssemblyError)` - The layout was computed for another bitmap, or encoding failed
    pub fn from_bitmap(
        bitmap: &Bitmap,
        layout: &PageLayout,
        geometry: PageGeometry,
    ) -> Result<Self, AssemblyError> {
        if layout.bitmap_width != bitmap.width().get()
            || layout.bitmap_height != bitmap.height().get()
        {
            return Err(AssemblyError::LayoutMismatch {
                width: bitmap.width().get(),
                height: bitmap.height().get(),
            });
        }

        let mut document = Self::new(geometry);
        for slice in layout.slices() {
            let band = bitmap.band(slice.source_y_start, slice.source_height);
            let png = encode_png(band).map_err(|source| AssemblyError::Encode {
                page: slice.index + 1,
                source,
            })?;

            document.push_page(OutputPage {
                png,
                x_mm: geometry.margin_mm,
                y_mm: geometry.margin_mm,
                width_mm: layout.image_width_mm,
                height_mm: slice.content_height_mm,
            });
        }

        log::debug!("Assembled {} page(s)", document.page_count());
        Ok(document)
    }

    /// Append a page
    pub fn push_page(&mut self, page: OutputPage) {
        self.pages.push(page);
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[OutputPage] {
        &self.pages
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    /// Typst markup placing every page image
    pub fn to_markup(&self) -> String {
        let mut markup = format!(
            "#set page(width: {:.3}mm, height: {:.3}mm, margin: 0mm)\n",
            self.geometry.page_width_mm, self.geometry.page_height_mm
        );

        for (index, page) in self.pages.iter().enumerate() {
            if index > 0 {
                markup.push_str("#pagebreak()\n");
            }
            markup.push_str(&format!(
                "#place(top + left, dx: {:.3}mm, dy: {:.3}mm, image(\"{}\", width: {:.3}mm, height: {:.3}mm, fit: \"stretch\"))\n",
                page.x_mm,
                page.y_mm,
                page_file_name(index),
                page.width_mm,
                page.height_mm
            ));
        }

        markup
    }

    /// Lay out the pages
    pub fn layout(&self, fonts: &FontStore) -> Result<PagedDocument, AssemblyError> {
        let mut world = LayoutWorld::new(self.to_markup(), fonts);
        for (index, page) in self.pages.iter().enumerate() {
            world.add_file(&page_file_name(index), page.png.clone());
        }

        world.compile().map_err(AssemblyError::Compile)
    }

    /// Render the document as PDF bytes
    pub fn to_pdf(&self, fonts: &FontStore) -> Result<Vec<u8>, AssemblyError> {
        let document = self.layout(fonts)?;

        typst_pdf::pdf(&document, &typst_pdf::PdfOptions::default())
            .map_err(|errors| {
                AssemblyError::Export(
                    errors
                        .iter()
                        .map(|e| e.message.to_string())
                        .collect::<Vec<_>>()
                        .join("; "),
                )
            })
    }
}

fn page_file_name(index: usize) -> String {
    format!("page-{:04}.png", index + 1)
}

/// Encode a band as an opaque RGB PNG
fn encode_png(band: image::RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let rgb = DynamicImage::ImageRgba8(band).into_rgb8();
    let mut png = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::num::NonZeroU32;

    fn bitmap(width: u32, height: u32) -> Bitmap {
        let image = RgbaImage::from_fn(width, height, |_, y| {
            let shade = u8::try_from(y % 256).unwrap();
            Rgba([shade, shade, shade, 255])
        });
        Bitmap::new(image).unwrap()
    }

    fn layout_for(bitmap: &Bitmap) -> PageLayout {
        PageLayout::compute(bitmap.width(), bitmap.height(), &PageGeometry::A4)
    }

    #[test]
    fn test_one_page_per_slice() {
        // Arrange: 170px wide gives 1px/mm, 600 rows is 600mm of content
        let bitmap = bitmap(170, 600);
        let layout = layout_for(&bitmap);

        // Act
        let document = OutputDocument::from_bitmap(&bitmap, &layout, PageGeometry::A4).unwrap();

        // Assert
        assert_eq!(document.page_count(), 3);
        let heights: Vec<f64> = document.pages().iter().map(|p| p.height_mm).collect();
        assert_eq!(heights, vec![257.0, 257.0, 86.0]);
        for page in document.pages() {
            assert_eq!(page.x_mm, 20.0);
            assert_eq!(page.y_mm, 20.0);
            assert_eq!(page.width_mm, 170.0);
        }
    }

    #[test]
    fn test_pages_are_valid_png_bands() {
        let bitmap = bitmap(170, 300);
        let layout = layout_for(&bitmap);

        let document = OutputDocument::from_bitmap(&bitmap, &layout, PageGeometry::A4).unwrap();

        let last = image::load_from_memory(&document.pages()[1].png).unwrap();
        assert_eq!((last.width(), last.height()), (170, 43));
        // First row of the second band is bitmap row 257
        assert_eq!(last.to_rgb8().get_pixel(0, 0).0, [1, 1, 1]);
    }

    #[test]
    fn test_layout_mismatch_is_rejected() {
        let bitmap = bitmap(170, 300);
        let other = PageLayout::compute(
            NonZeroU32::new(170).unwrap(),
            NonZeroU32::new(301).unwrap(),
            &PageGeometry::A4,
        );

        let err = OutputDocument::from_bitmap(&bitmap, &other, PageGeometry::A4).unwrap_err();

        assert!(matches!(
            err,
            AssemblyError::LayoutMismatch {
                width: 170,
                height: 300
            }
        ));
    }

    #[test]
    fn test_markup_places_images_at_margin() {
        let bitmap = bitmap(170, 300);
        let layout = layout_for(&bitmap);
        let document = OutputDocument::from_bitmap(&bitmap, &layout, PageGeometry::A4).unwrap();

        let markup = document.to_markup();

        assert!(markup.starts_with("#set page(width: 210.000mm, height: 297.000mm, margin: 0mm)"));
        assert!(markup.contains("dx: 20.000mm, dy: 20.000mm, image(\"page-0001.png\", width: 170.000mm, height: 257.000mm"));
        assert!(markup.contains("image(\"page-0002.png\", width: 170.000mm, height: 43.000mm"));
        assert_eq!(markup.matches("#pagebreak()").count(), 1);
    }

    #[test]
    fn test_layout_has_one_page_per_image() {
        let fonts = FontStore::load(false, &[]).unwrap();
        let bitmap = bitmap(170, 600);
        let layout = layout_for(&bitmap);
        let document = OutputDocument::from_bitmap(&bitmap, &layout, PageGeometry::A4).unwrap();

        let laid_out = document.layout(&fonts).unwrap();

        assert_eq!(laid_out.pages.len(), 3);
        for page in &laid_out.pages {
            assert!((page.frame.width().to_mm() - 210.0).abs() < 1e-6);
            assert!((page.frame.height().to_mm() - 297.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_to_pdf_produces_pdf_bytes() {
        let fonts = FontStore::load(false, &[]).unwrap();
        let bitmap = bitmap(170, 100);
        let layout = layout_for(&bitmap);
        let document = OutputDocument::from_bitmap(&bitmap, &layout, PageGeometry::A4).unwrap();

        let pdf = document.to_pdf(&fonts).unwrap();

        assert!(pdf.starts_with(b"%PDF-"));
    }
}
