//! Page geometry and bitmap slicing
//!
//! The rasterized fragment is one tall bitmap. It is scaled to the content
//! width of the page and cut into horizontal bands of one content height
//! each; every band becomes one PDF page.
//!
//! All slice arithmetic is done in integer pixel rows. Every page but the
//! last covers exactly `band_height` rows, so the bands tile the bitmap
//! without gaps or overlaps.

use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

/// Physical page size and margin, in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageGeometry {
    pub page_width_mm: f64,
    pub page_height_mm: f64,
    pub margin_mm: f64,
}

impl PageGeometry {
    /// ISO A4 portrait with a 20 mm margin
    pub const A4: PageGeometry = PageGeometry {
        page_width_mm: 210.0,
        page_height_mm: 297.0,
        margin_mm: 20.0,
    };

    /// Width available for content
    pub fn content_width_mm(&self) -> f64 {
        self.page_width_mm - 2.0 * self.margin_mm
    }

    /// Height available for content
    pub fn content_height_mm(&self) -> f64 {
        self.page_height_mm - 2.0 * self.margin_mm
    }

    /// Check that the margins leave a positive content area
    pub fn validate(&self) -> Result<(), String> {
        let values = [self.page_width_mm, self.page_height_mm, self.margin_mm];
        if values.iter().any(|v| !v.is_finite()) {
            return Err("page dimensions must be finite numbers".to_string());
        }
        if self.margin_mm < 0.0 {
            return Err("page.margin_mm must not be negative".to_string());
        }
        if self.content_width_mm() <= 0.0 || self.content_height_mm() <= 0.0 {
            return Err(format!(
                "a {}mm margin leaves no content area on a {}x{}mm page",
                self.margin_mm, self.page_width_mm, self.page_height_mm
            ));
        }
        Ok(())
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::A4
    }
}

/// How a bitmap of a given size maps onto pages
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    /// Bitmap width in pixels
    pub bitmap_width: u32,
    /// Bitmap height in pixels
    pub bitmap_height: u32,
    /// Physical width of the scaled image (the content width)
    pub image_width_mm: f64,
    /// Physical height of the whole scaled image
    pub image_height_mm: f64,
    /// Content height of a full page
    pub content_height_mm: f64,
    /// Bitmap pixels per physical millimetre
    pub pixels_per_mm: f64,
    /// Pixel rows covered by every page but the last
    pub band_height: u32,
    /// Number of output pages
    pub page_count: usize,
}

/// The vertical band of the bitmap that belongs to one page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSlice {
    /// Zero-based page index
    pub index: usize,
    /// First bitmap row of the band
    pub source_y_start: u32,
    /// Number of bitmap rows in the band
    pub source_height: u32,
    /// Physical height the band occupies on its page
    pub content_height_mm: f64,
}

impl PageSlice {
    /// One past the last bitmap row of the band
    pub fn source_y_end(&self) -> u32 {
        self.source_y_start + self.source_height
    }
}

impl PageLayout {
    /// Compute the page layout of a bitmap
    ///
    /// The image is scaled uniformly to the content width. The page count is
    /// never less than one.
    pub fn compute(width: NonZeroU32, height: NonZeroU32, geometry: &PageGeometry) -> Self {
        let bitmap_width = width.get();
        let bitmap_height = height.get();

        let image_width_mm = geometry.content_width_mm();
        let image_height_mm = f64::from(bitmap_height) * image_width_mm / f64::from(bitmap_width);
        let pixels_per_mm = f64::from(bitmap_width) / image_width_mm;
        let content_height_mm = geometry.content_height_mm();

        // A single row per page is the floor, even for absurdly small scales
        let band_height = band_rows(content_height_mm * pixels_per_mm);
        let page_count = usize::try_from(bitmap_height.div_ceil(band_height))
            .unwrap_or(usize::MAX)
            .max(1);

        Self {
            bitmap_width,
            bitmap_height,
            image_width_mm,
            image_height_mm,
            content_height_mm,
            pixels_per_mm,
            band_height,
            page_count,
        }
    }

    /// Slice descriptors for every page, in order
    pub fn slices(&self) -> Vec<PageSlice> {
        let mut slices = Vec::with_capacity(self.page_count);

        for index in 0..self.page_count {
            let start = u64::from(self.band_height) * index as u64;

            // Rounding must never produce a trailing empty page
            if start >= u64::from(self.bitmap_height) {
                break;
            }

            let source_y_start = start as u32;
            let source_height = self.band_height.min(self.bitmap_height - source_y_start);
            let content_height_mm = self
                .content_height_mm
                .min(f64::from(source_height) / self.pixels_per_mm);

            slices.push(PageSlice {
                index,
                source_y_start,
                source_height,
                content_height_mm,
            });
        }

        slices
    }
}

/// Whole pixel rows that fit into a band of `rows` (fractional) rows
fn band_rows(rows: f64) -> u32 {
    if rows >= f64::from(u32::MAX) {
        return u32::MAX;
    }
    // Truncation is the floor here; the value is non-negative and in range
    (rows.floor() as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nz(value: u32) -> NonZeroU32 {
        NonZeroU32::new(value).unwrap()
    }

    fn assert_exact_cover(layout: &PageLayout) {
        let slices = layout.slices();
        assert_eq!(slices.len(), layout.page_count);

        let mut expected_start = 0;
        for (i, slice) in slices.iter().enumerate() {
            assert_eq!(slice.index, i);
            assert_eq!(slice.source_y_start, expected_start, "gap or overlap at page {i}");
            assert!(slice.source_height > 0);
            if i + 1 < slices.len() {
                assert_eq!(slice.source_height, layout.band_height);
            } else {
                assert!(
                    f64::from(slice.source_height)
                        <= layout.content_height_mm * layout.pixels_per_mm
                );
            }
            expected_start = slice.source_y_end();
        }
        assert_eq!(expected_start, layout.bitmap_height);
    }

    #[test]
    fn test_a4_geometry() {
        let geometry = PageGeometry::A4;

        assert_eq!(geometry.content_width_mm(), 170.0);
        assert_eq!(geometry.content_height_mm(), 257.0);
        assert!(geometry.validate().is_ok());
    }

    #[test]
    fn test_short_document_is_one_page() {
        // Arrange: "# Hello" rendered at 800pt wide, 2x oversampling
        let layout = PageLayout::compute(nz(1600), nz(200), &PageGeometry::A4);

        // Assert
        assert_eq!(layout.image_width_mm, 170.0);
        assert!((layout.image_height_mm - 21.25).abs() < 1e-9);
        assert_eq!(layout.page_count, 1);

        let slices = layout.slices();
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].source_y_start, 0);
        assert_eq!(slices[0].source_height, 200);
        assert!((slices[0].content_height_mm - 21.25).abs() < 1e-9);
    }

    #[test]
    fn test_600mm_image_spans_three_pages() {
        // Arrange: 10 px/mm, so the image is exactly 600mm tall
        let layout = PageLayout::compute(nz(1700), nz(6000), &PageGeometry::A4);

        // Assert
        assert!((layout.image_height_mm - 600.0).abs() < 1e-9);
        assert_eq!(layout.band_height, 2570);
        assert_eq!(layout.page_count, 3);

        let slices = layout.slices();
        assert_eq!(slices[0].content_height_mm, 257.0);
        assert_eq!(slices[1].content_height_mm, 257.0);
        assert_eq!(slices[2].source_y_start, 5140);
        assert_eq!(slices[2].source_height, 860);
        assert!((slices[2].content_height_mm - 86.0).abs() < 1e-9);
        assert_exact_cover(&layout);
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_page() {
        let layout = PageLayout::compute(nz(1700), nz(2570 * 4), &PageGeometry::A4);

        assert_eq!(layout.page_count, 4);
        assert_eq!(layout.slices().len(), 4);
        assert_exact_cover(&layout);
    }

    #[test]
    fn test_fractional_band_height_still_tiles() {
        // 1600 / 170 px/mm gives a fractional band of 2418.82 rows
        for height in [1, 2418, 2419, 4837, 5647, 99_999] {
            let layout = PageLayout::compute(nz(1600), nz(height), &PageGeometry::A4);
            assert_eq!(layout.band_height, 2418);
            assert!(layout.page_count >= 1);
            assert_exact_cover(&layout);
        }
    }

    #[test]
    fn test_page_count_matches_physical_ratio() {
        let layout = PageLayout::compute(nz(1700), nz(6000), &PageGeometry::A4);

        let physical = (layout.image_height_mm / layout.content_height_mm).ceil() as usize;
        assert_eq!(layout.page_count, physical);
    }

    #[test]
    fn test_tiny_bitmap_is_one_page() {
        let layout = PageLayout::compute(nz(1), nz(1), &PageGeometry::A4);

        assert_eq!(layout.page_count, 1);
        assert_exact_cover(&layout);
    }

    #[test]
    fn test_many_pages_are_not_capped() {
        let layout = PageLayout::compute(nz(1700), nz(2570 * 500 + 1), &PageGeometry::A4);

        assert_eq!(layout.page_count, 501);
        let slices = layout.slices();
        assert_eq!(slices.last().map(|s| s.source_height), Some(1));
        assert_exact_cover(&layout);
    }

    #[test]
    fn test_same_bitmap_same_slices() {
        let a = PageLayout::compute(nz(1600), nz(12_345), &PageGeometry::A4);
        let b = PageLayout::compute(nz(1600), nz(12_345), &PageGeometry::A4);

        assert_eq!(a, b);
        assert_eq!(a.slices(), b.slices());
    }

    #[test]
    fn test_invalid_geometry() {
        let zero_width = PageGeometry {
            margin_mm: 105.0,
            ..PageGeometry::A4
        };
        let negative = PageGeometry {
            margin_mm: -1.0,
            ..PageGeometry::A4
        };

        assert!(zero_width.validate().is_err());
        assert!(negative.validate().is_err());
    }
}
