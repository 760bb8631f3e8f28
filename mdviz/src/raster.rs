//! Rasterization of render fragments
//!
//! The whole fragment is rasterized once into a single tall [`Bitmap`] at a
//! fixed oversampling scale. The result is always fully opaque.

use crate::config::{HexColor, RasterOptions};
use crate::renderer::Fragment;
use image::{imageops, RgbaImage};
use std::any::Any;
use std::num::NonZeroU32;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

/// Rasterization errors
#[derive(Error, Debug)]
pub enum RasterError {
    #[error("Bitmap has no pixels ({width}x{height})")]
    EmptyBitmap { width: u32, height: u32 },

    #[error("A {width}x{height} bitmap needs {bytes} bytes, more than the {limit} byte limit")]
    TooLarge {
        width: u64,
        height: u64,
        bytes: u64,
        limit: u64,
    },

    #[error("Rasterization backend failed: {0}")]
    Backend(String),
}

/// An opaque RGBA bitmap with non-zero dimensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    image: RgbaImage,
    width: NonZeroU32,
    height: NonZeroU32,
}

impl Bitmap {
    /// Wrap an image, rejecting images without pixels
    pub fn new(image: RgbaImage) -> Result<Self, RasterError> {
        let (width, height) = image.dimensions();
        match (NonZeroU32::new(width), NonZeroU32::new(height)) {
            (Some(width), Some(height)) => Ok(Self {
                image,
                width,
                height,
            }),
            _ => Err(RasterError::EmptyBitmap { width, height }),
        }
    }

    pub fn width(&self) -> NonZeroU32 {
        self.width
    }

    pub fn height(&self) -> NonZeroU32 {
        self.height
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Copy the full-width band of rows `[y, y + rows)`
    pub fn band(&self, y: u32, rows: u32) -> RgbaImage {
        imageops::crop_imm(&self.image, 0, y, self.width.get(), rows).to_image()
    }
}

/// Turns a fragment into pixels
pub trait Rasterizer: Send + Sync {
    /// Rasterize the whole fragment into one bitmap
    fn rasterize(&self, fragment: &Fragment) -> Result<Bitmap, RasterError>;
}

/// Rasterizer backed by typst-render
#[derive(Debug, Clone, Default)]
pub struct TypstRasterizer {
    options: RasterOptions,
}

impl TypstRasterizer {
    pub fn new(options: RasterOptions) -> Self {
        Self { options }
    }

    /// Pixel size the backend will allocate for a fragment
    fn pixel_size(&self, fragment: &Fragment) -> (f64, f64) {
        let scale = f64::from(self.options.scale);
        let width = (fragment.width_pt() * scale).round().max(1.0);
        let height = (fragment.height_pt() * scale).round().max(1.0);
        (width, height)
    }
}

impl Rasterizer for TypstRasterizer {
    fn rasterize(&self, fragment: &Fragment) -> Result<Bitmap, RasterError> {
        let (width, height) = self.pixel_size(fragment);
        let bytes = width * height * 4.0;
        if bytes > self.options.max_bitmap_bytes as f64 {
            return Err(RasterError::TooLarge {
                width: width as u64,
                height: height as u64,
                bytes: bytes as u64,
                limit: self.options.max_bitmap_bytes,
            });
        }

        log::debug!(
            "Rasterizing fragment at {}x into {}x{} pixels",
            self.options.scale,
            width,
            height
        );

        let scale = self.options.scale;
        let page = fragment.page();
        let pixmap = panic::catch_unwind(AssertUnwindSafe(|| typst_render::render(page, scale)))
            .map_err(|payload| RasterError::Backend(panic_reason(payload.as_ref())))?;

        let (width, height) = (pixmap.width(), pixmap.height());
        let mut data = pixmap.take();
        flatten_onto(&mut data, self.options.background);

        let image = RgbaImage::from_raw(width, height, data).ok_or_else(|| {
            RasterError::Backend(format!("pixel buffer does not match {width}x{height}"))
        })?;

        Bitmap::new(image)
    }
}

/// Run any rasterizer, turning a panic inside it into [`RasterError::Backend`]
pub fn rasterize_guarded(
    rasterizer: &dyn Rasterizer,
    fragment: &Fragment,
) -> Result<Bitmap, RasterError> {
    panic::catch_unwind(AssertUnwindSafe(|| rasterizer.rasterize(fragment)))
        .unwrap_or_else(|payload| Err(RasterError::Backend(panic_reason(payload.as_ref()))))
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "rasterizer panicked".to_string())
}

/// Composite premultiplied RGBA pixels onto an opaque background
fn flatten_onto(data: &mut [u8], background: HexColor) {
    let backdrop = [background.r, background.g, background.b];

    for pixel in data.chunks_exact_mut(4) {
        let alpha = pixel[3];
        if alpha == u8::MAX {
            continue;
        }

        let remaining = u16::from(u8::MAX - alpha);
        for (channel, bg) in pixel[..3].iter_mut().zip(backdrop) {
            let blended = u16::from(*channel) + (u16::from(bg) * remaining + 127) / 255;
            *channel = u8::try_from(blended).unwrap_or(u8::MAX);
        }
        pixel[3] = u8::MAX;
    }
}
