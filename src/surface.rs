//! Drawable surfaces that rendered pages are written to

use std::path::Path;

use image::{ImageFormat, RgbaImage};

use crate::pdf::PageImage;

/// Canvas size when the element specifies none
pub const DEFAULT_CANVAS_WIDTH: u32 = 300;
pub const DEFAULT_CANVAS_HEIGHT: u32 = 150;

/// Largest canvas side in pixels
pub const MAX_CANVAS_SIDE: u32 = 32_767;
/// Largest canvas area in pixels (16384 x 16384)
pub const MAX_CANVAS_AREA: u64 = 268_435_456;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceError {
    #[error(
        "surface of {width}x{height} exceeds the {MAX_CANVAS_SIDE}px side or {MAX_CANVAS_AREA}px area limit"
    )]
    TooLarge { width: u32, height: u32 },
}

/// Check a size against the canvas limits before allocating it
pub fn check_canvas_size(width: u32, height: u32) -> Result<(), SurfaceError> {
    let area = u64::from(width) * u64::from(height);
    if width > MAX_CANVAS_SIDE || height > MAX_CANVAS_SIDE || area > MAX_CANVAS_AREA {
        return Err(SurfaceError::TooLarge { width, height });
    }
    Ok(())
}

/// A 2D pixel surface a page can be drawn onto
pub trait Surface {
    /// Current size in pixels
    fn size(&self) -> (u32, u32);

    /// Resize the surface. Existing pixels are discarded.
    ///
    /// A size over the limits leaves the surface unchanged.
    fn set_size(&mut self, width: u32, height: u32) -> Result<(), SurfaceError>;

    /// Draw a rendered page at the origin, clipped to the surface
    fn draw_page(&mut self, image: &PageImage);
}

/// In-memory RGBA canvas
#[derive(Clone)]
pub struct Canvas {
    pixels: RgbaImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Result<Self, SurfaceError> {
        check_canvas_size(width, height)?;
        Ok(Self {
            pixels: RgbaImage::new(width, height),
        })
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Pixel at (x, y) as RGBA, if inside the canvas
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.pixels.get_pixel_checked(x, y).map(|p| p.0)
    }

    #[must_use]
    pub fn as_image(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> image::ImageResult<()> {
        self.pixels.save_with_format(path, ImageFormat::Png)
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            pixels: RgbaImage::new(DEFAULT_CANVAS_WIDTH, DEFAULT_CANVAS_HEIGHT),
        }
    }
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish_non_exhaustive()
    }
}

impl Surface for Canvas {
    fn size(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    fn set_size(&mut self, width: u32, height: u32) -> Result<(), SurfaceError> {
        check_canvas_size(width, height)?;
        self.pixels = RgbaImage::new(width, height);
        Ok(())
    }

    fn draw_page(&mut self, image: &PageImage) {
        let width = image.width_px.min(self.width()) as usize;
        let height = image.height_px.min(self.height()) as usize;
        let src_stride = image.width_px as usize * 4;
        let dst_stride = self.width() as usize * 4;
        let row_bytes = width * 4;

        let dst = &mut *self.pixels;
        for y in 0..height {
            let src_start = y * src_stride;
            let dst_start = y * dst_stride;
            let Some(src_row) = image.pixels.get(src_start..src_start + row_bytes) else {
                break;
            };
            dst[dst_start..dst_start + row_bytes].copy_from_slice(src_row);
        }
    }
}
