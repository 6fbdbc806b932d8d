//! Core types for page rendering

/// Fixed scale applied to a page's native size when computing its viewport
pub const DEFAULT_SCALE: f32 = 1.5;

/// Page rendered by a chain (1-based, as the engine API is addressed)
pub const FIRST_PAGE: u32 = 1;

/// Pixel rectangle a page is rendered at.
///
/// Derived from the page's intrinsic size in points (after rotation) and a
/// scale factor. Immutable once computed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    /// Width in pixels, possibly fractional
    pub width: f32,
    /// Height in pixels, possibly fractional
    pub height: f32,
    /// Scale factor applied to the native page size
    pub scale: f32,
}

impl Viewport {
    /// Compute the viewport for a page of `page_width` x `page_height` points
    #[must_use]
    pub fn from_page_size(page_width: f32, page_height: f32, scale: f32) -> Self {
        Self {
            width: page_width.abs() * scale,
            height: page_height.abs() * scale,
            scale,
        }
    }

    /// Surface size needed to hold the viewport, rounded up to whole pixels
    #[must_use]
    pub fn pixel_size(&self) -> (u32, u32) {
        (ceil_px(self.width), ceil_px(self.height))
    }
}

fn ceil_px(value: f32) -> u32 {
    let value = f64::from(value).ceil();
    if value <= 0.0 {
        0
    } else if value >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        value as u32
    }
}

/// Document metadata, reported once the document resolves
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub title: Option<String>,
}

/// Raw rendered page image.
///
/// RGBA pixels, 4 bytes per pixel, rows packed without padding.
#[derive(Clone)]
pub struct PageImage {
    pub pixels: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
}

impl std::fmt::Debug for PageImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageImage")
            .field("width_px", &self.width_px)
            .field("height_px", &self.height_px)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}
