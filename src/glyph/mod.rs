//! Glyphs and the lookup-or-render pipeline
//!
//! A [`Glyph`] is produced once per codepoint by a [`GlyphRenderer`], then
//! owned by the [`GlyphCache`] for the rest of the render session. Callers
//! only ever borrow glyphs back out of the cache.

pub mod cache;
pub mod render;

pub use cache::GlyphCache;
pub use render::{FontRenderer, GlyphRenderer, LineMetrics, RenderEngine, RenderError};

use crate::bitmap::PackedBitmap;

/// Missing glyph substitute, U+25A1 WHITE SQUARE
pub const MISSING_GLYPH: char = '\u{25A1}';

/// One rasterized codepoint at a fixed font and size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glyph {
    /// Monochrome raster, 1 = ink. `None` for glyphs without ink, e.g. space.
    pub bitmap: Option<PackedBitmap>,
    /// Horizontal distance to the next glyph's origin
    pub advance: i32,
    /// Distance from the top of the bitmap down to the baseline
    pub baseline: i32,
    /// Left side bearing, from the pen position to the bitmap's left edge
    pub bearing: i32,
}

impl Glyph {
    /// Glyph that only moves the pen
    pub fn blank(advance: i32) -> Self {
        Glyph {
            bitmap: None,
            advance,
            baseline: 0,
            bearing: 0,
        }
    }

    /// Raster width in pixels, 0 when there is no ink
    pub fn width(&self) -> u16 {
        self.bitmap.as_ref().map_or(0, PackedBitmap::width)
    }

    /// Raster height in pixels, 0 when there is no ink
    pub fn height(&self) -> u16 {
        self.bitmap.as_ref().map_or(0, PackedBitmap::height)
    }
}
