//! Glyph rasterization
//!
//! [`GlyphRenderer`] is the seam between the page composer and whatever
//! turns a codepoint into pixels. [`FontRenderer`] implements it on top of
//! `fontdue`, thresholding anti-aliased coverage down to one bit.

use std::path::Path;

use fontdue::{Font, FontSettings};

use super::{Glyph, GlyphCache};
use crate::bitmap::{PackedBitmap, PixelMode};

/// Coverage at or above this value becomes ink
pub const INK_THRESHOLD: u8 = 128;

/// Failures while producing a glyph
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The font has no glyph for the codepoint
    #[error("font has no glyph for {0:?}")]
    NotFound(char),

    /// The rasterizer returned something that cannot be a monochrome glyph
    #[error("invalid raster for {codepoint:?}: {width}x{height} with {bytes} coverage bytes")]
    InvalidRaster {
        /// Codepoint being rendered
        codepoint: char,
        /// Reported width
        width: usize,
        /// Reported height
        height: usize,
        /// Coverage bytes actually returned
        bytes: usize,
    },

    /// The font could not be loaded
    #[error("font error: {0}")]
    Font(String),

    /// Allocating the glyph bitmap failed
    #[error(transparent)]
    Bitmap(#[from] crate::Error),
}

/// Vertical metrics shared by every glyph of a font at one size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineMetrics {
    /// Distance from the top of a line to its baseline
    pub ascent: i32,
    /// Distance between consecutive baselines
    pub line_height: i32,
}

/// Something that turns codepoints into 1 = ink glyphs
pub trait GlyphRenderer {
    /// Rasterize one codepoint
    fn render(&mut self, codepoint: char) -> Result<Glyph, RenderError>;

    /// Line spacing for laying glyphs out
    fn line_metrics(&self) -> LineMetrics;
}

/// `fontdue` backed renderer for TrueType and OpenType fonts
pub struct FontRenderer {
    font: Font,
    size: f32,
    metrics: LineMetrics,
}

impl FontRenderer {
    /// Parse font bytes, rendering at `size` pixels
    pub fn from_bytes(bytes: &[u8], size: u32) -> Result<Self, RenderError> {
        let px = size as f32;
        let settings = FontSettings {
            scale: px,
            ..FontSettings::default()
        };
        let font = Font::from_bytes(bytes, settings).map_err(|e| RenderError::Font(e.to_string()))?;

        let metrics = match font.horizontal_line_metrics(px) {
            Some(m) => LineMetrics {
                ascent: m.ascent.ceil() as i32,
                line_height: m.new_line_size.ceil() as i32,
            },
            // Fonts without horizontal metrics get the conventional 1.2 spacing
            None => LineMetrics {
                ascent: size as i32,
                line_height: (px * 1.2).ceil() as i32,
            },
        };
        log::debug!("Loaded font at {size}px: {metrics:?}");

        Ok(FontRenderer {
            font,
            size: px,
            metrics,
        })
    }

    /// Load a font file from disk
    pub fn open(path: &Path, size: u32) -> Result<Self, RenderError> {
        let bytes = std::fs::read(path)
            .map_err(|e| RenderError::Font(format!("{}: {e}", path.display())))?;
        Self::from_bytes(&bytes, size)
    }
}

impl GlyphRenderer for FontRenderer {
    fn render(&mut self, codepoint: char) -> Result<Glyph, RenderError> {
        // Index 0 is .notdef
        if self.font.lookup_glyph_index(codepoint) == 0 {
            return Err(RenderError::NotFound(codepoint));
        }
        let (m, coverage) = self.font.rasterize(codepoint, self.size);
        let raster = Raster {
            width: m.width,
            height: m.height,
            xmin: m.xmin,
            ymin: m.ymin,
            advance: m.advance_width.round() as i32,
        };
        raster.into_glyph(codepoint, &coverage)
    }

    fn line_metrics(&self) -> LineMetrics {
        self.metrics
    }
}

/// Placement of an 8 bit coverage raster, as reported by the rasterizer
#[derive(Debug, Clone, Copy)]
struct Raster {
    width: usize,
    height: usize,
    /// Left edge relative to the pen
    xmin: i32,
    /// Bottom edge relative to the baseline, positive up
    ymin: i32,
    advance: i32,
}

impl Raster {
    /// Threshold row-major coverage into a glyph, validating the shape first
    fn into_glyph(self, codepoint: char, coverage: &[u8]) -> Result<Glyph, RenderError> {
        let invalid = || RenderError::InvalidRaster {
            codepoint,
            width: self.width,
            height: self.height,
            bytes: coverage.len(),
        };
        if self.width.checked_mul(self.height) != Some(coverage.len()) {
            return Err(invalid());
        }
        if self.width == 0 || self.height == 0 {
            return Ok(Glyph::blank(self.advance));
        }
        let width = u16::try_from(self.width).map_err(|_| invalid())?;
        let height = u16::try_from(self.height).map_err(|_| invalid())?;

        let mut bitmap = PackedBitmap::new(width, height)?;
        for (i, &value) in coverage.iter().enumerate() {
            if value >= INK_THRESHOLD {
                // Both fit in u16, checked above
                let x = (i % self.width) as u16;
                let y = (i / self.width) as u16;
                bitmap.set_pixel(x, y, PixelMode::Black)?;
            }
        }

        Ok(Glyph {
            bitmap: Some(bitmap),
            advance: self.advance,
            baseline: self.height as i32 + self.ymin,
            bearing: self.xmin,
        })
    }
}

/// Renderer plus the cache of everything it has rendered so far
pub struct RenderEngine<R> {
    renderer: R,
    cache: GlyphCache,
}

impl<R: GlyphRenderer> RenderEngine<R> {
    /// Bundle a renderer with a fresh cache for `font_id` at `size`
    pub fn new(renderer: R, font_id: impl Into<String>, size: u32) -> Self {
        RenderEngine {
            renderer,
            cache: GlyphCache::new(font_id, size),
        }
    }

    /// Cached glyph for `codepoint`, rendering it on first use
    pub fn glyph(&mut self, codepoint: char) -> Result<&Glyph, RenderError> {
        let renderer = &mut self.renderer;
        self.cache
            .get_or_try_insert_with(codepoint, |c| renderer.render(c))
    }

    /// Line spacing of the underlying renderer
    pub fn line_metrics(&self) -> LineMetrics {
        self.renderer.line_metrics()
    }

    /// The glyph cache
    pub fn cache(&self) -> &GlyphCache {
        &self.cache
    }
}
