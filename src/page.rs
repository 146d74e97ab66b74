//! Page composition
//!
//! Glyphs are placed left to right along a baseline. A newline, or a glyph
//! that would cross the right edge, moves the pen to the start of the next
//! line. There is no word breaking or shaping. Composition stops at the
//! first glyph that no longer fits below the last line.

use crate::bitmap::PackedBitmap;
use crate::error::Result;
use crate::glyph::{Glyph, GlyphRenderer, LineMetrics, RenderEngine, RenderError, MISSING_GLYPH};

/// Outcome of placing one glyph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Drawn, pen advanced
    Placed,
    /// Wider than the page, pen advanced without drawing
    Skipped,
    /// No vertical room left, nothing changed
    Full,
}

/// Summary of one [`compose`] run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Composed {
    /// Characters taken from the input and laid out, whitespace included
    pub consumed: usize,
    /// Characters dropped because no glyph could be drawn for them
    pub skipped: usize,
    /// Whether composition stopped because the page ran out of lines
    pub page_full: bool,
}

/// Page framebuffer plus the pen
#[derive(Debug)]
pub struct Page {
    bitmap: PackedBitmap,
    line: LineMetrics,
    pen_x: i32,
    baseline: i32,
}

impl Page {
    /// White page, pen on the first baseline
    pub fn new(width: u16, height: u16, line: LineMetrics) -> Result<Self> {
        Ok(Page {
            bitmap: PackedBitmap::new(width, height)?,
            line,
            pen_x: 0,
            baseline: line.ascent,
        })
    }

    /// The framebuffer composed so far
    pub fn bitmap(&self) -> &PackedBitmap {
        &self.bitmap
    }

    /// Take the framebuffer, e.g. to hand it to a display
    pub fn into_bitmap(self) -> PackedBitmap {
        self.bitmap
    }

    /// Pen position as (x, baseline)
    pub fn pen(&self) -> (i32, i32) {
        (self.pen_x, self.baseline)
    }

    /// Move the pen to the start of the next line
    pub fn newline(&mut self) {
        self.pen_x = 0;
        self.baseline += self.line.line_height;
    }

    /// Draw `glyph` at the pen and advance it
    pub fn place(&mut self, glyph: &Glyph) -> Result<Placement> {
        let Some(raster) = &glyph.bitmap else {
            self.pen_x += glyph.advance;
            return Ok(Placement::Placed);
        };
        let page_w = i32::from(self.bitmap.width());
        let page_h = i32::from(self.bitmap.height());
        let w = i32::from(raster.width());
        let h = i32::from(raster.height());

        if self.pen_x > 0 && self.pen_x + glyph.bearing + w > page_w {
            self.newline();
        }

        // Bearings and tall glyphs may reach past the top left corner
        let x = (self.pen_x + glyph.bearing).max(0);
        let y = (self.baseline - glyph.baseline).max(0);

        if y + h > page_h {
            return Ok(Placement::Full);
        }
        if x + w > page_w {
            log::warn!("Glyph of width {w} does not fit a {page_w}px line");
            self.pen_x += glyph.advance;
            return Ok(Placement::Skipped);
        }

        // Both non-negative and inside the page
        self.bitmap.blit(&raster.view(), x as u16, y as u16)?;
        self.pen_x += glyph.advance;
        Ok(Placement::Placed)
    }
}

/// Lay `text` out on `page`, rendering glyphs through `engine`
///
/// Codepoints the font lacks are drawn as U+25A1 instead, or skipped with a
/// warning when the font lacks that too.
pub fn compose<R, I>(
    engine: &mut RenderEngine<R>,
    page: &mut Page,
    text: I,
) -> core::result::Result<Composed, RenderError>
where
    R: GlyphRenderer,
    I: IntoIterator<Item = char>,
{
    let mut out = Composed::default();

    for c in text {
        match c {
            '\n' => {
                page.newline();
                out.consumed += 1;
                continue;
            }
            '\r' => {
                out.consumed += 1;
                continue;
            }
            _ => {}
        }

        let glyph = match engine.glyph(c) {
            Ok(glyph) => glyph,
            Err(RenderError::NotFound(missing)) => {
                log::warn!("No glyph for {missing:?}, substituting U+25A1");
                match engine.glyph(MISSING_GLYPH) {
                    Ok(glyph) => glyph,
                    Err(RenderError::NotFound(_)) => {
                        log::warn!("Font has no U+25A1 either, skipping {missing:?}");
                        out.consumed += 1;
                        out.skipped += 1;
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(e) => return Err(e),
        };

        match page.place(glyph)? {
            Placement::Placed => out.consumed += 1,
            Placement::Skipped => {
                out.consumed += 1;
                out.skipped += 1;
            }
            Placement::Full => {
                out.page_full = true;
                break;
            }
        }
    }

    log::debug!("Composed page: {out:?}");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::PixelMode;

    const METRICS: LineMetrics = LineMetrics {
        ascent: 4,
        line_height: 5,
    };

    fn block(w: u16, h: u16) -> Glyph {
        let mut bitmap = PackedBitmap::new(w, h).unwrap();
        for y in 0..h {
            for x in 0..w {
                bitmap.set_pixel(x, y, PixelMode::Black).unwrap();
            }
        }
        Glyph {
            bitmap: Some(bitmap),
            advance: 5,
            baseline: i32::from(h),
            bearing: 0,
        }
    }

    /// Lowercase letters are 4x4 blocks, the missing glyph a 2x2 block
    struct Blocks;

    impl GlyphRenderer for Blocks {
        fn render(&mut self, c: char) -> core::result::Result<Glyph, RenderError> {
            match c {
                ' ' => Ok(Glyph::blank(5)),
                MISSING_GLYPH => Ok(block(2, 2)),
                c if c.is_ascii_lowercase() => Ok(block(4, 4)),
                other => Err(RenderError::NotFound(other)),
            }
        }

        fn line_metrics(&self) -> LineMetrics {
            METRICS
        }
    }

    struct Empty;

    impl GlyphRenderer for Empty {
        fn render(&mut self, c: char) -> core::result::Result<Glyph, RenderError> {
            Err(RenderError::NotFound(c))
        }

        fn line_metrics(&self) -> LineMetrics {
            METRICS
        }
    }

    fn run<R: GlyphRenderer>(renderer: R, text: &str) -> (Page, Composed) {
        let mut engine = RenderEngine::new(renderer, "blocks", 4);
        let mut page = Page::new(16, 10, engine.line_metrics()).unwrap();
        let composed = compose(&mut engine, &mut page, text.chars()).unwrap();
        (page, composed)
    }

    fn ink(page: &Page, x: u16, y: u16) -> bool {
        page.bitmap().pixel(x, y).unwrap()
    }

    #[test]
    fn glyphs_advance_along_the_baseline() {
        let (page, composed) = run(Blocks, "ab");
        assert_eq!(composed.consumed, 2);
        assert!(ink(&page, 0, 0) && ink(&page, 3, 3));
        assert!(!ink(&page, 4, 0));
        assert!(ink(&page, 5, 0) && ink(&page, 8, 3));
        assert_eq!(page.pen(), (10, 4));
    }

    #[test]
    fn spaces_only_move_the_pen() {
        let (page, _) = run(Blocks, "a b");
        assert!(!ink(&page, 5, 0));
        assert!(ink(&page, 10, 0));
    }

    #[test]
    fn right_edge_wraps_to_next_line() {
        let (page, composed) = run(Blocks, "abcd");
        assert_eq!(composed.consumed, 4);
        assert!(!composed.page_full);
        assert!(ink(&page, 10, 0));
        assert!(ink(&page, 0, 5) && ink(&page, 3, 8));
        assert_eq!(page.pen(), (5, 9));
    }

    #[test]
    fn newline_starts_a_new_line() {
        let (page, composed) = run(Blocks, "a\nb");
        assert_eq!(composed.consumed, 3);
        assert!(ink(&page, 0, 5));
        assert!(!ink(&page, 5, 0));
    }

    #[test]
    fn stops_when_the_page_is_full() {
        let (page, composed) = run(Blocks, "abcdefg");
        assert_eq!(composed.consumed, 6);
        assert!(composed.page_full);
        assert!(ink(&page, 10, 5));
    }

    #[test]
    fn missing_glyphs_become_white_squares() {
        let mut engine = RenderEngine::new(Blocks, "blocks", 4);
        let mut page = Page::new(16, 10, METRICS).unwrap();
        let composed = compose(&mut engine, &mut page, "!".chars()).unwrap();
        assert_eq!(composed.consumed, 1);
        assert_eq!(composed.skipped, 0);
        // 2x2 square sitting on the baseline
        assert!(!ink(&page, 0, 0));
        assert!(ink(&page, 0, 2) && ink(&page, 1, 3));
        assert!(engine.cache().lookup(MISSING_GLYPH).is_some());
    }

    #[test]
    fn characters_without_any_glyph_are_skipped() {
        let (page, composed) = run(Empty, "xy");
        assert_eq!(composed.consumed, 2);
        assert_eq!(composed.skipped, 2);
        assert!(page.bitmap().as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn glyph_wider_than_page_is_skipped() {
        let mut page = Page::new(3, 10, METRICS).unwrap();
        assert_eq!(page.place(&block(4, 4)).unwrap(), Placement::Skipped);
        assert_eq!(page.pen(), (5, 4));
    }
}
