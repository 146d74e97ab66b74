//! Bit packed monochrome raster
//!
//! The buffer follows the portable bitmap (PBM P4) raster layout:
//!
//! - each row holds `width` pixels packed eight to a byte, with don't care
//!   bits filling out the last byte when the width is not a multiple of 8
//! - the pitch is the number of bytes in one row, `ceil(width / 8)`
//! - pixels run left to right, stored most significant bit first
//! - rows run top to bottom
//!
//! So pixel `(x, y)` lives in byte `y * pitch + x / 8` at bit `7 - x % 8`.
//!
//! Which bit value means "ink" is not implied. Every bitmap carries a
//! [`Polarity`]; the shared in-memory format used by the page and the glyphs
//! is [`Polarity::InkHigh`] and device backends convert at transmission.
//!
//! Bitmaps are plain owned buffers without any locking. Mutating one bitmap
//! from several threads requires external synchronisation.

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;

use crate::error::{Error, Result};

/// Logical value of an inked (black) pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Polarity {
    /// 1 is black, 0 is white. PBM and in-memory page convention.
    #[default]
    InkHigh,
    /// 0 is black, 1 is white. Waveshare controller RAM convention.
    InkLow,
}

impl Polarity {
    /// Byte with all eight pixels white
    pub const fn paper_byte(self) -> u8 {
        match self {
            Polarity::InkHigh => 0x00,
            Polarity::InkLow => 0xFF,
        }
    }

    /// Byte with all eight pixels black
    pub const fn ink_byte(self) -> u8 {
        !self.paper_byte()
    }

    /// The opposite convention
    pub const fn inverse(self) -> Self {
        match self {
            Polarity::InkHigh => Polarity::InkLow,
            Polarity::InkLow => Polarity::InkHigh,
        }
    }
}

/// How [`PackedBitmap::set_pixel`] modifies the addressed pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelMode {
    /// Ink the pixel
    Black,
    /// Clear the pixel to paper
    White,
    /// Flip the pixel
    Toggle,
}

/// Bytes per row for a row of `width` pixels
pub const fn pitch_for(width: u16) -> usize {
    (width as usize).div_ceil(8)
}

/// Single bit mask selecting pixel `x` within its byte
const fn bitmask(x: u16) -> u8 {
    0x80 >> (x % 8)
}

/// Mask of the leading `span` bits of a byte, `span` in 1..=8
const fn leading_bits(span: u32) -> u8 {
    0xFF << (8 - span)
}

/// Owned, fixed size 1 bit per pixel raster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedBitmap {
    width: u16,
    height: u16,
    pitch: usize,
    polarity: Polarity,
    buffer: Vec<u8>,
}

impl PackedBitmap {
    /// Create a white bitmap in the shared [`Polarity::InkHigh`] format
    pub fn new(width: u16, height: u16) -> Result<Self> {
        Self::with_polarity(width, height, Polarity::InkHigh)
    }

    /// Create a white bitmap with an explicit polarity
    pub fn with_polarity(width: u16, height: u16, polarity: Polarity) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions { width, height });
        }

        // When the pixel count is not a multiple of 8 the last byte of each
        // row is only partially used.
        let pitch = pitch_for(width);
        let length = pitch * usize::from(height);

        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(length)
            .map_err(|_| Error::Memory { bytes: length })?;
        buffer.resize(length, polarity.paper_byte());

        Ok(PackedBitmap {
            width,
            height,
            pitch,
            polarity,
            buffer,
        })
    }

    /// Wrap an existing raster, which must be exactly `pitch * height` bytes
    pub fn from_bytes(
        width: u16,
        height: u16,
        polarity: Polarity,
        buffer: Vec<u8>,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions { width, height });
        }
        let pitch = pitch_for(width);
        let expected = pitch * usize::from(height);
        if buffer.len() != expected {
            return Err(Error::InvalidLength {
                expected,
                actual: buffer.len(),
            });
        }
        Ok(PackedBitmap {
            width,
            height,
            pitch,
            polarity,
            buffer,
        })
    }

    /// Width in pixels
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Height in pixels (also `length / pitch`)
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Bytes per row
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    /// Total buffer length in bytes
    pub fn byte_len(&self) -> usize {
        self.buffer.len()
    }

    /// Polarity of the stored bits
    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Raw raster bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Bytes of row `y`, or `None` past the last row
    pub fn row(&self, y: u16) -> Option<&[u8]> {
        let start = usize::from(y) * self.pitch;
        self.buffer.get(start..start + self.pitch)
    }

    /// Borrow as a read only view, e.g. as a blit source
    pub fn view(&self) -> BitmapView<'_> {
        BitmapView {
            width: self.width,
            height: self.height,
            pitch: self.pitch,
            polarity: self.polarity,
            bytes: &self.buffer,
        }
    }

    /// Re-encode the raster in another polarity
    pub fn into_polarity(mut self, polarity: Polarity) -> Self {
        if polarity != self.polarity {
            self.buffer.iter_mut().for_each(|b| *b = !*b);
            self.polarity = polarity;
        }
        self
    }

    /// Set every pixel to white for this bitmap's polarity
    pub fn clear(&mut self) {
        self.buffer.fill(self.polarity.paper_byte());
    }

    fn check_point(&self, x: u16, y: u16) -> Result<()> {
        if x >= self.width || y >= self.height {
            return Err(Error::OutOfRange {
                x,
                y,
                extent_w: 1,
                extent_h: 1,
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    /// Modify the pixel at `(x, y)`
    pub fn set_pixel(&mut self, x: u16, y: u16, mode: PixelMode) -> Result<()> {
        self.check_point(x, y)?;

        let index = usize::from(y) * self.pitch + usize::from(x / 8);
        let mask = bitmask(x);
        let byte = &mut self.buffer[index];

        let ink = match mode {
            PixelMode::Toggle => {
                *byte ^= mask;
                return Ok(());
            }
            PixelMode::Black => true,
            PixelMode::White => false,
        };

        // Black sets the bit only when ink is represented by 1
        if ink == (self.polarity == Polarity::InkHigh) {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
        Ok(())
    }

    /// Whether the pixel at `(x, y)` is inked
    pub fn pixel(&self, x: u16, y: u16) -> Result<bool> {
        self.view().pixel(x, y)
    }

    /// Copy all of `src` so that its top left corner lands on `(x, y)`
    ///
    /// `x` does not need to be byte aligned: each source byte is split
    /// across two destination bytes. Destination pixels outside the source
    /// rectangle are preserved, including those sharing a byte with it, and
    /// the source's row padding bits are never copied. A source of the
    /// other polarity is inverted on the way in.
    pub fn blit(&mut self, src: &BitmapView<'_>, x: u16, y: u16) -> Result<()> {
        let fits_x = u32::from(x) + u32::from(src.width) <= u32::from(self.width);
        let fits_y = u32::from(y) + u32::from(src.height) <= u32::from(self.height);
        if !(fits_x && fits_y) {
            return Err(Error::OutOfRange {
                x,
                y,
                extent_w: src.width,
                extent_h: src.height,
                width: self.width,
                height: self.height,
            });
        }

        let invert = src.polarity != self.polarity;
        let shift = u32::from(x % 8);
        let first = usize::from(x / 8);

        for (row, src_row) in src.bytes.chunks_exact(src.pitch).enumerate() {
            // The cursor moves by the destination pitch, keeping the x offset
            let start = (usize::from(y) + row) * self.pitch + first;

            if shift == 0 && !invert && src.width % 8 == 0 {
                self.buffer[start..start + src.pitch].copy_from_slice(src_row);
                continue;
            }

            let mut remaining = u32::from(src.width);
            for (i, &raw) in src_row.iter().enumerate() {
                let span = remaining.min(8);
                remaining -= span;

                let mask = leading_bits(span);
                let byte = if invert { !raw } else { raw } & mask;
                let out = start + i;

                // High bits of the source byte land in the current byte
                let hi_mask = mask >> shift;
                self.buffer[out] = (self.buffer[out] & !hi_mask) | (byte >> shift);

                // Low bits spill over into the next one
                if shift > 0 {
                    let lo_mask = mask << (8 - shift);
                    if lo_mask != 0 {
                        let next = out + 1;
                        self.buffer[next] =
                            (self.buffer[next] & !lo_mask) | (byte << (8 - shift));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Borrowed raster over memory owned by someone else
///
/// Has the same layout as [`PackedBitmap`] but never owns or mutates its
/// bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitmapView<'a> {
    width: u16,
    height: u16,
    pitch: usize,
    polarity: Polarity,
    bytes: &'a [u8],
}

impl<'a> BitmapView<'a> {
    /// View `bytes` as a `width` x `height` raster
    pub fn new(width: u16, height: u16, polarity: Polarity, bytes: &'a [u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::Uninitialized("bitmap buffer"));
        }
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions { width, height });
        }
        let pitch = pitch_for(width);
        let expected = pitch * usize::from(height);
        if bytes.len() != expected {
            return Err(Error::InvalidLength {
                expected,
                actual: bytes.len(),
            });
        }
        Ok(BitmapView {
            width,
            height,
            pitch,
            polarity,
            bytes,
        })
    }

    /// Width in pixels
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Bytes per row
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    /// Polarity of the viewed bits
    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Raw raster bytes
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Whether the pixel at `(x, y)` is inked
    pub fn pixel(&self, x: u16, y: u16) -> Result<bool> {
        if x >= self.width || y >= self.height {
            return Err(Error::OutOfRange {
                x,
                y,
                extent_w: 1,
                extent_h: 1,
                width: self.width,
                height: self.height,
            });
        }
        let byte = self.bytes[usize::from(y) * self.pitch + usize::from(x / 8)];
        let set = byte & bitmask(x) != 0;
        Ok(set == (self.polarity == Polarity::InkHigh))
    }
}

impl OriginDimensions for PackedBitmap {
    fn size(&self) -> Size {
        Size::new(u32::from(self.width), u32::from(self.height))
    }
}

/// `BinaryColor::On` is ink, whatever the bitmap's polarity
impl DrawTarget for PackedBitmap {
    type Color = BinaryColor;
    type Error = Error;

    fn draw_iter<I>(&mut self, pixels: I) -> core::result::Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            // Pixels outside the bitmap are clipped
            let (Ok(x), Ok(y)) = (u16::try_from(point.x), u16::try_from(point.y)) else {
                continue;
            };
            if x >= self.width || y >= self.height {
                continue;
            }
            let mode = match color {
                BinaryColor::On => PixelMode::Black,
                BinaryColor::Off => PixelMode::White,
            };
            self.set_pixel(x, y, mode)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};

    /// Read the raw bit for (x, y) straight from the documented layout
    fn raw_bit(bmp: &PackedBitmap, x: u16, y: u16) -> bool {
        let byte = bmp.as_bytes()[usize::from(y) * bmp.pitch() + usize::from(x) / 8];
        (byte >> (7 - x % 8)) & 1 == 1
    }

    #[test]
    fn pitch_and_length_follow_width() {
        for width in [1u16, 7, 8, 9, 15, 16, 17, 128, 250] {
            for height in [1u16, 2, 13, 296] {
                let bmp = PackedBitmap::new(width, height).unwrap();
                let pitch = usize::from(width).div_ceil(8);
                assert_eq!(bmp.pitch(), pitch);
                assert_eq!(bmp.byte_len(), pitch * usize::from(height));
                assert_eq!(bmp.byte_len() % bmp.pitch(), 0);
                assert_eq!(bmp.height(), height);
            }
        }
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        for n in [1u16, 8, 300] {
            let err = PackedBitmap::new(0, n).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Input);
            let err = PackedBitmap::new(n, 0).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Input);
        }
    }

    #[test]
    fn new_bitmap_is_white_in_both_polarities() {
        let high = PackedBitmap::new(12, 3).unwrap();
        assert!(high.as_bytes().iter().all(|&b| b == 0x00));
        let low = PackedBitmap::with_polarity(12, 3, Polarity::InkLow).unwrap();
        assert!(low.as_bytes().iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn black_sets_the_addressed_bit() {
        let mut bmp = PackedBitmap::new(20, 4).unwrap();
        bmp.set_pixel(11, 2, PixelMode::Black).unwrap();
        assert!(raw_bit(&bmp, 11, 2));
        assert_eq!(bmp.as_bytes()[2 * 3 + 1], 0b0001_0000);
        assert!(bmp.pixel(11, 2).unwrap());
        assert!(!bmp.pixel(10, 2).unwrap());

        bmp.set_pixel(11, 2, PixelMode::White).unwrap();
        assert!(!raw_bit(&bmp, 11, 2));
    }

    #[test]
    fn ink_low_bitmaps_clear_bits_for_black() {
        let mut bmp = PackedBitmap::with_polarity(8, 1, Polarity::InkLow).unwrap();
        bmp.set_pixel(0, 0, PixelMode::Black).unwrap();
        assert_eq!(bmp.as_bytes(), &[0x7F]);
        assert!(bmp.pixel(0, 0).unwrap());
        bmp.set_pixel(0, 0, PixelMode::White).unwrap();
        assert_eq!(bmp.as_bytes(), &[0xFF]);
    }

    #[test]
    fn toggle_twice_is_identity() {
        let mut bmp = PackedBitmap::new(9, 9).unwrap();
        bmp.set_pixel(8, 8, PixelMode::Black).unwrap();
        let before = bmp.clone();
        for (x, y) in [(0, 0), (8, 8), (3, 5)] {
            bmp.set_pixel(x, y, PixelMode::Toggle).unwrap();
            bmp.set_pixel(x, y, PixelMode::Toggle).unwrap();
        }
        assert_eq!(bmp, before);
    }

    #[test]
    fn white_black_toggle_leaves_pixel_white() {
        let mut bmp = PackedBitmap::new(4, 4).unwrap();
        bmp.set_pixel(1, 1, PixelMode::White).unwrap();
        bmp.set_pixel(1, 1, PixelMode::Black).unwrap();
        bmp.set_pixel(1, 1, PixelMode::Toggle).unwrap();
        assert!(!bmp.pixel(1, 1).unwrap());
    }

    #[test]
    fn out_of_range_pixels_fail() {
        let mut bmp = PackedBitmap::new(10, 5).unwrap();
        assert!(matches!(
            bmp.set_pixel(10, 0, PixelMode::Black),
            Err(Error::OutOfRange { .. })
        ));
        assert!(matches!(
            bmp.set_pixel(0, 5, PixelMode::Toggle),
            Err(Error::OutOfRange { .. })
        ));
        // padding bits inside the last byte are not addressable either
        assert!(bmp.set_pixel(15, 0, PixelMode::Black).is_err());
    }

    #[test]
    fn clear_resets_to_paper() {
        let mut bmp = PackedBitmap::new(16, 2).unwrap();
        bmp.set_pixel(3, 1, PixelMode::Black).unwrap();
        bmp.clear();
        assert!(bmp.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn aligned_blit_copies_bytes_and_preserves_the_rest() {
        let mut dest = PackedBitmap::from_bytes(32, 4, Polarity::InkHigh, vec![0x5A; 16]).unwrap();
        let src = PackedBitmap::from_bytes(16, 2, Polarity::InkHigh, vec![0xAB, 0xCD, 0x12, 0x34])
            .unwrap();
        dest.blit(&src.view(), 8, 1).unwrap();

        assert_eq!(dest.row(0).unwrap(), &[0x5A, 0x5A, 0x5A, 0x5A]);
        assert_eq!(dest.row(1).unwrap(), &[0x5A, 0xAB, 0xCD, 0x5A]);
        assert_eq!(dest.row(2).unwrap(), &[0x5A, 0x12, 0x34, 0x5A]);
        assert_eq!(dest.row(3).unwrap(), &[0x5A, 0x5A, 0x5A, 0x5A]);
    }

    #[test]
    fn misaligned_blit_spans_three_bytes() {
        let mut dest = PackedBitmap::new(24, 1).unwrap();
        let src = PackedBitmap::from_bytes(16, 1, Polarity::InkHigh, vec![0xFF, 0x00]).unwrap();
        dest.blit(&src.view(), 3, 0).unwrap();
        assert_eq!(dest.as_bytes(), &[0x1F, 0xE0, 0x00]);
    }

    #[test]
    fn misaligned_blit_preserves_neighbouring_bits() {
        let mut dest = PackedBitmap::from_bytes(24, 1, Polarity::InkHigh, vec![0xFF; 3]).unwrap();
        let src = PackedBitmap::new(16, 1).unwrap();
        dest.blit(&src.view(), 3, 0).unwrap();
        // pixels 3..19 cleared, everything else untouched
        assert_eq!(dest.as_bytes(), &[0xE0, 0x00, 0x1F]);
    }

    #[test]
    fn blit_ignores_source_padding_bits() {
        let mut dest = PackedBitmap::new(16, 1).unwrap();
        // 5 pixel wide source whose don't care bits are set
        let src = BitmapView::new(5, 1, Polarity::InkHigh, &[0xFF]).unwrap();
        dest.blit(&src, 6, 0).unwrap();
        assert_eq!(dest.as_bytes(), &[0x03, 0xE0]);
    }

    #[test]
    fn multi_row_misaligned_blit_advances_by_dest_pitch() {
        let mut dest = PackedBitmap::new(24, 3).unwrap();
        let src = PackedBitmap::from_bytes(8, 2, Polarity::InkHigh, vec![0xF0, 0x0F]).unwrap();
        dest.blit(&src.view(), 4, 1).unwrap();
        assert_eq!(dest.row(0).unwrap(), &[0x00, 0x00, 0x00]);
        assert_eq!(dest.row(1).unwrap(), &[0x0F, 0x00, 0x00]);
        assert_eq!(dest.row(2).unwrap(), &[0x00, 0xF0, 0x00]);
    }

    #[test]
    fn blit_must_fit() {
        let mut dest = PackedBitmap::new(16, 4).unwrap();
        let src = PackedBitmap::new(8, 2).unwrap();
        assert!(dest.blit(&src.view(), 8, 2).is_ok());
        let err = dest.blit(&src.view(), 9, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
        let err = dest.blit(&src.view(), 0, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn blit_converts_polarity() {
        let mut dest = PackedBitmap::new(16, 1).unwrap();
        // black in the left half, as the controller RAM would hold it
        let src = BitmapView::new(8, 1, Polarity::InkLow, &[0x0F]).unwrap();
        dest.blit(&src, 4, 0).unwrap();
        assert_eq!(dest.as_bytes(), &[0x0F, 0x00]);
    }

    #[test]
    fn view_rejects_bad_buffers() {
        assert!(matches!(
            BitmapView::new(8, 1, Polarity::InkHigh, &[]),
            Err(Error::Uninitialized(_))
        ));
        assert!(matches!(
            BitmapView::new(9, 1, Polarity::InkHigh, &[0]),
            Err(Error::InvalidLength {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn into_polarity_inverts_once() {
        let mut bmp = PackedBitmap::new(8, 1).unwrap();
        bmp.set_pixel(7, 0, PixelMode::Black).unwrap();
        let low = bmp.into_polarity(Polarity::InkLow);
        assert_eq!(low.as_bytes(), &[0xFE]);
        assert!(low.pixel(7, 0).unwrap());
        let same = low.into_polarity(Polarity::InkLow);
        assert_eq!(same.as_bytes(), &[0xFE]);
    }

    #[test]
    fn embedded_graphics_draws_ink() {
        let mut bmp = PackedBitmap::new(8, 4).unwrap();
        Rectangle::new(Point::new(2, 1), Size::new(4, 2))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(&mut bmp)
            .unwrap();
        assert_eq!(bmp.as_bytes(), &[0x00, 0x3C, 0x3C, 0x00]);

        // partly off-canvas shapes are clipped
        Rectangle::new(Point::new(-2, 3), Size::new(4, 4))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(&mut bmp)
            .unwrap();
        assert_eq!(bmp.row(3).unwrap(), &[0xC0]);
    }

    #[test]
    fn pixels_past_the_edges_are_clipped_without_error() {
        let mut bmp = PackedBitmap::new(8, 4).unwrap();
        let pixels = [
            Pixel(Point::new(8, 0), BinaryColor::On),
            Pixel(Point::new(0, 4), BinaryColor::On),
            Pixel(Point::new(-1, 0), BinaryColor::On),
            Pixel(Point::new(7, 3), BinaryColor::On),
        ];
        bmp.draw_iter(pixels).unwrap();
        assert_eq!(bmp.as_bytes(), &[0x00, 0x00, 0x00, 0x01]);
    }
}
