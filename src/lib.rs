//! Text to e-paper renderer
//!
//! Decodes UTF-8 text, rasterizes each codepoint once through a glyph
//! cache, composes the glyphs onto a page-sized packed bitmap, and sends
//! the page to a Waveshare 2.9" black and white panel, or to a PBM file
//! when no panel is attached.
//!
//! ### Usage
//! 1. build a [`RenderEngine`] from a [`FontRenderer`]
//! 1. [`compose`] decoded text onto a [`Page`]
//! 1. [`Epd::power_on`] a device, [`Epd::display`] the page's bitmap, then
//!    [`Epd::sleep`]
#![deny(missing_docs)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod bitmap;
pub mod emulated;
pub mod epd;
pub mod error;
pub mod glyph;
pub mod page;
#[cfg(target_os = "linux")]
pub mod transport;
pub mod utf8;
pub mod ws29bw;

pub use crate::bitmap::{BitmapView, PackedBitmap, PixelMode, Polarity};
pub use crate::emulated::EmulatedDisplay;
pub use crate::epd::{DeviceConfig, DeviceState, Epd};
pub use crate::error::{DisplayError, Error, ErrorKind, Result};
pub use crate::glyph::{
    FontRenderer, Glyph, GlyphCache, GlyphRenderer, LineMetrics, RenderEngine, RenderError,
};
pub use crate::page::{compose, Composed, Page};
pub use crate::utf8::{Decoded, Utf8Decoder};
pub use crate::ws29bw::Ws29bw;
