//! Waveshare 2.9" black and white e-paper module
//!
//! 128x296 panel on an SPI bus with three extra GPIO lines (RST, DC, BUSY).
//! The driver is generic over `embedded-hal` 1.0 traits, so it runs on top
//! of `linux-embedded-hal` on a Raspberry Pi and on top of mocks in tests.
//!
//! ### Usage
//! 1. compose a page into a [`PackedBitmap`](crate::bitmap::PackedBitmap)
//! 1. [`Epd::power_on`](crate::epd::Epd::power_on)
//! 1. [`Epd::display`](crate::epd::Epd::display) the page
//! 1. [`Epd::sleep`](crate::epd::Epd::sleep) until the next page

mod cmd;
pub mod driver;
mod flag;
pub mod interface;
pub mod pins;

pub use driver::Ws29bw;

/// Display height, pixels vertically
pub const HEIGHT: u16 = 296;

/// Display width, pixels horizontally
pub const WIDTH: u16 = 128;
