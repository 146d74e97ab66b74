//! Device abstraction shared by the panel driver and the emulated backend

use crate::bitmap::{pitch_for, PackedBitmap, Polarity};
use crate::error::Result;
use crate::ws29bw::{HEIGHT, WIDTH};

/// Lifecycle of a display device
///
/// ```text
/// Unpowered -> Initializing -> Ready -> Transmitting -> Ready -> Sleeping
/// ```
///
/// A sleeping device has to go through [`Epd::power_on`] again. Any failure
/// during power on or transmission drops the device back to `Unpowered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// Nothing set up, or a previous sequence failed
    Unpowered,
    /// Reset and register setup in progress
    Initializing,
    /// Accepting frames
    Ready,
    /// Frame upload and refresh in progress
    Transmitting,
    /// Deep sleep, needs a fresh power on
    Sleeping,
}

/// Connection and timing parameters of a panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Width in pixels
    pub width: u16,
    /// Height in pixels
    pub height: u16,
    /// SPI channel, i.e. the chip select index
    pub spi_channel: u8,
    /// SPI clock
    pub clock_hz: u32,
    /// Hold time of every step of the reset pulse
    pub reset_delay_ms: u32,
    /// Sleep between polls of the BUSY pin
    pub busy_delay_ms: u32,
    /// Polls before giving up on the BUSY pin
    pub busy_max_polls: u32,
}

impl Default for DeviceConfig {
    /// Waveshare 2.9" black and white module
    fn default() -> Self {
        DeviceConfig {
            width: WIDTH,
            height: HEIGHT,
            spi_channel: 0,
            clock_hz: 32_000_000,
            reset_delay_ms: 200,
            busy_delay_ms: 300,
            busy_max_polls: 100,
        }
    }
}

impl DeviceConfig {
    /// Bytes per row of a full frame
    pub fn pitch(&self) -> usize {
        pitch_for(self.width)
    }

    /// Bytes in a full frame
    pub fn frame_len(&self) -> usize {
        self.pitch() * usize::from(self.height)
    }
}

/// A display that can show full frames
pub trait Epd {
    /// Width in pixels
    fn width(&self) -> u16;

    /// Height in pixels
    fn height(&self) -> u16;

    /// How the device stores ink; frames of the other polarity are inverted
    /// on the way out
    fn polarity(&self) -> Polarity;

    /// Current lifecycle state
    fn state(&self) -> DeviceState;

    /// Bring the device from any state to [`DeviceState::Ready`]
    fn power_on(&mut self) -> Result<()>;

    /// Hardware reset only
    fn reset(&mut self) -> Result<()>;

    /// Transmit a whole frame and refresh the panel
    ///
    /// The frame must be exactly `pitch * height` bytes for this device.
    /// Nothing is transmitted when it is not.
    fn display(&mut self, frame: &PackedBitmap) -> Result<()>;

    /// Enter deep sleep once the device is idle
    fn sleep(&mut self) -> Result<()>;

    /// A white frame that fits this device
    fn blank_frame(&self) -> Result<PackedBitmap> {
        PackedBitmap::new(self.width(), self.height())
    }
}
