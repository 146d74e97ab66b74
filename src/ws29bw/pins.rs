//! Wiring of the Waveshare 2.9" HAT on a Raspberry Pi header, BCM numbering

/// GPIO line offsets on the Pi's gpiochip
pub struct Pins;

impl Pins {
    /// Reset, active low
    pub const RST: u32 = 17;
    /// Data/Command control pin (High for data, Low for command)
    pub const DC: u32 = 25;
    /// Chip select, driven by the spidev driver as CE0
    pub const CS: u32 = 8;
    /// Busy status pin (High when display is busy)
    pub const BUSY: u32 = 24;
}

/// Character device the lines above belong to
pub const GPIO_CHIP: &str = "/dev/gpiochip0";
