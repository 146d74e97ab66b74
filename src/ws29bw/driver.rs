//! Waveshare 2.9" Black/White Display Driver
//!
//! ## Sequences
//!
//! ### Power on
//! 1. hardware reset, three pulses of `reset_delay_ms`
//! 1. startup registers (driver output, booster, VCOM, dummy line, gate
//!    time, border, data entry mode)
//! 1. the 30 byte full update LUT
//! 1. RAM window covering the whole panel
//!
//! ### Display
//! Every row gets its own RAM cursor and `WRITE_RAM` command, followed by
//! the row bytes. The controller stores black as 0, the page buffer stores
//! it as 1, so rows are inverted on the way out. Then update control 2,
//! master activation, frame terminate, and a bounded busy wait.
//!
//! ### Sleep
//! Busy wait, then deep sleep mode 1. Only a full power on wakes it again.

use display_interface::DisplayError;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;

use crate::bitmap::{PackedBitmap, Polarity};
use crate::epd::{DeviceConfig, DeviceState, Epd};
use crate::error::{Error, Result};
use crate::ws29bw::interface::DisplayInterface;
use crate::ws29bw::{cmd::Cmd, flag::Flag};

/// RAM x addresses are one byte of 8 pixel columns each
pub const MAX_WIDTH: u16 = 256 * 8;

/// Waveshare 2.9" e-paper driver
///
/// ## Type Parameters
///
/// - `SPI` - SPI device for communication
/// - `BSY` - BUSY input pin (HIGH when display is busy)
/// - `DC` - Data/Command output pin
/// - `RST` - Reset output pin
/// - `DELAY` - Delay provider for timing
pub struct Ws29bw<SPI, BSY, DC, RST, DELAY> {
    /// The display interface
    interface: DisplayInterface<SPI, BSY, DC, RST, DELAY>,
    config: DeviceConfig,
    state: DeviceState,
}

impl<SPI, BSY, DC, RST, DELAY> Ws29bw<SPI, BSY, DC, RST, DELAY> {
    /// Take ownership of the handles. Nothing is sent until [`Epd::power_on`].
    pub fn new(spi: SPI, busy: BSY, dc: DC, rst: RST, delay: DELAY, config: DeviceConfig) -> Self {
        Ws29bw {
            interface: DisplayInterface::new(spi, busy, dc, rst, delay),
            config,
            state: DeviceState::Unpowered,
        }
    }

    /// Panel geometry and timing
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Give the handles back, e.g. to close the SPI device
    pub fn release(self) -> (SPI, BSY, DC, RST, DELAY) {
        self.interface.release()
    }
}

impl<SPI, BSY, DC, RST, DELAY> Ws29bw<SPI, BSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    RST: OutputPin,
    DC: OutputPin,
    BSY: InputPin,
    DELAY: DelayNs,
{
    // ==================== Helper Functions ====================

    /// Fixed startup register writes
    fn push_shift_register(&mut self) -> core::result::Result<(), DisplayError> {
        let last_gate = self.config.height.saturating_sub(1);
        let [gate_lo, gate_hi] = last_gate.to_le_bytes();

        self.interface.cmd_with_data(
            Cmd::DRIVER_OUTPUT_CONTROL,
            &[gate_lo, gate_hi, Flag::DRIVER_OUTPUT_SCAN],
        )?;
        self.interface
            .cmd_with_data(Cmd::BOOSTER_SOFT_START_CONTROL, &Flag::BOOSTER_SOFT_START)?;
        self.interface
            .cmd_with_data(Cmd::WRITE_VCOM_REGISTER, &[Flag::VCOM])?;
        self.interface
            .cmd_with_data(Cmd::SET_DUMMY_LINE_PERIOD, &[Flag::DUMMY_LINE_PERIOD])?;
        self.interface
            .cmd_with_data(Cmd::SET_GATE_TIME, &[Flag::GATE_TIME])?;
        self.interface
            .cmd_with_data(Cmd::BORDER_WAVEFORM_CONTROL, &[Flag::BORDER_WAVEFORM])?;
        self.interface
            .cmd_with_data(Cmd::DATA_ENTRY_MODE, &[Flag::DATA_ENTRY_INCRY_INCRX])?;
        Ok(())
    }

    /// Upload the waveform table
    fn push_lut(&mut self, lut: &[u8; 30]) -> core::result::Result<(), DisplayError> {
        log::debug!("Uploading {} byte LUT", lut.len());
        self.interface.cmd_with_data(Cmd::WRITE_LUT_REGISTER, lut)
    }

    /// Set the RAM window, in pixels, both ends inclusive
    fn ram_set_window(
        &mut self,
        xmin: u16,
        xmax: u16,
        ymin: u16,
        ymax: u16,
    ) -> core::result::Result<(), DisplayError> {
        // 8 pixels per RAM byte along x
        self.interface.cmd_with_data(
            Cmd::SET_RAMX_START_END,
            &[(xmin >> 3) as u8, (xmax >> 3) as u8],
        )?;

        // y can exceed 255, little endian
        let [ymin_lo, ymin_hi] = ymin.to_le_bytes();
        let [ymax_lo, ymax_hi] = ymax.to_le_bytes();
        self.interface.cmd_with_data(
            Cmd::SET_RAMY_START_END,
            &[ymin_lo, ymin_hi, ymax_lo, ymax_hi],
        )
    }

    /// Point the RAM address counters at pixel `(x, y)`
    fn ram_set_cursor(&mut self, x: u16, y: u16) -> core::result::Result<(), DisplayError> {
        self.interface
            .cmd_with_data(Cmd::SET_RAMX_COUNTER, &[(x >> 3) as u8])?;
        self.interface
            .cmd_with_data(Cmd::SET_RAMY_COUNTER, &y.to_le_bytes())
    }

    /// Copy the frame into controller RAM, one row at a time
    fn ram_write(&mut self, frame: &PackedBitmap) -> core::result::Result<(), DisplayError> {
        let invert = frame.polarity() != Polarity::InkLow;
        let mut row_buf = Vec::with_capacity(frame.pitch());

        for y in 0..frame.height() {
            let row = frame.row(y).ok_or(DisplayError::OutOfBoundsError)?;
            self.ram_set_cursor(0, y)?;
            self.interface.cmd(Cmd::WRITE_RAM)?;
            if invert {
                row_buf.clear();
                row_buf.extend(row.iter().map(|b| !b));
                self.interface.data(&row_buf)?;
            } else {
                self.interface.data(row)?;
            }
        }
        Ok(())
    }

    /// Refresh the panel from RAM and wait for it to finish
    fn ram_load(&mut self) -> Result<()> {
        self.interface
            .cmd_with_data(Cmd::DISPLAY_UPDATE_CTRL2, &[Flag::DISPLAY_UPDATE_FULL])?;
        self.interface.cmd(Cmd::MASTER_ACTIVATE)?;
        self.interface.cmd(Cmd::TERMINATE_FRAME_READ_WRITE)?;
        self.wait_until_idle()
    }

    fn wait_until_idle(&mut self) -> Result<()> {
        self.interface
            .wait_until_idle(self.config.busy_delay_ms, self.config.busy_max_polls)
    }

    fn init(&mut self) -> Result<()> {
        self.interface.reset(self.config.reset_delay_ms)?;
        self.push_shift_register()?;
        self.push_lut(&Flag::LUT_FULL_UPDATE)?;
        self.ram_set_window(0, self.config.width - 1, 0, self.config.height - 1)?;
        Ok(())
    }
}

impl<SPI, BSY, DC, RST, DELAY> Epd for Ws29bw<SPI, BSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    RST: OutputPin,
    DC: OutputPin,
    BSY: InputPin,
    DELAY: DelayNs,
{
    fn width(&self) -> u16 {
        self.config.width
    }

    fn height(&self) -> u16 {
        self.config.height
    }

    fn polarity(&self) -> Polarity {
        Polarity::InkLow
    }

    fn state(&self) -> DeviceState {
        self.state
    }

    fn power_on(&mut self) -> Result<()> {
        log::info!(
            "Initialising Waveshare 2.9\" e-paper, {}x{}",
            self.config.width,
            self.config.height
        );
        if self.config.width == 0 || self.config.height == 0 || self.config.width > MAX_WIDTH {
            log::error!("Panel size out of controller range");
            return Err(Error::InvalidDimensions {
                width: self.config.width,
                height: self.config.height,
            });
        }

        self.state = DeviceState::Initializing;
        match self.init() {
            Ok(()) => {
                self.state = DeviceState::Ready;
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to initialise display: {e}");
                self.state = DeviceState::Unpowered;
                Err(e)
            }
        }
    }

    fn reset(&mut self) -> Result<()> {
        log::info!("Resetting display");
        self.interface.reset(self.config.reset_delay_ms)?;
        Ok(())
    }

    fn display(&mut self, frame: &PackedBitmap) -> Result<()> {
        if self.state != DeviceState::Ready {
            return Err(Error::Uninitialized("display device"));
        }
        let expected = self.config.frame_len();
        if frame.byte_len() != expected {
            log::error!("Invalid frame of {} bytes", frame.byte_len());
            return Err(Error::InvalidLength {
                expected,
                actual: frame.byte_len(),
            });
        }
        // Same length, different shape
        if frame.pitch() != self.config.pitch() {
            return Err(Error::InvalidDimensions {
                width: frame.width(),
                height: frame.height(),
            });
        }
        log::info!("Updating display with {} byte frame", frame.byte_len());

        self.state = DeviceState::Transmitting;
        let result = match self.ram_write(frame) {
            Ok(()) => self.ram_load(),
            Err(e) => Err(e.into()),
        };
        match result {
            Ok(()) => {
                self.state = DeviceState::Ready;
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to display frame: {e}");
                self.state = DeviceState::Unpowered;
                Err(e)
            }
        }
    }

    fn sleep(&mut self) -> Result<()> {
        match self.state {
            DeviceState::Sleeping => return Ok(()),
            DeviceState::Ready => {}
            _ => return Err(Error::Uninitialized("display device")),
        }
        log::info!("Display entering deep sleep mode");

        // A device that stays busy does not get the sleep command
        match self.wait_until_idle() {
            Ok(()) => {}
            Err(e @ Error::BusyTimeout { .. }) => return Err(e),
            Err(e) => {
                self.state = DeviceState::Unpowered;
                return Err(e);
            }
        }

        if let Err(e) = self
            .interface
            .cmd_with_data(Cmd::DEEP_SLEEP_MODE, &[Flag::DEEP_SLEEP_MODE_1])
        {
            self.state = DeviceState::Unpowered;
            return Err(e.into());
        }
        self.state = DeviceState::Sleeping;
        Ok(())
    }
}
