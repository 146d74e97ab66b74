//! Display interface using SPI
use display_interface::DisplayError;
use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
    spi::SpiDevice,
};

use crate::error::{Error, Result};

/// The four wire connection of the Waveshare modules
///
pub struct DisplayInterface<SPI, BSY, DC, RST, DELAY> {
    /// SPI device, chip select is handled by the device
    spi: SPI,
    /// High while the controller is busy
    busy: BSY,
    /// Data/Command Control Pin (High for data, Low for command)
    dc: DC,
    /// Pin for Reseting
    rst: RST,
    /// Delay provider for reset pulses and busy polling
    delay: DELAY,
}

impl<SPI, BSY, DC, RST, DELAY> DisplayInterface<SPI, BSY, DC, RST, DELAY> {
    /// Wrap the handles, without touching the hardware
    pub fn new(spi: SPI, busy: BSY, dc: DC, rst: RST, delay: DELAY) -> Self {
        DisplayInterface {
            spi,
            busy,
            dc,
            rst,
            delay,
        }
    }

    /// Give the handles back
    pub fn release(self) -> (SPI, BSY, DC, RST, DELAY) {
        (self.spi, self.busy, self.dc, self.rst, self.delay)
    }
}

impl<SPI, BSY, DC, RST, DELAY> DisplayInterface<SPI, BSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    RST: OutputPin,
    DC: OutputPin,
    BSY: InputPin,
    DELAY: DelayNs,
{
    /// Basic function for sending commands
    pub(crate) fn cmd(&mut self, command: u8) -> core::result::Result<(), DisplayError> {
        // low for commands
        self.dc.set_low().map_err(|_| DisplayError::DCError)?;

        match self.spi.write(&[command]) {
            Ok(_) => Ok(()),
            Err(e) => {
                log::error!("SPI write error for command 0x{:02X}: {:?}", command, e);
                Err(DisplayError::BusWriteError)
            }
        }
    }

    /// Basic function for sending an array of u8-values of data over spi
    pub(crate) fn data(&mut self, data: &[u8]) -> core::result::Result<(), DisplayError> {
        // high for data
        self.dc.set_high().map_err(|_| DisplayError::DCError)?;
        self.spi
            .write(data)
            .map_err(|_| DisplayError::BusWriteError)
    }

    /// Basic function for sending a command and the data belonging to it.
    pub(crate) fn cmd_with_data(
        &mut self,
        command: u8,
        data: &[u8],
    ) -> core::result::Result<(), DisplayError> {
        self.cmd(command)?;
        self.data(data)
    }

    /// Pulse the reset line high, low, high, holding each level for `hold_ms`
    pub(crate) fn reset(&mut self, hold_ms: u32) -> core::result::Result<(), DisplayError> {
        self.rst.set_high().map_err(|_| DisplayError::RSError)?;
        self.delay.delay_ms(hold_ms);
        self.rst.set_low().map_err(|_| DisplayError::RSError)?;
        self.delay.delay_ms(hold_ms);
        self.rst.set_high().map_err(|_| DisplayError::RSError)?;
        self.delay.delay_ms(hold_ms);
        Ok(())
    }

    /// Whether the BUSY pin reads high
    ///
    /// A failed read is reported as [`DisplayError::DCError`], the pin error
    /// of display-interface, which has no variant for input pins.
    fn is_busy(&mut self) -> core::result::Result<bool, DisplayError> {
        self.busy.is_high().map_err(|_| {
            log::error!("Failed to read BUSY pin");
            DisplayError::DCError
        })
    }

    /// Poll BUSY until it goes low
    ///
    /// Sleeps `delay_ms` between reads and gives up after `max_polls`
    /// sleeps, so a pin that never clears is read `max_polls + 1` times.
    pub(crate) fn wait_until_idle(&mut self, delay_ms: u32, max_polls: u32) -> Result<()> {
        let mut polls = 0;
        while self.is_busy()? {
            if polls >= max_polls {
                log::error!("Device not leaving busy state after {polls} polls, is power connected?");
                return Err(Error::BusyTimeout { polls });
            }
            self.delay.delay_ms(delay_ms);
            polls += 1;
        }
        if polls > 0 {
            log::debug!("Device idle after {polls} polls");
        }
        Ok(())
    }
}
