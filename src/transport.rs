//! spidev and GPIO character device wiring for a Raspberry Pi
//!
//! Every handle is owned by the returned driver and closed on drop, so an
//! error halfway through releases whatever was opened before it.

use std::path::Path;

use anyhow::Context;
use linux_embedded_hal::{
    gpio_cdev::{Chip, LineRequestFlags},
    spidev::{SpiModeFlags, SpidevOptions},
    CdevPin, Delay, SpidevDevice,
};

use crate::epd::DeviceConfig;
use crate::ws29bw::pins::Pins;
use crate::ws29bw::Ws29bw;

/// The panel driver over Linux userspace SPI and GPIO
pub type LinuxWs29bw = Ws29bw<SpidevDevice, CdevPin, CdevPin, CdevPin, Delay>;

fn request(
    chip: &mut Chip,
    line: u32,
    flags: LineRequestFlags,
    default: u8,
    consumer: &str,
) -> anyhow::Result<CdevPin> {
    let handle = chip
        .get_line(line)
        .with_context(|| format!("getting GPIO line {line}"))?
        .request(flags, default, consumer)
        .with_context(|| format!("requesting GPIO line {line} for {consumer}"))?;
    CdevPin::new(handle).with_context(|| format!("creating pin for {consumer}"))
}

/// Open `/dev/spidev0.<channel>` and the RST, DC and BUSY lines of `gpio_chip`
pub fn open(config: &DeviceConfig, gpio_chip: &Path) -> anyhow::Result<LinuxWs29bw> {
    let spi_path = format!("/dev/spidev0.{}", config.spi_channel);
    let mut spi =
        SpidevDevice::open(&spi_path).with_context(|| format!("opening SPI device {spi_path}"))?;
    let options = SpidevOptions::new()
        .bits_per_word(8)
        .max_speed_hz(config.clock_hz)
        .mode(SpiModeFlags::SPI_MODE_0)
        .build();
    spi.configure(&options).context("configuring SPI")?;
    log::debug!(
        "Opened {spi_path} at {} Hz, CS on BCM {} driven by spidev",
        config.clock_hz,
        Pins::CS
    );

    let mut chip = Chip::new(gpio_chip)
        .with_context(|| format!("opening GPIO chip {}", gpio_chip.display()))?;
    // Reset is active low, keep the controller running
    let rst = request(&mut chip, Pins::RST, LineRequestFlags::OUTPUT, 1, "papertext-rst")?;
    let dc = request(&mut chip, Pins::DC, LineRequestFlags::OUTPUT, 0, "papertext-dc")?;
    let busy = request(&mut chip, Pins::BUSY, LineRequestFlags::INPUT, 0, "papertext-busy")?;

    Ok(Ws29bw::new(spi, busy, dc, rst, Delay {}, config.clone()))
}
