use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;

// https://docs.rs/embedded-graphics/0.8.1/embedded_graphics/mono_font/index.html#modules
use embedded_graphics::mono_font::{iso_8859_15::FONT_5X8, MonoTextStyle};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};

use papertext::ws29bw::pins::GPIO_CHIP;
use papertext::{
    compose, DeviceConfig, EmulatedDisplay, Epd, FontRenderer, PackedBitmap, Page, RenderEngine,
    Utf8Decoder,
};

/// Render a UTF-8 text file onto a Waveshare 2.9" e-paper display
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// UTF-8 text file to show
    textfile: PathBuf,

    /// Font size in pixels
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    fontsize: u32,

    /// TrueType or OpenType font file
    fontpath: PathBuf,

    /// Write the page to this PBM file instead of the panel
    #[arg(long, value_name = "FILE")]
    emulate: Option<PathBuf>,

    /// SPI chip select, i.e. /dev/spidev0.<N>
    #[arg(long, default_value_t = 0)]
    spi_channel: u8,

    /// SPI clock
    #[arg(long, default_value_t = 32_000_000)]
    clock_hz: u32,

    /// GPIO character device carrying RST, DC and BUSY
    #[arg(long, default_value = GPIO_CHIP)]
    gpio_chip: PathBuf,

    /// Small status line drawn along the bottom edge
    #[arg(long)]
    footer: Option<String>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = DeviceConfig {
        spi_channel: args.spi_channel,
        clock_hz: args.clock_hz,
        ..DeviceConfig::default()
    };

    let renderer = FontRenderer::open(&args.fontpath, args.fontsize)
        .with_context(|| format!("loading font {}", args.fontpath.display()))?;
    let mut engine = RenderEngine::new(
        renderer,
        args.fontpath.display().to_string(),
        args.fontsize,
    );

    let file = File::open(&args.textfile)
        .with_context(|| format!("opening {}", args.textfile.display()))?;
    let text = Utf8Decoder::new(BufReader::new(file))
        .collect::<papertext::Result<Vec<char>>>()
        .with_context(|| format!("reading {}", args.textfile.display()))?;
    log::info!("Read {} characters", text.len());

    let mut page = Page::new(config.width, config.height, engine.line_metrics())?;
    let total = text.len();
    let composed = compose(&mut engine, &mut page, text).context("composing page")?;
    if composed.page_full {
        log::warn!("Page full, showing {} of {} characters", composed.consumed, total);
    }
    log::info!("{} distinct glyphs rendered", engine.cache().len());

    let mut frame = page.into_bitmap();
    if let Some(footer) = &args.footer {
        draw_footer(&mut frame, footer)?;
    }

    match &args.emulate {
        Some(path) => {
            let mut epd = EmulatedDisplay::new(path, config.width, config.height);
            show(&mut epd, &frame)
        }
        None => show_on_panel(&config, &args.gpio_chip, &frame),
    }
}

/// Overwrite the bottom 8 rows with a line of 5x8 text
fn draw_footer(frame: &mut PackedBitmap, footer: &str) -> anyhow::Result<()> {
    let size = frame.size();
    let bottom = size.height as i32;

    Rectangle::new(Point::new(0, bottom - 8), Size::new(size.width, 8))
        .into_styled(PrimitiveStyle::with_fill(BinaryColor::Off))
        .draw(frame)?;

    let label_style = MonoTextStyle::new(&FONT_5X8, BinaryColor::On);
    Text::with_baseline(footer, Point::new(0, bottom - 1), label_style, Baseline::Bottom)
        .draw(frame)?;
    Ok(())
}

fn show(epd: &mut impl Epd, frame: &PackedBitmap) -> anyhow::Result<()> {
    epd.power_on().context("powering on display")?;
    epd.display(frame).context("displaying page")?;
    epd.sleep().context("putting display to sleep")?;
    log::info!("Page displayed");
    Ok(())
}

#[cfg(target_os = "linux")]
fn show_on_panel(
    config: &DeviceConfig,
    gpio_chip: &Path,
    frame: &PackedBitmap,
) -> anyhow::Result<()> {
    let mut epd = papertext::transport::open(config, gpio_chip)?;
    show(&mut epd, frame)
}

#[cfg(not(target_os = "linux"))]
fn show_on_panel(
    _config: &DeviceConfig,
    _gpio_chip: &Path,
    _frame: &PackedBitmap,
) -> anyhow::Result<()> {
    anyhow::bail!("the e-paper panel needs Linux spidev and GPIO, use --emulate")
}
