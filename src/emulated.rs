//! Portable bitmap (PBM) stand-in for the panel
//!
//! Every displayed frame rewrites a binary PBM file (`P4 <width>
//! <height>\n` followed by the packed rows), which any image viewer can
//! open. PBM stores black as 1, the same as the page buffer.

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::bitmap::{pitch_for, PackedBitmap, Polarity};
use crate::epd::{DeviceState, Epd};
use crate::error::{Error, Result};

/// Display that renders into a PBM file
#[derive(Debug)]
pub struct EmulatedDisplay {
    path: PathBuf,
    width: u16,
    height: u16,
    file: Option<File>,
    state: DeviceState,
}

impl EmulatedDisplay {
    /// Emulate a `width` x `height` panel backed by the file at `path`
    ///
    /// The file is created on [`Epd::power_on`].
    pub fn new(path: impl AsRef<Path>, width: u16, height: u16) -> Self {
        EmulatedDisplay {
            path: path.as_ref().to_path_buf(),
            width,
            height,
            file: None,
            state: DeviceState::Unpowered,
        }
    }

    /// File the frames go to
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn header(&self) -> String {
        format!("P4 {} {}\n", self.width, self.height)
    }

    fn open(&mut self) -> Result<()> {
        let mut file = File::create(&self.path)?;
        file.write_all(self.header().as_bytes())?;
        self.file = Some(file);
        Ok(())
    }

    fn write_frame(&mut self, frame: &PackedBitmap) -> Result<()> {
        let header = self.header();
        let file = self.file.as_mut().ok_or(Error::Uninitialized("PBM file"))?;

        let mut out = Vec::with_capacity(header.len() + frame.byte_len());
        out.extend_from_slice(header.as_bytes());
        match frame.polarity() {
            Polarity::InkHigh => out.extend_from_slice(frame.as_bytes()),
            Polarity::InkLow => out.extend(frame.as_bytes().iter().map(|b| !b)),
        }

        file.seek(SeekFrom::Start(0))?;
        file.set_len(0)?;
        file.write_all(&out)?;
        file.flush()?;
        Ok(())
    }
}

impl Epd for EmulatedDisplay {
    fn width(&self) -> u16 {
        self.width
    }

    fn height(&self) -> u16 {
        self.height
    }

    fn polarity(&self) -> Polarity {
        Polarity::InkHigh
    }

    fn state(&self) -> DeviceState {
        self.state
    }

    fn power_on(&mut self) -> Result<()> {
        log::info!("Starting PBM emulator at {}", self.path.display());
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.file.is_some() {
            log::warn!("File {} already open", self.path.display());
            self.state = DeviceState::Ready;
            return Ok(());
        }

        self.state = DeviceState::Initializing;
        if let Err(e) = self.open() {
            log::error!("Cannot open {}: {e}", self.path.display());
            self.state = DeviceState::Unpowered;
            return Err(e);
        }
        self.state = DeviceState::Ready;
        Ok(())
    }

    /// Truncates an open file back to a bare header
    ///
    /// A closed emulator has no file to reset, so this only logs.
    fn reset(&mut self) -> Result<()> {
        if self.file.is_none() {
            log::debug!("PBM emulator not open, nothing to reset");
            return Ok(());
        }
        log::info!("Resetting PBM emulator");
        self.file = None;
        self.open()
    }

    fn display(&mut self, frame: &PackedBitmap) -> Result<()> {
        if self.state != DeviceState::Ready {
            return Err(Error::Uninitialized("PBM emulator"));
        }
        let expected = pitch_for(self.width) * usize::from(self.height);
        if frame.byte_len() != expected {
            log::error!("Invalid bitmap length {}", frame.byte_len());
            return Err(Error::InvalidLength {
                expected,
                actual: frame.byte_len(),
            });
        }
        // Same length, different shape
        if frame.pitch() != pitch_for(self.width) {
            log::error!("Invalid bitmap shape {}x{}", frame.width(), frame.height());
            return Err(Error::InvalidDimensions {
                width: frame.width(),
                height: frame.height(),
            });
        }
        log::info!("Displaying {} byte bitmap", frame.byte_len());

        self.state = DeviceState::Transmitting;
        match self.write_frame(frame) {
            Ok(()) => {
                self.state = DeviceState::Ready;
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to write to {}: {e}", self.path.display());
                self.file = None;
                self.state = DeviceState::Unpowered;
                Err(e)
            }
        }
    }

    /// Closes the file
    fn sleep(&mut self) -> Result<()> {
        match self.state {
            DeviceState::Sleeping => return Ok(()),
            DeviceState::Ready => {}
            _ => return Err(Error::Uninitialized("PBM emulator")),
        }
        log::info!("PBM emulator entering sleep mode");
        self.file = None;
        self.state = DeviceState::Sleeping;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::PixelMode;
    use crate::error::ErrorKind;

    fn powered(dir: &tempfile::TempDir) -> EmulatedDisplay {
        let mut epd = EmulatedDisplay::new(dir.path().join("display.pbm"), 16, 2);
        epd.power_on().unwrap();
        epd
    }

    #[test]
    fn power_on_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let epd = powered(&dir);
        assert_eq!(epd.state(), DeviceState::Ready);
        assert_eq!(std::fs::read(epd.path()).unwrap(), b"P4 16 2\n");
    }

    #[test]
    fn display_rewrites_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut epd = powered(&dir);

        let mut frame = epd.blank_frame().unwrap();
        frame.set_pixel(0, 0, PixelMode::Black).unwrap();
        epd.display(&frame).unwrap();
        frame.set_pixel(15, 1, PixelMode::Black).unwrap();
        epd.display(&frame).unwrap();

        let mut expected = b"P4 16 2\n".to_vec();
        expected.extend_from_slice(&[0x80, 0x00, 0x00, 0x01]);
        assert_eq!(std::fs::read(epd.path()).unwrap(), expected);
        assert_eq!(epd.state(), DeviceState::Ready);
    }

    #[test]
    fn ink_low_frames_are_stored_as_pbm() {
        let dir = tempfile::tempdir().unwrap();
        let mut epd = powered(&dir);
        let frame =
            PackedBitmap::from_bytes(16, 2, Polarity::InkLow, vec![0x7F, 0xFF, 0xFF, 0xFF])
                .unwrap();
        epd.display(&frame).unwrap();
        let bytes = std::fs::read(epd.path()).unwrap();
        assert_eq!(&bytes[8..], &[0x80, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn wrong_length_leaves_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let mut epd = powered(&dir);
        let frame = PackedBitmap::new(8, 2).unwrap();
        let err = epd.display(&frame).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
        assert_eq!(std::fs::read(epd.path()).unwrap(), b"P4 16 2\n");
        assert_eq!(epd.state(), DeviceState::Ready);
    }

    #[test]
    fn wrong_shape_leaves_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let mut epd = powered(&dir);
        // 8x4 has the byte count of 16x2
        let frame = PackedBitmap::new(8, 4).unwrap();
        let err = epd.display(&frame).unwrap_err();
        assert!(matches!(err, Error::InvalidDimensions { width: 8, height: 4 }));
        assert_eq!(err.kind(), ErrorKind::Input);
        assert_eq!(std::fs::read(epd.path()).unwrap(), b"P4 16 2\n");
        assert_eq!(epd.state(), DeviceState::Ready);
    }

    #[test]
    fn display_needs_power() {
        let dir = tempfile::tempdir().unwrap();
        let mut epd = EmulatedDisplay::new(dir.path().join("display.pbm"), 16, 2);
        let frame = PackedBitmap::new(16, 2).unwrap();
        let err = epd.display(&frame).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Uninitialized);
        assert!(!epd.path().exists());
    }

    #[test]
    fn sleeping_device_needs_power_on_again() {
        let dir = tempfile::tempdir().unwrap();
        let mut epd = powered(&dir);
        epd.sleep().unwrap();
        epd.sleep().unwrap();
        assert_eq!(epd.state(), DeviceState::Sleeping);

        let frame = epd.blank_frame().unwrap();
        assert!(epd.display(&frame).is_err());
        epd.power_on().unwrap();
        epd.display(&frame).unwrap();
    }

    #[test]
    fn reset_truncates_to_header() {
        let dir = tempfile::tempdir().unwrap();
        let mut epd = powered(&dir);
        let frame = epd.blank_frame().unwrap();
        epd.display(&frame).unwrap();
        epd.reset().unwrap();
        assert_eq!(std::fs::read(epd.path()).unwrap(), b"P4 16 2\n");
    }

    #[test]
    fn reset_of_closed_emulator_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut epd = EmulatedDisplay::new(dir.path().join("display.pbm"), 16, 2);
        epd.reset().unwrap();
        assert!(!epd.path().exists());
        assert_eq!(epd.state(), DeviceState::Unpowered);

        epd.power_on().unwrap();
        epd.sleep().unwrap();
        let frame = epd.blank_frame().unwrap();
        epd.reset().unwrap();
        assert_eq!(epd.state(), DeviceState::Sleeping);
        assert!(epd.display(&frame).is_err());
    }
}
