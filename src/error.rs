//! Error types shared by the bitmap engine and the display backends

pub use display_interface::DisplayError;

/// Convenience alias used throughout the crate
pub type Result<T> = core::result::Result<T, Error>;

/// Errors raised by bitmaps, the glyph pipeline plumbing and display devices
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A bitmap was requested with a zero width or height
    #[error("invalid bitmap dimensions {width}x{height}")]
    InvalidDimensions {
        /// Requested width in pixels
        width: u16,
        /// Requested height in pixels
        height: u16,
    },

    /// A coordinate, or a rectangle placed at a coordinate, falls outside the target
    #[error("({x}, {y}) with extent {extent_w}x{extent_h} is outside {width}x{height}")]
    OutOfRange {
        /// Requested x coordinate
        x: u16,
        /// Requested y coordinate
        y: u16,
        /// Width of the placed rectangle, 1 for a single pixel
        extent_w: u16,
        /// Height of the placed rectangle, 1 for a single pixel
        extent_h: u16,
        /// Width of the target
        width: u16,
        /// Height of the target
        height: u16,
    },

    /// A buffer does not have the number of bytes its dimensions require
    #[error("buffer holds {actual} bytes, expected {expected}")]
    InvalidLength {
        /// Bytes required (pitch * height)
        expected: usize,
        /// Bytes supplied
        actual: usize,
    },

    /// Operating on something that has not been set up yet
    #[error("{0} is not initialised")]
    Uninitialized(&'static str),

    /// SPI or GPIO primitive failed
    #[error("display bus error: {0:?}")]
    Comms(DisplayError),

    /// BUSY pin stayed high for the whole polling budget
    #[error("device still busy after {polls} polls, is power connected?")]
    BusyTimeout {
        /// Number of delays spent waiting
        polls: u32,
    },

    /// Buffer allocation failed
    #[error("failed to allocate {bytes} bytes")]
    Memory {
        /// Size of the failed allocation
        bytes: usize,
    },

    /// File backed devices and text input
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<DisplayError> for Error {
    fn from(err: DisplayError) -> Self {
        Error::Comms(err)
    }
}

/// Coarse classification of [`Error`], used by callers deciding whether to retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad dimensions, coordinates or lengths; fixable by the caller
    Input,
    /// SPI/GPIO failure
    Comms,
    /// Hardware stayed busy, likely unpowered or disconnected
    BusyTimeout,
    /// Allocation failure
    Memory,
    /// Handle used before it was set up
    Uninitialized,
    /// Filesystem or stream failure
    Io,
}

impl Error {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidDimensions { .. }
            | Error::OutOfRange { .. }
            | Error::InvalidLength { .. } => ErrorKind::Input,
            Error::Uninitialized(_) => ErrorKind::Uninitialized,
            Error::Comms(_) => ErrorKind::Comms,
            Error::BusyTimeout { .. } => ErrorKind::BusyTimeout,
            Error::Memory { .. } => ErrorKind::Memory,
            Error::Io(_) => ErrorKind::Io,
        }
    }
}
