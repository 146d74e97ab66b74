//! Streaming UTF-8 decoder
//!
//! Pulls one codepoint at a time out of a [`BufRead`]. Malformed input never
//! stops decoding; it yields U+FFFD and a warning, and decoding resumes at
//! the first byte that could not belong to the broken sequence.

use std::io::{self, BufRead};

use crate::error::Result;

/// U+FFFD REPLACEMENT CHARACTER
pub const REPLACEMENT: char = char::REPLACEMENT_CHARACTER;

/// Outcome of decoding one codepoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    /// A well formed codepoint
    Valid(char),
    /// A malformed sequence, standing in as the replacement character
    Invalid(char),
    /// No more input
    EndOfFile,
}

/// Total sequence length announced by a lead byte
fn sequence_length(lead: u8) -> Option<usize> {
    match lead {
        0x00..=0x7F => Some(1),
        0xC0..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF7 => Some(4),
        _ => None,
    }
}

/// Smallest value that needs a sequence of the given length
const MIN_VALUE: [u32; 5] = [0, 0, 0x80, 0x800, 0x1_0000];

/// Codepoint reader over any buffered byte stream
pub struct Utf8Decoder<R> {
    reader: R,
    offset: u64,
}

impl<R: BufRead> Utf8Decoder<R> {
    /// Decode from `reader`
    pub fn new(reader: R) -> Self {
        Utf8Decoder { reader, offset: 0 }
    }

    /// Bytes consumed so far
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn peek(&mut self) -> io::Result<Option<u8>> {
        loop {
            match self.reader.fill_buf() {
                Ok(buf) => return Ok(buf.first().copied()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn bump(&mut self) {
        self.reader.consume(1);
        self.offset += 1;
    }

    fn invalid(&self, start: u64, reason: &str) -> Decoded {
        log::warn!("Invalid UTF-8 at byte {start}: {reason}, substituting U+FFFD");
        Decoded::Invalid(REPLACEMENT)
    }

    /// Decode the next codepoint
    ///
    /// Only I/O failures are errors.
    pub fn next_codepoint(&mut self) -> Result<Decoded> {
        let Some(lead) = self.peek()? else {
            return Ok(Decoded::EndOfFile);
        };
        let start = self.offset;
        self.bump();

        let Some(len) = sequence_length(lead) else {
            return Ok(self.invalid(start, "not a lead byte"));
        };
        if len == 1 {
            return Ok(Decoded::Valid(char::from(lead)));
        }

        let mut value = u32::from(lead & (0x7F >> len));
        for _ in 1..len {
            match self.peek()? {
                Some(b) if b & 0xC0 == 0x80 => {
                    self.bump();
                    value = (value << 6) | u32::from(b & 0x3F);
                }
                // Left unconsumed, it starts the next sequence
                _ => return Ok(self.invalid(start, "truncated sequence")),
            }
        }

        if value < MIN_VALUE[len] {
            return Ok(self.invalid(start, "overlong encoding"));
        }
        match char::from_u32(value) {
            Some(c) => Ok(Decoded::Valid(c)),
            None => Ok(self.invalid(start, "surrogate or out of range")),
        }
    }
}

/// Yields codepoints, replacement characters included, until end of input
impl<R: BufRead> Iterator for Utf8Decoder<R> {
    type Item = Result<char>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_codepoint() {
            Ok(Decoded::Valid(c) | Decoded::Invalid(c)) => Some(Ok(c)),
            Ok(Decoded::EndOfFile) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
