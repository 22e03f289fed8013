use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::packet::Packet;

/// Line terminator on the wire.
pub const DELIMITER: u8 = b'\n';

/// Default maximum line length, terminator excluded: 4 KiB.
pub const DEFAULT_MAX_LINE: usize = 4 * 1024;

/// Encode a packet as one wire line.
///
/// Wire format: one compact JSON object followed by `\n`. Compact JSON never
/// contains a raw newline, so every encoded packet is exactly one line.
pub fn encode_line(packet: &Packet, dst: &mut BytesMut) -> Result<()> {
    let start = dst.len();
    serde_json::to_writer((&mut *dst).writer(), packet)?;
    debug_assert!(!dst[start..].contains(&DELIMITER));
    dst.put_u8(DELIMITER);
    Ok(())
}

/// Decode a packet from one line (terminator already removed).
///
/// The line must be non-blank ASCII holding one JSON object.
pub fn decode_packet(line: &[u8]) -> Result<Packet> {
    if let Some(offset) = line.iter().position(|b| !b.is_ascii()) {
        return Err(FrameError::NotAscii {
            offset,
            byte: line[offset],
        });
    }
    if line.iter().all(u8::is_ascii_whitespace) {
        return Err(FrameError::EmptyLine);
    }
    Ok(serde_json::from_slice(line)?)
}

/// Splits a byte buffer into lines.
///
/// An over-long line is reported once as [`FrameError::LineTooLong`] and its
/// remaining bytes are discarded up to and including the next terminator, so
/// the decoder resynchronizes on the following line.
#[derive(Debug, Clone)]
pub struct LineDecoder {
    max_line: usize,
    discarding: bool,
}

impl LineDecoder {
    pub fn new(max_line: usize) -> Self {
        Self {
            max_line,
            discarding: false,
        }
    }

    /// Decode the next line from `src`.
    ///
    /// Returns `Ok(None)` if `src` doesn't contain a complete line yet.
    /// On success, consumes the line and its terminator from `src`; a
    /// trailing `\r` is stripped.
    pub fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        loop {
            let newline = src.iter().position(|b| *b == DELIMITER);

            if self.discarding {
                match newline {
                    Some(pos) => {
                        src.advance(pos + 1);
                        self.discarding = false;
                        continue;
                    }
                    None => {
                        src.clear();
                        return Ok(None);
                    }
                }
            }

            return match newline {
                Some(pos) if pos > self.max_line => {
                    src.advance(pos + 1);
                    Err(FrameError::LineTooLong {
                        size: pos,
                        max: self.max_line,
                    })
                }
                Some(pos) => {
                    let mut line = src.split_to(pos + 1);
                    line.truncate(pos);
                    if line.last() == Some(&b'\r') {
                        line.truncate(pos - 1);
                    }
                    Ok(Some(line.freeze()))
                }
                None if src.len() > self.max_line => {
                    let size = src.len();
                    src.clear();
                    self.discarding = true;
                    Err(FrameError::LineTooLong {
                        size,
                        max: self.max_line,
                    })
                }
                None => Ok(None),
            };
        }
    }
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE)
    }
}

/// Configuration for the line codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum line length in bytes, terminator excluded. Default: 4 KiB.
    pub max_line_len: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_line_len: DEFAULT_MAX_LINE,
        }
    }
}
