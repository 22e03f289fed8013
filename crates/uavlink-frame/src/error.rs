/// Errors that can occur while framing or decoding packets.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The line contains a byte outside the ASCII range.
    #[error("non-ASCII byte 0x{byte:02x} at offset {offset}")]
    NotAscii { offset: usize, byte: u8 },

    /// The line is not a valid packet object.
    #[error("invalid packet JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The line is blank.
    #[error("empty line")]
    EmptyLine,

    /// The line exceeds the configured maximum length.
    #[error("line too long ({size} bytes, max {max})")]
    LineTooLong { size: usize, max: usize },

    /// An outbound packet encodes to more than the configured line length.
    /// Nothing was written; the link is still usable.
    #[error("packet too large to send ({size} bytes, max {max})")]
    PacketTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing lines.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link was closed.
    #[error("connection closed")]
    ConnectionClosed,
}

impl FrameError {
    /// Returns true if the error concerns a single line and the stream is
    /// still usable.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            FrameError::NotAscii { .. }
                | FrameError::Json(_)
                | FrameError::EmptyLine
                | FrameError::LineTooLong { .. }
        )
    }

    /// Returns true if the link itself failed and no further lines can be
    /// read or written.
    pub fn is_link_error(&self) -> bool {
        matches!(self, FrameError::Io(_) | FrameError::ConnectionClosed)
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
