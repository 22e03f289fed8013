//! Newline-delimited JSON packet framing for uavlink.
//!
//! Every packet travels as one line on the link:
//! - ASCII only
//! - One compact JSON object
//! - Terminated by `\n` (a preceding `\r` is tolerated on input)
//!
//! Malformed lines are reported per line and never poison the stream.

pub mod codec;
pub mod error;
pub mod packet;
pub mod reader;
pub mod writer;

pub use codec::{decode_packet, encode_line, FrameConfig, LineDecoder, DEFAULT_MAX_LINE, DELIMITER};
pub use error::{FrameError, Result};
pub use packet::{
    DeviceId, Packet, DEFAULT_DATA, DEFAULT_DEVICE, DEFAULT_HIGH, DEFAULT_LAT, DEFAULT_LNG,
};
pub use reader::FrameReader;
pub use writer::FrameWriter;
