//! Serial link session manager for JSON-lines flight controller protocols.
//!
//! uavlink keeps one duplex link to an embedded controller alive, answers
//! inbound commands from a fixed protocol table, and streams its own
//! telemetry over the same link.
//!
//! # Crate Structure
//!
//! - [`transport`]: Link capability: serial adapter and in-memory links
//! - [`frame`]: Packets and newline-delimited JSON framing
//! - [`session`]: Supervisor, ingress, dispatcher and telemetry emitters

/// Re-export transport types.
pub mod transport {
    pub use uavlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use uavlink_frame::*;
}

/// Re-export session types.
pub mod session {
    pub use uavlink_session::*;
}
