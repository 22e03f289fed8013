/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] uavlink_frame::FrameError),

    /// The command queue lost its consumer.
    #[error("command queue closed")]
    QueueClosed,

    /// The mission (emitter set) is unusable.
    #[error("invalid mission: {0}")]
    InvalidMission(String),

    /// A session task panicked or was aborted unexpectedly.
    #[error("session task failed: {0}")]
    TaskFailed(String),
}

impl SessionError {
    /// Returns true if the error means the established link is unusable.
    pub fn is_link_fatal(&self) -> bool {
        match self {
            SessionError::Frame(err) => err.is_link_error(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use uavlink_frame::FrameError;

    use super::*;

    #[test]
    fn link_fatal_classification() {
        assert!(SessionError::from(FrameError::ConnectionClosed).is_link_fatal());
        assert!(!SessionError::from(FrameError::EmptyLine).is_link_fatal());
        assert!(!SessionError::from(FrameError::PacketTooLarge { size: 90, max: 32 })
            .is_link_fatal());
        assert!(!SessionError::QueueClosed.is_link_fatal());
        assert!(!SessionError::InvalidMission("x".into()).is_link_fatal());
    }
}
