/// Errors that can occur while opening or driving a link.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The link configuration is missing or unusable.
    #[error("invalid link configuration: {0}")]
    InvalidConfig(String),

    /// The device could not be opened.
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        source: std::io::Error,
    },

    /// No link is currently available from this connector.
    #[error("link unavailable: {0}")]
    Unavailable(String),

    /// An I/O error occurred on the link.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
