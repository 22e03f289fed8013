use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tokio::io::DuplexStream;
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::{Connector, LinkStream};

/// Default in-memory pipe capacity in bytes.
pub const DEFAULT_PIPE_CAPACITY: usize = 64 * 1024;

enum Attempt {
    Fail,
    Link(DuplexStream),
}

/// Connector over scripted in-process links.
///
/// Each call to [`Connector::connect`] consumes the next scripted attempt.
/// Once the script runs out every attempt reports the link as unavailable.
pub struct MemoryConnector {
    script: Mutex<VecDeque<Attempt>>,
    attempts: AtomicUsize,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Script one failed open.
    pub fn push_failure(&self) {
        self.lock().push_back(Attempt::Fail);
    }

    /// Script one successful open and return the remote (device) end.
    pub fn push_link(&self) -> DuplexStream {
        self.push_link_with_capacity(DEFAULT_PIPE_CAPACITY)
    }

    /// Script one successful open with an explicit pipe capacity.
    pub fn push_link_with_capacity(&self, capacity: usize) -> DuplexStream {
        let (local, remote) = tokio::io::duplex(capacity);
        self.lock().push_back(Attempt::Link(local));
        remote
    }

    /// Number of connect attempts made so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Attempt>> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for MemoryConnector {
    async fn connect(&self) -> Result<LinkStream> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        match self.lock().pop_front() {
            Some(Attempt::Link(stream)) => {
                debug!(attempt, "memory link opened");
                Ok(LinkStream::memory(stream))
            }
            Some(Attempt::Fail) => Err(TransportError::Unavailable(format!(
                "scripted failure on attempt {attempt}"
            ))),
            None => Err(TransportError::Unavailable(
                "no memory link scripted".to_string(),
            )),
        }
    }

    fn endpoint(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    #[tokio::test]
    async fn empty_script_is_unavailable() {
        let connector = MemoryConnector::new();
        let err = connector.connect().await.unwrap_err();
        assert!(matches!(err, TransportError::Unavailable(_)));
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test]
    async fn script_is_consumed_in_order() {
        let connector = MemoryConnector::new();
        connector.push_failure();
        let mut remote = connector.push_link();

        assert!(connector.connect().await.is_err());
        let mut link = connector
            .connect()
            .await
            .expect("second attempt should open");
        assert!(connector.connect().await.is_err());
        assert_eq!(connector.attempts(), 3);

        link.write_all(b"hi").await.unwrap();
        let mut buf = [0u8; 2];
        remote.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hi");
    }
}
