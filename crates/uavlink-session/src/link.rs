use std::sync::Arc;

use tokio::io::WriteHalf;
use tokio::sync::Mutex;
use uavlink_frame::{FrameWriter, Packet};
use uavlink_transport::LinkStream;

use crate::error::Result;

/// Shared write side of one epoch's link.
///
/// Clones share one [`FrameWriter`]; the async mutex is held for a whole
/// line, so the dispatcher and every emitter can write concurrently without
/// interleaving partial frames.
#[derive(Clone)]
pub struct LinkWriter {
    inner: Arc<Mutex<FrameWriter<WriteHalf<LinkStream>>>>,
}

impl LinkWriter {
    pub fn new(writer: FrameWriter<WriteHalf<LinkStream>>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(writer)),
        }
    }

    /// Send one packet as a complete line.
    pub async fn send(&self, packet: &Packet) -> Result<()> {
        let mut writer = self.inner.lock().await;
        writer.send(packet).await?;
        Ok(())
    }

    /// Flush anything buffered on the write side.
    pub async fn flush(&self) -> Result<()> {
        self.inner.lock().await.flush().await?;
        Ok(())
    }
}

impl std::fmt::Debug for LinkWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkWriter")
            .field("writers", &Arc::strong_count(&self.inner))
            .finish()
    }
}
