//! Periodic telemetry emitters.
//!
//! Each emitter owns a waypoint path and a sequence counter, and writes one
//! packet per interval on the shared link writer. Emitters never read the
//! command queue and never block one another.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};
use uavlink_frame::{DeviceId, Packet};

use crate::error::{Result, SessionError};
use crate::link::LinkWriter;
use crate::path::{SeqCounter, Traversal, Waypoint, WaypointPath};

/// Packet type emitters use unless the mission says otherwise.
pub const DEFAULT_EMITTER_TYPE: i64 = 20;

fn default_emitter_type() -> i64 {
    DEFAULT_EMITTER_TYPE
}

/// Declarative description of one emitter, as it appears in a mission file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmitterSpec {
    pub id: DeviceId,
    #[serde(rename = "type", default = "default_emitter_type")]
    pub kind: i64,
    pub interval_ms: u64,
    #[serde(default)]
    pub stagger_ms: u64,
    #[serde(default)]
    pub policy: Traversal,
    pub waypoints: Vec<Waypoint>,
}

impl EmitterSpec {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn stagger(&self) -> Duration {
        Duration::from_millis(self.stagger_ms)
    }

    /// Build a runnable emitter, rejecting unusable settings.
    pub fn build(&self) -> Result<Emitter> {
        if self.interval_ms == 0 {
            return Err(SessionError::InvalidMission(format!(
                "emitter {}: interval must be greater than zero",
                self.id
            )));
        }
        let path = WaypointPath::new(self.waypoints.clone(), self.policy).map_err(|_| {
            SessionError::InvalidMission(format!("emitter {}: no waypoints", self.id))
        })?;
        Ok(Emitter {
            id: self.id.clone(),
            kind: self.kind,
            interval: self.interval(),
            stagger: self.stagger(),
            path,
            seq: SeqCounter::default(),
        })
    }
}

/// A running telemetry source. State lives for one link epoch.
#[derive(Debug, Clone)]
pub struct Emitter {
    id: DeviceId,
    kind: i64,
    interval: Duration,
    stagger: Duration,
    path: WaypointPath,
    seq: SeqCounter,
}

impl Emitter {
    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    /// The packet the next tick would send.
    pub fn current_packet(&self) -> Packet {
        let point = self.path.current();
        Packet::new(self.id.clone(), self.kind)
            .with_seq(i64::from(self.seq.value()))
            .with_position(point.lat, point.lng)
    }

    /// Step the waypoint cursor and the sequence counter.
    pub fn advance(&mut self) {
        self.path.advance();
        self.seq.advance();
    }

    /// Emit forever: wait out the stagger once, then send, advance, sleep.
    ///
    /// A packet too large to frame is logged and its tick skipped. Returns
    /// only when the link fails.
    pub async fn run(mut self, writer: LinkWriter) -> Result<()> {
        debug!(
            id = %self.id,
            interval_ms = self.interval.as_millis() as u64,
            stagger_ms = self.stagger.as_millis() as u64,
            policy = ?self.path.policy(),
            "emitter started"
        );
        if !self.stagger.is_zero() {
            tokio::time::sleep(self.stagger).await;
        }

        loop {
            let packet = self.current_packet();
            match writer.send(&packet).await {
                Ok(()) => trace!(packet = %packet, "emitted"),
                Err(SessionError::Frame(err)) if !err.is_link_error() => {
                    warn!(id = %self.id, seq = packet.seq, error = %err, "telemetry not sent");
                }
                Err(err) => return Err(err),
            }
            self.advance();
            tokio::time::sleep(self.interval).await;
        }
    }
}
