use std::time::Duration;

use uavlink_frame::FrameConfig;

use crate::mission::Mission;

/// Fixed delay between connect attempts.
pub const DEFAULT_RECONNECT_BACKOFF: Duration = Duration::from_secs(3);
/// Upper bound on waiting for the dispatcher to drain at epoch end.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(3);

/// Supervisor behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub reconnect_backoff: Duration,
    pub drain_timeout: Duration,
    pub frame: FrameConfig,
    pub mission: Mission,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_backoff: DEFAULT_RECONNECT_BACKOFF,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            frame: FrameConfig::default(),
            mission: Mission::builtin(),
        }
    }
}

impl SessionConfig {
    pub fn with_mission(mut self, mission: Mission) -> Self {
        self.mission = mission;
        self
    }

    pub fn with_reconnect_backoff(mut self, backoff: Duration) -> Self {
        self.reconnect_backoff = backoff;
        self
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }
}
