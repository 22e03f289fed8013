//! Waypoint paths and wrapping sequence counters for telemetry emitters.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};

/// Sequence numbers run `0..SEQ_MODULUS`; the counter resets to 0 when it
/// would reach this value.
pub const SEQ_MODULUS: u8 = 255;

/// One coordinate pair. Serialized as `[lat, lng]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Waypoint {
    pub lat: f64,
    pub lng: f64,
}

impl Waypoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<[f64; 2]> for Waypoint {
    fn from([lat, lng]: [f64; 2]) -> Self {
        Self { lat, lng }
    }
}

impl From<Waypoint> for [f64; 2] {
    fn from(point: Waypoint) -> Self {
        [point.lat, point.lng]
    }
}

/// What happens when traversal runs past the last waypoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Traversal {
    /// Restart at the first waypoint, order unchanged.
    #[default]
    Wrap,
    /// Reverse the path in place and restart at its (new) first waypoint.
    PingPong,
}

/// An ordered, non-empty list of waypoints with a traversal cursor.
///
/// Invariant: `index < points.len()`.
#[derive(Debug, Clone, PartialEq)]
pub struct WaypointPath {
    points: Vec<Waypoint>,
    policy: Traversal,
    index: usize,
}

impl WaypointPath {
    pub fn new(points: Vec<Waypoint>, policy: Traversal) -> Result<Self> {
        if points.is_empty() {
            return Err(SessionError::InvalidMission(
                "waypoint path must not be empty".to_string(),
            ));
        }
        Ok(Self {
            points,
            policy,
            index: 0,
        })
    }

    /// The waypoint under the cursor.
    pub fn current(&self) -> Waypoint {
        self.points[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn policy(&self) -> Traversal {
        self.policy
    }

    /// Move the cursor one step, applying the traversal policy on overflow.
    pub fn advance(&mut self) {
        self.index += 1;
        if self.index >= self.points.len() {
            if self.policy == Traversal::PingPong {
                self.points.reverse();
            }
            self.index = 0;
        }
    }
}

/// Wrapping packet sequence counter: 0, 1, ..., 254, 0, 1, ...
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeqCounter(u8);

impl SeqCounter {
    pub fn value(self) -> u8 {
        self.0
    }

    pub fn advance(&mut self) {
        self.0 = if self.0 + 1 >= SEQ_MODULUS { 0 } else { self.0 + 1 };
    }
}
