//! Mission: the set of telemetry emitters started on every link epoch.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::emitter::{EmitterSpec, DEFAULT_EMITTER_TYPE};
use crate::error::{Result, SessionError};
use crate::path::{Traversal, Waypoint};

/// Emitter set loaded from a mission document or the built-in default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub emitters: Vec<EmitterSpec>,
}

impl Mission {
    /// Parse and validate a mission document.
    pub fn from_json(text: &str) -> Result<Self> {
        let mission: Mission = serde_json::from_str(text)
            .map_err(|err| SessionError::InvalidMission(err.to_string()))?;
        mission.validate()?;
        Ok(mission)
    }

    /// Read, parse, and validate a mission file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            SessionError::InvalidMission(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::from_json(&text)
    }

    /// Check every emitter is buildable and ids are unique.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for spec in &self.emitters {
            if !seen.insert(&spec.id) {
                return Err(SessionError::InvalidMission(format!(
                    "duplicate emitter id {}",
                    spec.id
                )));
            }
            spec.build()?;
        }
        Ok(())
    }

    /// Two emitters circling the default position: "5" wraps, "6" ping-pongs
    /// half an interval behind it.
    pub fn builtin() -> Self {
        let square = vec![
            Waypoint::new(5.02, -9.02),
            Waypoint::new(5.03, -9.02),
            Waypoint::new(5.03, -9.01),
            Waypoint::new(5.02, -9.01),
        ];
        let line = vec![
            Waypoint::new(5.00, -9.04),
            Waypoint::new(5.01, -9.03),
            Waypoint::new(5.02, -9.02),
            Waypoint::new(5.03, -9.01),
            Waypoint::new(5.04, -9.00),
        ];
        Self {
            emitters: vec![
                EmitterSpec {
                    id: "5".into(),
                    kind: DEFAULT_EMITTER_TYPE,
                    interval_ms: 1000,
                    stagger_ms: 0,
                    policy: Traversal::Wrap,
                    waypoints: square,
                },
                EmitterSpec {
                    id: "6".into(),
                    kind: DEFAULT_EMITTER_TYPE,
                    interval_ms: 1000,
                    stagger_ms: 500,
                    policy: Traversal::PingPong,
                    waypoints: line,
                },
            ],
        }
    }
}

impl Default for Mission {
    fn default() -> Self {
        Self::builtin()
    }
}
