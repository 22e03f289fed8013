//! Link session management for uavlink.
//!
//! One supervisor owns the link. Each successful connection starts an
//! epoch: an ingress decoder feeding an unbounded queue, a dispatcher that
//! answers commands from a fixed table, and a set of telemetry emitters.
//! When any of them fails the epoch is torn down and the supervisor
//! reconnects after a fixed backoff.

pub mod config;
pub mod dispatch;
pub mod emitter;
pub mod error;
pub mod ingress;
pub mod link;
pub mod mission;
pub mod path;
pub mod supervisor;

pub use config::{SessionConfig, DEFAULT_DRAIN_TIMEOUT, DEFAULT_RECONNECT_BACKOFF};
pub use dispatch::{
    dispatch, lookup, run_dispatcher, DispatchRule, Outcome, AUDIT_TARGET, DISPATCH_TABLE,
    REPLY_DEVICE_ID,
};
pub use emitter::{Emitter, EmitterSpec, DEFAULT_EMITTER_TYPE};
pub use error::{Result, SessionError};
pub use ingress::run_ingress;
pub use link::LinkWriter;
pub use mission::Mission;
pub use path::{SeqCounter, Traversal, Waypoint, WaypointPath, SEQ_MODULUS};
pub use supervisor::{Supervisor, TaskRole};
