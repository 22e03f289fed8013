//! Command dispatch: the fixed inbound-type → outbound-type protocol table.

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};
use uavlink_frame::Packet;

use crate::error::{Result, SessionError};
use crate::link::LinkWriter;

/// Log target for the consumed-packet audit trail.
pub const AUDIT_TARGET: &str = "uavlink::audit";

/// Device id carried by every dispatched reply.
pub const REPLY_DEVICE_ID: &str = "4";

/// One row of the dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchRule {
    pub inbound: i64,
    pub outbound: i64,
    pub label: &'static str,
}

/// The protocol table. Process-wide constant.
pub const DISPATCH_TABLE: [DispatchRule; 4] = [
    DispatchRule {
        inbound: 24,
        outbound: 25,
        label: "forward-1",
    },
    DispatchRule {
        inbound: 26,
        outbound: 27,
        label: "forward-2",
    },
    DispatchRule {
        inbound: 28,
        outbound: 29,
        label: "flight started",
    },
    DispatchRule {
        inbound: 30,
        outbound: 31,
        label: "flight aborted",
    },
];

/// Find the rule for an inbound packet type.
pub fn lookup(kind: i64) -> Option<&'static DispatchRule> {
    DISPATCH_TABLE.iter().find(|rule| rule.inbound == kind)
}

/// What the dispatcher does with one consumed packet.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Send `reply` on the link.
    Reply {
        rule: &'static DispatchRule,
        reply: Packet,
    },
    /// No rule matches; nothing is sent.
    Unknown,
}

/// Apply the dispatch table to one packet.
///
/// Replies carry only the rule's outbound type and the fixed device id; every
/// other field is the packet default regardless of the inbound values.
pub fn dispatch(packet: &Packet) -> Outcome {
    match lookup(packet.kind) {
        Some(rule) => Outcome::Reply {
            rule,
            reply: Packet::new(REPLY_DEVICE_ID, rule.outbound),
        },
        None => Outcome::Unknown,
    }
}

/// Consume packets in arrival order until the queue closes.
///
/// Every consumed packet is written to the audit trail before it is
/// dispatched. A reply that cannot be framed is logged and skipped; a failed
/// link write ends the loop with the link error.
pub async fn run_dispatcher(
    mut queue: UnboundedReceiver<Packet>,
    writer: LinkWriter,
) -> Result<()> {
    while let Some(packet) = queue.recv().await {
        info!(
            target: AUDIT_TARGET,
            id = %packet.id,
            kind = packet.kind,
            packet = %packet,
            "consumed"
        );

        match dispatch(&packet) {
            Outcome::Reply { rule, reply } => {
                info!(
                    inbound = rule.inbound,
                    outbound = rule.outbound,
                    rule = rule.label,
                    "dispatching reply"
                );
                match writer.send(&reply).await {
                    Ok(()) => {}
                    Err(SessionError::Frame(err)) if !err.is_link_error() => {
                        warn!(outbound = rule.outbound, error = %err, "reply not sent");
                    }
                    Err(err) => return Err(err),
                }
            }
            Outcome::Unknown => {
                info!(kind = packet.kind, packet = %packet, "unknown packet type");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fmt;
    use std::sync::{Arc, Mutex};

    use tokio::sync::mpsc;
    use tracing::field::{Field, Visit};
    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;
    use uavlink_frame::{DeviceId, FrameConfig, FrameReader, FrameWriter};
    use uavlink_transport::LinkStream;

    use super::*;

    /// Records `(target, message)` for every event.
    #[derive(Clone, Default)]
    struct CapturedEvents(Arc<Mutex<Vec<(String, String)>>>);

    impl CapturedEvents {
        fn count(&self, target: &str, message: &str) -> usize {
            self.0
                .lock()
                .unwrap()
                .iter()
                .filter(|(t, m)| t == target && m == message)
                .count()
        }
    }

    impl<S: Subscriber> Layer<S> for CapturedEvents {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let mut message = MessageField::default();
            event.record(&mut message);
            self.0
                .lock()
                .unwrap()
                .push((event.metadata().target().to_string(), message.0));
        }
    }

    #[derive(Default)]
    struct MessageField(String);

    impl Visit for MessageField {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            if field.name() == "message" {
                self.0 = format!("{value:?}");
            }
        }
    }

    #[test]
    fn every_rule_replies_with_defaults() {
        for rule in &DISPATCH_TABLE {
            let inbound = Packet::new("1", rule.inbound)
                .with_seq(42)
                .with_position(0.0, 0.0);
            match dispatch(&inbound) {
                Outcome::Reply { rule: hit, reply } => {
                    assert_eq!(hit, rule);
                    assert_eq!(reply, Packet::new("4", rule.outbound));
                }
                Outcome::Unknown => panic!("type {} should match", rule.inbound),
            }
        }
    }

    #[test]
    fn unmatched_types_are_unknown() {
        for kind in [i64::MIN, -24, -1, 0, 1, 23, 25, 27, 29, 31, 32, 1000, 70_000] {
            assert_eq!(dispatch(&Packet::new("1", kind)), Outcome::Unknown);
        }
    }

    #[test]
    fn table_is_keyed_uniquely() {
        for (i, a) in DISPATCH_TABLE.iter().enumerate() {
            for b in &DISPATCH_TABLE[i + 1..] {
                assert_ne!(a.inbound, b.inbound);
            }
        }
        assert_eq!(lookup(28).map(|r| r.label), Some("flight started"));
    }

    #[tokio::test]
    async fn dispatcher_replies_in_arrival_order() {
        let (link, remote) = LinkStream::memory_pair(4096);
        let (_rd, wr) = link.split();
        let writer = LinkWriter::new(FrameWriter::new(wr));
        let (tx, rx) = mpsc::unbounded_channel();

        for kind in [30, 99, 24, 28, 26] {
            tx.send(Packet::new("1", kind)).unwrap();
        }
        drop(tx);

        run_dispatcher(rx, writer).await.unwrap();

        let mut reader = FrameReader::new(remote);
        let mut kinds = Vec::new();
        for _ in 0..4 {
            let reply = reader.read_packet().await.unwrap();
            assert_eq!(reply.id, DeviceId::from("4"));
            kinds.push(reply.kind);
        }
        assert_eq!(kinds, vec![31, 25, 29, 27]);
    }

    #[tokio::test]
    async fn every_consumed_packet_is_audited_once() {
        let events = CapturedEvents::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(events.clone()));

        let (link, _remote) = LinkStream::memory_pair(4096);
        let (_rd, wr) = link.split();
        let writer = LinkWriter::new(FrameWriter::new(wr));
        let (tx, rx) = mpsc::unbounded_channel();
        for kind in [24, 99, 70_000, -1, 26] {
            tx.send(Packet::new("1", kind)).unwrap();
        }
        drop(tx);

        run_dispatcher(rx, writer).await.unwrap();

        let target = "uavlink_session::dispatch";
        assert_eq!(events.count(AUDIT_TARGET, "consumed"), 5);
        assert_eq!(events.count(target, "unknown packet type"), 3);
        assert_eq!(events.count(target, "dispatching reply"), 2);
    }

    #[tokio::test]
    async fn unframeable_reply_is_skipped() {
        let (link, remote) = LinkStream::memory_pair(4096);
        let (rd, wr) = link.split();
        let writer = LinkWriter::new(FrameWriter::with_config(
            wr,
            FrameConfig { max_line_len: 32 },
        ));
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(Packet::new("1", 24)).unwrap();
        drop(tx);

        run_dispatcher(rx, writer).await.unwrap();
        drop(rd);

        let mut reader = FrameReader::new(remote);
        assert!(matches!(
            reader.read_packet().await,
            Err(uavlink_frame::FrameError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn dispatcher_stops_on_write_failure() {
        let (link, remote) = LinkStream::memory_pair(64);
        drop(remote);
        let (_rd, wr) = link.split();
        let writer = LinkWriter::new(FrameWriter::new(wr));
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(Packet::new("1", 24)).unwrap();

        let err = run_dispatcher(rx, writer).await.unwrap_err();
        assert!(err.is_link_fatal());
    }

    #[tokio::test]
    async fn unknown_types_do_not_touch_the_link() {
        let (link, remote) = LinkStream::memory_pair(64);
        drop(remote);
        let (_rd, wr) = link.split();
        let writer = LinkWriter::new(FrameWriter::new(wr));
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(Packet::new("1", 7)).unwrap();
        drop(tx);

        // The link is dead, so any write would fail.
        run_dispatcher(rx, writer).await.unwrap();
    }
}
