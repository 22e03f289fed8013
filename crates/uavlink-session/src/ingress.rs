use tokio::io::AsyncRead;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};
use uavlink_frame::{decode_packet, FrameReader, Packet};

use crate::error::{Result, SessionError};

/// Read lines from the link and queue decoded packets in arrival order.
///
/// Malformed lines are logged and dropped. Returns `Ok(())` when `stop` is
/// cancelled and an error when the link read fails, which is the signal
/// that the link is dead.
pub async fn run_ingress<R>(
    mut reader: FrameReader<R>,
    queue: UnboundedSender<Packet>,
    stop: CancellationToken,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    loop {
        let line = tokio::select! {
            _ = stop.cancelled() => return Ok(()),
            line = reader.read_line() => line,
        };

        let line = match line {
            Ok(line) => line,
            Err(err) if err.is_decode_error() => {
                warn!(error = %err, "dropping unreadable line");
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        match decode_packet(&line) {
            Ok(packet) => {
                trace!(packet = %packet, "queued");
                queue.send(packet).map_err(|_| SessionError::QueueClosed)?;
            }
            Err(err) => {
                warn!(
                    error = %err,
                    line = %String::from_utf8_lossy(&line),
                    "dropping malformed line"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncWriteExt;
    use tokio::sync::mpsc;
    use uavlink_frame::FrameError;
    use uavlink_transport::LinkStream;

    use super::*;
    use crate::dispatch::{dispatch, Outcome};

    #[tokio::test]
    async fn malformed_lines_are_dropped_and_reading_continues() {
        let wire = concat!(
            "{\"id\":\"1\",\"type\":24}\n",
            "garbage\n",
            "\n",
            "{\"id\":\"1\",\"type\":\n",
            "{\"id\":\"\u{e9}\",\"type\":26}\n",
            "{\"type\":26}\n",
            "{\"id\":\"2\",\"type\":30}\n",
        );
        let (tx, mut rx) = mpsc::unbounded_channel();

        let err = run_ingress(
            FrameReader::new(wire.as_bytes()),
            tx,
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Frame(FrameError::ConnectionClosed)
        ));

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!((first.kind, second.kind), (24, 30));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn any_integer_type_or_seq_is_queued() {
        let wire = concat!(
            "{\"id\":\"1\",\"type\":70000}\n",
            "{\"id\":\"1\",\"type\":-1}\n",
            "{\"id\":\"1\",\"type\":24,\"seq\":300}\n",
        );
        let (tx, mut rx) = mpsc::unbounded_channel();

        let _ = run_ingress(
            FrameReader::new(wire.as_bytes()),
            tx,
            CancellationToken::new(),
        )
        .await;

        let mut queued = Vec::new();
        while let Some(packet) = rx.recv().await {
            queued.push(packet);
        }
        assert_eq!(queued.len(), 3);
        assert_eq!(dispatch(&queued[0]), Outcome::Unknown);
        assert_eq!(dispatch(&queued[1]), Outcome::Unknown);
        assert_eq!(queued[2].seq, 300);
        assert!(matches!(
            dispatch(&queued[2]),
            Outcome::Reply { ref reply, .. } if reply.kind == 25 && reply.seq == 0
        ));
    }

    #[tokio::test]
    async fn overlong_line_does_not_stop_ingress() {
        let mut wire = "x".repeat(uavlink_frame::DEFAULT_MAX_LINE + 10);
        wire.push('\n');
        wire.push_str("{\"id\":\"1\",\"type\":28}\n");
        let (tx, mut rx) = mpsc::unbounded_channel();

        let _ = run_ingress(
            FrameReader::new(wire.as_bytes()),
            tx,
            CancellationToken::new(),
        )
        .await;
        assert_eq!(rx.recv().await.unwrap().kind, 28);
    }

    #[tokio::test]
    async fn stop_token_ends_ingress_while_waiting() {
        let (link, _remote) = LinkStream::memory_pair(64);
        let (rd, _wr) = link.split();
        let (tx, _rx) = mpsc::unbounded_channel();
        let stop = CancellationToken::new();

        let task = tokio::spawn(run_ingress(FrameReader::new(rd), tx, stop.clone()));
        stop.cancel();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn closed_queue_is_reported() {
        let (link, mut remote) = LinkStream::memory_pair(64);
        let (rd, _wr) = link.split();
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        remote.write_all(b"{\"id\":\"1\",\"type\":24}\n").await.unwrap();
        let err = run_ingress(FrameReader::new(rd), tx, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::QueueClosed));
    }
}
