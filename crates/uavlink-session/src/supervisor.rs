//! Link lifecycle: connect with backoff, run one epoch of tasks per
//! connection, tear it down on failure, repeat.

use std::fmt;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uavlink_frame::{DeviceId, FrameReader, FrameWriter};
use uavlink_transport::{Connector, LinkStream};

use crate::config::SessionConfig;
use crate::dispatch::run_dispatcher;
use crate::error::{Result, SessionError};
use crate::ingress::run_ingress;
use crate::link::LinkWriter;

/// Which epoch task finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskRole {
    Ingress,
    Dispatcher,
    Emitter(DeviceId),
}

impl fmt::Display for TaskRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskRole::Ingress => f.write_str("ingress"),
            TaskRole::Dispatcher => f.write_str("dispatcher"),
            TaskRole::Emitter(id) => write!(f, "emitter {id}"),
        }
    }
}

/// Owns the connector and restarts the session on every link loss.
pub struct Supervisor<C> {
    connector: C,
    config: SessionConfig,
}

impl<C: Connector> Supervisor<C> {
    /// Create a supervisor. Fails if the mission cannot be built.
    pub fn new(connector: C, config: SessionConfig) -> Result<Self> {
        config.mission.validate()?;
        Ok(Self { connector, config })
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// Link failures never end this loop; they end the current epoch and
    /// lead to a reconnect after the configured backoff.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let mut epoch: u64 = 0;
        loop {
            let link = tokio::select! {
                _ = shutdown.cancelled() => break,
                link = self.connect_with_backoff() => link,
            };
            epoch += 1;

            match self.run_epoch(epoch, link, &shutdown).await {
                Ok(()) => break,
                Err(err) => warn!(epoch, error = %err, "link epoch ended"),
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.reconnect_backoff) => {}
            }
        }
        info!("session supervisor stopped");
        Ok(())
    }

    /// Try to open the link until it succeeds, sleeping the fixed backoff
    /// after every failure.
    pub async fn connect_with_backoff(&self) -> LinkStream {
        let endpoint = self.connector.endpoint();
        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            match self.connector.connect().await {
                Ok(link) => {
                    info!(
                        endpoint = %endpoint,
                        attempt,
                        transport = link.transport_name(),
                        "link connected"
                    );
                    return link;
                }
                Err(err) => {
                    error!(
                        endpoint = %endpoint,
                        attempt,
                        error = %err,
                        retry_in_ms = self.config.reconnect_backoff.as_millis() as u64,
                        "link unavailable"
                    );
                }
            }
            tokio::time::sleep(self.config.reconnect_backoff).await;
        }
    }

    /// Run one epoch on an open link.
    ///
    /// Returns `Ok(())` only when `shutdown` fires; otherwise the error that
    /// ended the epoch. Every task spawned here is finished or aborted before
    /// this returns.
    pub async fn run_epoch(
        &self,
        epoch: u64,
        link: LinkStream,
        shutdown: &CancellationToken,
    ) -> Result<()> {
        let frame = self.config.frame.clone();
        let (rd, wr) = link.split();
        let reader = FrameReader::with_config(rd, frame.clone());
        let writer = LinkWriter::new(FrameWriter::with_config(wr, frame));
        writer.flush().await?;

        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let stop = CancellationToken::new();

        let mut dispatcher = JoinSet::new();
        dispatcher.spawn(run_dispatcher(queue_rx, writer.clone()));

        let mut tasks: JoinSet<(TaskRole, Result<()>)> = JoinSet::new();
        let ingress_stop = stop.clone();
        tasks.spawn(async move {
            let result = run_ingress(reader, queue_tx, ingress_stop).await;
            (TaskRole::Ingress, result)
        });
        for spec in &self.config.mission.emitters {
            let emitter = spec.build()?;
            let role = TaskRole::Emitter(emitter.id().clone());
            let writer = writer.clone();
            tasks.spawn(async move { (role, emitter.run(writer).await) });
        }
        drop(writer);
        info!(epoch, tasks = tasks.len() + 1, "link epoch started");

        let mut dispatcher_done = false;
        // Ingress is polled before the dispatcher: once ingress ends the
        // dispatcher also finishes, and the ingress error is the real cause.
        let ended = tokio::select! {
            biased;
            _ = shutdown.cancelled() => Ok(()),
            Some(joined) = tasks.join_next() => Err(task_result(joined)),
            Some(joined) = dispatcher.join_next() => {
                dispatcher_done = true;
                Err(dispatcher_result(joined))
            }
        };

        stop.cancel();
        if !dispatcher_done {
            match tokio::time::timeout(self.config.drain_timeout, dispatcher.join_next()).await {
                Ok(Some(Ok(Ok(())))) => debug!(epoch, "dispatcher drained"),
                Ok(Some(joined)) => warn!(
                    epoch,
                    error = %dispatcher_result(joined),
                    "dispatcher failed while draining"
                ),
                Ok(None) => {}
                Err(_) => warn!(
                    epoch,
                    timeout_ms = self.config.drain_timeout.as_millis() as u64,
                    "dispatcher did not drain in time"
                ),
            }
        }
        dispatcher.shutdown().await;
        tasks.shutdown().await;
        debug!(epoch, "link epoch torn down");

        ended
    }
}

impl<C> fmt::Debug for Supervisor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn dispatcher_result(joined: std::result::Result<Result<()>, JoinError>) -> SessionError {
    task_result(joined.map(|result| (TaskRole::Dispatcher, result)))
}

// Turn a finished task into the reason its epoch ends.
fn task_result(joined: std::result::Result<(TaskRole, Result<()>), JoinError>) -> SessionError {
    match joined {
        Ok((role, Err(err))) => {
            debug!(task = %role, error = %err, "epoch task failed");
            err
        }
        Ok((role, Ok(()))) => SessionError::TaskFailed(format!("{role} exited")),
        Err(err) if err.is_panic() => SessionError::TaskFailed(format!("task panicked: {err}")),
        Err(err) => SessionError::TaskFailed(err.to_string()),
    }
}
