use std::future::Future;
use std::io;

use tokio_util::sync::CancellationToken;
use tracing::info;
use uavlink_session::{Mission, SessionConfig, Supervisor};
use uavlink_transport::{LinkConfig, SerialConnector};

use crate::cmd::RunArgs;
use crate::exit::{io_error, session_error, CliResult, SUCCESS};

pub fn run(args: RunArgs) -> CliResult<i32> {
    let mission = match &args.mission {
        Some(path) => Mission::load(path).map_err(|err| session_error("mission", err))?,
        None => Mission::builtin(),
    };

    let link = LinkConfig {
        port: args.port.clone(),
        baud_rate: args.baud,
        ..LinkConfig::default()
    };
    let config = SessionConfig::default()
        .with_mission(mission)
        .with_reconnect_backoff(args.backoff)
        .with_drain_timeout(args.drain_timeout);
    let supervisor = Supervisor::new(SerialConnector::new(link), config)
        .map_err(|err| session_error("mission", err))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("runtime setup failed", err))?;

    runtime.block_on(async {
        let shutdown = CancellationToken::new();
        let signal = shutdown_signal().map_err(|err| io_error("signal handler setup failed", err))?;
        tokio::spawn(cancel_on(signal, shutdown.clone()));
        supervisor
            .run(shutdown)
            .await
            .map_err(|err| session_error("session", err))
    })?;

    Ok(SUCCESS)
}

async fn cancel_on(signal: impl Future<Output = ()>, shutdown: CancellationToken) {
    signal.await;
    info!("shutdown requested");
    shutdown.cancel();
}

// Handlers are installed before this returns, not on first poll.
#[cfg(unix)]
fn shutdown_signal() -> io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => {}
            _ = terminate.recv() => {}
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> io::Result<impl Future<Output = ()>> {
    Ok(async {
        let _ = tokio::signal::ctrl_c().await;
    })
}
