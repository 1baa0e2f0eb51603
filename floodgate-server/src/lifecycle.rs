//! Process-wide shutdown sequencing.
//!
//! Shutdown runs in two phases: the listener stops accepting and in-flight
//! requests drain under a short deadline, then the task supervisor drains
//! under a longer one. Both deadlines are enforced even against waits that
//! would otherwise never return.

use crate::config::ShutdownConfig;
use crate::supervisor::TaskSupervisor;
use anyhow::Result;
use axum::Router;
use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tokio::time::timeout;

/// Lifecycle state, published through a watch channel.
///
/// Transitions are one-directional: Running -> Draining -> Stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Running,
    Draining,
    Stopped,
}

/// Owns the shutdown sequence for the whole process.
pub struct Coordinator {
    supervisor: TaskSupervisor,
    shutdown: ShutdownConfig,
    state: watch::Sender<State>,
}

impl Coordinator {
    pub fn new(supervisor: TaskSupervisor, shutdown: ShutdownConfig) -> Self {
        let (state, _) = watch::channel(State::Running);
        Coordinator {
            supervisor,
            shutdown,
            state,
        }
    }

    /// Observe lifecycle state transitions.
    pub fn state(&self) -> watch::Receiver<State> {
        self.state.subscribe()
    }

    /// Accept connections until `signal` fires, then drain and stop.
    ///
    /// Returns once `Stopped` is reached. Requests accepted before the
    /// signal get their responses unless the request drain deadline passes
    /// first; background tasks scheduled before shutdown complete before
    /// the process stops, bounded by the task drain deadline. Deadline
    /// violations are logged and absorbed -- only a failure of the listener
    /// itself, before any shutdown was requested, is an error.
    pub async fn serve<F>(self, listener: TcpListener, app: Router, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut drain_rx = self.state.subscribe();
        let graceful = async move {
            // An error here means the coordinator is gone; stop serving.
            let _ = drain_rx.wait_for(|state| *state == State::Draining).await;
        };

        let mut server = tokio::spawn(
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(graceful)
            .into_future(),
        );

        tokio::select! {
            _ = signal => {}
            result = &mut server => {
                self.state.send_replace(State::Stopped);
                return match result {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(err)) => Err(err.into()),
                    Err(join_err) => Err(anyhow::anyhow!("server task panicked: {join_err}")),
                };
            }
        }

        // Phase one: stop accepting, let in-flight requests finish.
        self.state.send_replace(State::Draining);
        tracing::info!("shutdown requested, draining in-flight requests");

        match timeout(self.shutdown.request_drain_timeout, &mut server).await {
            Ok(Ok(Ok(()))) => tracing::info!("in-flight requests finished"),
            Ok(Ok(Err(err))) => tracing::error!(error = %err, "server failed while draining"),
            Ok(Err(join_err)) => tracing::error!(error = %join_err, "server task panicked"),
            Err(_) => {
                // Non-fatal: the deadline bounds how long clients can hold us up.
                tracing::warn!(
                    deadline = ?self.shutdown.request_drain_timeout,
                    "request drain deadline exceeded, terminating remaining connections"
                );
                server.abort();
            }
        }

        // Phase two: wait out the background tasks.
        let outstanding = self.supervisor.outstanding();
        if outstanding > 0 {
            tracing::info!(outstanding, "waiting for background tasks to finish");
        }
        if self.supervisor.wait_idle(self.shutdown.task_drain_timeout).await {
            tracing::info!("background tasks drained");
        } else {
            // Operational fault: work may have been lost, but an indefinite
            // hang is worse than exiting.
            tracing::error!(
                outstanding = self.supervisor.outstanding(),
                deadline = ?self.shutdown.task_drain_timeout,
                "background tasks did not drain before deadline, exiting anyway"
            );
        }

        self.state.send_replace(State::Stopped);
        Ok(())
    }
}


/// Wait for a termination signal (Ctrl-C or, on Unix, SIGTERM).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        // If the handler cannot be installed the process has no way to
        // shut down cleanly, which is worth dying loudly over.
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            tracing::info!("received SIGTERM, initiating shutdown");
        }
    }
}
