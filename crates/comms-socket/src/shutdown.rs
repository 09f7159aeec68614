//! Process-level interrupt fan-out via `CancellationToken`.
//!
//! One coordinator listens for Ctrl-C once; every session receives a clone of
//! its token and runs the cooperative close path when it fires.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Default time to wait for tracked tasks before giving up.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Coordinates the interrupt shared by every session in the process.
#[derive(Clone, Debug)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Create a new coordinator.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// A clone of the interrupt token, handed to sessions and actors.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Fire the interrupt.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether the interrupt has fired.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Spawn a task that fires the interrupt on the first Ctrl-C.
    ///
    /// The task also ends, without firing, if the interrupt is triggered
    /// some other way first.
    pub fn install_interrupt_handler(&self) -> JoinHandle<()> {
        let token = self.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => info!("interrupt signal received"),
                        Err(e) => warn!(error = %e, "failed to listen for interrupt signal"),
                    }
                    token.cancel();
                }
                () = token.cancelled() => {}
            }
        })
    }

    /// Fire the interrupt and wait up to `timeout` for `handles` to finish.
    pub async fn graceful_shutdown(&self, handles: Vec<JoinHandle<()>>, timeout: Option<Duration>) {
        let timeout = timeout.unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT);

        self.shutdown();
        info!(
            task_count = handles.len(),
            timeout_secs = timeout.as_secs(),
            "waiting for tasks to complete"
        );

        let drain = futures::future::join_all(handles);
        if tokio::time::timeout(timeout, drain).await.is_err() {
            warn!("shutdown timed out after {timeout:?}, some tasks may still be running");
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
