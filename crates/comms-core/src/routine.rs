//! Queue-draining helper.

use std::future::Future;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Spawn a task that invokes `f` for every item received on `rx`.
///
/// The task ends once the queue is closed and drained; it never spins on a
/// closed queue. Returns the task handle so callers can await completion.
pub fn spawn_consumer<T, F, Fut>(mut rx: mpsc::Receiver<T>, mut f: F) -> JoinHandle<()>
where
    T: Send + 'static,
    F: FnMut(T) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        while let Some(item) = rx.recv().await {
            f(item).await;
        }
        tracing::debug!("consumer queue closed");
    })
}
