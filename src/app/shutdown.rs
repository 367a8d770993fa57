//! Graceful shutdown handling.

use tokio_util::sync::CancellationToken;

/// Shuts down the background progress-logging task.
///
/// Cancellation is signaled first, then the task is awaited so the runner
/// does not report itself stopped while the task is still mid-write.
pub async fn shutdown_gracefully(
    cancel: CancellationToken,
    logging_task: Option<tokio::task::JoinHandle<()>>,
) {
    cancel.cancel();
    if let Some(logging_task) = logging_task {
        let _ = logging_task.await;
    }
}
