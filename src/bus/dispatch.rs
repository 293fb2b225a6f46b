use std::future::Future;
use tokio::task::JoinHandle;

/// Detached, non-blocking, best-effort execution. The spawned task keeps
/// running if the caller's request future is dropped mid-flight, which is
/// what makes post-commit cache writes and publishes non-cancelable.
pub fn detach<F>(label: &'static str, fut: F) -> JoinHandle<()>
where
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = fut.await {
            tracing::warn!(error = %format!("{e:#}"), "{label} failed");
        }
    })
}
