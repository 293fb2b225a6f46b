/// Physical mail delivery is somebody else's problem; the worker only needs
/// this surface.
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Dev-mode delivery: the mail goes to the log.
pub struct LogMailer;

#[async_trait::async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> anyhow::Result<()> {
        tracing::info!(to, subject, "email (log backend)");
        Ok(())
    }
}
