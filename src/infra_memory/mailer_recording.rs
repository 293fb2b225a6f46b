use crate::worker::Mailer;
use dashmap::DashSet;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Records every send; addresses can be marked to fail, to exercise
/// per-recipient failure isolation.
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
    failing: DashSet<String>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: DashSet::new(),
        }
    }

    pub fn fail_address(&self, address: &str) {
        self.failing.insert(address.to_string());
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().expect("sent mail lock").clone()
    }

    pub fn sent_to(&self, address: &str) -> usize {
        self.sent
            .lock()
            .expect("sent mail lock")
            .iter()
            .filter(|m| m.to == address)
            .count()
    }
}

impl Default for RecordingMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        if self.failing.contains(to) {
            anyhow::bail!("smtp rejected {to}");
        }
        self.sent.lock().expect("sent mail lock").push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
