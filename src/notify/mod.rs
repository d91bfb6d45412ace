pub mod email;

use anyhow::Result;

/// Side-channel transport for operator messages. Callers treat every
/// send as best-effort; the agent never lets a transport failure reach
/// its control flow.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, subject: &str, html_body: &str) -> Result<()>;
}

#[async_trait::async_trait]
impl<T: Notifier + ?Sized> Notifier for std::sync::Arc<T> {
    async fn send(&self, subject: &str, html_body: &str) -> Result<()> {
        (**self).send(subject, html_body).await
    }
}

/// Used when no SMTP transport is configured.
pub struct NullNotifier;

#[async_trait::async_trait]
impl Notifier for NullNotifier {
    async fn send(&self, subject: &str, _html_body: &str) -> Result<()> {
        tracing::debug!(subject, "notifications disabled (no SMTP config)");
        Ok(())
    }
}

// --- Test helper ---
pub struct MemoryNotifier {
    pub sent: std::sync::Mutex<Vec<(String, String)>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self {
            sent: std::sync::Mutex::new(vec![]),
        }
    }
}

impl Default for MemoryNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Notifier for MemoryNotifier {
    async fn send(&self, subject: &str, html_body: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((subject.to_string(), html_body.to_string()));
        Ok(())
    }
}
