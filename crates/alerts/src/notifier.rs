//! Alert notification dispatch.

use crate::mailer::MailTransport;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Sends notifications to a recipient list. Failures are logged and
/// swallowed so they never block the caller.
#[derive(Clone)]
pub struct Notifier {
    transport: Option<Arc<dyn MailTransport>>,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl Notifier {
    /// Create a new notifier.
    pub fn new(transport: Arc<dyn MailTransport>) -> Self {
        Self {
            transport: Some(transport),
        }
    }

    /// Notifier without a transport: every send is a logged no-op.
    pub fn disabled() -> Self {
        Self { transport: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    /// Send one message addressed jointly to all `recipients`.
    pub async fn send(&self, recipients: &[String], subject: &str, body: &str) {
        if recipients.is_empty() {
            warn!("No email addresses found. Skipping email alert.");
            return;
        }

        let Some(transport) = &self.transport else {
            warn!("Mail transport not configured. Skipping email alert.");
            return;
        };

        match transport.deliver(recipients, subject, body).await {
            Ok(()) => info!("Email sent successfully to: {:?}", recipients),
            Err(e) => error!("Failed to send email: {}", e),
        }
    }
}
