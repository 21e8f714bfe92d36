use serde::Serialize;
use tracing::{error, info};

use crate::adaptive::connector::error::Result;

/// Sender shown on job notifications.
pub const NOTIFICATION_FROM: &str = "Adaptive Connector Job Notification";
/// Fixed recipient of job notifications.
pub const NOTIFICATION_TO: &str = "databot";

/// Job status message handed to a [`Notifier`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub success: bool,
    pub subject: String,
    pub from: String,
    pub to: String,
    pub body: String,
}

impl Notification {
    /// Builds the status message for a finished run from its captured
    /// diagnostic text.
    pub fn job_status(success: bool, diagnostics: &str) -> Self {
        let (kind, lead) = if success {
            ("Success", "The Adaptive job ran successfully.")
        } else {
            ("Error", "The Adaptive job encountered an error:")
        };
        Self {
            success,
            subject: format!("Adaptive - {kind}"),
            from: NOTIFICATION_FROM.to_string(),
            to: NOTIFICATION_TO.to_string(),
            body: format!("{lead}\n{diagnostics}"),
        }
    }
}

/// Delivers job status messages.
pub trait Notifier {
    fn notify(&mut self, notification: &Notification) -> Result<()>;
}

/// Emits notifications as structured log events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&mut self, notification: &Notification) -> Result<()> {
        if notification.success {
            info!(
                subject = %notification.subject,
                to = %notification.to,
                body = %notification.body,
                "job notification"
            );
        } else {
            error!(
                subject = %notification.subject,
                to = %notification.to,
                body = %notification.body,
                "job notification"
            );
        }
        Ok(())
    }
}

/// Keeps every notification it receives.
#[derive(Debug, Clone, Default)]
pub struct MemoryNotifier {
    pub sent: Vec<Notification>,
}

impl Notifier for MemoryNotifier {
    fn notify(&mut self, notification: &Notification) -> Result<()> {
        self.sent.push(notification.clone());
        Ok(())
    }
}
