//! One-time-code delivery.
//!
//! The engine records the transfer initiation before the code leaves the
//! process, so a delivery failure never erases the audit entry.

use std::error::Error;

/// Delivers short out-of-band messages to a user.
pub trait Notifier: Send + Sync {
    fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Default notifier: writes the message to the log instead of sending it.
///
/// Stands in until a mail transport is wired up; useful as-is for local
/// runs and tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::info!(recipient, subject, body, "notification");
        Ok(())
    }
}
