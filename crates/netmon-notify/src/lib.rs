//! Notification delivery with pluggable channel support.
//!
//! Alerts are fanned out to one or more [`Notifier`] implementations based
//! on each channel's enabled flag and minimum severity. Built-in channels
//! cover email (SMTP) and webhooks; the [`registry::NotifierFactory`] trait
//! is the seam for adding more.

pub mod dispatcher;
pub mod email;
pub mod error;
pub mod registry;
pub mod utils;
pub mod webhook;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use netmon_common::types::Alert;

/// A delivery channel that pushes one alert to an external service
/// (e.g., SMTP, webhook endpoint).
///
/// Implementations are created by the [`registry::NotifierFactory`] from
/// stored channel definitions.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers the alert through this channel.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery fails after retries.
    async fn send(&self, alert: &Alert) -> error::Result<()>;

    /// Returns the channel type name (e.g., `"email"`, `"webhook"`).
    fn kind(&self) -> &'static str;
}
