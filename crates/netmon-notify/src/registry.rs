use crate::email::EmailNotifier;
use crate::error::Result;
use crate::webhook::WebhookNotifier;
use crate::Notifier;
use netmon_common::types::{ChannelConfig, NotificationChannel};

/// Builds a concrete [`Notifier`] from a stored channel definition.
///
/// Split out as a trait so dispatcher tests can substitute scripted
/// notifiers without touching SMTP or HTTP.
pub trait NotifierFactory: Send + Sync {
    fn build(&self, channel: &NotificationChannel) -> Result<Box<dyn Notifier>>;
}

/// Default factory covering the built-in channel kinds.
///
/// # Examples
///
/// ```
/// use netmon_common::types::{ChannelConfig, WebhookConfig};
/// use netmon_notify::registry::NotifierRegistry;
///
/// let registry = NotifierRegistry::default();
/// let config = ChannelConfig::Webhook(WebhookConfig {
///     url: "https://hooks.example.com/netmon".to_string(),
///     method: "POST".to_string(),
///     headers: Default::default(),
///     bearer_token: None,
/// });
/// assert!(registry.validate(&config).is_ok());
/// ```
#[derive(Default)]
pub struct NotifierRegistry;

impl NotifierRegistry {
    /// Checks a config without keeping the notifier, for create and update
    /// validation at the API edge.
    pub fn validate(&self, config: &ChannelConfig) -> Result<()> {
        match config {
            ChannelConfig::Email(email) => {
                EmailNotifier::new(email)?;
            }
            ChannelConfig::Webhook(webhook) => {
                WebhookNotifier::new(webhook)?;
            }
        }
        Ok(())
    }
}

impl NotifierFactory for NotifierRegistry {
    fn build(&self, channel: &NotificationChannel) -> Result<Box<dyn Notifier>> {
        match &channel.config {
            ChannelConfig::Email(email) => Ok(Box::new(EmailNotifier::new(email)?)),
            ChannelConfig::Webhook(webhook) => Ok(Box::new(WebhookNotifier::new(webhook)?)),
        }
    }
}
