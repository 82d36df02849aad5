//! Persistence layer for alert rules, alerts, channels and mutes.
//!
//! The default implementation ([`sqlite::SqliteStore`]) keeps everything in
//! a single SQLite database with WAL mode for concurrent reads. The engine
//! and manager crates only depend on the repository traits defined here, so
//! tests can substitute in-memory fakes.

pub mod error;
pub mod schema;
pub mod sqlite;


use chrono::{DateTime, Utc};
use error::Result;
use netmon_common::types::{
    Alert, AlertMute, AlertRule, DeliveryState, Device, MetricPoint, NotificationChannel,
};
use std::collections::HashMap;

pub use sqlite::SqliteStore;

/// Repository for alert rule definitions.
///
/// Implementations must be safe to share across threads (`Send + Sync`)
/// because rules are read by the evaluation loop while the CLI or an
/// operator mutates them.
pub trait RuleStore: Send + Sync {
    /// Persists a new rule. Fails with [`error::StorageError::Conflict`]
    /// when a rule with the same name already exists.
    fn create_rule(&self, rule: &AlertRule) -> Result<()>;

    /// Fetches one rule by id, failing with `NotFound` when absent.
    fn get_rule(&self, id: &str) -> Result<AlertRule>;

    /// Returns every rule, ordered by name.
    fn list_rules(&self) -> Result<Vec<AlertRule>>;

    /// Returns only rules currently enabled, ordered by name.
    fn list_enabled_rules(&self) -> Result<Vec<AlertRule>>;

    /// Replaces a rule row with the given state.
    fn update_rule(&self, rule: &AlertRule) -> Result<()>;

    /// Flips the enabled flag without touching the rest of the rule.
    fn set_rule_enabled(&self, id: &str, enabled: bool, now: DateTime<Utc>) -> Result<()>;

    /// Removes a rule. Alerts already raised by it are kept.
    fn delete_rule(&self, id: &str) -> Result<()>;
}

/// Repository for triggered alerts and their lifecycle fields.
pub trait AlertStore: Send + Sync {
    /// Persists a newly triggered alert.
    fn create_alert(&self, alert: &Alert) -> Result<()>;

    /// Fetches one alert by id, failing with `NotFound` when absent.
    fn get_alert(&self, id: &str) -> Result<Alert>;

    /// Returns the most recent alerts, newest first, capped at `limit`.
    fn list_alerts(&self, limit: usize) -> Result<Vec<Alert>>;

    /// Returns every unresolved alert, newest first.
    fn list_open_alerts(&self) -> Result<Vec<Alert>>;

    /// Looks for an alert of this (rule, device) pair triggered at or after
    /// `since`. Resolution state is ignored: the cooldown window counts any
    /// prior trigger.
    fn find_recent_alert(
        &self,
        rule_id: &str,
        host_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Alert>>;

    /// Stamps the acknowledgement fields.
    fn set_acknowledged(&self, id: &str, acknowledged_by: &str, at: DateTime<Utc>) -> Result<()>;

    /// Stamps the resolution time.
    fn set_resolved(&self, id: &str, at: DateTime<Utc>) -> Result<()>;

    /// Replaces the per-channel delivery outcome map.
    fn set_notification_status(
        &self,
        id: &str,
        status: &HashMap<String, DeliveryState>,
    ) -> Result<()>;

    /// Removes an alert record entirely.
    fn delete_alert(&self, id: &str) -> Result<()>;
}

/// Repository for notification channel definitions.
pub trait ChannelStore: Send + Sync {
    /// Persists a new channel. Fails with `Conflict` on a duplicate name.
    fn create_channel(&self, channel: &NotificationChannel) -> Result<()>;

    /// Fetches one channel by id, failing with `NotFound` when absent.
    fn get_channel(&self, id: &str) -> Result<NotificationChannel>;

    /// Returns every channel, ordered by name. Configs come back verbatim,
    /// credentials included; callers that display them must redact.
    fn list_channels(&self) -> Result<Vec<NotificationChannel>>;

    /// Replaces a channel row with the given state.
    fn update_channel(&self, channel: &NotificationChannel) -> Result<()>;

    /// Removes a channel definition.
    fn delete_channel(&self, id: &str) -> Result<()>;
}

/// Repository for alert mutes.
pub trait MuteStore: Send + Sync {
    /// Persists a new mute.
    fn create_mute(&self, mute: &AlertMute) -> Result<()>;

    /// Fetches one mute by id, failing with `NotFound` when absent.
    fn get_mute(&self, id: &str) -> Result<AlertMute>;

    /// Returns every mute, including expired ones, oldest first.
    fn list_mutes(&self) -> Result<Vec<AlertMute>>;

    /// Returns the mutes covering the (rule, device) pair at `now`: scope
    /// fields that are `NULL` match anything, and expired mutes are
    /// filtered out.
    fn find_active_mutes(
        &self,
        rule_id: &str,
        host_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<AlertMute>>;

    /// Removes a mute by id.
    fn delete_mute(&self, id: &str) -> Result<()>;

    /// Physically deletes mutes whose expiry has passed. Returns how many
    /// rows were removed.
    fn delete_expired_mutes(&self, now: DateTime<Utc>) -> Result<usize>;
}

/// Read side of the device inventory and metric history the evaluation
/// engine consumes.
pub trait MetricSource: Send + Sync {
    /// Returns the known devices, ordered by id.
    fn devices(&self) -> Result<Vec<Device>>;

    /// Returns the most recent sample of `metric_name` for the device, or
    /// `None` when the device has never reported that metric.
    fn latest_metric(&self, device_id: &str, metric_name: &str) -> Result<Option<MetricPoint>>;

    /// Returns the device's most recently reported status string, or `None`
    /// when the device has never reported one.
    fn latest_status(&self, device_id: &str) -> Result<Option<String>>;
}
