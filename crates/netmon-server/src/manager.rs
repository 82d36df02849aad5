//! The alert manager fronts every alerting operation: rule, channel and
//! mute administration, the alert lifecycle, and the periodic evaluation
//! and maintenance sweeps.

use crate::error::{ManagerError, Result};
use chrono::Utc;
use netmon_alert::engine::{stale_alerts, AlertEngine, StalePolicy};
use netmon_common::id;
use netmon_common::types::{
    Alert, AlertMute, AlertRule, AlertRuleUpdate, ChannelUpdate, DeliveryState, NewAlertRule,
    NewChannel, NewMute, NotificationChannel, RuleCondition,
};
use netmon_notify::dispatcher::NotificationDispatcher;
use netmon_notify::registry::NotifierRegistry;
use netmon_storage::error::StorageError;
use netmon_storage::{AlertStore, ChannelStore, MuteStore, RuleStore};
use std::collections::HashMap;
use std::sync::Arc;

/// What one evaluation cycle did, for logs and the `evaluate` command.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub alerts_triggered: usize,
    pub rules_evaluated: usize,
    pub devices_evaluated: usize,
    pub metric_errors: usize,
    pub notifications_sent: usize,
    pub notifications_failed: usize,
}

pub struct AlertManager {
    rules: Arc<dyn RuleStore>,
    alerts: Arc<dyn AlertStore>,
    channels: Arc<dyn ChannelStore>,
    mutes: Arc<dyn MuteStore>,
    engine: AlertEngine,
    dispatcher: NotificationDispatcher,
    registry: NotifierRegistry,
    stale_policy: StalePolicy,
}

impl AlertManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rules: Arc<dyn RuleStore>,
        alerts: Arc<dyn AlertStore>,
        channels: Arc<dyn ChannelStore>,
        mutes: Arc<dyn MuteStore>,
        engine: AlertEngine,
        dispatcher: NotificationDispatcher,
        stale_policy: StalePolicy,
    ) -> Self {
        Self {
            rules,
            alerts,
            channels,
            mutes,
            engine,
            dispatcher,
            registry: NotifierRegistry::default(),
            stale_policy,
        }
    }

    // ---- Rules ----

    /// Validates and persists a new alert rule.
    ///
    /// Every referenced notification channel must already exist; a rule
    /// pointing at an unknown channel is rejected up front rather than
    /// failing silently at dispatch time.
    pub fn create_rule(&self, new: NewAlertRule) -> Result<AlertRule> {
        validate_rule_fields(&new.name, &new.condition, new.cooldown_minutes)?;
        self.validate_channel_ids(&new.notification_channels)?;

        let now = Utc::now();
        let rule = AlertRule {
            id: id::next_id(),
            name: new.name.trim().to_string(),
            condition: new.condition,
            host_id: new.host_id,
            severity: new.severity,
            enabled: new.enabled,
            notification_channels: new.notification_channels,
            cooldown_minutes: new.cooldown_minutes,
            created_at: now,
            updated_at: now,
        };
        self.rules.create_rule(&rule)?;
        tracing::info!(rule_id = %rule.id, name = %rule.name, "Alert rule created");
        Ok(rule)
    }

    /// Applies a partial update. Fields left as `None` keep their current
    /// value; `host_id: Some(None)` clears the device pin. The merged rule
    /// is re-validated before anything is written.
    pub fn update_rule(&self, id: &str, update: AlertRuleUpdate) -> Result<AlertRule> {
        let mut rule = self.rules.get_rule(id)?;
        if let Some(name) = update.name {
            rule.name = name;
        }
        if let Some(condition) = update.condition {
            rule.condition = condition;
        }
        if let Some(host_id) = update.host_id {
            rule.host_id = host_id;
        }
        if let Some(severity) = update.severity {
            rule.severity = severity;
        }
        if let Some(enabled) = update.enabled {
            rule.enabled = enabled;
        }
        if let Some(channels) = update.notification_channels {
            rule.notification_channels = channels;
        }
        if let Some(cooldown) = update.cooldown_minutes {
            rule.cooldown_minutes = cooldown;
        }

        validate_rule_fields(&rule.name, &rule.condition, rule.cooldown_minutes)?;
        self.validate_channel_ids(&rule.notification_channels)?;
        rule.name = rule.name.trim().to_string();
        rule.updated_at = Utc::now();
        self.rules.update_rule(&rule)?;
        Ok(rule)
    }

    /// Deletes a rule. Alerts it already raised are kept, with the rule
    /// name snapshot preserved on each alert.
    pub fn delete_rule(&self, id: &str) -> Result<()> {
        self.rules.delete_rule(id)?;
        tracing::info!(rule_id = %id, "Alert rule deleted");
        Ok(())
    }

    pub fn enable_rule(&self, id: &str) -> Result<()> {
        self.rules.set_rule_enabled(id, true, Utc::now())?;
        Ok(())
    }

    pub fn disable_rule(&self, id: &str) -> Result<()> {
        self.rules.set_rule_enabled(id, false, Utc::now())?;
        Ok(())
    }

    pub fn get_rule(&self, id: &str) -> Result<AlertRule> {
        Ok(self.rules.get_rule(id)?)
    }

    pub fn list_rules(&self) -> Result<Vec<AlertRule>> {
        Ok(self.rules.list_rules()?)
    }

    // ---- Notification channels ----

    /// Validates and persists a new channel. The returned copy has its
    /// credentials redacted; the stored row keeps them intact.
    pub fn create_channel(&self, new: NewChannel) -> Result<NotificationChannel> {
        if new.name.trim().is_empty() {
            return Err(ManagerError::Validation(
                "channel name cannot be empty".to_string(),
            ));
        }
        self.registry
            .validate(&new.config)
            .map_err(|e| ManagerError::Validation(e.to_string()))?;

        let now = Utc::now();
        let mut channel = NotificationChannel {
            id: id::next_id(),
            name: new.name.trim().to_string(),
            config: new.config,
            min_severity: new.min_severity,
            enabled: new.enabled,
            created_at: now,
            updated_at: now,
        };
        self.channels.create_channel(&channel)?;
        tracing::info!(
            channel_id = %channel.id,
            name = %channel.name,
            kind = channel.config.channel_type(),
            "Notification channel created"
        );
        channel.config = channel.config.redacted();
        Ok(channel)
    }

    /// Partial channel update; a replacement config is validated before it
    /// is stored. Returns the merged channel, redacted.
    pub fn update_channel(&self, id: &str, update: ChannelUpdate) -> Result<NotificationChannel> {
        let mut channel = self.channels.get_channel(id)?;
        if let Some(name) = update.name {
            channel.name = name;
        }
        if let Some(config) = update.config {
            self.registry
                .validate(&config)
                .map_err(|e| ManagerError::Validation(e.to_string()))?;
            channel.config = config;
        }
        if let Some(min_severity) = update.min_severity {
            channel.min_severity = min_severity;
        }
        if let Some(enabled) = update.enabled {
            channel.enabled = enabled;
        }
        if channel.name.trim().is_empty() {
            return Err(ManagerError::Validation(
                "channel name cannot be empty".to_string(),
            ));
        }
        channel.name = channel.name.trim().to_string();
        channel.updated_at = Utc::now();
        self.channels.update_channel(&channel)?;
        channel.config = channel.config.redacted();
        Ok(channel)
    }

    /// Deletes a channel. Rules that still reference it keep the dangling
    /// id; the next dispatch records a failed delivery for it.
    pub fn delete_channel(&self, id: &str) -> Result<()> {
        self.channels.delete_channel(id)?;
        tracing::info!(channel_id = %id, "Notification channel deleted");
        Ok(())
    }

    pub fn get_channel(&self, id: &str) -> Result<NotificationChannel> {
        let mut channel = self.channels.get_channel(id)?;
        channel.config = channel.config.redacted();
        Ok(channel)
    }

    pub fn list_channels(&self) -> Result<Vec<NotificationChannel>> {
        let mut channels = self.channels.list_channels()?;
        for channel in &mut channels {
            channel.config = channel.config.redacted();
        }
        Ok(channels)
    }

    // ---- Mutes ----

    /// Creates a suppression window. At least one scope field must be set;
    /// a completely unscoped mute would silence the whole system.
    pub fn mute(&self, new: NewMute) -> Result<AlertMute> {
        if new.rule_id.is_none() && new.host_id.is_none() {
            return Err(ManagerError::Validation(
                "mute needs a rule_id, a host_id, or both".to_string(),
            ));
        }
        if let Some(rule_id) = &new.rule_id {
            self.rules.get_rule(rule_id)?;
        }

        let mute = AlertMute {
            id: id::next_id(),
            rule_id: new.rule_id,
            host_id: new.host_id,
            reason: new.reason,
            muted_by: new.muted_by,
            muted_at: Utc::now(),
            expires_at: new.expires_at,
        };
        self.mutes.create_mute(&mute)?;
        tracing::info!(
            mute_id = %mute.id,
            rule_id = ?mute.rule_id,
            host_id = ?mute.host_id,
            "Mute created"
        );
        Ok(mute)
    }

    pub fn unmute(&self, id: &str) -> Result<()> {
        self.mutes.delete_mute(id)?;
        Ok(())
    }

    pub fn list_mutes(&self) -> Result<Vec<AlertMute>> {
        Ok(self.mutes.list_mutes()?)
    }

    // ---- Alerts ----

    pub fn get_alert(&self, id: &str) -> Result<Alert> {
        Ok(self.alerts.get_alert(id)?)
    }

    pub fn list_alerts(&self, limit: usize) -> Result<Vec<Alert>> {
        Ok(self.alerts.list_alerts(limit)?)
    }

    pub fn list_open_alerts(&self) -> Result<Vec<Alert>> {
        Ok(self.alerts.list_open_alerts()?)
    }

    /// Marks an alert as acknowledged. Fails if it is already acknowledged
    /// or already resolved.
    pub fn acknowledge_alert(&self, id: &str, acknowledged_by: &str) -> Result<Alert> {
        let mut alert = self.alerts.get_alert(id)?;
        if alert.resolved_at.is_some() {
            return Err(ManagerError::InvalidTransition(
                "alert is already resolved".to_string(),
            ));
        }
        if alert.acknowledged_at.is_some() {
            return Err(ManagerError::InvalidTransition(
                "alert is already acknowledged".to_string(),
            ));
        }
        let now = Utc::now();
        self.alerts.set_acknowledged(id, acknowledged_by, now)?;
        alert.acknowledged_at = Some(now);
        alert.acknowledged_by = Some(acknowledged_by.to_string());
        tracing::info!(alert_id = %id, by = %acknowledged_by, "Alert acknowledged");
        Ok(alert)
    }

    /// Marks an alert as resolved. Resolving an already resolved alert is
    /// a no-op and returns the alert unchanged.
    pub fn resolve_alert(&self, id: &str) -> Result<Alert> {
        let mut alert = self.alerts.get_alert(id)?;
        if alert.resolved_at.is_some() {
            return Ok(alert);
        }
        let now = Utc::now();
        self.alerts.set_resolved(id, now)?;
        alert.resolved_at = Some(now);
        tracing::info!(alert_id = %id, "Alert resolved");
        Ok(alert)
    }

    // ---- Evaluation and maintenance sweeps ----

    /// Runs one evaluation sweep: evaluates every enabled rule, persists
    /// the alerts that fired and fans each one out to its channels.
    ///
    /// Alerts are written before dispatch starts, so a crash mid-send
    /// leaves a record with pending deliveries rather than losing the
    /// alert.
    pub async fn evaluate_rules(&self) -> Result<CycleReport> {
        let now = Utc::now();
        let rules = self.rules.list_enabled_rules()?;
        let summary = self.engine.evaluate(&rules, now)?;

        let mut report = CycleReport {
            rules_evaluated: summary.rules_evaluated,
            devices_evaluated: summary.devices_evaluated,
            metric_errors: summary.metric_errors,
            ..CycleReport::default()
        };

        for mut alert in summary.alerts {
            self.alerts.create_alert(&alert)?;
            tracing::info!(
                alert_id = %alert.id,
                rule = %alert.rule_name,
                severity = %alert.severity,
                "Alert triggered"
            );
            report.alerts_triggered += 1;

            let channel_ids: Vec<String> = alert.notification_status.keys().cloned().collect();
            let (channels, mut statuses) = self.load_channels(&channel_ids)?;
            statuses.extend(self.dispatcher.dispatch(&alert, &channels).await);

            for state in statuses.values() {
                match state {
                    DeliveryState::Sent => report.notifications_sent += 1,
                    DeliveryState::Failed => report.notifications_failed += 1,
                    DeliveryState::Pending => {}
                }
            }

            alert.notification_status = statuses;
            self.alerts
                .set_notification_status(&alert.id, &alert.notification_status)?;
        }

        tracing::info!(
            alerts = report.alerts_triggered,
            rules = report.rules_evaluated,
            sent = report.notifications_sent,
            failed = report.notifications_failed,
            "Evaluation cycle completed"
        );
        Ok(report)
    }

    /// Re-dispatches an alert over its failed and still-pending channels.
    /// Channels that already delivered are left alone.
    pub async fn retry_notifications(&self, alert_id: &str) -> Result<Alert> {
        let mut alert = self.alerts.get_alert(alert_id)?;
        let channel_ids: Vec<String> = alert
            .notification_status
            .iter()
            .filter(|(_, state)| {
                matches!(state, DeliveryState::Failed | DeliveryState::Pending)
            })
            .map(|(id, _)| id.clone())
            .collect();
        if channel_ids.is_empty() {
            return Ok(alert);
        }

        let (channels, outcomes) = self.load_channels(&channel_ids)?;
        alert.notification_status.extend(outcomes);
        let delivered = self.dispatcher.dispatch(&alert, &channels).await;
        alert.notification_status.extend(delivered);
        self.alerts
            .set_notification_status(&alert.id, &alert.notification_status)?;

        tracing::info!(
            alert_id = %alert_id,
            retried = channel_ids.len(),
            "Notification retry finished"
        );
        Ok(alert)
    }

    /// Auto-resolves open alerts older than the configured cutoffs.
    /// Returns how many were resolved.
    pub fn resolve_stale_alerts(&self) -> Result<usize> {
        let now = Utc::now();
        let open = self.alerts.list_open_alerts()?;
        let rules_by_id: HashMap<String, AlertRule> = self
            .rules
            .list_rules()?
            .into_iter()
            .map(|rule| (rule.id.clone(), rule))
            .collect();

        let stale: Vec<String> = stale_alerts(&open, &rules_by_id, &self.stale_policy, now)
            .into_iter()
            .map(|alert| alert.id.clone())
            .collect();
        let count = stale.len();
        for id in stale {
            self.alerts.set_resolved(&id, now)?;
            tracing::info!(alert_id = %id, "Stale alert auto-resolved");
        }
        Ok(count)
    }

    /// Physically removes expired mutes. Active and never-expiring mutes
    /// are untouched.
    pub fn cleanup_expired_mutes(&self) -> Result<usize> {
        Ok(self.mutes.delete_expired_mutes(Utc::now())?)
    }

    // ---- Internals ----

    fn validate_channel_ids(&self, channel_ids: &[String]) -> Result<()> {
        for id in channel_ids {
            match self.channels.get_channel(id) {
                Ok(_) => {}
                Err(StorageError::NotFound { .. }) => {
                    return Err(ManagerError::Validation(format!(
                        "unknown notification channel: {id}"
                    )));
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Resolves channel ids to their definitions. Ids with no definition
    /// (the channel was deleted after the rule referenced it) are reported
    /// as failed deliveries instead of aborting the dispatch.
    fn load_channels(
        &self,
        channel_ids: &[String],
    ) -> Result<(Vec<NotificationChannel>, HashMap<String, DeliveryState>)> {
        let mut channels = Vec::new();
        let mut statuses = HashMap::new();
        for id in channel_ids {
            match self.channels.get_channel(id) {
                Ok(channel) => channels.push(channel),
                Err(StorageError::NotFound { .. }) => {
                    tracing::warn!(channel_id = %id, "Rule references unknown notification channel");
                    statuses.insert(id.clone(), DeliveryState::Failed);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok((channels, statuses))
    }
}

fn validate_rule_fields(name: &str, condition: &RuleCondition, cooldown_minutes: i64) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ManagerError::Validation(
            "rule name cannot be empty".to_string(),
        ));
    }
    if cooldown_minutes < 0 {
        return Err(ManagerError::Validation(
            "cooldown_minutes cannot be negative".to_string(),
        ));
    }
    match condition {
        RuleCondition::Threshold {
            metric_name,
            threshold,
            ..
        } => {
            if metric_name.trim().is_empty() {
                return Err(ManagerError::Validation(
                    "metric_name cannot be empty".to_string(),
                ));
            }
            if !threshold.is_finite() {
                return Err(ManagerError::Validation(
                    "threshold must be a finite number".to_string(),
                ));
            }
        }
        RuleCondition::StatusChange { expected_status } => {
            if expected_status.trim().is_empty() {
                return Err(ManagerError::Validation(
                    "expected_status cannot be empty".to_string(),
                ));
            }
        }
    }
    Ok(())
}
