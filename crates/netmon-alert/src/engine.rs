use chrono::{DateTime, Duration, Utc};
use netmon_common::types::{Alert, AlertRule, CompareOp, DeliveryState, Device, RuleCondition};
use netmon_storage::error::StorageError;
use netmon_storage::{AlertStore, MetricSource, MuteStore};
use std::collections::HashMap;
use std::sync::Arc;

/// Outcome of one evaluation sweep.
#[derive(Debug, Default)]
pub struct EvaluationSummary {
    /// Alerts that fired this sweep. Not yet persisted or notified.
    pub alerts: Vec<Alert>,
    pub rules_evaluated: usize,
    pub devices_evaluated: usize,
    /// Metric lookups that failed. The affected (rule, device) pairs were
    /// skipped for this sweep and will be retried on the next one.
    pub metric_errors: usize,
}

/// Age cutoffs for the auto-resolve sweep, per rule kind.
#[derive(Debug, Clone)]
pub struct StalePolicy {
    /// Open threshold alerts older than this get resolved.
    pub threshold_after: Duration,
    /// Same for status-change alerts. `None` leaves them open until a
    /// human acknowledges or resolves them.
    pub status_change_after: Option<Duration>,
}

/// What a rule condition observed when it matched.
struct Trigger {
    value: Option<f64>,
    threshold: Option<f64>,
    message: String,
}

/// Decision core of the alerting pipeline.
///
/// Reads the latest device data, active mutes and alert history, and
/// decides which alerts fire. Every sweep applies the same order per
/// (rule, device) pair: mute check, cooldown check, condition check.
pub struct AlertEngine {
    metrics: Arc<dyn MetricSource>,
    alerts: Arc<dyn AlertStore>,
    mutes: Arc<dyn MuteStore>,
}

impl AlertEngine {
    pub fn new(
        metrics: Arc<dyn MetricSource>,
        alerts: Arc<dyn AlertStore>,
        mutes: Arc<dyn MuteStore>,
    ) -> Self {
        Self {
            metrics,
            alerts,
            mutes,
        }
    }

    /// Runs the given rules against the current state of the fleet and
    /// returns the alerts that fired.
    ///
    /// Disabled rules are skipped. Metric source failures are absorbed and
    /// counted so one flaky device cannot sink the whole sweep; repository
    /// failures propagate.
    pub fn evaluate(
        &self,
        rules: &[AlertRule],
        now: DateTime<Utc>,
    ) -> Result<EvaluationSummary, StorageError> {
        let devices = self.metrics.devices()?;
        let mut summary = EvaluationSummary::default();

        for rule in rules.iter().filter(|rule| rule.enabled) {
            summary.rules_evaluated += 1;

            for device in target_devices(rule, &devices) {
                summary.devices_evaluated += 1;

                if !self
                    .mutes
                    .find_active_mutes(&rule.id, &device.id, now)?
                    .is_empty()
                {
                    tracing::debug!(
                        rule_id = %rule.id,
                        device_id = %device.id,
                        "Alert suppressed (mute)"
                    );
                    continue;
                }

                let since = now - Duration::minutes(rule.cooldown_minutes.max(0));
                if self
                    .alerts
                    .find_recent_alert(&rule.id, &device.id, since)?
                    .is_some()
                {
                    tracing::debug!(
                        rule_id = %rule.id,
                        device_id = %device.id,
                        "Alert suppressed (cooldown)"
                    );
                    continue;
                }

                match self.observe(rule, &device) {
                    Ok(Some(trigger)) => {
                        summary.alerts.push(build_alert(rule, &device, trigger, now));
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(
                            rule_id = %rule.id,
                            device_id = %device.id,
                            error = %e,
                            "Metric lookup failed, skipping device this sweep"
                        );
                        summary.metric_errors += 1;
                    }
                }
            }
        }

        Ok(summary)
    }

    /// Checks the rule condition against the device's latest data.
    /// `None` means no data yet, or data that does not match.
    fn observe(&self, rule: &AlertRule, device: &Device) -> Result<Option<Trigger>, StorageError> {
        match &rule.condition {
            RuleCondition::Threshold {
                metric_name,
                condition,
                threshold,
            } => {
                let Some(point) = self.metrics.latest_metric(&device.id, metric_name)? else {
                    return Ok(None);
                };
                if !condition.check(point.value, *threshold) {
                    return Ok(None);
                }
                Ok(Some(Trigger {
                    value: Some(point.value),
                    threshold: Some(*threshold),
                    message: format!(
                        "{}: {} is {:.2} on {} ({} threshold {:.2})",
                        rule.name,
                        metric_name,
                        point.value,
                        device.label(),
                        op_phrase(*condition),
                        threshold
                    ),
                }))
            }
            RuleCondition::StatusChange { expected_status } => {
                let Some(status) = self.metrics.latest_status(&device.id)? else {
                    return Ok(None);
                };
                if status != *expected_status {
                    return Ok(None);
                }
                Ok(Some(Trigger {
                    value: None,
                    threshold: None,
                    message: format!(
                        "{}: {} reported status '{}'",
                        rule.name,
                        device.label(),
                        status
                    ),
                }))
            }
        }
    }
}

/// Devices a rule applies to. A pinned rule whose device is not in the
/// inventory still evaluates against a bare placeholder, so rules created
/// ahead of device discovery work as soon as data shows up.
fn target_devices(rule: &AlertRule, devices: &[Device]) -> Vec<Device> {
    match &rule.host_id {
        Some(host_id) => {
            let pinned = devices
                .iter()
                .find(|device| device.id == *host_id)
                .cloned()
                .unwrap_or_else(|| Device {
                    id: host_id.clone(),
                    name: None,
                });
            vec![pinned]
        }
        None => devices.to_vec(),
    }
}

fn build_alert(rule: &AlertRule, device: &Device, trigger: Trigger, now: DateTime<Utc>) -> Alert {
    // Every configured channel starts out pending; the dispatcher fills in
    // the real outcomes after delivery.
    let notification_status: HashMap<String, DeliveryState> = rule
        .notification_channels
        .iter()
        .map(|channel_id| (channel_id.clone(), DeliveryState::Pending))
        .collect();

    Alert {
        id: netmon_common::id::next_id(),
        rule_id: rule.id.clone(),
        rule_name: rule.name.clone(),
        host_id: Some(device.id.clone()),
        host_name: device.name.clone(),
        value: trigger.value,
        threshold: trigger.threshold,
        severity: rule.severity,
        message: trigger.message,
        triggered_at: now,
        acknowledged_at: None,
        acknowledged_by: None,
        resolved_at: None,
        notification_status,
    }
}

fn op_phrase(op: CompareOp) -> &'static str {
    match op {
        CompareOp::GreaterThan => "above",
        CompareOp::GreaterEqual => "at or above",
        CompareOp::LessThan => "below",
        CompareOp::LessEqual => "at or below",
        CompareOp::Equal => "equal to",
        CompareOp::NotEqual => "not equal to",
    }
}

/// Picks the open alerts whose age has passed the policy cutoff for their
/// rule kind. Alerts whose rule was deleted fall back to the threshold
/// cutoff.
pub fn stale_alerts<'a>(
    open_alerts: &'a [Alert],
    rules_by_id: &HashMap<String, AlertRule>,
    policy: &StalePolicy,
    now: DateTime<Utc>,
) -> Vec<&'a Alert> {
    open_alerts
        .iter()
        .filter(|alert| {
            if !alert.is_open() {
                return false;
            }
            let cutoff = match rules_by_id.get(&alert.rule_id).map(|rule| &rule.condition) {
                Some(RuleCondition::StatusChange { .. }) => match policy.status_change_after {
                    Some(cutoff) => cutoff,
                    None => return false,
                },
                _ => policy.threshold_after,
            };
            now - alert.triggered_at > cutoff
        })
        .collect()
}
