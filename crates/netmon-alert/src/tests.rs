use crate::engine::{stale_alerts, AlertEngine, StalePolicy};
use chrono::{DateTime, Duration, Utc};
use netmon_common::types::{
    Alert, AlertMute, AlertRule, CompareOp, DeliveryState, Device, MetricPoint, RuleCondition,
    Severity,
};
use netmon_storage::error::{Result as StorageResult, StorageError};
use netmon_storage::{AlertStore, MetricSource, MuteStore};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct FakeMetrics {
    devices: Vec<Device>,
    metrics: HashMap<(String, String), MetricPoint>,
    statuses: HashMap<String, String>,
    failing: HashSet<String>,
}

impl FakeMetrics {
    fn with_devices(ids: &[&str]) -> Self {
        Self {
            devices: ids
                .iter()
                .map(|id| Device {
                    id: (*id).to_string(),
                    name: None,
                })
                .collect(),
            ..Self::default()
        }
    }

    fn set_metric(&mut self, device: &str, metric: &str, value: f64) {
        self.metrics.insert(
            (device.to_string(), metric.to_string()),
            MetricPoint {
                value,
                recorded_at: Utc::now(),
            },
        );
    }

    fn set_status(&mut self, device: &str, status: &str) {
        self.statuses.insert(device.to_string(), status.to_string());
    }
}

impl MetricSource for FakeMetrics {
    fn devices(&self) -> StorageResult<Vec<Device>> {
        Ok(self.devices.clone())
    }

    fn latest_metric(
        &self,
        device_id: &str,
        metric_name: &str,
    ) -> StorageResult<Option<MetricPoint>> {
        if self.failing.contains(device_id) {
            return Err(StorageError::Other(format!(
                "metric backend unavailable for {device_id}"
            )));
        }
        Ok(self
            .metrics
            .get(&(device_id.to_string(), metric_name.to_string()))
            .cloned())
    }

    fn latest_status(&self, device_id: &str) -> StorageResult<Option<String>> {
        if self.failing.contains(device_id) {
            return Err(StorageError::Other(format!(
                "status backend unavailable for {device_id}"
            )));
        }
        Ok(self.statuses.get(device_id).cloned())
    }
}

#[derive(Default)]
struct FakeAlerts {
    alerts: Mutex<Vec<Alert>>,
}

impl AlertStore for FakeAlerts {
    fn create_alert(&self, alert: &Alert) -> StorageResult<()> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }

    fn get_alert(&self, id: &str) -> StorageResult<Alert> {
        self.alerts
            .lock()
            .unwrap()
            .iter()
            .find(|alert| alert.id == id)
            .cloned()
            .ok_or(StorageError::NotFound {
                entity: "alert",
                id: id.to_string(),
            })
    }

    fn list_alerts(&self, limit: usize) -> StorageResult<Vec<Alert>> {
        let mut alerts = self.alerts.lock().unwrap().clone();
        alerts.sort_by_key(|alert| std::cmp::Reverse(alert.triggered_at));
        alerts.truncate(limit);
        Ok(alerts)
    }

    fn list_open_alerts(&self) -> StorageResult<Vec<Alert>> {
        Ok(self
            .alerts
            .lock()
            .unwrap()
            .iter()
            .filter(|alert| alert.is_open())
            .cloned()
            .collect())
    }

    fn find_recent_alert(
        &self,
        rule_id: &str,
        host_id: &str,
        since: DateTime<Utc>,
    ) -> StorageResult<Option<Alert>> {
        Ok(self
            .alerts
            .lock()
            .unwrap()
            .iter()
            .filter(|alert| {
                alert.rule_id == rule_id
                    && alert.host_id.as_deref() == Some(host_id)
                    && alert.triggered_at >= since
            })
            .max_by_key(|alert| alert.triggered_at)
            .cloned())
    }

    fn set_acknowledged(
        &self,
        id: &str,
        acknowledged_by: &str,
        at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let mut alerts = self.alerts.lock().unwrap();
        let alert = alerts
            .iter_mut()
            .find(|alert| alert.id == id)
            .ok_or(StorageError::NotFound {
                entity: "alert",
                id: id.to_string(),
            })?;
        alert.acknowledged_at = Some(at);
        alert.acknowledged_by = Some(acknowledged_by.to_string());
        Ok(())
    }

    fn set_resolved(&self, id: &str, at: DateTime<Utc>) -> StorageResult<()> {
        let mut alerts = self.alerts.lock().unwrap();
        let alert = alerts
            .iter_mut()
            .find(|alert| alert.id == id)
            .ok_or(StorageError::NotFound {
                entity: "alert",
                id: id.to_string(),
            })?;
        alert.resolved_at = Some(at);
        Ok(())
    }

    fn set_notification_status(
        &self,
        id: &str,
        status: &HashMap<String, DeliveryState>,
    ) -> StorageResult<()> {
        let mut alerts = self.alerts.lock().unwrap();
        let alert = alerts
            .iter_mut()
            .find(|alert| alert.id == id)
            .ok_or(StorageError::NotFound {
                entity: "alert",
                id: id.to_string(),
            })?;
        alert.notification_status = status.clone();
        Ok(())
    }

    fn delete_alert(&self, id: &str) -> StorageResult<()> {
        let mut alerts = self.alerts.lock().unwrap();
        let before = alerts.len();
        alerts.retain(|alert| alert.id != id);
        if alerts.len() == before {
            return Err(StorageError::NotFound {
                entity: "alert",
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
struct FakeMutes {
    mutes: Mutex<Vec<AlertMute>>,
}

impl MuteStore for FakeMutes {
    fn create_mute(&self, mute: &AlertMute) -> StorageResult<()> {
        self.mutes.lock().unwrap().push(mute.clone());
        Ok(())
    }

    fn get_mute(&self, id: &str) -> StorageResult<AlertMute> {
        self.mutes
            .lock()
            .unwrap()
            .iter()
            .find(|mute| mute.id == id)
            .cloned()
            .ok_or(StorageError::NotFound {
                entity: "mute",
                id: id.to_string(),
            })
    }

    fn list_mutes(&self) -> StorageResult<Vec<AlertMute>> {
        Ok(self.mutes.lock().unwrap().clone())
    }

    fn find_active_mutes(
        &self,
        rule_id: &str,
        host_id: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<Vec<AlertMute>> {
        Ok(self
            .mutes
            .lock()
            .unwrap()
            .iter()
            .filter(|mute| mute.is_active(now) && mute.covers(rule_id, host_id))
            .cloned()
            .collect())
    }

    fn delete_mute(&self, id: &str) -> StorageResult<()> {
        let mut mutes = self.mutes.lock().unwrap();
        let before = mutes.len();
        mutes.retain(|mute| mute.id != id);
        if mutes.len() == before {
            return Err(StorageError::NotFound {
                entity: "mute",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    fn delete_expired_mutes(&self, now: DateTime<Utc>) -> StorageResult<usize> {
        let mut mutes = self.mutes.lock().unwrap();
        let before = mutes.len();
        mutes.retain(|mute| mute.is_active(now));
        Ok(before - mutes.len())
    }
}

fn engine_with(
    metrics: FakeMetrics,
    alerts: Vec<Alert>,
    mutes: Vec<AlertMute>,
) -> (AlertEngine, Arc<FakeAlerts>) {
    netmon_common::id::init(1, 1);
    let alert_store = Arc::new(FakeAlerts {
        alerts: Mutex::new(alerts),
    });
    let engine = AlertEngine::new(
        Arc::new(metrics),
        alert_store.clone(),
        Arc::new(FakeMutes {
            mutes: Mutex::new(mutes),
        }),
    );
    (engine, alert_store)
}

fn threshold_rule(id: &str, name: &str, op: CompareOp, threshold: f64, cooldown: i64) -> AlertRule {
    let now = Utc::now();
    AlertRule {
        id: id.to_string(),
        name: name.to_string(),
        condition: RuleCondition::Threshold {
            metric_name: "cpu_usage".to_string(),
            condition: op,
            threshold,
        },
        host_id: None,
        severity: Severity::Critical,
        enabled: true,
        notification_channels: vec!["ch-1".to_string(), "ch-2".to_string()],
        cooldown_minutes: cooldown,
        created_at: now,
        updated_at: now,
    }
}

fn status_rule(id: &str, name: &str, expected: &str) -> AlertRule {
    let now = Utc::now();
    AlertRule {
        id: id.to_string(),
        name: name.to_string(),
        condition: RuleCondition::StatusChange {
            expected_status: expected.to_string(),
        },
        host_id: None,
        severity: Severity::Warning,
        enabled: true,
        notification_channels: vec!["ch-1".to_string()],
        cooldown_minutes: 10,
        created_at: now,
        updated_at: now,
    }
}

fn prior_alert(rule_id: &str, host_id: &str, triggered_at: DateTime<Utc>) -> Alert {
    Alert {
        id: format!("a-{rule_id}-{host_id}"),
        rule_id: rule_id.to_string(),
        rule_name: "prior".to_string(),
        host_id: Some(host_id.to_string()),
        host_name: None,
        value: Some(99.0),
        threshold: Some(80.0),
        severity: Severity::Critical,
        message: "prior alert".to_string(),
        triggered_at,
        acknowledged_at: None,
        acknowledged_by: None,
        resolved_at: None,
        notification_status: HashMap::new(),
    }
}

fn mute(
    id: &str,
    rule_id: Option<&str>,
    host_id: Option<&str>,
    expires_at: Option<DateTime<Utc>>,
) -> AlertMute {
    AlertMute {
        id: id.to_string(),
        rule_id: rule_id.map(str::to_string),
        host_id: host_id.map(str::to_string),
        reason: Some("maintenance".to_string()),
        muted_by: "alice".to_string(),
        muted_at: Utc::now(),
        expires_at,
    }
}

#[test]
fn threshold_rule_fires_when_condition_holds() {
    let mut metrics = FakeMetrics::with_devices(&["sw-01"]);
    metrics.set_metric("sw-01", "cpu_usage", 91.5);
    let (engine, _) = engine_with(metrics, vec![], vec![]);

    let rule = threshold_rule("r1", "high-cpu", CompareOp::GreaterThan, 80.0, 5);
    let summary = engine.evaluate(&[rule], Utc::now()).unwrap();

    assert_eq!(summary.rules_evaluated, 1);
    assert_eq!(summary.devices_evaluated, 1);
    assert_eq!(summary.metric_errors, 0);
    assert_eq!(summary.alerts.len(), 1);

    let alert = &summary.alerts[0];
    assert_eq!(alert.rule_id, "r1");
    assert_eq!(alert.rule_name, "high-cpu");
    assert_eq!(alert.host_id.as_deref(), Some("sw-01"));
    assert_eq!(alert.value, Some(91.5));
    assert_eq!(alert.threshold, Some(80.0));
    assert_eq!(alert.severity, Severity::Critical);
    assert!(alert.is_open());

    // Every configured channel starts out pending.
    assert_eq!(alert.notification_status.len(), 2);
    assert!(alert
        .notification_status
        .values()
        .all(|state| *state == DeliveryState::Pending));
}

#[test]
fn threshold_rule_stays_quiet_below_threshold() {
    let mut metrics = FakeMetrics::with_devices(&["sw-01"]);
    metrics.set_metric("sw-01", "cpu_usage", 55.0); // below threshold
    let (engine, _) = engine_with(metrics, vec![], vec![]);

    let rule = threshold_rule("r1", "high-cpu", CompareOp::GreaterThan, 80.0, 5);
    let summary = engine.evaluate(&[rule], Utc::now()).unwrap();
    assert!(summary.alerts.is_empty());
}

#[test]
fn boundary_value_respects_operator() {
    let mut metrics = FakeMetrics::with_devices(&["sw-01"]);
    metrics.set_metric("sw-01", "cpu_usage", 80.0); // exactly at threshold
    let (engine, _) = engine_with(metrics, vec![], vec![]);

    let strict = threshold_rule("r1", "cpu-strict", CompareOp::GreaterThan, 80.0, 5);
    let inclusive = threshold_rule("r2", "cpu-inclusive", CompareOp::GreaterEqual, 80.0, 5);
    let summary = engine.evaluate(&[strict, inclusive], Utc::now()).unwrap();

    assert_eq!(summary.rules_evaluated, 2);
    assert_eq!(summary.alerts.len(), 1);
    assert_eq!(summary.alerts[0].rule_id, "r2");
}

#[test]
fn alert_message_names_rule_metric_and_device() {
    let mut metrics = FakeMetrics::with_devices(&["sw-01"]);
    metrics.set_metric("sw-01", "cpu_usage", 91.5);
    let (engine, _) = engine_with(metrics, vec![], vec![]);

    let rule = threshold_rule("r1", "high-cpu", CompareOp::GreaterThan, 80.0, 5);
    let summary = engine.evaluate(&[rule], Utc::now()).unwrap();
    let message = &summary.alerts[0].message;
    assert!(message.contains("high-cpu"), "got: {message}");
    assert!(message.contains("cpu_usage"), "got: {message}");
    assert!(message.contains("sw-01"), "got: {message}");
    assert!(message.contains("91.50"), "got: {message}");
    assert!(message.contains("above threshold 80.00"), "got: {message}");
}

#[test]
fn cooldown_suppresses_within_window() {
    let now = Utc::now();
    let mut metrics = FakeMetrics::with_devices(&["sw-01"]);
    metrics.set_metric("sw-01", "cpu_usage", 95.0);
    let prior = prior_alert("r1", "sw-01", now - Duration::minutes(9));
    let (engine, _) = engine_with(metrics, vec![prior], vec![]);

    let rule = threshold_rule("r1", "high-cpu", CompareOp::GreaterThan, 80.0, 10);
    let summary = engine.evaluate(&[rule], now).unwrap();
    assert!(summary.alerts.is_empty());
}

#[test]
fn cooldown_releases_after_window() {
    let now = Utc::now();
    let mut metrics = FakeMetrics::with_devices(&["sw-01"]);
    metrics.set_metric("sw-01", "cpu_usage", 95.0);
    let prior = prior_alert("r1", "sw-01", now - Duration::minutes(11));
    let (engine, _) = engine_with(metrics, vec![prior], vec![]);

    let rule = threshold_rule("r1", "high-cpu", CompareOp::GreaterThan, 80.0, 10);
    let summary = engine.evaluate(&[rule], now).unwrap();
    assert_eq!(summary.alerts.len(), 1);
}

#[test]
fn resolved_alert_still_counts_toward_cooldown() {
    let now = Utc::now();
    let mut metrics = FakeMetrics::with_devices(&["sw-01"]);
    metrics.set_metric("sw-01", "cpu_usage", 95.0);
    let mut prior = prior_alert("r1", "sw-01", now - Duration::minutes(5));
    prior.resolved_at = Some(now - Duration::minutes(3));
    let (engine, _) = engine_with(metrics, vec![prior], vec![]);

    let rule = threshold_rule("r1", "high-cpu", CompareOp::GreaterThan, 80.0, 10);
    let summary = engine.evaluate(&[rule], now).unwrap();
    assert!(summary.alerts.is_empty());
}

#[test]
fn cooldown_is_scoped_per_device() {
    let now = Utc::now();
    let mut metrics = FakeMetrics::with_devices(&["sw-01", "sw-02"]);
    metrics.set_metric("sw-01", "cpu_usage", 95.0);
    metrics.set_metric("sw-02", "cpu_usage", 95.0);
    let prior = prior_alert("r1", "sw-01", now - Duration::minutes(2));
    let (engine, _) = engine_with(metrics, vec![prior], vec![]);

    let rule = threshold_rule("r1", "high-cpu", CompareOp::GreaterThan, 80.0, 10);
    let summary = engine.evaluate(&[rule], now).unwrap();
    assert_eq!(summary.alerts.len(), 1);
    assert_eq!(summary.alerts[0].host_id.as_deref(), Some("sw-02"));
}

#[test]
fn rule_wide_mute_suppresses_every_device() {
    let now = Utc::now();
    let mut metrics = FakeMetrics::with_devices(&["sw-01", "sw-02"]);
    metrics.set_metric("sw-01", "cpu_usage", 95.0);
    metrics.set_metric("sw-02", "cpu_usage", 95.0);
    let mutes = vec![mute("m1", Some("r1"), None, None)];
    let (engine, _) = engine_with(metrics, vec![], mutes);

    let rule = threshold_rule("r1", "high-cpu", CompareOp::GreaterThan, 80.0, 5);
    let summary = engine.evaluate(&[rule], now).unwrap();
    assert!(summary.alerts.is_empty());
}

#[test]
fn host_mute_only_covers_its_device() {
    let now = Utc::now();
    let mut metrics = FakeMetrics::with_devices(&["sw-01", "sw-02"]);
    metrics.set_metric("sw-01", "cpu_usage", 95.0);
    metrics.set_metric("sw-02", "cpu_usage", 95.0);
    let mutes = vec![mute("m1", None, Some("sw-01"), None)];
    let (engine, _) = engine_with(metrics, vec![], mutes);

    let rule = threshold_rule("r1", "high-cpu", CompareOp::GreaterThan, 80.0, 5);
    let summary = engine.evaluate(&[rule], now).unwrap();
    assert_eq!(summary.alerts.len(), 1);
    assert_eq!(summary.alerts[0].host_id.as_deref(), Some("sw-02"));
}

#[test]
fn expired_mute_no_longer_suppresses() {
    let now = Utc::now();
    let mut metrics = FakeMetrics::with_devices(&["sw-01"]);
    metrics.set_metric("sw-01", "cpu_usage", 95.0);
    let mutes = vec![mute(
        "m1",
        Some("r1"),
        None,
        Some(now - Duration::minutes(1)),
    )];
    let (engine, _) = engine_with(metrics, vec![], mutes);

    let rule = threshold_rule("r1", "high-cpu", CompareOp::GreaterThan, 80.0, 5);
    let summary = engine.evaluate(&[rule], now).unwrap();
    assert_eq!(summary.alerts.len(), 1);
}

#[test]
fn network_wide_rule_sweeps_every_device() {
    let mut metrics = FakeMetrics::with_devices(&["sw-01", "sw-02", "sw-03"]);
    metrics.set_metric("sw-01", "cpu_usage", 95.0);
    metrics.set_metric("sw-02", "cpu_usage", 40.0);
    metrics.set_metric("sw-03", "cpu_usage", 88.0);
    let (engine, _) = engine_with(metrics, vec![], vec![]);

    let rule = threshold_rule("r1", "high-cpu", CompareOp::GreaterThan, 80.0, 5);
    let summary = engine.evaluate(&[rule], Utc::now()).unwrap();
    assert_eq!(summary.devices_evaluated, 3);
    assert_eq!(summary.alerts.len(), 2);
}

#[test]
fn pinned_rule_only_checks_its_device() {
    let mut metrics = FakeMetrics::with_devices(&["sw-01", "sw-02"]);
    metrics.set_metric("sw-01", "cpu_usage", 95.0);
    metrics.set_metric("sw-02", "cpu_usage", 95.0);
    let (engine, _) = engine_with(metrics, vec![], vec![]);

    let mut rule = threshold_rule("r1", "high-cpu", CompareOp::GreaterThan, 80.0, 5);
    rule.host_id = Some("sw-01".to_string());
    let summary = engine.evaluate(&[rule], Utc::now()).unwrap();
    assert_eq!(summary.devices_evaluated, 1);
    assert_eq!(summary.alerts.len(), 1);
    assert_eq!(summary.alerts[0].host_id.as_deref(), Some("sw-01"));
}

#[test]
fn pinned_rule_for_unknown_device_stays_quiet() {
    let metrics = FakeMetrics::with_devices(&["sw-01"]);
    let (engine, _) = engine_with(metrics, vec![], vec![]);

    let mut rule = threshold_rule("r1", "high-cpu", CompareOp::GreaterThan, 80.0, 5);
    rule.host_id = Some("ghost".to_string());
    let summary = engine.evaluate(&[rule], Utc::now()).unwrap();
    assert_eq!(summary.devices_evaluated, 1);
    assert!(summary.alerts.is_empty());
    assert_eq!(summary.metric_errors, 0);
}

#[test]
fn missing_metric_is_not_an_error() {
    let metrics = FakeMetrics::with_devices(&["sw-01"]); // never reported cpu_usage
    let (engine, _) = engine_with(metrics, vec![], vec![]);

    let rule = threshold_rule("r1", "high-cpu", CompareOp::GreaterThan, 80.0, 5);
    let summary = engine.evaluate(&[rule], Utc::now()).unwrap();
    assert!(summary.alerts.is_empty());
    assert_eq!(summary.metric_errors, 0);
}

#[test]
fn metric_failure_is_counted_but_not_fatal() {
    let mut metrics = FakeMetrics::with_devices(&["sw-01", "sw-02"]);
    metrics.failing.insert("sw-01".to_string());
    metrics.set_metric("sw-02", "cpu_usage", 95.0);
    let (engine, _) = engine_with(metrics, vec![], vec![]);

    let rule = threshold_rule("r1", "high-cpu", CompareOp::GreaterThan, 80.0, 5);
    let summary = engine.evaluate(&[rule], Utc::now()).unwrap();
    assert_eq!(summary.metric_errors, 1);
    assert_eq!(summary.alerts.len(), 1);
    assert_eq!(summary.alerts[0].host_id.as_deref(), Some("sw-02"));
}

#[test]
fn disabled_rule_is_skipped() {
    let mut metrics = FakeMetrics::with_devices(&["sw-01"]);
    metrics.set_metric("sw-01", "cpu_usage", 95.0);
    let (engine, _) = engine_with(metrics, vec![], vec![]);

    let mut rule = threshold_rule("r1", "high-cpu", CompareOp::GreaterThan, 80.0, 5);
    rule.enabled = false;
    let summary = engine.evaluate(&[rule], Utc::now()).unwrap();
    assert_eq!(summary.rules_evaluated, 0);
    assert!(summary.alerts.is_empty());
}

#[test]
fn status_rule_fires_on_matching_status() {
    let mut metrics = FakeMetrics::with_devices(&["sw-01"]);
    metrics.set_status("sw-01", "offline");
    let (engine, _) = engine_with(metrics, vec![], vec![]);

    let rule = status_rule("r1", "device-down", "offline");
    let summary = engine.evaluate(&[rule], Utc::now()).unwrap();
    assert_eq!(summary.alerts.len(), 1);

    let alert = &summary.alerts[0];
    assert_eq!(alert.value, None);
    assert_eq!(alert.threshold, None);
    assert_eq!(alert.severity, Severity::Warning);
    assert!(alert.message.contains("offline"), "got: {}", alert.message);
}

#[test]
fn status_rule_ignores_other_statuses() {
    let mut metrics = FakeMetrics::with_devices(&["sw-01"]);
    metrics.set_status("sw-01", "online");
    let (engine, _) = engine_with(metrics, vec![], vec![]);

    let rule = status_rule("r1", "device-down", "offline");
    let summary = engine.evaluate(&[rule], Utc::now()).unwrap();
    assert!(summary.alerts.is_empty());
}

#[test]
fn status_rule_cools_down_once_persisted() {
    let now = Utc::now();
    let mut metrics = FakeMetrics::with_devices(&["sw-01"]);
    metrics.set_status("sw-01", "offline");
    let (engine, alert_store) = engine_with(metrics, vec![], vec![]);

    let rule = status_rule("r1", "device-down", "offline");
    let summary = engine.evaluate(std::slice::from_ref(&rule), now).unwrap();
    assert_eq!(summary.alerts.len(), 1);
    alert_store.create_alert(&summary.alerts[0]).unwrap();

    // Device is still offline five minutes later; cooldown is ten.
    let later = now + Duration::minutes(5);
    let summary = engine.evaluate(&[rule], later).unwrap();
    assert!(summary.alerts.is_empty());
}

#[test]
fn stale_sweep_applies_per_rule_kind_cutoffs() {
    let now = Utc::now();
    let threshold = threshold_rule("r1", "high-cpu", CompareOp::GreaterThan, 80.0, 5);
    let status = status_rule("r2", "device-down", "offline");
    let mut rules_by_id = HashMap::new();
    rules_by_id.insert(threshold.id.clone(), threshold);
    rules_by_id.insert(status.id.clone(), status);

    let open = vec![
        prior_alert("r1", "sw-01", now - Duration::hours(30)),
        prior_alert("r2", "sw-01", now - Duration::hours(30)),
        prior_alert("r1", "sw-02", now - Duration::hours(1)),
    ];

    // Status-change alerts exempt from the sweep.
    let policy = StalePolicy {
        threshold_after: Duration::hours(24),
        status_change_after: None,
    };
    let stale = stale_alerts(&open, &rules_by_id, &policy, now);
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].rule_id, "r1");
    assert_eq!(stale[0].host_id.as_deref(), Some("sw-01"));

    // With a status cutoff configured both old alerts go.
    let policy = StalePolicy {
        threshold_after: Duration::hours(24),
        status_change_after: Some(Duration::hours(24)),
    };
    assert_eq!(stale_alerts(&open, &rules_by_id, &policy, now).len(), 2);
}

#[test]
fn stale_sweep_covers_alerts_of_deleted_rules() {
    let now = Utc::now();
    let open = vec![prior_alert("gone", "sw-01", now - Duration::hours(30))];
    let policy = StalePolicy {
        threshold_after: Duration::hours(24),
        status_change_after: None,
    };
    let stale = stale_alerts(&open, &HashMap::new(), &policy, now);
    assert_eq!(stale.len(), 1);
}
