use crate::dispatcher::NotificationDispatcher;
use crate::email::{self, EmailNotifier};
use crate::error::{NotifyError, Result};
use crate::registry::{NotifierFactory, NotifierRegistry};
use crate::webhook::WebhookNotifier;
use crate::Notifier;
use async_trait::async_trait;
use chrono::Utc;
use netmon_common::types::{
    Alert, ChannelConfig, DeliveryState, EmailConfig, NotificationChannel, Severity, WebhookConfig,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Fixtures ──

struct FakeNotifier {
    fail: bool,
    delay: Duration,
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn send(&self, _alert: &Alert) -> Result<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(NotifyError::Other("scripted failure".to_string()));
        }
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "fake"
    }
}

#[derive(Default)]
struct FakeFactory {
    fail_channels: Vec<String>,
    /// Channels the delay applies to; empty means every channel.
    slow_channels: Vec<String>,
    delay: Duration,
}

impl NotifierFactory for FakeFactory {
    fn build(&self, channel: &NotificationChannel) -> Result<Box<dyn Notifier>> {
        let slow = self.slow_channels.is_empty() || self.slow_channels.contains(&channel.id);
        Ok(Box::new(FakeNotifier {
            fail: self.fail_channels.contains(&channel.id),
            delay: if slow { self.delay } else { Duration::ZERO },
        }))
    }
}

fn make_alert(severity: Severity) -> Alert {
    Alert {
        id: "a1".to_string(),
        rule_id: "r1".to_string(),
        rule_name: "high-cpu".to_string(),
        host_id: Some("sw-01".to_string()),
        host_name: Some("core-switch".to_string()),
        value: Some(91.5),
        threshold: Some(80.0),
        severity,
        message: "high-cpu: cpu_usage is 91.50 on core-switch (above threshold 80.00)"
            .to_string(),
        triggered_at: Utc::now(),
        acknowledged_at: None,
        acknowledged_by: None,
        resolved_at: None,
        notification_status: HashMap::new(),
    }
}

fn webhook_channel(id: &str, url: &str) -> NotificationChannel {
    let now = Utc::now();
    NotificationChannel {
        id: id.to_string(),
        name: format!("hook-{id}"),
        config: ChannelConfig::Webhook(WebhookConfig {
            url: url.to_string(),
            method: "POST".to_string(),
            headers: HashMap::new(),
            bearer_token: None,
        }),
        min_severity: None,
        enabled: true,
        created_at: now,
        updated_at: now,
    }
}

fn email_config() -> EmailConfig {
    EmailConfig {
        smtp_host: "smtp.example.com".to_string(),
        smtp_port: 587,
        username: Some("alerts".to_string()),
        password: Some("hunter2".to_string()),
        from: "netmon <alerts@example.com>".to_string(),
        to: vec!["ops@example.com".to_string()],
        use_tls: true,
    }
}

fn dispatcher_with(
    factory: impl NotifierFactory + 'static,
    send_timeout: Duration,
    dispatch_timeout: Duration,
) -> NotificationDispatcher {
    NotificationDispatcher::new(Arc::new(factory), 4, send_timeout, dispatch_timeout)
}

// ── Config validation ──

#[test]
fn email_config_requires_host_and_recipients() {
    let mut config = email_config();
    config.smtp_host = "".to_string();
    let err = EmailNotifier::new(&config).err().expect("empty host");
    assert!(matches!(err, NotifyError::InvalidConfig(_)));

    let mut config = email_config();
    config.to.clear();
    let err = EmailNotifier::new(&config).err().expect("no recipients");
    assert!(err.to_string().contains("recipient"));
}

#[test]
fn email_config_rejects_bad_addresses() {
    let mut config = email_config();
    config.from = "not-an-address".to_string();
    assert!(EmailNotifier::new(&config).is_err());

    let mut config = email_config();
    config.to = vec!["also not an address".to_string()];
    assert!(EmailNotifier::new(&config).is_err());
}

#[test]
fn webhook_config_rejects_bad_urls() {
    let mut channel = WebhookConfig {
        url: "not a url".to_string(),
        method: "POST".to_string(),
        headers: HashMap::new(),
        bearer_token: None,
    };
    assert!(WebhookNotifier::new(&channel).is_err());

    channel.url = "ftp://files.example.com/drop".to_string();
    let err = WebhookNotifier::new(&channel).err().expect("bad scheme");
    assert!(err.to_string().contains("scheme"));
}

#[test]
fn webhook_config_rejects_bad_method_and_headers() {
    let mut channel = WebhookConfig {
        url: "https://hooks.example.com/netmon".to_string(),
        method: "NOT A METHOD".to_string(),
        headers: HashMap::new(),
        bearer_token: None,
    };
    assert!(WebhookNotifier::new(&channel).is_err());

    channel.method = "PUT".to_string();
    channel
        .headers
        .insert("bad header".to_string(), "x".to_string());
    assert!(WebhookNotifier::new(&channel).is_err());
}

#[tokio::test]
async fn registry_validates_typed_configs() {
    let registry = NotifierRegistry::default();

    assert!(registry.validate(&ChannelConfig::Email(email_config())).is_ok());

    let bad = ChannelConfig::Webhook(WebhookConfig {
        url: "nope".to_string(),
        method: "POST".to_string(),
        headers: HashMap::new(),
        bearer_token: None,
    });
    assert!(registry.validate(&bad).is_err());
}

// ── Email rendering ──

#[test]
fn email_body_lists_alert_fields() {
    let body = email::format_body(&make_alert(Severity::Critical));
    assert!(body.contains("Rule: high-cpu"), "got: {body}");
    assert!(body.contains("Device: core-switch"), "got: {body}");
    assert!(body.contains("Value: 91.50"), "got: {body}");
    assert!(body.contains("Threshold: 80.00"), "got: {body}");
}

#[test]
fn email_body_omits_values_for_status_alerts() {
    let mut alert = make_alert(Severity::Warning);
    alert.value = None;
    alert.threshold = None;
    let body = email::format_body(&alert);
    assert!(!body.contains("Value:"), "got: {body}");
    assert!(!body.contains("Threshold:"), "got: {body}");
}

// ── Dispatch ──

#[tokio::test]
async fn partial_failure_marks_only_the_failed_channel() {
    let factory = FakeFactory {
        fail_channels: vec!["ch-2".to_string()],
        ..Default::default()
    };
    let dispatcher = dispatcher_with(factory, Duration::from_secs(5), Duration::from_secs(10));

    let channels = vec![
        webhook_channel("ch-1", "https://hooks.example.com/a"),
        webhook_channel("ch-2", "https://hooks.example.com/b"),
        webhook_channel("ch-3", "https://hooks.example.com/c"),
    ];
    let statuses = dispatcher
        .dispatch(&make_alert(Severity::Critical), &channels)
        .await;

    assert_eq!(statuses.len(), 3);
    assert_eq!(statuses["ch-1"], DeliveryState::Sent);
    assert_eq!(statuses["ch-2"], DeliveryState::Failed);
    assert_eq!(statuses["ch-3"], DeliveryState::Sent);
}

#[tokio::test]
async fn severity_filter_and_disabled_flag_skip_channels() {
    let dispatcher = dispatcher_with(
        FakeFactory::default(),
        Duration::from_secs(5),
        Duration::from_secs(10),
    );

    let mut critical_only = webhook_channel("ch-crit", "https://hooks.example.com/a");
    critical_only.min_severity = Some(Severity::Critical);
    let mut warning_up = webhook_channel("ch-warn", "https://hooks.example.com/b");
    warning_up.min_severity = Some(Severity::Warning);
    let mut disabled = webhook_channel("ch-off", "https://hooks.example.com/c");
    disabled.enabled = false;

    let statuses = dispatcher
        .dispatch(
            &make_alert(Severity::Warning),
            &[critical_only, warning_up, disabled],
        )
        .await;

    // Skipped channels get no entry at all.
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses["ch-warn"], DeliveryState::Sent);
}

#[tokio::test]
async fn unbuildable_channel_is_marked_failed() {
    // Real registry: the broken url fails at build time, not send time.
    let dispatcher = dispatcher_with(
        NotifierRegistry::default(),
        Duration::from_secs(5),
        Duration::from_secs(10),
    );

    let channels = vec![webhook_channel("ch-bad", "not a url")];
    let statuses = dispatcher
        .dispatch(&make_alert(Severity::Critical), &channels)
        .await;
    assert_eq!(statuses["ch-bad"], DeliveryState::Failed);
}

#[tokio::test]
async fn slow_send_fails_on_send_timeout() {
    let factory = FakeFactory {
        delay: Duration::from_millis(200),
        ..Default::default()
    };
    let dispatcher = dispatcher_with(factory, Duration::from_millis(50), Duration::from_secs(10));

    let channels = vec![webhook_channel("ch-slow", "https://hooks.example.com/a")];
    let statuses = dispatcher
        .dispatch(&make_alert(Severity::Critical), &channels)
        .await;
    assert_eq!(statuses["ch-slow"], DeliveryState::Failed);
}

#[tokio::test]
async fn dispatch_deadline_leaves_unfinished_sends_pending() {
    let factory = FakeFactory {
        delay: Duration::from_millis(500),
        ..Default::default()
    };
    let dispatcher = dispatcher_with(factory, Duration::from_secs(5), Duration::from_millis(50));

    let channels = vec![
        webhook_channel("ch-1", "https://hooks.example.com/a"),
        webhook_channel("ch-2", "https://hooks.example.com/b"),
    ];
    let statuses = dispatcher
        .dispatch(&make_alert(Severity::Critical), &channels)
        .await;

    assert_eq!(statuses.len(), 2);
    assert!(statuses
        .values()
        .all(|state| *state == DeliveryState::Pending));
}

#[tokio::test]
async fn dispatch_deadline_covers_sends_queued_for_a_permit() {
    let factory = FakeFactory {
        delay: Duration::from_millis(200),
        ..Default::default()
    };
    // One permit serializes the sends; without the deadline the fan-out
    // would take three full sends back to back.
    let dispatcher = NotificationDispatcher::new(
        Arc::new(factory),
        1,
        Duration::from_secs(5),
        Duration::from_millis(100),
    );

    let channels = vec![
        webhook_channel("ch-1", "https://hooks.example.com/a"),
        webhook_channel("ch-2", "https://hooks.example.com/b"),
        webhook_channel("ch-3", "https://hooks.example.com/c"),
    ];
    let started = tokio::time::Instant::now();
    let statuses = dispatcher
        .dispatch(&make_alert(Severity::Critical), &channels)
        .await;
    let elapsed = started.elapsed();

    assert!(
        elapsed < Duration::from_millis(450),
        "dispatch overran its deadline: {elapsed:?}"
    );
    assert_eq!(statuses.len(), 3);
    assert!(statuses
        .values()
        .all(|state| *state == DeliveryState::Pending));
}

#[tokio::test]
async fn finished_sends_keep_their_outcome_past_the_deadline() {
    let factory = FakeFactory {
        slow_channels: vec!["ch-slow".to_string()],
        delay: Duration::from_millis(500),
        ..Default::default()
    };
    let dispatcher = dispatcher_with(factory, Duration::from_secs(5), Duration::from_millis(100));

    // Slow channel listed first: both start at once, the fast one
    // completes inside the deadline and must be recorded sent even
    // though the slow one forces the deadline path.
    let channels = vec![
        webhook_channel("ch-slow", "https://hooks.example.com/a"),
        webhook_channel("ch-fast", "https://hooks.example.com/b"),
    ];
    let statuses = dispatcher
        .dispatch(&make_alert(Severity::Critical), &channels)
        .await;

    assert_eq!(statuses["ch-fast"], DeliveryState::Sent);
    assert_eq!(statuses["ch-slow"], DeliveryState::Pending);
}

// ── Webhook delivery ──

#[tokio::test]
async fn webhook_posts_alert_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/alerts"))
        .and(header("authorization", "Bearer s3cret"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = WebhookConfig {
        url: format!("{}/alerts", server.uri()),
        method: "POST".to_string(),
        headers: HashMap::new(),
        bearer_token: Some("s3cret".to_string()),
    };
    let notifier = WebhookNotifier::new(&config).unwrap();
    notifier.send(&make_alert(Severity::Critical)).await.unwrap();
}

#[tokio::test]
async fn webhook_retries_then_surfaces_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/alerts"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(3)
        .mount(&server)
        .await;

    let config = WebhookConfig {
        url: format!("{}/alerts", server.uri()),
        method: "POST".to_string(),
        headers: HashMap::new(),
        bearer_token: None,
    };
    let notifier = WebhookNotifier::new(&config).unwrap();
    let err = notifier
        .send(&make_alert(Severity::Critical))
        .await
        .unwrap_err();

    match err {
        NotifyError::ApiError { status, body, .. } => {
            assert_eq!(status, 500);
            assert!(body.contains("boom"), "body was: {body}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn webhook_recovers_within_retry_budget() {
    let server = MockServer::start().await;
    // First two attempts fail, third succeeds.
    Mock::given(method("POST"))
        .and(path("/alerts"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/alerts"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = WebhookConfig {
        url: format!("{}/alerts", server.uri()),
        method: "POST".to_string(),
        headers: HashMap::new(),
        bearer_token: None,
    };
    let notifier = WebhookNotifier::new(&config).unwrap();
    notifier.send(&make_alert(Severity::Warning)).await.unwrap();
}
