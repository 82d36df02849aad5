use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Alert severity level, ordered from lowest to highest.
///
/// # Examples
///
/// ```
/// use netmon_common::types::Severity;
///
/// let sev: Severity = "warning".parse().unwrap();
/// assert_eq!(sev, Severity::Warning);
/// assert_eq!(sev.to_string(), "warning");
/// assert!(Severity::Critical > Severity::Info);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// Comparison operator for threshold rules.
///
/// # Examples
///
/// ```
/// use netmon_common::types::CompareOp;
///
/// let op: CompareOp = "gte".parse().unwrap();
/// assert_eq!(op, CompareOp::GreaterEqual);
/// assert!(op.check(80.0, 80.0));
/// assert!(!CompareOp::GreaterThan.check(80.0, 80.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = "gt")]
    GreaterThan,
    #[serde(rename = "gte")]
    GreaterEqual,
    #[serde(rename = "lt")]
    LessThan,
    #[serde(rename = "lte")]
    LessEqual,
    #[serde(rename = "eq")]
    Equal,
    #[serde(rename = "ne")]
    NotEqual,
}

impl CompareOp {
    /// Returns true when `value` satisfies the comparison against `threshold`.
    pub fn check(self, value: f64, threshold: f64) -> bool {
        match self {
            CompareOp::GreaterThan => value > threshold,
            CompareOp::GreaterEqual => value >= threshold,
            CompareOp::LessThan => value < threshold,
            CompareOp::LessEqual => value <= threshold,
            CompareOp::Equal => value == threshold,
            CompareOp::NotEqual => value != threshold,
        }
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompareOp::GreaterThan => write!(f, "gt"),
            CompareOp::GreaterEqual => write!(f, "gte"),
            CompareOp::LessThan => write!(f, "lt"),
            CompareOp::LessEqual => write!(f, "lte"),
            CompareOp::Equal => write!(f, "eq"),
            CompareOp::NotEqual => write!(f, "ne"),
        }
    }
}

impl std::str::FromStr for CompareOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gt" | "greater_than" => Ok(CompareOp::GreaterThan),
            "gte" | "greater_equal" => Ok(CompareOp::GreaterEqual),
            "lt" | "less_than" => Ok(CompareOp::LessThan),
            "lte" | "less_equal" => Ok(CompareOp::LessEqual),
            "eq" | "equal" => Ok(CompareOp::Equal),
            "ne" | "not_equal" => Ok(CompareOp::NotEqual),
            _ => Err(format!("unknown compare operator: {s}")),
        }
    }
}

/// What a rule checks: a metric crossing a threshold, or a device
/// reporting a specific status.
///
/// Serialized with a `rule_type` tag so rule definitions stay flat:
/// `{"rule_type": "threshold", "metric_name": "cpu_usage", ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "rule_type", rename_all = "snake_case")]
pub enum RuleCondition {
    Threshold {
        metric_name: String,
        condition: CompareOp,
        threshold: f64,
    },
    StatusChange {
        expected_status: String,
    },
}

impl RuleCondition {
    /// Wire name of the condition kind (`"threshold"` or `"status_change"`).
    pub fn rule_type(&self) -> &'static str {
        match self {
            RuleCondition::Threshold { .. } => "threshold",
            RuleCondition::StatusChange { .. } => "status_change",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub condition: RuleCondition,
    /// Device this rule is pinned to; `None` means every known device.
    pub host_id: Option<String>,
    pub severity: Severity,
    pub enabled: bool,
    /// Channel ids notified when the rule fires.
    pub notification_channels: Vec<String>,
    /// Minimum minutes between consecutive alerts per (rule, device) pair.
    pub cooldown_minutes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Delivery outcome for one notification channel of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryState {
    Pending,
    Sent,
    Failed,
}

impl std::fmt::Display for DeliveryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryState::Pending => write!(f, "pending"),
            DeliveryState::Sent => write!(f, "sent"),
            DeliveryState::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for DeliveryState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(DeliveryState::Pending),
            "sent" => Ok(DeliveryState::Sent),
            "failed" => Ok(DeliveryState::Failed),
            _ => Err(format!("unknown delivery state: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub rule_id: String,
    /// Rule name snapshot; survives rule deletion.
    pub rule_name: String,
    pub host_id: Option<String>,
    /// Device name snapshot at trigger time.
    pub host_name: Option<String>,
    /// Observed metric value (threshold rules only).
    pub value: Option<f64>,
    /// Rule threshold snapshot (threshold rules only).
    pub threshold: Option<f64>,
    pub severity: Severity,
    pub message: String,
    pub triggered_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    /// Per-channel delivery outcome, keyed by channel id.
    #[serde(default)]
    pub notification_status: HashMap<String, DeliveryState>,
}

impl Alert {
    pub fn is_open(&self) -> bool {
        self.resolved_at.is_none()
    }
}

/// SMTP delivery settings for an email channel.
#[derive(Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    pub from: String,
    pub to: Vec<String>,
    #[serde(default = "default_use_tls")]
    pub use_tls: bool,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("from", &self.from)
            .field("to", &self.to)
            .field("use_tls", &self.use_tls)
            .finish()
    }
}

/// HTTP delivery settings for a webhook channel.
#[derive(Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    #[serde(default = "default_webhook_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "***"))
            .finish()
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_use_tls() -> bool {
    true
}

fn default_webhook_method() -> String {
    "POST".to_string()
}

/// Channel-specific delivery settings, tagged by `channel_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "channel_type", rename_all = "snake_case")]
pub enum ChannelConfig {
    Email(EmailConfig),
    Webhook(WebhookConfig),
}

impl ChannelConfig {
    pub fn channel_type(&self) -> &'static str {
        match self {
            ChannelConfig::Email(_) => "email",
            ChannelConfig::Webhook(_) => "webhook",
        }
    }

    /// Copy with credentials replaced by `"***"`, for display and logs.
    pub fn redacted(&self) -> ChannelConfig {
        match self {
            ChannelConfig::Email(config) => {
                let mut config = config.clone();
                if config.password.is_some() {
                    config.password = Some("***".to_string());
                }
                ChannelConfig::Email(config)
            }
            ChannelConfig::Webhook(config) => {
                let mut config = config.clone();
                if config.bearer_token.is_some() {
                    config.bearer_token = Some("***".to_string());
                }
                ChannelConfig::Webhook(config)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationChannel {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub config: ChannelConfig,
    /// Drops alerts below this severity; `None` delivers everything.
    #[serde(default)]
    pub min_severity: Option<Severity>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Suppression window. Scope is the intersection of the set fields:
/// rule-only mutes every device for that rule, host-only mutes every
/// rule on that device, both together mute the single pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertMute {
    pub id: String,
    pub rule_id: Option<String>,
    pub host_id: Option<String>,
    pub reason: Option<String>,
    pub muted_by: String,
    pub muted_at: DateTime<Utc>,
    /// `None` mutes until explicitly removed.
    pub expires_at: Option<DateTime<Utc>>,
}

impl AlertMute {
    /// True when the mute has no expiry or the expiry is still in the future.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |expires| expires > now)
    }

    /// True when this mute covers the (rule, device) pair.
    pub fn covers(&self, rule_id: &str, host_id: &str) -> bool {
        self.rule_id.as_deref().map_or(true, |r| r == rule_id)
            && self.host_id.as_deref().map_or(true, |h| h == host_id)
    }
}

/// A monitored device known to the metric source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: Option<String>,
}

impl Device {
    /// Display label: the human name when present, otherwise the id.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// A single observed metric sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricPoint {
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
}

// ---- Create / update payloads ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAlertRule {
    pub name: String,
    #[serde(flatten)]
    pub condition: RuleCondition,
    #[serde(default)]
    pub host_id: Option<String>,
    pub severity: Severity,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub notification_channels: Vec<String>,
    #[serde(default = "default_cooldown_minutes")]
    pub cooldown_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRuleUpdate {
    pub name: Option<String>,
    pub condition: Option<RuleCondition>,
    /// `Some(None)` clears the pin, making the rule network-wide.
    pub host_id: Option<Option<String>>,
    pub severity: Option<Severity>,
    pub enabled: Option<bool>,
    pub notification_channels: Option<Vec<String>>,
    pub cooldown_minutes: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChannel {
    pub name: String,
    #[serde(flatten)]
    pub config: ChannelConfig,
    #[serde(default)]
    pub min_severity: Option<Severity>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelUpdate {
    pub name: Option<String>,
    pub config: Option<ChannelConfig>,
    /// `Some(None)` removes the severity floor.
    pub min_severity: Option<Option<Severity>>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMute {
    #[serde(default)]
    pub rule_id: Option<String>,
    #[serde(default)]
    pub host_id: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    pub muted_by: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

fn default_enabled() -> bool {
    true
}

fn default_cooldown_minutes() -> i64 {
    5
}
