use serde::{Deserialize, Serialize};

/// Server configuration loaded from a TOML file.
///
/// Every field has a default so an empty file (or a file naming only the
/// database path) is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path of the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub notify: NotifyConfig,

    #[serde(default)]
    pub id: IdConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds between evaluation sweeps.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Open threshold alerts older than this many hours are auto-resolved
    /// by the maintenance sweep.
    #[serde(default = "default_stale_after_hours")]
    pub stale_after_hours: u64,

    /// Same cutoff for status-change alerts. Unset leaves them open until
    /// someone resolves them.
    #[serde(default)]
    pub status_stale_after_hours: Option<u64>,

    /// Seconds between maintenance sweeps (stale alerts, expired mutes).
    #[serde(default = "default_maintenance_interval_secs")]
    pub maintenance_interval_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            stale_after_hours: default_stale_after_hours(),
            status_stale_after_hours: None,
            maintenance_interval_secs: default_maintenance_interval_secs(),
        }
    }
}

fn default_interval_secs() -> u64 {
    300 // Evaluate every 5 minutes
}

fn default_stale_after_hours() -> u64 {
    24
}

fn default_maintenance_interval_secs() -> u64 {
    3600
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Concurrent sends per alert.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Seconds a single channel send may take.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,

    /// Seconds the whole fan-out of one alert may take.
    #[serde(default = "default_dispatch_timeout_secs")]
    pub dispatch_timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            send_timeout_secs: default_send_timeout_secs(),
            dispatch_timeout_secs: default_dispatch_timeout_secs(),
        }
    }
}

fn default_max_concurrent() -> usize {
    5
}

fn default_send_timeout_secs() -> u64 {
    30
}

fn default_dispatch_timeout_secs() -> u64 {
    60
}

/// Snowflake generator coordinates; make them unique per instance when
/// several servers share one database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdConfig {
    #[serde(default = "default_machine_id")]
    pub machine_id: i32,
    #[serde(default = "default_machine_id")]
    pub node_id: i32,
}

impl Default for IdConfig {
    fn default() -> Self {
        Self {
            machine_id: default_machine_id(),
            node_id: default_machine_id(),
        }
    }
}

fn default_machine_id() -> i32 {
    1
}

fn default_database_path() -> String {
    "data/netmon.db".to_string()
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}
