//! Database schema and connection bootstrap.
//!
//! Timestamps are stored as INTEGER Unix milliseconds; structured values
//! (rule conditions, channel configs, delivery maps) are JSON TEXT columns
//! serialized at the storage boundary.

use crate::error::Result;
use rusqlite::Connection;
use std::path::Path;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS alert_rules (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    rule_type TEXT NOT NULL,
    condition_json TEXT NOT NULL,
    host_id TEXT,
    severity TEXT NOT NULL,
    enabled INTEGER NOT NULL DEFAULT 1,
    channels_json TEXT NOT NULL DEFAULT '[]',
    cooldown_minutes INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_rules_enabled ON alert_rules(enabled);

CREATE TABLE IF NOT EXISTS alerts (
    id TEXT PRIMARY KEY,
    rule_id TEXT NOT NULL,
    rule_name TEXT NOT NULL,
    host_id TEXT,
    host_name TEXT,
    value REAL,
    threshold REAL,
    severity TEXT NOT NULL,
    message TEXT NOT NULL,
    triggered_at INTEGER NOT NULL,
    acknowledged_at INTEGER,
    acknowledged_by TEXT,
    resolved_at INTEGER,
    notification_status TEXT NOT NULL DEFAULT '{}'
);
CREATE INDEX IF NOT EXISTS idx_alerts_rule_host_time
    ON alerts(rule_id, host_id, triggered_at);
CREATE INDEX IF NOT EXISTS idx_alerts_resolved ON alerts(resolved_at);

CREATE TABLE IF NOT EXISTS notification_channels (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    channel_type TEXT NOT NULL,
    config_json TEXT NOT NULL,
    min_severity TEXT,
    enabled INTEGER NOT NULL DEFAULT 1,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS alert_mutes (
    id TEXT PRIMARY KEY,
    rule_id TEXT,
    host_id TEXT,
    reason TEXT,
    muted_by TEXT NOT NULL,
    muted_at INTEGER NOT NULL,
    expires_at INTEGER
);
CREATE INDEX IF NOT EXISTS idx_mutes_expiry ON alert_mutes(expires_at);

CREATE TABLE IF NOT EXISTS devices (
    id TEXT PRIMARY KEY,
    name TEXT,
    last_status TEXT,
    last_status_at INTEGER
);

CREATE TABLE IF NOT EXISTS device_metrics (
    device_id TEXT NOT NULL,
    metric_name TEXT NOT NULL,
    value REAL NOT NULL,
    recorded_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_metrics_device_name_time
    ON device_metrics(device_id, metric_name, recorded_at);
";

/// Opens (or creates) the database at `path` and applies the schema.
pub fn open_database(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}
