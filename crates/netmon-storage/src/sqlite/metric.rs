use super::{from_ms, to_ms, SqliteStore};
use crate::error::Result;
use crate::MetricSource;
use chrono::{DateTime, Utc};
use netmon_common::types::{Device, MetricPoint};
use rusqlite::params;

impl SqliteStore {
    /// Registers a device or refreshes its display name.
    pub fn upsert_device(&self, id: &str, name: Option<&str>) -> Result<()> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "INSERT INTO devices (id, name) VALUES (?1, ?2) \
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        )?;
        stmt.execute(params![id, name])?;
        Ok(())
    }

    /// Records the device's most recent status report (e.g. `"online"`).
    /// Creates the device row when it has not been seen before.
    pub fn record_status(&self, device_id: &str, status: &str, at: DateTime<Utc>) -> Result<()> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "INSERT INTO devices (id, last_status, last_status_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(id) DO UPDATE SET last_status = excluded.last_status, \
             last_status_at = excluded.last_status_at",
        )?;
        stmt.execute(params![device_id, status, to_ms(at)])?;
        Ok(())
    }

    /// Appends one metric sample for a device.
    pub fn record_metric(
        &self,
        device_id: &str,
        metric_name: &str,
        value: f64,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "INSERT INTO device_metrics (device_id, metric_name, value, recorded_at) \
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        stmt.execute(params![device_id, metric_name, value, to_ms(at)])?;
        Ok(())
    }
}

impl MetricSource for SqliteStore {
    fn devices(&self) -> Result<Vec<Device>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached("SELECT id, name FROM devices ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Device {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        let mut devices = Vec::new();
        for row in rows {
            devices.push(row?);
        }
        Ok(devices)
    }

    fn latest_metric(&self, device_id: &str, metric_name: &str) -> Result<Option<MetricPoint>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT value, recorded_at FROM device_metrics \
             WHERE device_id = ?1 AND metric_name = ?2 \
             ORDER BY recorded_at DESC LIMIT 1",
        )?;
        match stmt.query_row(params![device_id, metric_name], |row| {
            Ok((row.get::<_, f64>(0)?, row.get::<_, i64>(1)?))
        }) {
            Ok((value, recorded_ms)) => Ok(Some(MetricPoint {
                value,
                recorded_at: from_ms(recorded_ms, "recorded_at")?,
            })),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn latest_status(&self, device_id: &str) -> Result<Option<String>> {
        let conn = self.lock();
        let mut stmt =
            conn.prepare_cached("SELECT last_status FROM devices WHERE id = ?1")?;
        match stmt.query_row(params![device_id], |row| row.get::<_, Option<String>>(0)) {
            Ok(status) => Ok(status),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
