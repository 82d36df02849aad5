use super::{from_ms, from_opt_ms, parse_severity, to_ms, SqliteStore};
use crate::error::{Result, StorageError};
use crate::AlertStore;
use chrono::{DateTime, Utc};
use netmon_common::types::{Alert, DeliveryState};
use rusqlite::params;
use std::collections::HashMap;

const ALERT_COLUMNS: &str = "id, rule_id, rule_name, host_id, host_name, value, threshold, \
     severity, message, triggered_at, acknowledged_at, acknowledged_by, resolved_at, \
     notification_status";

type AlertRow = (
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<f64>,
    Option<f64>,
    String,
    String,
    i64,
    Option<i64>,
    Option<String>,
    Option<i64>,
    String,
);

fn alert_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AlertRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
        row.get(11)?,
        row.get(12)?,
        row.get(13)?,
    ))
}

fn alert_from_parts(parts: AlertRow) -> Result<Alert> {
    let (
        id,
        rule_id,
        rule_name,
        host_id,
        host_name,
        value,
        threshold,
        severity,
        message,
        triggered_ms,
        acknowledged_ms,
        acknowledged_by,
        resolved_ms,
        status_json,
    ) = parts;
    let notification_status: HashMap<String, DeliveryState> = serde_json::from_str(&status_json)?;
    Ok(Alert {
        id,
        rule_id,
        rule_name,
        host_id,
        host_name,
        value,
        threshold,
        severity: parse_severity(&severity, "severity")?,
        message,
        triggered_at: from_ms(triggered_ms, "triggered_at")?,
        acknowledged_at: from_opt_ms(acknowledged_ms, "acknowledged_at")?,
        acknowledged_by,
        resolved_at: from_opt_ms(resolved_ms, "resolved_at")?,
        notification_status,
    })
}

impl AlertStore for SqliteStore {
    fn create_alert(&self, alert: &Alert) -> Result<()> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "INSERT INTO alerts (id, rule_id, rule_name, host_id, host_name, value, threshold, \
             severity, message, triggered_at, acknowledged_at, acknowledged_by, resolved_at, \
             notification_status) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        )?;
        stmt.execute(params![
            alert.id,
            alert.rule_id,
            alert.rule_name,
            alert.host_id,
            alert.host_name,
            alert.value,
            alert.threshold,
            alert.severity.to_string(),
            alert.message,
            to_ms(alert.triggered_at),
            alert.acknowledged_at.map(to_ms),
            alert.acknowledged_by,
            alert.resolved_at.map(to_ms),
            serde_json::to_string(&alert.notification_status)?,
        ])?;
        Ok(())
    }

    fn get_alert(&self, id: &str) -> Result<Alert> {
        let conn = self.lock();
        let mut stmt =
            conn.prepare_cached(&format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE id = ?1"))?;
        match stmt.query_row(params![id], alert_from_row) {
            Ok(parts) => alert_from_parts(parts),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(StorageError::NotFound {
                entity: "alert",
                id: id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn list_alerts(&self, limit: usize) -> Result<Vec<Alert>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts ORDER BY triggered_at DESC LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![limit as i64], alert_from_row)?;
        let mut alerts = Vec::new();
        for row in rows {
            alerts.push(alert_from_parts(row?)?);
        }
        Ok(alerts)
    }

    fn list_open_alerts(&self) -> Result<Vec<Alert>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts WHERE resolved_at IS NULL \
             ORDER BY triggered_at DESC"
        ))?;
        let rows = stmt.query_map([], alert_from_row)?;
        let mut alerts = Vec::new();
        for row in rows {
            alerts.push(alert_from_parts(row?)?);
        }
        Ok(alerts)
    }

    fn find_recent_alert(
        &self,
        rule_id: &str,
        host_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Alert>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts \
             WHERE rule_id = ?1 AND host_id = ?2 AND triggered_at >= ?3 \
             ORDER BY triggered_at DESC LIMIT 1"
        ))?;
        match stmt.query_row(params![rule_id, host_id, to_ms(since)], alert_from_row) {
            Ok(parts) => Ok(Some(alert_from_parts(parts)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_acknowledged(&self, id: &str, acknowledged_by: &str, at: DateTime<Utc>) -> Result<()> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "UPDATE alerts SET acknowledged_at = ?2, acknowledged_by = ?3 WHERE id = ?1",
        )?;
        let changed = stmt.execute(params![id, to_ms(at), acknowledged_by])?;
        if changed == 0 {
            return Err(StorageError::NotFound {
                entity: "alert",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    fn set_resolved(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        let conn = self.lock();
        let mut stmt =
            conn.prepare_cached("UPDATE alerts SET resolved_at = ?2 WHERE id = ?1")?;
        let changed = stmt.execute(params![id, to_ms(at)])?;
        if changed == 0 {
            return Err(StorageError::NotFound {
                entity: "alert",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    fn set_notification_status(
        &self,
        id: &str,
        status: &HashMap<String, DeliveryState>,
    ) -> Result<()> {
        let conn = self.lock();
        let mut stmt =
            conn.prepare_cached("UPDATE alerts SET notification_status = ?2 WHERE id = ?1")?;
        let changed = stmt.execute(params![id, serde_json::to_string(status)?])?;
        if changed == 0 {
            return Err(StorageError::NotFound {
                entity: "alert",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    fn delete_alert(&self, id: &str) -> Result<()> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached("DELETE FROM alerts WHERE id = ?1")?;
        let changed = stmt.execute(params![id])?;
        if changed == 0 {
            return Err(StorageError::NotFound {
                entity: "alert",
                id: id.to_string(),
            });
        }
        Ok(())
    }
}
