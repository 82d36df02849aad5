use super::{from_ms, parse_severity, to_ms, unique_violation, SqliteStore};
use crate::error::{Result, StorageError};
use crate::RuleStore;
use chrono::{DateTime, Utc};
use netmon_common::types::{AlertRule, RuleCondition};
use rusqlite::params;

const RULE_COLUMNS: &str = "id, name, condition_json, host_id, severity, enabled, \
     channels_json, cooldown_minutes, created_at, updated_at";

type RuleRow = (
    String,
    String,
    String,
    Option<String>,
    String,
    bool,
    String,
    i64,
    i64,
    i64,
);

fn rule_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RuleRow> {
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
    ))
}

fn rule_from_parts(parts: RuleRow) -> Result<AlertRule> {
    let (
        id,
        name,
        condition_json,
        host_id,
        severity,
        enabled,
        channels_json,
        cooldown_minutes,
        created_ms,
        updated_ms,
    ) = parts;
    let condition: RuleCondition = serde_json::from_str(&condition_json)?;
    Ok(AlertRule {
        id,
        name,
        condition,
        host_id,
        severity: parse_severity(&severity, "severity")?,
        enabled,
        notification_channels: serde_json::from_str(&channels_json)?,
        cooldown_minutes,
        created_at: from_ms(created_ms, "created_at")?,
        updated_at: from_ms(updated_ms, "updated_at")?,
    })
}

impl RuleStore for SqliteStore {
    fn create_rule(&self, rule: &AlertRule) -> Result<()> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "INSERT INTO alert_rules (id, name, rule_type, condition_json, host_id, severity, \
             enabled, channels_json, cooldown_minutes, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )?;
        stmt.execute(params![
            rule.id,
            rule.name,
            rule.condition.rule_type(),
            serde_json::to_string(&rule.condition)?,
            rule.host_id,
            rule.severity.to_string(),
            rule.enabled,
            serde_json::to_string(&rule.notification_channels)?,
            rule.cooldown_minutes,
            to_ms(rule.created_at),
            to_ms(rule.updated_at),
        ])
        .map_err(|e| unique_violation(e, "alert_rule", &rule.name))?;
        Ok(())
    }

    fn get_rule(&self, id: &str) -> Result<AlertRule> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare_cached(&format!("SELECT {RULE_COLUMNS} FROM alert_rules WHERE id = ?1"))?;
        match stmt.query_row(params![id], rule_from_row) {
            Ok(parts) => rule_from_parts(parts),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(StorageError::NotFound {
                entity: "alert_rule",
                id: id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn list_rules(&self) -> Result<Vec<AlertRule>> {
        let conn = self.lock();
        let mut stmt =
            conn.prepare_cached(&format!("SELECT {RULE_COLUMNS} FROM alert_rules ORDER BY name"))?;
        let rows = stmt.query_map([], rule_from_row)?;
        let mut rules = Vec::new();
        for row in rows {
            rules.push(rule_from_parts(row?)?);
        }
        Ok(rules)
    }

    fn list_enabled_rules(&self) -> Result<Vec<AlertRule>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {RULE_COLUMNS} FROM alert_rules WHERE enabled = 1 ORDER BY name"
        ))?;
        let rows = stmt.query_map([], rule_from_row)?;
        let mut rules = Vec::new();
        for row in rows {
            rules.push(rule_from_parts(row?)?);
        }
        Ok(rules)
    }

    fn update_rule(&self, rule: &AlertRule) -> Result<()> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "UPDATE alert_rules SET name = ?2, rule_type = ?3, condition_json = ?4, \
             host_id = ?5, severity = ?6, enabled = ?7, channels_json = ?8, \
             cooldown_minutes = ?9, updated_at = ?10 WHERE id = ?1",
        )?;
        let changed = stmt
            .execute(params![
                rule.id,
                rule.name,
                rule.condition.rule_type(),
                serde_json::to_string(&rule.condition)?,
                rule.host_id,
                rule.severity.to_string(),
                rule.enabled,
                serde_json::to_string(&rule.notification_channels)?,
                rule.cooldown_minutes,
                to_ms(rule.updated_at),
            ])
            .map_err(|e| unique_violation(e, "alert_rule", &rule.name))?;
        if changed == 0 {
            return Err(StorageError::NotFound {
                entity: "alert_rule",
                id: rule.id.clone(),
            });
        }
        Ok(())
    }

    fn set_rule_enabled(&self, id: &str, enabled: bool, now: DateTime<Utc>) -> Result<()> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "UPDATE alert_rules SET enabled = ?2, updated_at = ?3 WHERE id = ?1",
        )?;
        let changed = stmt.execute(params![id, enabled, to_ms(now)])?;
        if changed == 0 {
            return Err(StorageError::NotFound {
                entity: "alert_rule",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    fn delete_rule(&self, id: &str) -> Result<()> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached("DELETE FROM alert_rules WHERE id = ?1")?;
        let changed = stmt.execute(params![id])?;
        if changed == 0 {
            return Err(StorageError::NotFound {
                entity: "alert_rule",
                id: id.to_string(),
            });
        }
        Ok(())
    }
}
