use super::{from_ms, from_opt_ms, to_ms, SqliteStore};
use crate::error::{Result, StorageError};
use crate::MuteStore;
use chrono::{DateTime, Utc};
use netmon_common::types::AlertMute;
use rusqlite::params;

const MUTE_COLUMNS: &str = "id, rule_id, host_id, reason, muted_by, muted_at, expires_at";

type MuteRow = (
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
    i64,
    Option<i64>,
);

fn mute_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MuteRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn mute_from_parts(parts: MuteRow) -> Result<AlertMute> {
    let (id, rule_id, host_id, reason, muted_by, muted_ms, expires_ms) = parts;
    Ok(AlertMute {
        id,
        rule_id,
        host_id,
        reason,
        muted_by,
        muted_at: from_ms(muted_ms, "muted_at")?,
        expires_at: from_opt_ms(expires_ms, "expires_at")?,
    })
}

impl MuteStore for SqliteStore {
    fn create_mute(&self, mute: &AlertMute) -> Result<()> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "INSERT INTO alert_mutes (id, rule_id, host_id, reason, muted_by, muted_at, \
             expires_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        stmt.execute(params![
            mute.id,
            mute.rule_id,
            mute.host_id,
            mute.reason,
            mute.muted_by,
            to_ms(mute.muted_at),
            mute.expires_at.map(to_ms),
        ])?;
        Ok(())
    }

    fn get_mute(&self, id: &str) -> Result<AlertMute> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare_cached(&format!("SELECT {MUTE_COLUMNS} FROM alert_mutes WHERE id = ?1"))?;
        match stmt.query_row(params![id], mute_from_row) {
            Ok(parts) => mute_from_parts(parts),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(StorageError::NotFound {
                entity: "alert_mute",
                id: id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn list_mutes(&self) -> Result<Vec<AlertMute>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare_cached(&format!("SELECT {MUTE_COLUMNS} FROM alert_mutes ORDER BY muted_at"))?;
        let rows = stmt.query_map([], mute_from_row)?;
        let mut mutes = Vec::new();
        for row in rows {
            mutes.push(mute_from_parts(row?)?);
        }
        Ok(mutes)
    }

    fn find_active_mutes(
        &self,
        rule_id: &str,
        host_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<AlertMute>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {MUTE_COLUMNS} FROM alert_mutes \
             WHERE (expires_at IS NULL OR expires_at > ?1) \
               AND (rule_id IS NULL OR rule_id = ?2) \
               AND (host_id IS NULL OR host_id = ?3) \
             ORDER BY muted_at"
        ))?;
        let rows = stmt.query_map(params![to_ms(now), rule_id, host_id], mute_from_row)?;
        let mut mutes = Vec::new();
        for row in rows {
            mutes.push(mute_from_parts(row?)?);
        }
        Ok(mutes)
    }

    fn delete_mute(&self, id: &str) -> Result<()> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached("DELETE FROM alert_mutes WHERE id = ?1")?;
        let changed = stmt.execute(params![id])?;
        if changed == 0 {
            return Err(StorageError::NotFound {
                entity: "alert_mute",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    fn delete_expired_mutes(&self, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "DELETE FROM alert_mutes WHERE expires_at IS NOT NULL AND expires_at <= ?1",
        )?;
        let removed = stmt.execute(params![to_ms(now)])?;
        Ok(removed)
    }
}
