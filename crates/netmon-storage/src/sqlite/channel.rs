use super::{from_ms, parse_severity, to_ms, unique_violation, SqliteStore};
use crate::error::{Result, StorageError};
use crate::ChannelStore;
use netmon_common::types::{ChannelConfig, NotificationChannel, Severity};
use rusqlite::params;

const CHANNEL_COLUMNS: &str =
    "id, name, config_json, min_severity, enabled, created_at, updated_at";

type ChannelRow = (String, String, String, Option<String>, bool, i64, i64);

fn channel_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChannelRow> {
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

fn channel_from_parts(parts: ChannelRow) -> Result<NotificationChannel> {
    let (id, name, config_json, min_severity, enabled, created_ms, updated_ms) = parts;
    let config: ChannelConfig = serde_json::from_str(&config_json)?;
    let min_severity: Option<Severity> = min_severity
        .map(|raw| parse_severity(&raw, "min_severity"))
        .transpose()?;
    Ok(NotificationChannel {
        id,
        name,
        config,
        min_severity,
        enabled,
        created_at: from_ms(created_ms, "created_at")?,
        updated_at: from_ms(updated_ms, "updated_at")?,
    })
}

impl ChannelStore for SqliteStore {
    fn create_channel(&self, channel: &NotificationChannel) -> Result<()> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "INSERT INTO notification_channels (id, name, channel_type, config_json, \
             min_severity, enabled, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        stmt.execute(params![
            channel.id,
            channel.name,
            channel.config.channel_type(),
            serde_json::to_string(&channel.config)?,
            channel.min_severity.map(|s| s.to_string()),
            channel.enabled,
            to_ms(channel.created_at),
            to_ms(channel.updated_at),
        ])
        .map_err(|e| unique_violation(e, "notification_channel", &channel.name))?;
        Ok(())
    }

    fn get_channel(&self, id: &str) -> Result<NotificationChannel> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {CHANNEL_COLUMNS} FROM notification_channels WHERE id = ?1"
        ))?;
        match stmt.query_row(params![id], channel_from_row) {
            Ok(parts) => channel_from_parts(parts),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(StorageError::NotFound {
                entity: "notification_channel",
                id: id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn list_channels(&self) -> Result<Vec<NotificationChannel>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {CHANNEL_COLUMNS} FROM notification_channels ORDER BY name"
        ))?;
        let rows = stmt.query_map([], channel_from_row)?;
        let mut channels = Vec::new();
        for row in rows {
            channels.push(channel_from_parts(row?)?);
        }
        Ok(channels)
    }

    fn update_channel(&self, channel: &NotificationChannel) -> Result<()> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "UPDATE notification_channels SET name = ?2, channel_type = ?3, config_json = ?4, \
             min_severity = ?5, enabled = ?6, updated_at = ?7 WHERE id = ?1",
        )?;
        let changed = stmt
            .execute(params![
                channel.id,
                channel.name,
                channel.config.channel_type(),
                serde_json::to_string(&channel.config)?,
                channel.min_severity.map(|s| s.to_string()),
                channel.enabled,
                to_ms(channel.updated_at),
            ])
            .map_err(|e| unique_violation(e, "notification_channel", &channel.name))?;
        if changed == 0 {
            return Err(StorageError::NotFound {
                entity: "notification_channel",
                id: channel.id.clone(),
            });
        }
        Ok(())
    }

    fn delete_channel(&self, id: &str) -> Result<()> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached("DELETE FROM notification_channels WHERE id = ?1")?;
        let changed = stmt.execute(params![id])?;
        if changed == 0 {
            return Err(StorageError::NotFound {
                entity: "notification_channel",
                id: id.to_string(),
            });
        }
        Ok(())
    }
}
