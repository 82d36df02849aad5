//! Seed-file bootstrap behind the `init-rules` and `init-channels`
//! commands. Seeding is idempotent: entries whose name already exists are
//! skipped, so re-running against a populated database is safe.

use crate::error::ManagerError;
use crate::manager::AlertManager;
use netmon_common::types::{NewAlertRule, NewChannel};
use netmon_storage::error::StorageError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct RulesSeedFile {
    pub rules: Vec<NewAlertRule>,
}

#[derive(Debug, Deserialize)]
pub struct ChannelsSeedFile {
    pub channels: Vec<NewChannel>,
}

pub fn load_rules_seed(path: &str) -> anyhow::Result<RulesSeedFile> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read seed file '{}': {}", path, e))?;
    let seed: RulesSeedFile = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse seed file '{}': {}", path, e))?;
    Ok(seed)
}

pub fn load_channels_seed(path: &str) -> anyhow::Result<ChannelsSeedFile> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read seed file '{}': {}", path, e))?;
    let seed: ChannelsSeedFile = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse seed file '{}': {}", path, e))?;
    Ok(seed)
}

/// Creates every rule in the seed, skipping names that already exist.
pub fn init_rules(manager: &AlertManager, seed: RulesSeedFile) -> anyhow::Result<()> {
    let mut created = 0;
    let mut skipped = 0;
    for rule in seed.rules {
        let name = rule.name.clone();
        match manager.create_rule(rule) {
            Ok(_) => created += 1,
            Err(ManagerError::Storage(StorageError::Conflict { .. })) => {
                tracing::warn!(name = %name, "Alert rule already exists, skipping");
                skipped += 1;
            }
            Err(e) => {
                tracing::error!(name = %name, error = %e, "Failed to create alert rule");
            }
        }
    }
    tracing::info!(created, skipped, "init-rules completed");
    Ok(())
}

/// Creates every channel in the seed, skipping names that already exist.
pub fn init_channels(manager: &AlertManager, seed: ChannelsSeedFile) -> anyhow::Result<()> {
    let mut created = 0;
    let mut skipped = 0;
    for channel in seed.channels {
        let name = channel.name.clone();
        match manager.create_channel(channel) {
            Ok(_) => created += 1,
            Err(ManagerError::Storage(StorageError::Conflict { .. })) => {
                tracing::warn!(name = %name, "Channel already exists, skipping");
                skipped += 1;
            }
            Err(e) => {
                tracing::error!(name = %name, error = %e, "Failed to create channel");
            }
        }
    }
    tracing::info!(created, skipped, "init-channels completed");
    Ok(())
}
