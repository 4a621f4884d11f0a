use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{database::Database, error::CogResult};

#[derive(Default, Serialize, Deserialize, Clone, Debug)]
pub struct LogsDatabase {
    /// guild id -> channel receiving deleted messages
    pub channels: HashMap<u64, u64>,
}

pub type LogsRegistry = Database<LogsDatabase>;

impl LogsRegistry {
    pub async fn channel_for(&self, guild_id: u64) -> Option<u64> {
        self.read(|db| db.channels.get(&guild_id).copied()).await
    }

    pub async fn set_channel(&self, guild_id: u64, channel_id: u64) -> CogResult<()> {
        self.update(|db| {
            let previous = db.channels.insert(guild_id, channel_id);
            Ok(((), previous != Some(channel_id)))
        })
        .await
    }

    /// Returns whether the guild had a log channel.
    pub async fn disable(&self, guild_id: u64) -> CogResult<bool> {
        self.update(|db| {
            let removed = db.channels.remove(&guild_id).is_some();
            Ok((removed, removed))
        })
        .await
    }
}
