use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{database::Database, default_struct, error::CogResult};

default_struct! {
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleSyncGuild {
    pub wolf_role: Option<u64>,
    pub member_role: Option<u64>,
    pub admin_role: Option<u64>,
}
}

#[derive(Default, Serialize, Deserialize, Clone, Debug)]
pub struct RoleSyncDatabase {
    pub main_guild: Option<u64>,
    pub guilds: HashMap<u64, RoleSyncGuild>,
}

impl RoleSyncDatabase {
    pub fn guild(&self, guild_id: u64) -> RoleSyncGuild {
        self.guilds.get(&guild_id).cloned().unwrap_or_default()
    }
}

pub type RoleSyncRegistry = Database<RoleSyncDatabase>;

impl RoleSyncRegistry {
    pub async fn set_main_guild(&self, guild_id: u64) -> CogResult<()> {
        self.transaction(|db| {
            db.main_guild = Some(guild_id);
            Ok(())
        })
        .await
    }

    pub async fn settings(&self, guild_id: u64) -> RoleSyncGuild {
        self.read(|db| db.guild(guild_id)).await
    }

    pub async fn update_guild<F>(&self, guild_id: u64, f: F) -> CogResult<RoleSyncGuild>
    where
        F: FnOnce(&mut RoleSyncGuild),
    {
        self.transaction(|db| {
            let settings = db.guilds.entry(guild_id).or_default();
            f(settings);
            Ok(settings.clone())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn settings_survive_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rolesync.db").display().to_string();

        let registry = RoleSyncRegistry::new(path.clone()).await.unwrap();
        registry.set_main_guild(1).await.unwrap();
        registry
            .update_guild(1, |g| g.wolf_role = Some(10))
            .await
            .unwrap();
        registry
            .update_guild(2, |g| g.member_role = Some(20))
            .await
            .unwrap();

        let reloaded = RoleSyncRegistry::new(path).await.unwrap();
        let data = reloaded.get_data().await;
        assert_eq!(data.main_guild, Some(1));
        assert_eq!(data.guild(1).wolf_role, Some(10));
        assert_eq!(reloaded.settings(2).await.member_role, Some(20));
        assert_eq!(reloaded.settings(3).await, RoleSyncGuild::default());
    }
}
