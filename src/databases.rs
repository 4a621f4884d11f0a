use crate::config::Config;
use crate::database::{Database, DbError};
use crate::modules::{
    interactions::database::InteractionsDatabase, logs::database::LogsDatabase,
    rolesync::database::RoleSyncDatabase, selfroles::database::SelfRolesDatabase,
    stats::database::StatsDatabase, support::database::SupportDatabase,
};

#[derive(Debug)]
pub struct Databases {
    pub interactions: Database<InteractionsDatabase>,
    pub selfroles: Database<SelfRolesDatabase>,
    pub support: Database<SupportDatabase>,
    pub rolesync: Database<RoleSyncDatabase>,
    pub stats: Database<StatsDatabase>,
    pub logs: Database<LogsDatabase>,
}

impl Databases {
    pub async fn open(config: &Config) -> Result<Self, DbError> {
        Ok(Self {
            interactions: Database::new(config.db_path("interactions")).await?,
            selfroles: Database::new(config.db_path("selfroles")).await?,
            support: Database::new(config.db_path("support")).await?,
            rolesync: Database::new(config.db_path("rolesync")).await?,
            stats: Database::new(config.db_path("stats")).await?,
            logs: Database::new(config.db_path("logs")).await?,
        })
    }
}
