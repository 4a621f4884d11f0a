//! Join-time role propagation between the main guild and its satellites.

use super::database::RoleSyncDatabase;

/// What is known about a member when they join `guild_id`.
#[derive(Debug, Clone, Default)]
pub struct JoinFacts {
    pub guild_id: u64,
    /// Roles the member holds in the joined guild.
    pub roles: Vec<u64>,
    /// Whether the member is present in some other guild the bot serves.
    pub present_elsewhere: bool,
    /// The member's roles in the main guild, if they are in it.
    pub main_guild_roles: Option<Vec<u64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grant {
    pub guild_id: u64,
    pub role_id: u64,
    pub reason: &'static str,
}

pub fn plan_sync(db: &RoleSyncDatabase, facts: &JoinFacts) -> Option<Grant> {
    let main_guild = db.main_guild?;

    if facts.guild_id == main_guild {
        if !facts.present_elsewhere {
            return None;
        }
        let role_id = db.guild(main_guild).wolf_role?;
        return Some(Grant {
            guild_id: main_guild,
            role_id,
            reason: "Member of the pack",
        });
    }

    let wolf_role = db.guild(main_guild).wolf_role?;
    let is_wolf = facts
        .main_guild_roles
        .as_ref()
        .is_some_and(|roles| roles.contains(&wolf_role));
    if !is_wolf {
        return None;
    }

    let member_role = db.guild(facts.guild_id).member_role?;
    if facts.roles.contains(&member_role) {
        return None;
    }
    Some(Grant {
        guild_id: facts.guild_id,
        role_id: member_role,
        reason: "Wolf on the main server",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::rolesync::database::RoleSyncGuild;

    const MAIN: u64 = 1;
    const SATELLITE: u64 = 2;
    const WOLF: u64 = 10;
    const MEMBER: u64 = 20;

    fn db() -> RoleSyncDatabase {
        let mut db = RoleSyncDatabase {
            main_guild: Some(MAIN),
            ..Default::default()
        };
        db.guilds.insert(
            MAIN,
            RoleSyncGuild {
                wolf_role: Some(WOLF),
                ..Default::default()
            },
        );
        db.guilds.insert(
            SATELLITE,
            RoleSyncGuild {
                member_role: Some(MEMBER),
                ..Default::default()
            },
        );
        db
    }

    #[test]
    fn joining_main_from_a_satellite_grants_wolf() {
        let facts = JoinFacts {
            guild_id: MAIN,
            present_elsewhere: true,
            ..Default::default()
        };
        assert_eq!(
            plan_sync(&db(), &facts),
            Some(Grant {
                guild_id: MAIN,
                role_id: WOLF,
                reason: "Member of the pack"
            })
        );
    }

    #[test]
    fn joining_main_alone_grants_nothing() {
        let facts = JoinFacts {
            guild_id: MAIN,
            ..Default::default()
        };
        assert_eq!(plan_sync(&db(), &facts), None);
    }

    #[test]
    fn wolves_get_the_satellite_member_role() {
        let facts = JoinFacts {
            guild_id: SATELLITE,
            main_guild_roles: Some(vec![WOLF]),
            ..Default::default()
        };
        assert_eq!(plan_sync(&db(), &facts).map(|g| g.role_id), Some(MEMBER));

        let already = JoinFacts {
            roles: vec![MEMBER],
            ..facts
        };
        assert_eq!(plan_sync(&db(), &already), None);
    }

    #[test]
    fn non_wolves_and_strangers_get_nothing() {
        let not_wolf = JoinFacts {
            guild_id: SATELLITE,
            main_guild_roles: Some(vec![99]),
            ..Default::default()
        };
        assert_eq!(plan_sync(&db(), &not_wolf), None);

        let stranger = JoinFacts {
            guild_id: SATELLITE,
            ..Default::default()
        };
        assert_eq!(plan_sync(&db(), &stranger), None);
    }

    #[test]
    fn unconfigured_sync_does_nothing() {
        let facts = JoinFacts {
            guild_id: MAIN,
            present_elsewhere: true,
            ..Default::default()
        };
        assert_eq!(plan_sync(&RoleSyncDatabase::default(), &facts), None);
    }
}
