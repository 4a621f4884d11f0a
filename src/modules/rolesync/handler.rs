use async_trait::async_trait;
use poise::serenity_prelude::{Context, FullEvent, GuildId, Member, RoleId};
use tracing::{debug, info};

use super::database::RoleSyncRegistry;
use super::sync::{plan_sync, JoinFacts};
use crate::events::EventHandler;

#[derive(Debug, Clone)]
pub struct RoleSyncHandler {
    db: RoleSyncRegistry,
}

impl RoleSyncHandler {
    pub fn new(db: RoleSyncRegistry) -> Self {
        Self { db }
    }

    async fn facts(&self, ctx: &Context, member: &Member, main_guild: GuildId) -> JoinFacts {
        let user_id = member.user.id;
        let mut facts = JoinFacts {
            guild_id: member.guild_id.get(),
            roles: member.roles.iter().map(|r| r.get()).collect(),
            ..Default::default()
        };

        if member.guild_id == main_guild {
            for guild_id in ctx.cache.guilds() {
                if guild_id != main_guild && guild_id.member(ctx, user_id).await.is_ok() {
                    facts.present_elsewhere = true;
                    break;
                }
            }
        } else {
            facts.main_guild_roles = main_guild
                .member(ctx, user_id)
                .await
                .ok()
                .map(|m| m.roles.iter().map(|r| r.get()).collect());
        }
        facts
    }

    async fn on_join(
        &self,
        ctx: &Context,
        member: &Member,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let snapshot = self.db.get_data().await;
        let Some(main_guild) = snapshot.main_guild else {
            return Ok(());
        };

        let facts = self.facts(ctx, member, GuildId::new(main_guild)).await;
        let Some(grant) = plan_sync(&snapshot, &facts) else {
            debug!("No role to sync for {} in {}", member.user.id, member.guild_id);
            return Ok(());
        };

        ctx.http
            .add_member_role(
                GuildId::new(grant.guild_id),
                member.user.id,
                RoleId::new(grant.role_id),
                Some(grant.reason),
            )
            .await?;
        info!(
            "Synced role {} for {} in {}",
            grant.role_id, member.user.id, grant.guild_id
        );
        Ok(())
    }
}

#[async_trait]
impl EventHandler for RoleSyncHandler {
    fn name(&self) -> &str {
        "RoleSync"
    }

    async fn handle(
        &self,
        ctx: &Context,
        event: &FullEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match event {
            FullEvent::GuildMemberAddition { new_member } => self.on_join(ctx, new_member).await,
            _ => Ok(()),
        }
    }

    fn box_clone(&self) -> Box<dyn EventHandler> {
        Box::new(self.clone())
    }
}
