use async_trait::async_trait;
use poise::serenity_prelude::{
    ChannelId, Context, CreateEmbed, EditMessage, FullEvent, GuildId, MessageId, Reaction, RoleId,
    UserId,
};
use tracing::{debug, info};

use super::database::{SelfRoleBinding, SelfRoleRegistry};
use super::wizard::WizardStep;
use crate::{error::CogError, events::EventHandler, markers};

pub fn prompt(binding: &SelfRoleBinding) -> Option<CreateEmbed> {
    let role_id = binding.current_role()?;
    Some(
        CreateEmbed::new()
            .title("Self-role setup")
            .description(format!(
                "React to this message with the emoji for <@&{}> ({}/{})",
                role_id,
                binding.cursor() + 1,
                binding.roles.len()
            ))
            .colour(0x0E82AF),
    )
}

#[derive(Debug, Clone)]
pub struct SelfRoleHandler {
    db: SelfRoleRegistry,
}

impl SelfRoleHandler {
    pub fn new(db: SelfRoleRegistry) -> Self {
        Self { db }
    }

    async fn on_wizard_reaction(
        &self,
        ctx: &Context,
        reaction: &Reaction,
        actor_id: u64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let emoji = reaction.emoji.to_string();
        let progress = match self
            .db
            .advance(reaction.message_id.get(), actor_id, &emoji)
            .await
        {
            Ok(Some(progress)) => progress,
            Ok(None) => return Ok(()),
            Err(CogError::DuplicateEmoji(_)) => {
                let _ = reaction.delete(ctx).await;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let binding = progress.binding;
        match progress.step {
            WizardStep::Next { cursor, role_id } => {
                debug!("Binding {} now waits for role {} ({})", binding.message_id, role_id, cursor);
                let _ = reaction.delete(ctx).await;
                if let Some(embed) = prompt(&binding) {
                    reaction
                        .channel_id
                        .edit_message(ctx, reaction.message_id, EditMessage::new().embed(embed))
                        .await?;
                }
            }
            WizardStep::Complete => {
                reaction
                    .channel_id
                    .delete_message(ctx, reaction.message_id)
                    .await?;

                let source = ChannelId::new(binding.channel_id);
                for emoji in &binding.emojis {
                    source
                        .create_reaction(
                            ctx,
                            MessageId::new(binding.message_id),
                            markers::reaction_type(emoji),
                        )
                        .await?;
                }
                info!(
                    "Self-role message {} bound {} roles",
                    binding.message_id,
                    binding.roles.len()
                );
            }
        }
        Ok(())
    }

    async fn on_role_reaction(
        &self,
        ctx: &Context,
        reaction: &Reaction,
        user_id: u64,
        added: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let emoji = reaction.emoji.to_string();
        let Some((guild_id, role_id)) = self.db.role_for(reaction.message_id.get(), &emoji).await
        else {
            return Ok(());
        };

        let (guild_id, user_id, role_id) =
            (GuildId::new(guild_id), UserId::new(user_id), RoleId::new(role_id));
        if added {
            ctx.http
                .add_member_role(guild_id, user_id, role_id, Some("Self give"))
                .await?;
        } else {
            ctx.http
                .remove_member_role(guild_id, user_id, role_id, Some("Self remove"))
                .await?;
        }
        debug!(
            "{} role {} for {}",
            if added { "Granted" } else { "Revoked" },
            role_id,
            user_id
        );
        Ok(())
    }

    async fn on_reaction(
        &self,
        ctx: &Context,
        reaction: &Reaction,
        added: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let Some(user_id) = reaction.user_id else {
            return Ok(());
        };
        if user_id == ctx.cache.current_user().id {
            return Ok(());
        }

        if added && self.db.is_control(reaction.message_id.get()).await {
            self.on_wizard_reaction(ctx, reaction, user_id.get()).await
        } else {
            self.on_role_reaction(ctx, reaction, user_id.get(), added).await
        }
    }
}

#[async_trait]
impl EventHandler for SelfRoleHandler {
    fn name(&self) -> &str {
        "SelfRoles"
    }

    async fn handle(
        &self,
        ctx: &Context,
        event: &FullEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match event {
            FullEvent::ReactionAdd { add_reaction } => self.on_reaction(ctx, add_reaction, true).await,
            FullEvent::ReactionRemove { removed_reaction } => {
                self.on_reaction(ctx, removed_reaction, false).await
            }
            FullEvent::MessageDelete {
                deleted_message_id, ..
            } => {
                if self.db.forget_message(deleted_message_id.get()).await? {
                    debug!("Dropped self-role state for message {}", deleted_message_id);
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn box_clone(&self) -> Box<dyn EventHandler> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_the_current_role() {
        let binding = SelfRoleBinding::wizard(1, 2, 3, vec![44, 55], 9).unwrap();
        assert!(prompt(&binding).is_some());

        let done = SelfRoleBinding::numbered(1, 2, 3, vec![44], 9).unwrap();
        assert!(prompt(&done).is_none());
    }
}
