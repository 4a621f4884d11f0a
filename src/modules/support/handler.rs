use async_trait::async_trait;
use dashmap::DashSet;
use poise::serenity_prelude::{
    ChannelId, ChannelType, Context, CreateAttachment, CreateChannel, CreateEmbed,
    CreateEmbedFooter, CreateMessage, EditChannel, FullEvent, GuildId, MessageId,
    PermissionOverwrite, PermissionOverwriteType, Permissions, Reaction, RoleId, UserId,
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

use super::database::{SupportRegistry, TicketAction, TicketMessage, TicketRecord};
use super::transcript;
use crate::{
    events::EventHandler,
    markers::{self, FooterTag, LOCK, NO, NO_ENTRY, UNLOCK, YES},
};

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

const OWNER_ACCESS: Permissions = Permissions::VIEW_CHANNEL.union(Permissions::SEND_MESSAGES);

pub fn channel_name(index: u64, closed: bool) -> String {
    if closed {
        format!("🔒-closed-{index}")
    } else {
        format!("📩-ticket-{index}")
    }
}

pub fn control_embed(index: u64) -> CreateEmbed {
    CreateEmbed::new()
        .title("Support ticket")
        .description(format!("React with {LOCK} to close this ticket"))
        .colour(0x0E82AF)
        .footer(CreateEmbedFooter::new(FooterTag::Ticket.render(index)))
}

fn admin_embed(index: u64) -> CreateEmbed {
    CreateEmbed::new()
        .title("Ticket closed")
        .description(format!("{UNLOCK} Reopen the ticket\n{NO_ENTRY} Delete the ticket"))
        .colour(0xE67E22)
        .footer(CreateEmbedFooter::new(FooterTag::Mod.render(index)))
}

fn summary_embed(ticket: &TicketRecord, participants: &[u64], closed_by: u64) -> CreateEmbed {
    let others = if participants.is_empty() {
        "None".to_string()
    } else {
        participants
            .iter()
            .map(|id| format!("<@{id}>"))
            .collect::<Vec<_>>()
            .join(", ")
    };
    CreateEmbed::new()
        .title(format!("Ticket {} transcript", ticket.index))
        .field("Owner", format!("<@{}>", ticket.owner_id), true)
        .field("Deleted by", format!("<@{closed_by}>"), true)
        .field("Participants", others, false)
        .colour(0x0E82AF)
}

/// What a reaction on a support message asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    OpenTicket,
    Ticket(TicketAction),
    Ignore,
}

/// Any reaction on a panel opens a ticket. On ticket messages only the
/// marker glyphs of that message do something.
pub fn route(on_panel: bool, message: Option<TicketMessage>, emoji: &str) -> Route {
    if on_panel {
        return Route::OpenTicket;
    }
    message
        .and_then(|m| TicketAction::from_emoji(m, emoji))
        .map_or(Route::Ignore, Route::Ticket)
}

/// Step of a ticket deletion that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteStage {
    Export,
    Publish,
    Teardown,
    Forget,
}

impl DeleteStage {
    /// Transition that puts the ticket back in reach after this step failed.
    pub fn recovery(self) -> Option<TicketAction> {
        match self {
            Self::Export | Self::Publish | Self::Teardown => Some(TicketAction::AbortDelete),
            // The channel is gone; its ChannelDelete event drops the record.
            Self::Forget => None,
        }
    }
}

type StageResult = Result<(), (DeleteStage, Box<dyn std::error::Error + Send + Sync>)>;

fn at<E>(stage: DeleteStage) -> impl FnOnce(E) -> (DeleteStage, Box<dyn std::error::Error + Send + Sync>)
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    move |e| (stage, e.into())
}

/// Drives support tickets from reactions on panels, control and admin
/// messages.
#[derive(Debug, Clone)]
pub struct SupportHandler {
    db: SupportRegistry,
    export_timeout: Duration,
    transcript_limit: usize,
    deleting: Arc<DashSet<u64>>,
}

impl SupportHandler {
    pub fn new(db: SupportRegistry, export_timeout: Duration, transcript_limit: usize) -> Self {
        Self {
            db,
            export_timeout,
            transcript_limit,
            deleting: Arc::new(DashSet::new()),
        }
    }

    async fn open_ticket(&self, ctx: &Context, reaction: &Reaction, guild_id: GuildId, owner: UserId) -> HandlerResult {
        let index = self.db.allocate_index().await?;
        let settings = self.db.get_settings(guild_id.get()).await;

        let mut permissions = vec![
            PermissionOverwrite {
                allow: Permissions::empty(),
                deny: Permissions::VIEW_CHANNEL,
                kind: PermissionOverwriteType::Role(guild_id.everyone_role()),
            },
            PermissionOverwrite {
                allow: OWNER_ACCESS,
                deny: Permissions::empty(),
                kind: PermissionOverwriteType::Member(owner),
            },
        ];
        if let Some(admin_role) = settings.admin_role {
            permissions.push(PermissionOverwrite {
                allow: OWNER_ACCESS,
                deny: Permissions::empty(),
                kind: PermissionOverwriteType::Role(RoleId::new(admin_role)),
            });
        }

        let mut builder = CreateChannel::new(channel_name(index, false))
            .kind(ChannelType::Text)
            .permissions(permissions)
            .audit_log_reason("Support ticket opened");
        let category = reaction
            .channel_id
            .to_channel(ctx)
            .await?
            .guild()
            .and_then(|c| c.parent_id);
        if let Some(category) = category {
            builder = builder.category(category);
        }

        let channel = guild_id.create_channel(ctx, builder).await?;
        channel
            .id
            .say(
                ctx,
                format!("<@{owner}>\nDescribe your problem here, an administrator will answer soon."),
            )
            .await?;
        let control = channel
            .id
            .send_message(ctx, CreateMessage::new().embed(control_embed(index)))
            .await?;
        control.react(ctx, markers::reaction_type(LOCK)).await?;

        self.db
            .insert(TicketRecord::new(
                index,
                guild_id.get(),
                owner.get(),
                channel.id.get(),
                control.id.get(),
            ))
            .await?;
        info!("Ticket {} opened by {} in {}", index, owner, guild_id);
        Ok(())
    }

    async fn on_action(&self, ctx: &Context, ticket: TicketRecord, action: TicketAction, actor: UserId) -> HandlerResult {
        let Some(ticket) = self.db.transition(ticket.index, action).await? else {
            debug!("Ticket {} ignores {:?}", ticket.index, action);
            return Ok(());
        };

        let channel = ChannelId::new(ticket.channel_id);
        let control = MessageId::new(ticket.control_message_id);
        let owner = UserId::new(ticket.owner_id);

        match action {
            TicketAction::RequestClose => {
                for glyph in [YES, NO] {
                    channel
                        .create_reaction(ctx, control, markers::reaction_type(glyph))
                        .await?;
                }
            }
            TicketAction::CancelClose => {
                channel.delete_reactions(ctx, control).await?;
                channel
                    .create_reaction(ctx, control, markers::reaction_type(LOCK))
                    .await?;
            }
            TicketAction::ConfirmClose => {
                channel.delete_reactions(ctx, control).await?;
                channel
                    .say(ctx, format!("Ticket closed by <@{actor}>"))
                    .await?;
                channel
                    .create_permission(
                        ctx,
                        PermissionOverwrite {
                            allow: Permissions::empty(),
                            deny: OWNER_ACCESS,
                            kind: PermissionOverwriteType::Member(owner),
                        },
                    )
                    .await?;
                channel
                    .edit(ctx, EditChannel::new().name(channel_name(ticket.index, true)))
                    .await?;

                let admin = channel
                    .send_message(ctx, CreateMessage::new().embed(admin_embed(ticket.index)))
                    .await?;
                for glyph in [UNLOCK, NO_ENTRY] {
                    admin.react(ctx, markers::reaction_type(glyph)).await?;
                }
                self.db
                    .set_admin_message(ticket.index, Some(admin.id.get()))
                    .await?;
                info!("Ticket {} closed by {}", ticket.index, actor);
            }
            TicketAction::Reopen => {
                if let Some(admin) = ticket.admin_message_id {
                    channel.delete_message(ctx, MessageId::new(admin)).await?;
                }
                self.db.set_admin_message(ticket.index, None).await?;
                channel
                    .create_permission(
                        ctx,
                        PermissionOverwrite {
                            allow: OWNER_ACCESS,
                            deny: Permissions::empty(),
                            kind: PermissionOverwriteType::Member(owner),
                        },
                    )
                    .await?;
                channel
                    .edit(ctx, EditChannel::new().name(channel_name(ticket.index, false)))
                    .await?;
                channel
                    .say(ctx, format!("Ticket reopened by <@{actor}>"))
                    .await?;
                channel
                    .create_reaction(ctx, control, markers::reaction_type(LOCK))
                    .await?;
                info!("Ticket {} reopened by {}", ticket.index, actor);
            }
            TicketAction::Delete => self.delete_ticket(ctx, ticket, actor).await?,
            TicketAction::AbortDelete => {}
        }
        Ok(())
    }

    async fn run_delete(&self, ctx: &Context, ticket: &TicketRecord, actor: UserId) -> StageResult {
        let channel = ChannelId::new(ticket.channel_id);
        channel
            .say(ctx, "Saving transcript...")
            .await
            .map_err(at(DeleteStage::Export))?;
        let lines = transcript::export(ctx, channel, self.transcript_limit, self.export_timeout)
            .await
            .map_err(at(DeleteStage::Export))?;

        let settings = self.db.get_settings(ticket.guild_id).await;
        match settings.transcript_channel {
            Some(target) => {
                let participants = transcript::participants(ticket.owner_id, &lines);
                let file = CreateAttachment::bytes(
                    transcript::render(ticket.index, &lines).into_bytes(),
                    format!("ticket-{}.txt", ticket.index),
                );
                ChannelId::new(target)
                    .send_message(
                        ctx,
                        CreateMessage::new()
                            .embed(summary_embed(ticket, &participants, actor.get()))
                            .add_file(file),
                    )
                    .await
                    .map_err(at(DeleteStage::Publish))?;
            }
            None => warn!(
                "No transcript channel set for guild {}, ticket {} transcript dropped",
                ticket.guild_id, ticket.index
            ),
        }

        channel.delete(ctx).await.map_err(at(DeleteStage::Teardown))?;
        self.db
            .remove(ticket.index)
            .await
            .map_err(at(DeleteStage::Forget))?;
        Ok(())
    }

    async fn delete_ticket(&self, ctx: &Context, ticket: TicketRecord, actor: UserId) -> HandlerResult {
        if !self.deleting.insert(ticket.index) {
            debug!("Ticket {} is already being deleted", ticket.index);
            return Ok(());
        }
        let result = self.run_delete(ctx, &ticket, actor).await;
        self.deleting.remove(&ticket.index);

        let Err((stage, e)) = result else {
            info!("Ticket {} deleted by {}", ticket.index, actor);
            return Ok(());
        };
        warn!("Deleting ticket {} failed at {:?}: {}", ticket.index, stage, e);
        if let Some(action) = stage.recovery() {
            self.db.transition(ticket.index, action).await?;
            let _ = ChannelId::new(ticket.channel_id)
                .say(ctx, format!("❌ The ticket could not be deleted and was kept: {e}"))
                .await;
        }
        Ok(())
    }

    async fn on_reaction(&self, ctx: &Context, reaction: &Reaction) -> HandlerResult {
        let (Some(user_id), Some(guild_id)) = (reaction.user_id, reaction.guild_id) else {
            return Ok(());
        };
        if user_id == ctx.cache.current_user().id {
            return Ok(());
        }
        let message_id = reaction.message_id.get();

        let on_panel = self.db.is_panel(message_id).await;
        let found = if on_panel {
            None
        } else {
            self.db.find_by_message(message_id).await
        };
        if !on_panel && found.is_none() {
            return Ok(());
        }
        let _ = reaction.delete(ctx).await;

        let emoji = reaction.emoji.to_string();
        match route(on_panel, found.as_ref().map(|(_, m)| *m), &emoji) {
            Route::OpenTicket => self.open_ticket(ctx, reaction, guild_id, user_id).await,
            Route::Ticket(action) => match found {
                Some((ticket, _)) => self.on_action(ctx, ticket, action, user_id).await,
                None => Ok(()),
            },
            Route::Ignore => Ok(()),
        }
    }

    async fn on_channel_deleted(&self, channel_id: ChannelId) -> HandlerResult {
        if let Some(ticket) = self.db.forget_channel(channel_id.get()).await? {
            info!("Ticket {} dropped with its channel {}", ticket.index, channel_id);
        }
        Ok(())
    }
}

#[async_trait]
impl EventHandler for SupportHandler {
    fn name(&self) -> &str {
        "Support"
    }

    async fn handle(
        &self,
        ctx: &Context,
        event: &FullEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match event {
            FullEvent::ReactionAdd { add_reaction } => self.on_reaction(ctx, add_reaction).await,
            FullEvent::ChannelDelete { channel, .. } => self.on_channel_deleted(channel.id).await,
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
    fn channel_names_follow_the_state() {
        assert_eq!(channel_name(0, false), "📩-ticket-0");
        assert_eq!(channel_name(12, true), "🔒-closed-12");
    }

    #[test]
    fn any_panel_reaction_opens_a_ticket() {
        for emoji in ["📩", "🎫", "<:custom:123>"] {
            assert_eq!(route(true, None, emoji), Route::OpenTicket);
        }
    }

    #[test]
    fn ticket_messages_only_react_to_their_markers() {
        assert_eq!(
            route(false, Some(TicketMessage::Control), LOCK),
            Route::Ticket(TicketAction::RequestClose)
        );
        assert_eq!(
            route(false, Some(TicketMessage::Control), YES),
            Route::Ticket(TicketAction::ConfirmClose)
        );
        assert_eq!(
            route(false, Some(TicketMessage::Admin), NO_ENTRY),
            Route::Ticket(TicketAction::Delete)
        );
        assert_eq!(route(false, Some(TicketMessage::Admin), LOCK), Route::Ignore);
        assert_eq!(route(false, Some(TicketMessage::Control), "🎉"), Route::Ignore);
        assert_eq!(route(false, None, LOCK), Route::Ignore);
    }

    #[test]
    fn failed_deletes_roll_back_while_the_channel_exists() {
        assert_eq!(DeleteStage::Export.recovery(), Some(TicketAction::AbortDelete));
        assert_eq!(DeleteStage::Publish.recovery(), Some(TicketAction::AbortDelete));
        assert_eq!(DeleteStage::Teardown.recovery(), Some(TicketAction::AbortDelete));
        assert_eq!(DeleteStage::Forget.recovery(), None);
    }

    #[test]
    fn stage_errors_keep_their_stage() {
        let (stage, e) = at::<&str>(DeleteStage::Publish)("send failed");
        assert_eq!(stage, DeleteStage::Publish);
        assert_eq!(e.to_string(), "send failed");
    }

    #[test]
    fn owner_access_covers_reading_and_writing() {
        assert!(OWNER_ACCESS.contains(Permissions::VIEW_CHANNEL));
        assert!(OWNER_ACCESS.contains(Permissions::SEND_MESSAGES));
    }
}
