use async_trait::async_trait;
use poise::serenity_prelude::{Context, FullEvent, Message, VoiceState};
use tracing::debug;

use super::database::{PendingMessages, StatsRegistry};
use crate::{events::EventHandler, utils::now_timestamp};

/// Counts messages and voice time of guild members.
#[derive(Debug, Clone)]
pub struct StatsHandler {
    db: StatsRegistry,
    pending: PendingMessages,
}

impl StatsHandler {
    pub fn new(db: StatsRegistry, pending: PendingMessages) -> Self {
        Self { db, pending }
    }

    fn on_message(&self, message: &Message) {
        let Some(guild_id) = message.guild_id else {
            return;
        };
        if message.author.bot || message.webhook_id.is_some() {
            return;
        }
        self.pending.record(guild_id.get(), message.author.id.get());
    }

    async fn on_voice_state(
        &self,
        ctx: &Context,
        state: &VoiceState,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let Some(guild_id) = state.guild_id else {
            return Ok(());
        };
        let bot = match &state.member {
            Some(member) => member.user.bot,
            None => ctx.cache.user(state.user_id).is_some_and(|u| u.bot),
        };
        if bot {
            return Ok(());
        }

        let in_voice = state.channel_id.is_some();
        if self
            .db
            .track_voice(guild_id.get(), state.user_id.get(), in_voice, now_timestamp())
            .await?
        {
            debug!(
                "Voice session of {} in {} {}",
                state.user_id,
                guild_id,
                if in_voice { "opened" } else { "closed" }
            );
        }
        Ok(())
    }
}

#[async_trait]
impl EventHandler for StatsHandler {
    fn name(&self) -> &str {
        "Stats"
    }

    async fn handle(
        &self,
        ctx: &Context,
        event: &FullEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match event {
            FullEvent::Message { new_message } => {
                self.on_message(new_message);
                Ok(())
            }
            FullEvent::VoiceStateUpdate { new, .. } => self.on_voice_state(ctx, new).await,
            _ => Ok(()),
        }
    }

    fn box_clone(&self) -> Box<dyn EventHandler> {
        Box::new(self.clone())
    }
}
