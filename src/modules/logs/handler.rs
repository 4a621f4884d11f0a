use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lru::LruCache;
use poise::serenity_prelude::{
    ChannelId, Context, CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter, CreateMessage, FullEvent,
    GuildId, Message, MessageId,
};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use super::database::LogsRegistry;
use crate::events::EventHandler;

const LOG_COLOUR: u32 = 0x9B59B6;

/// What is kept of a message so it can be reported after deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedMessage {
    pub author_id: u64,
    pub name: String,
    pub nick: Option<String>,
    pub channel_id: u64,
    pub content: String,
}

impl LoggedMessage {
    pub fn from_message(message: &Message) -> Self {
        let mentions: Vec<(u64, String)> = message
            .mentions
            .iter()
            .map(|u| (u.id.get(), u.name.clone()))
            .collect();
        Self {
            author_id: message.author.id.get(),
            name: message.author.name.clone(),
            nick: message.member.as_ref().and_then(|m| m.nick.clone()),
            channel_id: message.channel_id.get(),
            content: clean_mentions(&message.content, &mentions),
        }
    }

    pub fn heading(&self) -> String {
        match &self.nick {
            Some(nick) => format!("{} ~ {}", self.name, nick),
            None => self.name.clone(),
        }
    }

    pub fn info(&self) -> String {
        format!(
            "A message by __{}__, was deleted in <#{}>",
            self.nick.as_deref().unwrap_or(&self.name),
            self.channel_id
        )
    }

    pub fn embed(&self, deleted_at: DateTime<Utc>) -> CreateEmbed {
        let content = if self.content.is_empty() {
            "*no text*".to_string()
        } else {
            self.content.clone()
        };
        CreateEmbed::new()
            .description(self.heading())
            .colour(LOG_COLOUR)
            .author(CreateEmbedAuthor::new(format!(
                "{} - Deleted Message",
                deleted_at.format("%H:%M:%S")
            )))
            .field("Info:", self.info(), false)
            .field("Message:", content, false)
            .footer(CreateEmbedFooter::new(format!("User ID: {}", self.author_id)))
    }
}

/// Replaces user mentions with `@name`.
pub fn clean_mentions(content: &str, mentions: &[(u64, String)]) -> String {
    let mut clean = content.to_string();
    for (id, name) in mentions {
        let readable = format!("@{name}");
        clean = clean
            .replace(&format!("<@{id}>"), &readable)
            .replace(&format!("<@!{id}>"), &readable);
    }
    clean
}

/// Reports deleted messages to the guild's log channel. Only messages seen
/// while logging was enabled can be reported.
#[derive(Debug, Clone)]
pub struct LogsHandler {
    db: LogsRegistry,
    recent: Arc<Mutex<LruCache<u64, LoggedMessage>>>,
}

impl LogsHandler {
    pub fn new(db: LogsRegistry, capacity: NonZeroUsize) -> Self {
        Self {
            db,
            recent: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    async fn remember(&self, message: &Message) {
        let Some(guild_id) = message.guild_id else {
            return;
        };
        if message.author.bot {
            return;
        }
        match self.db.channel_for(guild_id.get()).await {
            Some(log_channel) if log_channel != message.channel_id.get() => {
                self.recent
                    .lock()
                    .await
                    .put(message.id.get(), LoggedMessage::from_message(message));
            }
            _ => {}
        }
    }

    async fn on_deleted(
        &self,
        ctx: &Context,
        guild_id: Option<GuildId>,
        message_id: MessageId,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let Some(guild_id) = guild_id else {
            return Ok(());
        };
        let Some(logged) = self.recent.lock().await.pop(&message_id.get()) else {
            return Ok(());
        };
        let Some(log_channel) = self.db.channel_for(guild_id.get()).await else {
            return Ok(());
        };

        ChannelId::new(log_channel)
            .send_message(ctx, CreateMessage::new().embed(logged.embed(Utc::now())))
            .await?;
        debug!("Logged deletion of {} by {} in {}", message_id, logged.author_id, guild_id);
        Ok(())
    }
}

#[async_trait]
impl EventHandler for LogsHandler {
    fn name(&self) -> &str {
        "Logs"
    }

    async fn handle(
        &self,
        ctx: &Context,
        event: &FullEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match event {
            FullEvent::Message { new_message } => {
                self.remember(new_message).await;
                Ok(())
            }
            FullEvent::MessageDelete {
                deleted_message_id,
                guild_id,
                ..
            } => self.on_deleted(ctx, *guild_id, *deleted_message_id).await,
            _ => Ok(()),
        }
    }

    fn box_clone(&self) -> Box<dyn EventHandler> {
        Box::new(self.clone())
    }
}
