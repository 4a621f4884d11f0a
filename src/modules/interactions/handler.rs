use async_trait::async_trait;
use dashmap::DashMap;
use poise::serenity_prelude::{
    ChannelId, Context, EditMessage, FullEvent, MessageId, Reaction,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::database::InteractionRegistry;
use super::render;
use crate::{error::CogError, events::EventHandler};

/// Listens for reactions on tracked polls and votes.
#[derive(Debug, Clone)]
pub struct InteractionHandler {
    db: InteractionRegistry,
    locks: Arc<DashMap<u64, Arc<Mutex<()>>>>,
}

impl InteractionHandler {
    pub fn new(db: InteractionRegistry) -> Self {
        Self {
            db,
            locks: Arc::new(DashMap::new()),
        }
    }

    fn lock_for(&self, message_id: u64) -> Arc<Mutex<()>> {
        self.locks.entry(message_id).or_default().clone()
    }

    /// Drops the lock of `message_id` once no reaction holds or waits on it.
    fn release(&self, message_id: u64) {
        self.locks
            .remove_if(&message_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    async fn on_reaction(
        &self,
        ctx: &Context,
        reaction: &Reaction,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let Some(user_id) = reaction.user_id else {
            return Ok(());
        };
        if user_id == ctx.cache.current_user().id {
            return Ok(());
        }

        let message_id = reaction.message_id.get();
        if !self.db.is_tracked(message_id).await {
            return Ok(());
        }

        // Record and render of one message must land in arrival order.
        let lock = self.lock_for(message_id);
        let result = {
            let _guard = lock.lock().await;
            self.record(ctx, reaction, user_id.get(), message_id).await
        };
        drop(lock);
        self.release(message_id);
        result
    }

    async fn record(
        &self,
        ctx: &Context,
        reaction: &Reaction,
        user_id: u64,
        message_id: u64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let emoji = reaction.emoji.to_string();
        let update = match self
            .db
            .handle_reaction(message_id, user_id, &emoji, true)
            .await
        {
            Ok(Some(update)) => update,
            Ok(None) => return Ok(()),
            Err(e @ (CogError::InteractionClosed(_) | CogError::UnknownEmoji(_))) => {
                debug!("Ignoring reaction {} on {}: {}", emoji, message_id, e);
                let _ = reaction.delete(ctx).await;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        debug!(
            "Recorded {:?} for {} on {} {}",
            update.outcome, user_id, update.interaction.kind, message_id
        );

        reaction
            .channel_id
            .edit_message(
                ctx,
                reaction.message_id,
                EditMessage::new().embed(render::embed(&update.interaction)),
            )
            .await?;

        if let Err(e) = reaction.delete(ctx).await {
            warn!("Failed to remove reaction on {}: {}", message_id, e);
        }
        Ok(())
    }

    async fn on_message_deleted(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let message_id = message_id.get();
        if !self.db.is_tracked(message_id).await {
            return Ok(());
        }
        self.db.archive(message_id).await?;
        self.locks.remove(&message_id);
        debug!("Archived interaction {} from channel {}", message_id, channel_id);
        Ok(())
    }
}

#[async_trait]
impl EventHandler for InteractionHandler {
    fn name(&self) -> &str {
        "Interactions"
    }

    async fn handle(
        &self,
        ctx: &Context,
        event: &FullEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match event {
            FullEvent::ReactionAdd { add_reaction } => self.on_reaction(ctx, add_reaction).await,
            FullEvent::MessageDelete {
                channel_id,
                deleted_message_id,
                ..
            } => self.on_message_deleted(*channel_id, *deleted_message_id).await,
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

    async fn handler(dir: &tempfile::TempDir) -> InteractionHandler {
        let path = dir.path().join("interactions.db").display().to_string();
        InteractionHandler::new(InteractionRegistry::new(path).await.unwrap())
    }

    #[tokio::test]
    async fn idle_locks_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler(&dir).await;

        let lock = handler.lock_for(1);
        drop(lock);
        handler.release(1);

        assert!(handler.locks.is_empty());
    }

    #[tokio::test]
    async fn waiting_reactions_keep_their_lock() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler(&dir).await;

        let first = handler.lock_for(1);
        let waiting = handler.lock_for(1);
        assert!(Arc::ptr_eq(&first, &waiting));

        drop(first);
        handler.release(1);
        assert_eq!(handler.locks.len(), 1);

        drop(waiting);
        handler.release(1);
        assert!(handler.locks.is_empty());
    }
}
