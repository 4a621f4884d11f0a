use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{
    database::Database,
    default_struct,
    error::{CogError, CogResult},
    markers::{LOCK, NO, NO_ENTRY, UNLOCK, YES},
    utils::now_timestamp,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TicketStatus {
    Open,
    CloseRequested,
    Closed,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketAction {
    RequestClose,
    CancelClose,
    ConfirmClose,
    Reopen,
    Delete,
    /// Undo a `Delete` that failed before the channel was gone.
    AbortDelete,
}

/// Which of a ticket's messages a reaction landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketMessage {
    Control,
    Admin,
}

impl TicketStatus {
    pub fn apply(self, action: TicketAction) -> Option<TicketStatus> {
        use TicketAction::*;
        use TicketStatus::*;

        match (self, action) {
            (Open, RequestClose) => Some(CloseRequested),
            (CloseRequested, CancelClose) => Some(Open),
            (CloseRequested, ConfirmClose) => Some(Closed),
            (Closed, Reopen) => Some(Open),
            (Closed, Delete) => Some(Deleted),
            // A delete interrupted by a crash can be retried from the admin message.
            (Deleted, Delete) => Some(Deleted),
            (Deleted, AbortDelete) => Some(Closed),
            _ => None,
        }
    }
}

impl TicketAction {
    pub fn from_emoji(message: TicketMessage, emoji: &str) -> Option<Self> {
        let is = |glyph: &str| crate::markers::same_emoji(glyph, emoji);
        match message {
            TicketMessage::Control if is(LOCK) => Some(Self::RequestClose),
            TicketMessage::Control if is(YES) => Some(Self::ConfirmClose),
            TicketMessage::Control if is(NO) => Some(Self::CancelClose),
            TicketMessage::Admin if is(UNLOCK) => Some(Self::Reopen),
            TicketMessage::Admin if is(NO_ENTRY) => Some(Self::Delete),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketRecord {
    pub index: u64,
    pub guild_id: u64,
    pub owner_id: u64,
    pub channel_id: u64,
    pub control_message_id: u64,
    pub admin_message_id: Option<u64>,
    pub status: TicketStatus,
    pub opened_at: i64,
}

impl TicketRecord {
    pub fn new(index: u64, guild_id: u64, owner_id: u64, channel_id: u64, control_message_id: u64) -> Self {
        Self {
            index,
            guild_id,
            owner_id,
            channel_id,
            control_message_id,
            admin_message_id: None,
            status: TicketStatus::Open,
            opened_at: now_timestamp(),
        }
    }
}

default_struct! {
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportSettings {
    pub transcript_channel: Option<u64>,
    pub admin_role: Option<u64>,
}
}

#[derive(Default, Serialize, Deserialize, Clone, Debug)]
pub struct SupportDatabase {
    pub next_index: u64,
    pub tickets: HashMap<u64, TicketRecord>,
    /// panel message id -> guild id
    pub panels: HashMap<u64, u64>,
    pub settings: HashMap<u64, SupportSettings>,
}

pub type SupportRegistry = Database<SupportDatabase>;

impl SupportRegistry {
    pub async fn add_panel(&self, message_id: u64, guild_id: u64) -> CogResult<()> {
        self.transaction(|db| {
            db.panels.insert(message_id, guild_id);
            Ok(())
        })
        .await
    }

    pub async fn is_panel(&self, message_id: u64) -> bool {
        self.read(|db| db.panels.contains_key(&message_id)).await
    }

    /// Reserves the next ticket index. Indices are never handed out twice,
    /// even if the ticket that would have used one is never created.
    pub async fn allocate_index(&self) -> CogResult<u64> {
        self.transaction(|db| {
            let index = db.next_index;
            db.next_index += 1;
            Ok(index)
        })
        .await
    }

    pub async fn insert(&self, record: TicketRecord) -> CogResult<()> {
        self.transaction(|db| {
            db.tickets.insert(record.index, record);
            Ok(())
        })
        .await
    }

    pub async fn find_by_message(&self, message_id: u64) -> Option<(TicketRecord, TicketMessage)> {
        self.read(|db| {
            db.tickets.values().find_map(|t| {
                if t.control_message_id == message_id {
                    Some((t.clone(), TicketMessage::Control))
                } else if t.admin_message_id == Some(message_id) {
                    Some((t.clone(), TicketMessage::Admin))
                } else {
                    None
                }
            })
        })
        .await
    }

    pub async fn tickets_in(&self, guild_id: u64) -> Vec<TicketRecord> {
        let mut tickets: Vec<TicketRecord> = self
            .read(|db| {
                db.tickets
                    .values()
                    .filter(|t| t.guild_id == guild_id)
                    .cloned()
                    .collect()
            })
            .await;
        tickets.sort_by_key(|t| t.index);
        tickets
    }

    /// Applies `action` to ticket `index`. A missing ticket or a transition
    /// the current state does not allow is a no-op returning `None`.
    pub async fn transition(&self, index: u64, action: TicketAction) -> CogResult<Option<TicketRecord>> {
        let applies = self
            .read(|db| {
                db.tickets
                    .get(&index)
                    .is_some_and(|t| t.status.apply(action).is_some())
            })
            .await;
        if !applies {
            return Ok(None);
        }

        self.transaction(|db| {
            let Some(ticket) = db.tickets.get_mut(&index) else {
                return Ok(None);
            };
            let Some(next) = ticket.status.apply(action) else {
                return Ok(None);
            };
            ticket.status = next;
            Ok(Some(ticket.clone()))
        })
        .await
    }

    pub async fn set_admin_message(&self, index: u64, message_id: Option<u64>) -> CogResult<()> {
        self.transaction(|db| {
            if let Some(ticket) = db.tickets.get_mut(&index) {
                ticket.admin_message_id = message_id;
            }
            Ok(())
        })
        .await
    }

    pub async fn remove(&self, index: u64) -> CogResult<Option<TicketRecord>> {
        self.update(|db| {
            let removed = db.tickets.remove(&index);
            let changed = removed.is_some();
            Ok((removed, changed))
        })
        .await
    }

    /// Drops the ticket living in `channel_id`, if any.
    pub async fn forget_channel(&self, channel_id: u64) -> CogResult<Option<TicketRecord>> {
        let index = self
            .read(|db| {
                db.tickets
                    .values()
                    .find(|t| t.channel_id == channel_id)
                    .map(|t| t.index)
            })
            .await;
        match index {
            Some(index) => self.remove(index).await,
            None => Ok(None),
        }
    }

    /// Drops the tickets and panels of one guild. The index counter is kept
    /// so old indices are never reassigned.
    pub async fn clean(&self, guild_id: u64) -> CogResult<usize> {
        self.transaction(|db| {
            let before = db.tickets.len();
            db.tickets.retain(|_, t| t.guild_id != guild_id);
            db.panels.retain(|_, guild| *guild != guild_id);
            Ok::<_, CogError>(before - db.tickets.len())
        })
        .await
    }

    pub async fn get_settings(&self, guild_id: u64) -> SupportSettings {
        self.read(|db| db.settings.get(&guild_id).cloned().unwrap_or_default())
            .await
    }

    pub async fn update_settings<F>(&self, guild_id: u64, f: F) -> CogResult<SupportSettings>
    where
        F: FnOnce(&mut SupportSettings),
    {
        self.transaction(|db| {
            let settings = db.settings.entry(guild_id).or_default();
            f(settings);
            Ok(settings.clone())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn stored(registry: &SupportRegistry, index: u64) -> Option<TicketRecord> {
        registry.read(|db| db.tickets.get(&index).cloned()).await
    }

    async fn registry(dir: &tempfile::TempDir) -> SupportRegistry {
        SupportRegistry::new(dir.path().join("support.db").display().to_string())
            .await
            .unwrap()
    }

    #[test]
    fn transition_table() {
        use TicketAction::*;
        use TicketStatus::*;

        assert_eq!(Open.apply(RequestClose), Some(CloseRequested));
        assert_eq!(CloseRequested.apply(CancelClose), Some(Open));
        assert_eq!(CloseRequested.apply(ConfirmClose), Some(Closed));
        assert_eq!(Closed.apply(Reopen), Some(Open));
        assert_eq!(Closed.apply(Delete), Some(Deleted));
        assert_eq!(Deleted.apply(AbortDelete), Some(Closed));
        assert_eq!(Deleted.apply(Delete), Some(Deleted));

        assert_eq!(Open.apply(ConfirmClose), None);
        assert_eq!(Open.apply(Delete), None);
        assert_eq!(CloseRequested.apply(Reopen), None);
        assert_eq!(Deleted.apply(Reopen), None);
    }

    #[test]
    fn emoji_map_depends_on_the_message() {
        assert_eq!(
            TicketAction::from_emoji(TicketMessage::Control, LOCK),
            Some(TicketAction::RequestClose)
        );
        assert_eq!(TicketAction::from_emoji(TicketMessage::Admin, LOCK), None);
        assert_eq!(
            TicketAction::from_emoji(TicketMessage::Admin, "⛔\u{fe0f}"),
            Some(TicketAction::Delete)
        );
        assert_eq!(TicketAction::from_emoji(TicketMessage::Control, "🎉"), None);
    }

    #[tokio::test]
    async fn ticket_lifecycle_never_reuses_indices() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(&dir).await;
        registry.add_panel(900, 1).await.unwrap();
        assert!(registry.is_panel(900).await);

        let index = registry.allocate_index().await.unwrap();
        assert_eq!(index, 0);
        registry
            .insert(TicketRecord::new(index, 1, 42, 1000, 1001))
            .await
            .unwrap();

        let ticket = registry.transition(0, TicketAction::RequestClose).await.unwrap().unwrap();
        assert_eq!(ticket.status, TicketStatus::CloseRequested);
        let ticket = registry.transition(0, TicketAction::ConfirmClose).await.unwrap().unwrap();
        assert_eq!(ticket.status, TicketStatus::Closed);

        registry.set_admin_message(0, Some(1002)).await.unwrap();
        let (found, message) = registry.find_by_message(1002).await.unwrap();
        assert_eq!(found.index, 0);
        assert_eq!(message, TicketMessage::Admin);

        registry.transition(0, TicketAction::Delete).await.unwrap().unwrap();
        assert!(registry.remove(0).await.unwrap().is_some());
        assert!(stored(&registry, 0).await.is_none());

        assert_eq!(registry.allocate_index().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_tickets_are_no_ops() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(&dir).await;

        assert!(registry.transition(7, TicketAction::RequestClose).await.unwrap().is_none());
        assert!(registry.find_by_message(7).await.is_none());
        assert!(registry.remove(7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalid_transitions_leave_the_record_alone() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(&dir).await;
        registry.insert(TicketRecord::new(0, 1, 42, 1000, 1001)).await.unwrap();

        assert!(registry.transition(0, TicketAction::Delete).await.unwrap().is_none());
        assert_eq!(stored(&registry, 0).await.unwrap().status, TicketStatus::Open);
    }

    #[tokio::test]
    async fn clean_keeps_the_counter() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(&dir).await;
        for _ in 0..3 {
            let index = registry.allocate_index().await.unwrap();
            registry.insert(TicketRecord::new(index, 1, 42, 10, 11)).await.unwrap();
        }

        assert_eq!(registry.clean(1).await.unwrap(), 3);
        assert!(registry.tickets_in(1).await.is_empty());
        assert_eq!(registry.allocate_index().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn clean_is_scoped_to_the_guild() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(&dir).await;
        registry.insert(TicketRecord::new(0, 1, 42, 10, 11)).await.unwrap();
        registry.insert(TicketRecord::new(1, 2, 43, 20, 21)).await.unwrap();
        registry.add_panel(900, 1).await.unwrap();
        registry.add_panel(901, 2).await.unwrap();

        assert_eq!(registry.clean(1).await.unwrap(), 1);
        assert!(registry.tickets_in(1).await.is_empty());
        assert_eq!(registry.tickets_in(2).await.len(), 1);
        assert!(!registry.is_panel(900).await);
        assert!(registry.is_panel(901).await);
    }

    #[tokio::test]
    async fn interrupted_delete_can_be_recovered() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(&dir).await;
        registry.insert(TicketRecord::new(0, 1, 42, 10, 11)).await.unwrap();
        for action in [TicketAction::RequestClose, TicketAction::ConfirmClose, TicketAction::Delete] {
            registry.transition(0, action).await.unwrap().unwrap();
        }

        // Retried after a crash.
        let ticket = registry.transition(0, TicketAction::Delete).await.unwrap().unwrap();
        assert_eq!(ticket.status, TicketStatus::Deleted);

        // Rolled back after a failed side effect, then reopened.
        registry.transition(0, TicketAction::AbortDelete).await.unwrap().unwrap();
        let ticket = registry.transition(0, TicketAction::Reopen).await.unwrap().unwrap();
        assert_eq!(ticket.status, TicketStatus::Open);
    }

    #[tokio::test]
    async fn deleted_channels_drop_their_ticket() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(&dir).await;
        registry.insert(TicketRecord::new(0, 1, 42, 10, 11)).await.unwrap();

        assert!(registry.forget_channel(99).await.unwrap().is_none());
        assert_eq!(registry.forget_channel(10).await.unwrap().unwrap().index, 0);
        assert!(stored(&registry, 0).await.is_none());
    }

    #[tokio::test]
    async fn no_op_transitions_do_not_touch_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("support.db");
        let registry = SupportRegistry::new(path.display().to_string()).await.unwrap();

        assert!(registry.transition(3, TicketAction::Delete).await.unwrap().is_none());
        assert!(registry.forget_channel(3).await.unwrap().is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn settings_are_per_guild() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(&dir).await;
        registry
            .update_settings(1, |s| s.transcript_channel = Some(55))
            .await
            .unwrap();

        assert_eq!(registry.get_settings(1).await.transcript_channel, Some(55));
        assert_eq!(registry.get_settings(2).await.transcript_channel, None);
    }
}
