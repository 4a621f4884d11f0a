use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::{
    database::Database,
    error::{CogError, CogResult},
    markers::{self, FooterTag, MAX_OPTIONS},
    utils::now_timestamp,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    Poll,
    Vote,
}

impl InteractionKind {
    pub fn footer(self) -> FooterTag {
        match self {
            Self::Poll => FooterTag::Poll,
            Self::Vote => FooterTag::Vote,
        }
    }

    pub fn colour(self) -> u32 {
        match self {
            Self::Poll => 0x0E82AF,
            Self::Vote => 0x00AA40,
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.footer().fmt(f)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChoiceMode {
    Single,
    Multi,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum InteractionStatus {
    Open,
    Closed,
    Archived,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InteractionOption {
    pub emoji: String,
    pub label: String,
}

/// A validated interaction that has not been posted yet.
#[derive(Debug, Clone)]
pub struct InteractionDraft {
    pub kind: InteractionKind,
    pub mode: ChoiceMode,
    pub title: String,
    pub options: Vec<InteractionOption>,
}

impl InteractionDraft {
    pub fn new(
        kind: InteractionKind,
        mode: ChoiceMode,
        title: impl Into<String>,
        labels: Vec<String>,
    ) -> CogResult<Self> {
        if labels.is_empty() || labels.len() > MAX_OPTIONS {
            return Err(CogError::InvalidOptionCount {
                count: labels.len(),
                max: MAX_OPTIONS,
            });
        }

        let options = markers::assign(&labels)
            .into_iter()
            .zip(labels)
            .map(|(emoji, label)| InteractionOption {
                emoji: emoji.to_string(),
                label,
            })
            .collect();

        Ok(Self {
            kind,
            mode,
            title: title.into(),
            options,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceOutcome {
    Selected(usize),
    Replaced { from: usize, to: usize },
    Unchanged(usize),
    Added(usize),
    Removed(usize),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedInteraction {
    pub message_id: u64,
    pub guild_id: u64,
    pub channel_id: u64,
    pub author_id: u64,
    pub kind: InteractionKind,
    pub mode: ChoiceMode,
    pub title: String,
    pub options: Vec<InteractionOption>,
    pub choices: HashMap<u64, BTreeSet<usize>>,
    pub status: InteractionStatus,
    pub created_at: i64,
}

impl TrackedInteraction {
    pub fn from_draft(
        message_id: u64,
        guild_id: u64,
        channel_id: u64,
        author_id: u64,
        draft: InteractionDraft,
    ) -> Self {
        Self {
            message_id,
            guild_id,
            channel_id,
            author_id,
            kind: draft.kind,
            mode: draft.mode,
            title: draft.title,
            options: draft.options,
            choices: HashMap::new(),
            status: InteractionStatus::Open,
            created_at: now_timestamp(),
        }
    }

    pub fn option_index(&self, emoji: &str) -> Option<usize> {
        self.options
            .iter()
            .position(|o| markers::same_emoji(&o.emoji, emoji))
    }

    pub fn counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.options.len()];
        for selected in self.choices.values() {
            for &index in selected {
                if let Some(count) = counts.get_mut(index) {
                    *count += 1;
                }
            }
        }
        counts
    }

    pub fn choice_labels(&self, participant_id: u64) -> Vec<&str> {
        self.choices
            .get(&participant_id)
            .map(|selected| {
                selected
                    .iter()
                    .filter_map(|&i| self.options.get(i).map(|o| o.label.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn apply_choice(&mut self, participant_id: u64, emoji: &str) -> CogResult<ChoiceOutcome> {
        if self.status != InteractionStatus::Open {
            return Err(CogError::InteractionClosed(self.message_id));
        }
        let index = self
            .option_index(emoji)
            .ok_or_else(|| CogError::UnknownEmoji(emoji.to_string()))?;

        let selected = self.choices.entry(participant_id).or_default();
        let outcome = match self.mode {
            ChoiceMode::Single => match selected.iter().next().copied() {
                Some(previous) if previous == index => ChoiceOutcome::Unchanged(index),
                Some(previous) => {
                    selected.clear();
                    selected.insert(index);
                    ChoiceOutcome::Replaced { from: previous, to: index }
                }
                None => {
                    selected.insert(index);
                    ChoiceOutcome::Selected(index)
                }
            },
            ChoiceMode::Multi => {
                if selected.remove(&index) {
                    ChoiceOutcome::Removed(index)
                } else {
                    selected.insert(index);
                    ChoiceOutcome::Added(index)
                }
            }
        };

        if selected.is_empty() {
            self.choices.remove(&participant_id);
        }
        Ok(outcome)
    }
}

#[derive(Debug, Clone)]
pub struct ChoiceUpdate {
    pub outcome: ChoiceOutcome,
    pub interaction: TrackedInteraction,
}

#[derive(Default, Serialize, Deserialize, Clone, Debug)]
pub struct InteractionsDatabase {
    pub interactions: HashMap<u64, TrackedInteraction>,
}

pub type InteractionRegistry = Database<InteractionsDatabase>;

impl InteractionRegistry {
    /// The interaction on `message_id`, if it belongs to `guild_id`.
    pub async fn get(&self, guild_id: u64, message_id: u64) -> Option<TrackedInteraction> {
        self.read(|db| {
            db.interactions
                .get(&message_id)
                .filter(|i| i.guild_id == guild_id)
                .cloned()
        })
        .await
    }

    pub async fn is_tracked(&self, message_id: u64) -> bool {
        self.read(|db| db.interactions.contains_key(&message_id)).await
    }

    pub async fn create(
        &self,
        message_id: u64,
        guild_id: u64,
        channel_id: u64,
        author_id: u64,
        draft: InteractionDraft,
    ) -> CogResult<TrackedInteraction> {
        let interaction =
            TrackedInteraction::from_draft(message_id, guild_id, channel_id, author_id, draft);
        self.transaction(|db| {
            db.interactions.insert(message_id, interaction.clone());
            Ok::<_, CogError>(())
        })
        .await?;
        Ok(interaction)
    }

    pub async fn record_choice(
        &self,
        message_id: u64,
        participant_id: u64,
        emoji: &str,
    ) -> CogResult<ChoiceUpdate> {
        self.update(|db| {
            let interaction = db
                .interactions
                .get_mut(&message_id)
                .ok_or(CogError::UnknownInteraction(message_id))?;
            let outcome = interaction.apply_choice(participant_id, emoji)?;
            let changed = !matches!(outcome, ChoiceOutcome::Unchanged(_));
            let update = ChoiceUpdate {
                outcome,
                interaction: interaction.clone(),
            };
            Ok((update, changed))
        })
        .await
    }

    /// Entry point for raw reaction events. Untracked messages and removals
    /// are not ours to handle and yield `None`.
    pub async fn handle_reaction(
        &self,
        message_id: u64,
        participant_id: u64,
        emoji: &str,
        added: bool,
    ) -> CogResult<Option<ChoiceUpdate>> {
        if !added {
            return Ok(None);
        }
        match self.record_choice(message_id, participant_id, emoji).await {
            Ok(update) => Ok(Some(update)),
            Err(CogError::UnknownInteraction(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Closes an interaction of `guild_id`. Interactions of other guilds are
    /// reported as unknown.
    pub async fn close(&self, guild_id: u64, message_id: u64) -> CogResult<TrackedInteraction> {
        self.set_status(message_id, Some(guild_id), InteractionStatus::Closed)
            .await
    }

    pub async fn archive(&self, message_id: u64) -> CogResult<TrackedInteraction> {
        self.set_status(message_id, None, InteractionStatus::Archived)
            .await
    }

    async fn set_status(
        &self,
        message_id: u64,
        guild_id: Option<u64>,
        status: InteractionStatus,
    ) -> CogResult<TrackedInteraction> {
        self.transaction(|db| {
            let interaction = db
                .interactions
                .get_mut(&message_id)
                .filter(|i| guild_id.map_or(true, |g| i.guild_id == g))
                .ok_or(CogError::UnknownInteraction(message_id))?;
            interaction.status = status;
            Ok(interaction.clone())
        })
        .await
    }

    pub async fn clean(&self, guild_id: u64, kind: InteractionKind) -> CogResult<usize> {
        self.transaction(|db| {
            let before = db.interactions.len();
            db.interactions
                .retain(|_, i| i.guild_id != guild_id || i.kind != kind);
            Ok::<_, CogError>(before - db.interactions.len())
        })
        .await
    }
}
