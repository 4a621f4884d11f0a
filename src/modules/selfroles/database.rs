use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::wizard::{WizardState, WizardStep};
use crate::{
    database::Database,
    error::{CogError, CogResult},
    markers::{self, KEYCAPS, MAX_OPTIONS},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfRoleBinding {
    pub message_id: u64,
    pub guild_id: u64,
    pub channel_id: u64,
    pub roles: Vec<u64>,
    pub emojis: Vec<String>,
    pub state: WizardState,
    pub admin_id: u64,
    pub control_message_id: Option<u64>,
}

fn check_role_count(roles: &[u64]) -> CogResult<()> {
    if roles.is_empty() || roles.len() > MAX_OPTIONS {
        return Err(CogError::InvalidOptionCount {
            count: roles.len(),
            max: MAX_OPTIONS,
        });
    }
    Ok(())
}

impl SelfRoleBinding {
    /// A binding whose emoji are chosen by `admin_id` through the wizard.
    pub fn wizard(
        message_id: u64,
        guild_id: u64,
        channel_id: u64,
        roles: Vec<u64>,
        admin_id: u64,
    ) -> CogResult<Self> {
        check_role_count(&roles)?;
        Ok(Self {
            message_id,
            guild_id,
            channel_id,
            state: WizardState::start(roles.len()),
            roles,
            emojis: Vec::new(),
            admin_id,
            control_message_id: None,
        })
    }

    /// A binding for a message posted with numbered markers, complete from
    /// the start.
    pub fn numbered(
        message_id: u64,
        guild_id: u64,
        channel_id: u64,
        roles: Vec<u64>,
        admin_id: u64,
    ) -> CogResult<Self> {
        check_role_count(&roles)?;
        let emojis = KEYCAPS.iter().take(roles.len()).map(|e| e.to_string()).collect();
        Ok(Self {
            message_id,
            guild_id,
            channel_id,
            roles,
            emojis,
            state: WizardState::Complete,
            admin_id,
            control_message_id: None,
        })
    }

    pub fn cursor(&self) -> usize {
        self.state.cursor(self.roles.len())
    }

    pub fn current_role(&self) -> Option<u64> {
        match self.state {
            WizardState::AwaitingBinding(cursor) => self.roles.get(cursor).copied(),
            WizardState::Complete => None,
        }
    }

    /// Binds `emoji` to the role under the cursor. Reactions from anyone but
    /// the administrator, or after completion, yield `None`.
    pub fn bind(&mut self, actor_id: u64, emoji: &str) -> CogResult<Option<WizardStep>> {
        let WizardState::AwaitingBinding(cursor) = self.state else {
            return Ok(None);
        };
        if actor_id != self.admin_id {
            return Ok(None);
        }
        if self.emojis.iter().any(|bound| markers::same_emoji(bound, emoji)) {
            return Err(CogError::DuplicateEmoji(emoji.to_string()));
        }

        self.emojis.push(emoji.to_string());
        self.state = self.state.advance(self.roles.len());
        debug_assert_eq!(self.emojis.len(), self.cursor());

        Ok(Some(match self.state {
            WizardState::AwaitingBinding(next) => WizardStep::Next {
                cursor: next,
                role_id: self.roles[next],
            },
            WizardState::Complete => {
                tracing::debug!("Binding {} completed after {} roles", self.message_id, cursor + 1);
                WizardStep::Complete
            }
        }))
    }

    pub fn role_for(&self, emoji: &str) -> Option<u64> {
        if self.state != WizardState::Complete {
            return None;
        }
        self.emojis
            .iter()
            .position(|bound| markers::same_emoji(bound, emoji))
            .and_then(|i| self.roles.get(i).copied())
    }
}

#[derive(Default, Serialize, Deserialize, Clone, Debug)]
pub struct SelfRolesDatabase {
    pub bindings: HashMap<u64, SelfRoleBinding>,
    /// control message id -> source message id
    pub controls: HashMap<u64, u64>,
}

pub type SelfRoleRegistry = Database<SelfRolesDatabase>;

#[derive(Debug, Clone)]
pub struct WizardProgress {
    pub step: WizardStep,
    pub binding: SelfRoleBinding,
}

impl SelfRoleRegistry {
    pub async fn get(&self, message_id: u64) -> Option<SelfRoleBinding> {
        self.read(|db| db.bindings.get(&message_id).cloned()).await
    }

    pub async fn is_control(&self, message_id: u64) -> bool {
        self.read(|db| db.controls.contains_key(&message_id)).await
    }

    pub async fn insert(&self, binding: SelfRoleBinding) -> CogResult<()> {
        self.transaction(|db| {
            if let Some(control) = binding.control_message_id {
                db.controls.insert(control, binding.message_id);
            }
            db.bindings.insert(binding.message_id, binding);
            Ok(())
        })
        .await
    }

    pub async fn advance(
        &self,
        control_message_id: u64,
        actor_id: u64,
        emoji: &str,
    ) -> CogResult<Option<WizardProgress>> {
        if !self.is_control(control_message_id).await {
            return Ok(None);
        }
        self.transaction(|db| {
            let Some(&source) = db.controls.get(&control_message_id) else {
                return Ok(None);
            };
            let Some(binding) = db.bindings.get_mut(&source) else {
                db.controls.remove(&control_message_id);
                return Ok(None);
            };
            let Some(step) = binding.bind(actor_id, emoji)? else {
                return Ok(None);
            };
            let binding = binding.clone();
            if step == WizardStep::Complete {
                db.controls.remove(&control_message_id);
            }
            Ok(Some(WizardProgress { step, binding }))
        })
        .await
    }

    /// Role bound to `emoji` on a completed self-role message.
    pub async fn role_for(&self, message_id: u64, emoji: &str) -> Option<(u64, u64)> {
        self.read(|db| {
            db.bindings
                .get(&message_id)
                .and_then(|b| b.role_for(emoji).map(|role| (b.guild_id, role)))
        })
        .await
    }

    /// Drops a binding whose source or unfinished control message vanished.
    pub async fn forget_message(&self, message_id: u64) -> CogResult<bool> {
        let known = self
            .read(|db| db.controls.contains_key(&message_id) || db.bindings.contains_key(&message_id))
            .await;
        if !known {
            return Ok(false);
        }
        self.transaction(|db| {
            if let Some(source) = db.controls.remove(&message_id) {
                let unfinished = db
                    .bindings
                    .get(&source)
                    .is_some_and(|b| b.state != WizardState::Complete);
                if unfinished {
                    db.bindings.remove(&source);
                }
                return Ok(true);
            }
            match db.bindings.remove(&message_id) {
                Some(binding) => {
                    if let Some(control) = binding.control_message_id {
                        db.controls.remove(&control);
                    }
                    Ok(true)
                }
                None => Ok(false),
            }
        })
        .await
    }

    pub async fn clean(&self, guild_id: u64) -> CogResult<usize> {
        self.transaction(|db| {
            let before = db.bindings.len();
            db.bindings.retain(|_, b| b.guild_id != guild_id);
            let remaining: Vec<u64> = db.bindings.keys().copied().collect();
            db.controls.retain(|_, source| remaining.contains(source));
            Ok(before - db.bindings.len())
        })
        .await
    }
}
