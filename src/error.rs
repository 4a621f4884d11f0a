//! Errors shared by the reaction-driven modules.

use crate::database::DbError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CogError {
    #[error("expected between 1 and {max} options, got {count}")]
    InvalidOptionCount { count: usize, max: usize },

    #[error("message {0} is not tracked")]
    UnknownInteraction(u64),

    #[error("emoji {0} does not match any option")]
    UnknownEmoji(String),

    #[error("message {0} is closed")]
    InteractionClosed(u64),

    #[error("emoji {0} is already bound")]
    DuplicateEmoji(String),

    #[error("external request failed: {0}")]
    ExternalFetch(String),

    #[error("persistence failure: {0}")]
    Persistence(#[from] DbError),
}

impl CogError {
    /// Errors a user can fix themselves; these are replied to instead of
    /// being logged as failures.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::InvalidOptionCount { .. } | Self::InteractionClosed(_) | Self::DuplicateEmoji(_)
        )
    }
}

pub type CogResult<T> = Result<T, CogError>;
