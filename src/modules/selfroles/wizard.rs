//! Emoji binding wizard: an administrator reacts once per role, in order,
//! on a control message.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WizardState {
    AwaitingBinding(usize),
    Complete,
}

/// What the handler has to show after a successful binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Next { cursor: usize, role_id: u64 },
    Complete,
}

impl WizardState {
    pub fn start(role_count: usize) -> Self {
        if role_count == 0 {
            Self::Complete
        } else {
            Self::AwaitingBinding(0)
        }
    }

    pub fn cursor(self, role_count: usize) -> usize {
        match self {
            Self::AwaitingBinding(cursor) => cursor,
            Self::Complete => role_count,
        }
    }

    /// Transition taken once the current role got its emoji.
    ///
    /// | from                  | to                        |
    /// |-----------------------|---------------------------|
    /// | `AwaitingBinding(c)`  | `AwaitingBinding(c + 1)`  if `c + 1 < count` |
    /// | `AwaitingBinding(c)`  | `Complete`                if `c + 1 == count` |
    /// | `Complete`            | `Complete`                |
    pub fn advance(self, role_count: usize) -> Self {
        match self {
            Self::AwaitingBinding(cursor) if cursor + 1 < role_count => {
                Self::AwaitingBinding(cursor + 1)
            }
            _ => Self::Complete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_every_role_then_completes() {
        let mut state = WizardState::start(3);
        assert_eq!(state, WizardState::AwaitingBinding(0));
        state = state.advance(3);
        assert_eq!(state, WizardState::AwaitingBinding(1));
        state = state.advance(3);
        assert_eq!(state, WizardState::AwaitingBinding(2));
        state = state.advance(3);
        assert_eq!(state, WizardState::Complete);
        assert_eq!(state.advance(3), WizardState::Complete);
        assert_eq!(state.cursor(3), 3);
    }

    #[test]
    fn no_roles_is_already_complete() {
        assert_eq!(WizardState::start(0), WizardState::Complete);
    }
}
