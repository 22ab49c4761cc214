//! Session state machine: what the next text from a user means.

use serde::{Deserialize, Serialize};

/// Per-user conversational state. Held in memory only.
///
/// `Fresh` → `AwaitingName` → `Ready`, and from `Ready` out to one of the
/// two awaiting states and back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Nothing known about this session yet.
    #[default]
    Fresh,
    /// The next text is the user's display name.
    AwaitingName,
    /// The next text is a taste to record.
    AwaitingTaste,
    /// Named user; text is matched against the menu.
    Ready,
}

impl SessionState {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, target),
            (Fresh, AwaitingName)
                | (Fresh, Ready)
                | (AwaitingName, Ready)
                | (AwaitingName, AwaitingName)
                | (AwaitingTaste, Ready)
                | (AwaitingTaste, AwaitingName)
                | (Ready, AwaitingName)
                | (Ready, AwaitingTaste)
                | (Ready, Ready)
        )
    }

    /// Whether the next text is consumed as input instead of a menu choice.
    pub fn is_awaiting_input(&self) -> bool {
        matches!(self, Self::AwaitingName | Self::AwaitingTaste)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Fresh => "fresh",
            Self::AwaitingName => "awaiting_name",
            Self::AwaitingTaste => "awaiting_taste",
            Self::Ready => "ready",
        };
        write!(f, "{s}")
    }
}
