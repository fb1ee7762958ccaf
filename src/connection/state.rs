//! Handle lifecycle state machine

use crate::{Error, Result};

/// Lifecycle state of a [`Database`](super::Database) handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// Built from configuration, no connection attempted yet
    Configured,

    /// A live client is available
    Connected,

    /// The server side went away; the next use reconnects
    Disconnected,

    /// Closed by the application; terminal
    Closed,
}

impl HandleState {
    /// Check if transition is valid
    pub fn can_transition_to(&self, next: HandleState) -> bool {
        use HandleState::*;

        matches!(
            (self, next),
            (Configured, Connected)
                | (Connected, Disconnected)
                | (Disconnected, Connected)
                | (_, Closed)
        )
    }

    /// Transition to new state
    pub fn transition(&mut self, next: HandleState) -> Result<()> {
        if !self.can_transition_to(next) {
            return Err(Error::InvalidState {
                expected: format!("valid transition from {}", self),
                actual: next.to_string(),
            });
        }
        *self = next;
        Ok(())
    }

    /// Whether the handle can still be used
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Closed)
    }
}

impl std::fmt::Display for HandleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configured => write!(f, "configured"),
            Self::Connected => write!(f, "connected"),
            Self::Disconnected => write!(f, "disconnected"),
            Self::Closed => write!(f, "closed"),
        }
    }
}
