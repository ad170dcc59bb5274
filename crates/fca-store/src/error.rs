//! Error types for the authoritative store and session service

use crate::types::{MacroStage, SessionId};

/// Store and session-service failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No session under the given identifier
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    /// Session already carries a terminal decision
    #[error("session {0} is already closed")]
    SessionClosed(SessionId),

    /// Attempted close with a non-terminal decision
    #[error("cannot close a session with an in-progress decision")]
    NonTerminalDecision,

    /// Stage commit would move the canonical pointer backwards or skip ahead
    #[error("stage {stage:?} cannot be committed while the session is at {current:?}")]
    StageOutOfOrder {
        stage: MacroStage,
        current: MacroStage,
    },

    /// Payload (de)serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The remote store could not be reached or rejected the operation
    #[error("store backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    /// Failures worth retrying against the backend.
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Backend(_))
    }
}
