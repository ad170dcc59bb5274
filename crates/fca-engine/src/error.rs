//! Error types for the workflow engine

use crate::notify::NotifyError;
use fca_store::{MacroStage, StoreError};

/// A stage form failed its completeness predicate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Required fields are blank
    #[error("required fields are blank: {0:?}")]
    MissingFields(Vec<&'static str>),

    /// Stage 3 and 5 require at least one conviction entry
    #[error("at least one non-blank conviction entry is required")]
    NoConvictions,

    /// Candidates must get a minimum response window
    #[error("response window of {got} business days is below the minimum of {min}")]
    ResponseWindowTooShort { got: u32, min: u32 },

    /// Stage 5 must carry a terminal decision
    #[error("final decision must be terminal (hired or revoked)")]
    NonTerminalDecision,
}

/// A stage commit was rejected or aborted.
///
/// Every variant here means the compliance letter was NOT sent; failures
/// after a successful send are reported through
/// [`crate::commit::CommitOutcome`] flags instead.
#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    /// Completeness predicate failed (defensive re-check; the UI validates
    /// before the handler is reachable)
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// No recipient contact info; aborts before any write
    #[error("recipient contact info is missing")]
    MissingRecipient,

    /// The canonical pointer is already past this stage; re-sending the
    /// letter would duplicate a compliance notice
    #[error("stage {0:?} was already committed")]
    StageAlreadyCommitted(MacroStage),

    /// Earlier stages have not been committed yet
    #[error("session is at {current:?}; stage {stage:?} is not yet reachable")]
    StageNotReached {
        stage: MacroStage,
        current: MacroStage,
    },

    /// The notification collaborator refused the letter
    #[error("letter send failed: {0}")]
    Notify(#[from] NotifyError),

    /// The authoritative store failed before the letter was sent
    #[error(transparent)]
    Store(#[from] StoreError),
}
