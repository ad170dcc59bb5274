//! FCA Engine - Fair-chance assessment workflow
//!
//! The workflow layer over the two persistence tiers:
//! - Per-stage form types with completeness predicates
//! - Step storage modules holding in-progress form data and UI toggles in
//!   the durable cache
//! - A step state machine that reconciles its cached step number against the
//!   authoritative store on mount
//! - Stage completion handlers that send the compliance letter, record the
//!   document, commit the stage atomically, and clear the stage's cache
//! - Read paths for later stages: document availability, cross-stage
//!   autofill, and a milestone progress summary
//!
//! # Example
//!
//! ```rust,ignore
//! use fca_engine::prelude::*;
//!
//! let committer = StageCommitter::new(service, notifier, cache.clone());
//! let outcome = committer
//!     .commit_revocation_notice(&handle, &form, Some("candidate@example.com"))
//!     .await?;
//! assert!(outcome.stage_committed);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod aggregate;
pub mod availability;
pub mod commit;
pub mod error;
pub mod forms;
pub mod machine;
pub mod notify;
pub mod stage_store;
pub mod summary;

pub use aggregate::{
    CandidateProfile, CandidateProfiles, CrossStageAggregator, EmployerProfile, EmployerProfiles,
    StageProjection,
};
pub use availability::{AvailabilitySnapshot, DocumentAvailabilityResolver, FileStore, StoredFile};
pub use commit::{CommitOutcome, StageCommitter};
pub use error::{CommitError, ValidationError};
pub use forms::{
    ConditionalOfferForm, FinalDecisionForm, IndividualAssessmentForm, ReassessmentForm,
    RevocationNoticeForm, StageForm, MIN_RESPONSE_BUSINESS_DAYS,
};
pub use machine::StepStateMachine;
pub use notify::{LetterPayload, NotificationSender, NotifyError};
pub use stage_store::{StageStore, StageUiState};
pub use summary::{summarize, MilestoneFlags, ProgressInput, ProgressSummary, MILESTONES};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the assessment workflow
    pub use crate::commit::{CommitOutcome, StageCommitter};
    pub use crate::forms::{
        ConditionalOfferForm, FinalDecisionForm, IndividualAssessmentForm, ReassessmentForm,
        RevocationNoticeForm, StageForm,
    };
    pub use crate::machine::StepStateMachine;
    pub use crate::notify::{LetterPayload, NotificationSender};
    pub use crate::stage_store::StageStore;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
