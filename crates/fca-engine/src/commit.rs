//! Stage completion handlers
//!
//! One commit operation per committable stage, all with the same shape and
//! the same strict effect order:
//! 1. send the stage's compliance letter (failure aborts, nothing mutated)
//! 2. append a document record tagged sent
//! 3. commit the stage record and advance the macro-stage, atomically
//! 4. delete the stage's durable-cache keys
//! 5. best-effort: audit entry, and on the terminal stage, session close
//!
//! Once the letter is out, nothing rolls back: the letter having been sent is
//! the fact that matters, so failures in 2-5 are logged and reported through
//! [`CommitOutcome`] flags. The cache is only cleared after the stage commit
//! is durable; a crash in between leaves stale cache data, never lost
//! canonical data.

use crate::error::CommitError;
use crate::forms::{
    ConditionalOfferForm, FinalDecisionForm, IndividualAssessmentForm, ReassessmentForm,
    RevocationNoticeForm, StageForm,
};
use crate::notify::{LetterPayload, NotificationSender};
use crate::stage_store::StageStore;
use fca_cache::DurableCache;
use fca_store::{
    AssessmentService, DocumentId, MacroStage, Metadata, SessionHandle, StoreError,
};
use std::sync::Arc;

/// What a commit actually accomplished past the letter send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    pub stage: MacroStage,
    /// Document record id, when step 2 succeeded.
    pub document_id: Option<DocumentId>,
    /// Whether the canonical stage record and pointer were committed.
    pub stage_committed: bool,
    /// The macro-stage the session advanced to.
    pub new_stage: Option<MacroStage>,
    /// Whether the stage's cache keys were deleted.
    pub cache_cleared: bool,
}

/// Executes stage commits against the service, notifier, and cache.
#[derive(Debug, Clone)]
pub struct StageCommitter {
    service: AssessmentService,
    notifier: Arc<dyn NotificationSender>,
    cache: DurableCache,
}

impl StageCommitter {
    #[must_use]
    pub fn new(
        service: AssessmentService,
        notifier: Arc<dyn NotificationSender>,
        cache: DurableCache,
    ) -> Self {
        Self {
            service,
            notifier,
            cache,
        }
    }

    pub async fn commit_conditional_offer(
        &self,
        handle: &SessionHandle,
        form: &ConditionalOfferForm,
        recipient: Option<&str>,
    ) -> Result<CommitOutcome, CommitError> {
        self.commit(handle, form, recipient).await
    }

    pub async fn commit_assessment(
        &self,
        handle: &SessionHandle,
        form: &IndividualAssessmentForm,
        recipient: Option<&str>,
    ) -> Result<CommitOutcome, CommitError> {
        self.commit(handle, form, recipient).await
    }

    pub async fn commit_revocation_notice(
        &self,
        handle: &SessionHandle,
        form: &RevocationNoticeForm,
        recipient: Option<&str>,
    ) -> Result<CommitOutcome, CommitError> {
        self.commit(handle, form, recipient).await
    }

    pub async fn commit_reassessment(
        &self,
        handle: &SessionHandle,
        form: &ReassessmentForm,
        recipient: Option<&str>,
    ) -> Result<CommitOutcome, CommitError> {
        self.commit(handle, form, recipient).await
    }

    pub async fn commit_final_decision(
        &self,
        handle: &SessionHandle,
        form: &FinalDecisionForm,
        recipient: Option<&str>,
    ) -> Result<CommitOutcome, CommitError> {
        self.commit(handle, form, recipient).await
    }

    /// Uniform commit pipeline for any stage form.
    pub async fn commit<F: StageForm>(
        &self,
        handle: &SessionHandle,
        form: &F,
        recipient: Option<&str>,
    ) -> Result<CommitOutcome, CommitError> {
        let stage = F::stage();

        // Aborts before any write: recipient, predicate, stage position.
        let recipient = recipient
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or(CommitError::MissingRecipient)?;
        form.validate()?;

        let session = self.service.session(handle).await?;
        if session.macro_stage > stage {
            return Err(CommitError::StageAlreadyCommitted(stage));
        }
        if !session.is_open() {
            return Err(CommitError::Store(StoreError::SessionClosed(handle.id())));
        }
        if session.macro_stage < stage {
            return Err(CommitError::StageNotReached {
                stage,
                current: session.macro_stage,
            });
        }
        let Some(doc_type) = stage.document_type() else {
            return Err(CommitError::StageNotReached {
                stage,
                current: session.macro_stage,
            });
        };

        let payload = serde_json::to_value(form).map_err(StoreError::from)?;
        let letter = LetterPayload::new(doc_type, payload.clone());
        self.notifier.send(&letter, recipient).await?;

        // The letter is out. Everything below is forward-only.
        let mut outcome = CommitOutcome {
            stage,
            document_id: None,
            stage_committed: false,
            new_stage: None,
            cache_cleared: false,
        };

        match self
            .service
            .save_document(handle, doc_type, payload, true)
            .await
        {
            Ok(id) => outcome.document_id = Some(id),
            Err(err) => {
                tracing::warn!(session = %handle.id(), %doc_type, %err, "letter sent but document record failed");
            }
        }

        match self.service.commit_stage(handle, stage, form).await {
            Ok(next) => {
                outcome.stage_committed = true;
                outcome.new_stage = Some(next);
            }
            Err(err) => {
                tracing::warn!(session = %handle.id(), ?stage, %err, "letter sent but stage commit failed; cache retained");
            }
        }

        // Only a durable commit releases the stage's cached draft.
        if outcome.stage_committed {
            StageStore::<F>::new(self.cache.clone(), handle.candidate_id().clone()).clear_all();
            outcome.cache_cleared = true;
        }

        let mut detail = Metadata::new();
        detail.insert("stage".to_string(), u64::from(stage.as_u8()).into());
        if let Some(id) = outcome.document_id {
            detail.insert("document_id".to_string(), id.0.to_string().into());
        }
        self.service
            .log_action(handle, &format!("{}_sent", doc_type.as_str()), detail)
            .await;

        if let Some(decision) = form.terminal_decision() {
            if outcome.stage_committed {
                if let Err(err) = self.service.complete(handle, decision).await {
                    tracing::warn!(session = %handle.id(), %err, "terminal stage committed but session close failed");
                }
            }
        }

        Ok(outcome)
    }
}
