//! Step state machine
//!
//! Owns the cached step number, answers, and notes for one candidate. Every
//! change is written through to the durable cache. On mount the machine asks
//! the authoritative store for the canonical step; the canonical value wins
//! any discrepancy and the cache is overwritten to match. If the fetch fails
//! the cached value is kept: optimistic availability over consistency.

use fca_cache::{scoped_key, DurableCache};
use fca_store::{CandidateId, MacroStage, SafeTracking, SessionHandle};
use std::collections::BTreeMap;

const STEP_PURPOSE: &str = "current_step";
const ANSWERS_PURPOSE: &str = "answers";
const NOTES_PURPOSE: &str = "notes";

/// Per-candidate workflow position and scratch answers.
#[derive(Debug)]
pub struct StepStateMachine {
    candidate_id: CandidateId,
    cache: DurableCache,
    tracking: SafeTracking,
    current_step: MacroStage,
    answers: BTreeMap<String, String>,
    notes: String,
}

impl StepStateMachine {
    /// Restore the machine from the durable cache.
    #[must_use]
    pub fn new(cache: DurableCache, tracking: SafeTracking, candidate_id: CandidateId) -> Self {
        let current_step = cache
            .read::<u8>(&scoped_key(STEP_PURPOSE, candidate_id.as_str()))
            .and_then(MacroStage::from_u8)
            .unwrap_or(MacroStage::ConditionalOffer);
        let answers = cache.read_or(
            &scoped_key(ANSWERS_PURPOSE, candidate_id.as_str()),
            BTreeMap::new(),
        );
        let notes = cache.read_or(&scoped_key(NOTES_PURPOSE, candidate_id.as_str()), String::new());
        Self {
            candidate_id,
            cache,
            tracking,
            current_step,
            answers,
            notes,
        }
    }

    /// Reconcile the cached step against the authoritative store.
    ///
    /// The canonical value wins; the cache is overwritten to match. When the
    /// store is unreachable or knows nothing about the candidate, the cached
    /// value stands and no error escapes.
    pub async fn mount(&mut self) {
        match self.tracking.current_stage(&self.candidate_id).await {
            Some(canonical) if canonical != self.current_step => {
                tracing::info!(
                    candidate = %self.candidate_id,
                    cached = ?self.current_step,
                    ?canonical,
                    "cached step drifted; adopting canonical value"
                );
                self.current_step = canonical;
                self.persist_step();
            }
            Some(_) => {}
            None => {
                tracing::debug!(
                    candidate = %self.candidate_id,
                    cached = ?self.current_step,
                    "canonical step unavailable; keeping cached value"
                );
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn current_step(&self) -> MacroStage {
        self.current_step
    }

    #[inline]
    #[must_use]
    pub fn answers(&self) -> &BTreeMap<String, String> {
        &self.answers
    }

    #[inline]
    #[must_use]
    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// The only transition this layer exposes directly: 1 -> 2. All other
    /// forward transitions go through stage commit handlers.
    pub fn handle_next(&mut self) -> MacroStage {
        if self.current_step == MacroStage::ConditionalOffer {
            self.current_step = MacroStage::IndividualAssessment;
            self.persist_step();
        }
        self.current_step
    }

    /// Step back one stage, floored at 1. Committed stage data is untouched.
    pub fn handle_back(&mut self) -> MacroStage {
        if let Some(previous) = MacroStage::from_u8(self.current_step.as_u8().saturating_sub(1)) {
            self.current_step = previous;
            self.persist_step();
        }
        self.current_step
    }

    /// Adopt the stage a successful commit advanced the session to.
    pub fn sync_to(&mut self, stage: MacroStage) {
        if stage != self.current_step {
            self.current_step = stage;
            self.persist_step();
        }
    }

    pub fn set_answer(&mut self, question_id: impl Into<String>, answer: impl Into<String>) {
        self.answers.insert(question_id.into(), answer.into());
        self.cache.write(
            &scoped_key(ANSWERS_PURPOSE, self.candidate_id.as_str()),
            Some(&self.answers),
        );
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
        self.cache.write(
            &scoped_key(NOTES_PURPOSE, self.candidate_id.as_str()),
            Some(&self.notes),
        );
    }

    /// Push the accumulated answers to the authoritative store. Degrades to
    /// `false` when tracking is unavailable.
    pub async fn flush_answers(&self, handle: &SessionHandle) -> bool {
        self.tracking.save_all_answers(handle, &self.answers).await
    }

    fn persist_step(&self) {
        self.cache.write(
            &scoped_key(STEP_PURPOSE, self.candidate_id.as_str()),
            Some(&self.current_step.as_u8()),
        );
    }
}
