//! Safe tracking facade
//!
//! Presentation code never sees a tracking error: every service call is
//! wrapped so failure degrades to a logged warning and a neutral return
//! value. `is_available` distinguishes "tracking infrastructure missing or
//! misconfigured" from an operation-specific failure, so callers can choose
//! to shut the whole subsystem off instead of retrying each call.

use crate::service::{AssessmentService, SessionHandle};
use crate::types::{
    AssessmentRecord, CandidateId, Decision, DocumentId, DocumentType, EmployerId, MacroStage,
    Metadata, Session, SessionId,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Never-failing wrapper over [`AssessmentService`].
#[derive(Debug, Clone)]
pub struct SafeTracking {
    service: AssessmentService,
}

impl SafeTracking {
    #[must_use]
    pub fn new(service: AssessmentService) -> Self {
        Self { service }
    }

    /// The wrapped service, for callers that need typed errors.
    #[inline]
    #[must_use]
    pub fn service(&self) -> &AssessmentService {
        &self.service
    }

    /// Probe the authoritative store with a trivial read.
    pub async fn is_available(&self) -> bool {
        match self.service.store().ping().await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(%err, "assessment tracking unavailable");
                false
            }
        }
    }

    pub async fn get_or_create(
        &self,
        employer: &EmployerId,
        candidate: &CandidateId,
    ) -> Option<SessionHandle> {
        self.service
            .get_or_create(employer, candidate)
            .await
            .map_err(|err| tracing::warn!(%candidate, %err, "get_or_create failed"))
            .ok()
    }

    pub async fn resume(&self, id: SessionId) -> Option<SessionHandle> {
        self.service
            .resume(id)
            .await
            .map_err(|err| tracing::warn!(session = %id, %err, "resume failed"))
            .ok()
    }

    pub async fn session(&self, handle: &SessionHandle) -> Option<Session> {
        self.service
            .session(handle)
            .await
            .map_err(|err| tracing::warn!(session = %handle.id(), %err, "session read failed"))
            .ok()
    }

    /// Canonical macro-stage, or `None` when unknown or unreachable.
    pub async fn current_stage(&self, candidate: &CandidateId) -> Option<MacroStage> {
        self.service
            .current_stage(candidate)
            .await
            .map_err(|err| tracing::warn!(%candidate, %err, "current stage read failed"))
            .ok()
            .flatten()
    }

    pub async fn has_session(&self, candidate: &CandidateId) -> bool {
        self.service
            .has_session(candidate)
            .await
            .map_err(|err| tracing::warn!(%candidate, %err, "session existence check failed"))
            .unwrap_or(false)
    }

    pub async fn latest_session(&self, candidate: &CandidateId) -> Option<Session> {
        self.service
            .latest_session(candidate)
            .await
            .map_err(|err| tracing::warn!(%candidate, %err, "latest session read failed"))
            .ok()
            .flatten()
    }

    pub async fn stage_record(
        &self,
        session: SessionId,
        stage: MacroStage,
    ) -> Option<crate::types::StepRecord> {
        self.service
            .stage_record(session, stage)
            .await
            .map_err(|err| tracing::warn!(%session, ?stage, %err, "stage record read failed"))
            .ok()
            .flatten()
    }

    pub async fn save_step(
        &self,
        handle: &SessionHandle,
        step_number: u32,
        question_id: &str,
        answer: &str,
        notes: Option<String>,
    ) -> bool {
        self.service
            .save_step(handle, step_number, question_id, answer, notes)
            .await
            .map_err(|err| tracing::warn!(session = %handle.id(), question_id, %err, "save_step failed"))
            .is_ok()
    }

    pub async fn save_all_answers(
        &self,
        handle: &SessionHandle,
        answers: &BTreeMap<String, String>,
    ) -> bool {
        self.service
            .save_all_answers(handle, answers)
            .await
            .map_err(|err| tracing::warn!(session = %handle.id(), %err, "save_all_answers failed"))
            .is_ok()
    }

    pub async fn save_document(
        &self,
        handle: &SessionHandle,
        doc_type: DocumentType,
        payload: serde_json::Value,
        mark_sent: bool,
    ) -> Option<DocumentId> {
        self.service
            .save_document(handle, doc_type, payload, mark_sent)
            .await
            .map_err(|err| tracing::warn!(session = %handle.id(), %doc_type, %err, "save_document failed"))
            .ok()
    }

    pub async fn update_metadata(&self, handle: &SessionHandle, patch: Metadata) -> bool {
        self.service
            .update_metadata(handle, patch)
            .await
            .map_err(|err| tracing::warn!(session = %handle.id(), %err, "metadata update failed"))
            .is_ok()
    }

    pub async fn commit_stage<T: Serialize>(
        &self,
        handle: &SessionHandle,
        stage: MacroStage,
        form: &T,
    ) -> Option<MacroStage> {
        self.service
            .commit_stage(handle, stage, form)
            .await
            .map_err(|err| tracing::warn!(session = %handle.id(), ?stage, %err, "stage commit failed"))
            .ok()
    }

    pub async fn complete(&self, handle: &SessionHandle, decision: Decision) -> bool {
        self.service
            .complete(handle, decision)
            .await
            .map_err(|err| tracing::warn!(session = %handle.id(), %err, "completion failed"))
            .is_ok()
    }

    /// Always succeeds from the caller's perspective.
    pub async fn log_action(&self, handle: &SessionHandle, action: &str, detail: Metadata) {
        self.service.log_action(handle, action, detail).await;
    }

    pub async fn assessment_record(&self, handle: &SessionHandle) -> Option<AssessmentRecord> {
        self.service
            .assessment_record(handle)
            .await
            .map_err(|err| tracing::warn!(session = %handle.id(), %err, "export read failed"))
            .ok()
    }
}
