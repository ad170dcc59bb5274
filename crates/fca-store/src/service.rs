//! Assessment session / audit service
//!
//! One session per (employer, candidate) pair, addressed through an explicit
//! [`SessionHandle`] threaded through every call. Resuming a stored session
//! id goes through [`AssessmentService::resume`]; there is no process-wide
//! current-session state.

use crate::audit::{verify_chain, AuditDraft};
use crate::error::StoreError;
use crate::store::AssessmentStore;
use crate::types::{
    AssessmentRecord, CandidateId, Decision, DocumentId, DocumentRecord, DocumentType,
    EmployerId, MacroStage, Metadata, Session, SessionId, StepRecord,
};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Service configuration: who is acting and from where.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Actor recorded on every audit entry.
    pub actor_id: String,
    /// Client fingerprint recorded on every audit entry.
    pub client_fingerprint: String,
}

impl ServiceConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            actor_id: "system".to_string(),
            client_fingerprint: "unknown".to_string(),
        }
    }

    #[must_use]
    pub fn with_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = actor_id.into();
        self
    }

    #[must_use]
    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.client_fingerprint = fingerprint.into();
        self
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Explicit handle to one session, passed through every session-scoped call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    id: SessionId,
    employer_id: EmployerId,
    candidate_id: CandidateId,
}

impl SessionHandle {
    #[inline]
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn employer_id(&self) -> &EmployerId {
        &self.employer_id
    }

    #[inline]
    #[must_use]
    pub fn candidate_id(&self) -> &CandidateId {
        &self.candidate_id
    }
}

/// Session lifecycle, step/document persistence, and audit logging.
#[derive(Debug, Clone)]
pub struct AssessmentService {
    store: Arc<dyn AssessmentStore>,
    config: ServiceConfig,
}

impl AssessmentService {
    #[must_use]
    pub fn new(store: Arc<dyn AssessmentStore>, config: ServiceConfig) -> Self {
        Self { store, config }
    }

    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn AssessmentStore> {
        &self.store
    }

    /// Open a fresh session at stage 1 for the pair.
    ///
    /// Callers that must honor the one-in-progress-session invariant go
    /// through [`AssessmentService::get_or_create`] instead.
    pub async fn create(
        &self,
        employer: &EmployerId,
        candidate: &CandidateId,
    ) -> Result<SessionHandle, StoreError> {
        let session = Session::open(employer.clone(), candidate.clone());
        let handle = self.handle_for(&session);
        tracing::info!(session = %session.id, %candidate, "starting assessment session");
        self.store.insert_session(session).await?;
        self.log_action(&handle, "assessment_started", Metadata::new())
            .await;
        Ok(handle)
    }

    /// Resolve the unique in-progress session for the pair, creating one at
    /// stage 1 if none exists. Idempotent: calling twice without an
    /// intervening completion returns the same session.
    pub async fn get_or_create(
        &self,
        employer: &EmployerId,
        candidate: &CandidateId,
    ) -> Result<SessionHandle, StoreError> {
        if let Some(existing) = self.store.in_progress_session(employer, candidate).await? {
            return Ok(self.handle_for(&existing));
        }
        self.create(employer, candidate).await
    }

    /// Resume a session from a durable identifier.
    pub async fn resume(&self, id: SessionId) -> Result<SessionHandle, StoreError> {
        let session = self
            .store
            .session(id)
            .await?
            .ok_or(StoreError::SessionNotFound(id))?;
        Ok(self.handle_for(&session))
    }

    /// Load the current session row.
    pub async fn session(&self, handle: &SessionHandle) -> Result<Session, StoreError> {
        self.store
            .session(handle.id)
            .await?
            .ok_or(StoreError::SessionNotFound(handle.id))
    }

    /// Canonical macro-stage of the candidate's most recent session.
    pub async fn current_stage(
        &self,
        candidate: &CandidateId,
    ) -> Result<Option<MacroStage>, StoreError> {
        Ok(self
            .store
            .latest_session_for_candidate(candidate)
            .await?
            .map(|s| s.macro_stage))
    }

    /// Whether any session exists for the candidate.
    pub async fn has_session(&self, candidate: &CandidateId) -> Result<bool, StoreError> {
        Ok(self
            .store
            .latest_session_for_candidate(candidate)
            .await?
            .is_some())
    }

    /// Most recently started session for the candidate, any state.
    pub async fn latest_session(
        &self,
        candidate: &CandidateId,
    ) -> Result<Option<Session>, StoreError> {
        self.store.latest_session_for_candidate(candidate).await
    }

    /// The canonical completion record committed for `stage`, if any.
    pub async fn stage_record(
        &self,
        session: SessionId,
        stage: MacroStage,
    ) -> Result<Option<StepRecord>, StoreError> {
        self.store
            .step_by_question(session, stage.question_key())
            .await
    }

    /// Upsert one question's answer. `(session, question_id)` stays unique.
    pub async fn save_step(
        &self,
        handle: &SessionHandle,
        step_number: u32,
        question_id: &str,
        answer: &str,
        notes: Option<String>,
    ) -> Result<(), StoreError> {
        tracing::debug!(session = %handle.id, question_id, "saving step");
        self.store
            .upsert_step(StepRecord::new(
                handle.id,
                step_number,
                question_id,
                answer,
                notes,
            ))
            .await
    }

    /// Bulk upsert of answers, step numbers assigned in key order.
    pub async fn save_all_answers(
        &self,
        handle: &SessionHandle,
        answers: &BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        for (index, (question_id, answer)) in answers.iter().enumerate() {
            let step_number = u32::try_from(index).unwrap_or(u32::MAX).saturating_add(1);
            self.save_step(handle, step_number, question_id, answer, None)
                .await?;
        }
        Ok(())
    }

    /// Append a document record; never updates an existing one.
    pub async fn save_document(
        &self,
        handle: &SessionHandle,
        doc_type: DocumentType,
        payload: serde_json::Value,
        mark_sent: bool,
    ) -> Result<DocumentId, StoreError> {
        let mut document = DocumentRecord::new(handle.id, doc_type, payload);
        if mark_sent {
            document = document.sent();
        }
        let id = document.id;
        tracing::info!(session = %handle.id, %doc_type, mark_sent, "recording document");
        self.store.insert_document(document).await?;
        Ok(id)
    }

    /// Merge `patch` into the session metadata map.
    ///
    /// Read-merge-write without a transaction: concurrent writers race and
    /// the last writer wins, which the design accepts for these fields.
    pub async fn update_metadata(
        &self,
        handle: &SessionHandle,
        patch: Metadata,
    ) -> Result<(), StoreError> {
        let mut session = self.session(handle).await?;
        for (key, value) in patch {
            session.metadata.insert(key, value);
        }
        session
            .metadata
            .insert("updated_at".to_string(), Utc::now().to_rfc3339().into());
        self.store.update_session(session).await
    }

    /// Commit a stage's canonical completion record and advance the
    /// macro-stage pointer by exactly one, atomically.
    ///
    /// Rejected once the session carries a terminal decision.
    pub async fn commit_stage<T: Serialize>(
        &self,
        handle: &SessionHandle,
        stage: MacroStage,
        form: &T,
    ) -> Result<MacroStage, StoreError> {
        let session = self.session(handle).await?;
        if !session.is_open() {
            return Err(StoreError::SessionClosed(handle.id));
        }
        let next = stage.next().ok_or(StoreError::StageOutOfOrder {
            stage,
            current: session.macro_stage,
        })?;

        let answer = serde_json::to_string(form)?;
        let record = StepRecord::new(
            handle.id,
            u32::from(stage.as_u8()),
            stage.question_key(),
            answer,
            None,
        );
        tracing::info!(session = %handle.id, ?stage, "committing stage");
        self.store.commit_stage(handle.id, record, next).await?;

        // Progress metadata is advisory; a failed merge must not unwind the
        // committed stage.
        let mut patch = Metadata::new();
        patch.insert(
            "last_step_completed".to_string(),
            u64::from(stage.as_u8()).into(),
        );
        if let Err(err) = self.update_metadata(handle, patch).await {
            tracing::warn!(session = %handle.id, %err, "stage committed but metadata merge failed");
        }
        Ok(next)
    }

    /// Close the session with a terminal decision.
    ///
    /// A second completion is rejected with [`StoreError::SessionClosed`]
    /// rather than silently overwriting the recorded decision.
    pub async fn complete(
        &self,
        handle: &SessionHandle,
        decision: Decision,
    ) -> Result<(), StoreError> {
        if !decision.is_terminal() {
            return Err(StoreError::NonTerminalDecision);
        }
        let mut session = self.session(handle).await?;
        if !session.is_open() {
            return Err(StoreError::SessionClosed(handle.id));
        }
        session.decision = decision;
        session.completed_at = Some(Utc::now());
        tracing::info!(session = %handle.id, ?decision, "completing session");
        self.store.update_session(session).await?;
        self.log_action(handle, "session_completed", Metadata::new())
            .await;
        Ok(())
    }

    /// Fire-and-forget audit append. Failures are logged, never returned.
    pub async fn log_action(&self, handle: &SessionHandle, action: &str, detail: Metadata) {
        let draft = AuditDraft::new(
            handle.id,
            self.config.actor_id.clone(),
            action,
            detail,
            self.config.client_fingerprint.clone(),
        );
        if let Err(err) = self.store.append_audit(draft).await {
            tracing::warn!(session = %handle.id, action, %err, "audit append failed");
        }
    }

    /// Read-only join of the session and everything recorded under it.
    pub async fn assessment_record(
        &self,
        handle: &SessionHandle,
    ) -> Result<AssessmentRecord, StoreError> {
        let session = self.session(handle).await?;
        let steps = self.store.steps(handle.id).await?;
        let documents = self.store.documents(handle.id).await?;
        let audit = self.store.audit_entries(handle.id).await?;
        let audit_chain_intact = verify_chain(&audit);
        let audit_chain_head = audit.last().map(|entry| crate::audit::hash_hex(&entry.hash));
        Ok(AssessmentRecord {
            session,
            steps,
            documents,
            audit,
            audit_chain_intact,
            audit_chain_head,
        })
    }

    fn handle_for(&self, session: &Session) -> SessionHandle {
        SessionHandle {
            id: session.id,
            employer_id: session.employer_id.clone(),
            candidate_id: session.candidate_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;

    fn service() -> AssessmentService {
        AssessmentService::new(
            Arc::new(MemoryStore::new()),
            ServiceConfig::new().with_actor("admin-1").with_fingerprint("fp-1"),
        )
    }

    fn pair() -> (EmployerId, CandidateId) {
        (EmployerId::new("emp-1"), CandidateId::new("cand-1"))
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let service = service();
        let (employer, candidate) = pair();

        let first = service.get_or_create(&employer, &candidate).await.unwrap();
        let second = service.get_or_create(&employer, &candidate).await.unwrap();
        assert_eq!(first.id(), second.id());
    }

    #[tokio::test]
    async fn completion_allows_a_fresh_session() {
        let service = service();
        let (employer, candidate) = pair();

        let first = service.get_or_create(&employer, &candidate).await.unwrap();
        service.complete(&first, Decision::Hired).await.unwrap();

        let next = service.get_or_create(&employer, &candidate).await.unwrap();
        assert_ne!(first.id(), next.id());
    }

    #[tokio::test]
    async fn double_completion_is_rejected() {
        let service = service();
        let (employer, candidate) = pair();
        let handle = service.get_or_create(&employer, &candidate).await.unwrap();

        service.complete(&handle, Decision::Revoked).await.unwrap();
        let err = service.complete(&handle, Decision::Hired).await.unwrap_err();
        assert!(matches!(err, StoreError::SessionClosed(_)));

        // The recorded decision stands.
        let session = service.session(&handle).await.unwrap();
        assert_eq!(session.decision, Decision::Revoked);
    }

    #[tokio::test]
    async fn complete_requires_terminal_decision() {
        let service = service();
        let (employer, candidate) = pair();
        let handle = service.get_or_create(&employer, &candidate).await.unwrap();

        let err = service
            .complete(&handle, Decision::InProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NonTerminalDecision));
    }

    #[tokio::test]
    async fn commit_stage_rejected_after_close() {
        let service = service();
        let (employer, candidate) = pair();
        let handle = service.get_or_create(&employer, &candidate).await.unwrap();
        service.complete(&handle, Decision::Revoked).await.unwrap();

        let err = service
            .commit_stage(&handle, MacroStage::ConditionalOffer, &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SessionClosed(_)));
    }

    #[tokio::test]
    async fn commit_stage_records_progress_metadata() {
        let service = service();
        let (employer, candidate) = pair();
        let handle = service.get_or_create(&employer, &candidate).await.unwrap();

        let next = service
            .commit_stage(&handle, MacroStage::ConditionalOffer, &serde_json::json!({"position": "clerk"}))
            .await
            .unwrap();
        assert_eq!(next, MacroStage::IndividualAssessment);

        let session = service.session(&handle).await.unwrap();
        assert_eq!(session.macro_stage, MacroStage::IndividualAssessment);
        assert_eq!(
            session.metadata.get("last_step_completed"),
            Some(&serde_json::json!(1))
        );
        assert!(session.metadata.contains_key("updated_at"));
    }

    #[tokio::test]
    async fn save_all_answers_bulk_upserts() {
        let service = service();
        let (employer, candidate) = pair();
        let handle = service.get_or_create(&employer, &candidate).await.unwrap();

        let mut answers = BTreeMap::new();
        answers.insert("q_duties".to_string(), "driving".to_string());
        answers.insert("q_environment".to_string(), "warehouse".to_string());
        service.save_all_answers(&handle, &answers).await.unwrap();

        // Second bulk write revises in place.
        answers.insert("q_duties".to_string(), "forklift".to_string());
        service.save_all_answers(&handle, &answers).await.unwrap();

        let record = service.assessment_record(&handle).await.unwrap();
        assert_eq!(record.steps.len(), 2);
        let duties = record
            .steps
            .iter()
            .find(|s| s.question_id == "q_duties")
            .unwrap();
        assert_eq!(duties.answer, "forklift");
    }

    #[tokio::test]
    async fn export_verifies_audit_chain() {
        let service = service();
        let (employer, candidate) = pair();
        let handle = service.get_or_create(&employer, &candidate).await.unwrap();
        service
            .log_action(&handle, "offer_letter_sent", Metadata::new())
            .await;

        let record = service.assessment_record(&handle).await.unwrap();
        assert!(record.audit_chain_intact);
        // assessment_started + offer_letter_sent
        assert_eq!(record.audit.len(), 2);
        assert_eq!(record.audit[0].actor_id, "admin-1");
        assert_eq!(record.audit[0].client_fingerprint, "fp-1");
    }
}
