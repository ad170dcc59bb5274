//! Authoritative store seam
//!
//! Table-like collections for sessions, step records, document records, and
//! audit entries. Operations are network calls in production deployments and
//! may suspend; none carry a timeout at this layer. No cross-table
//! transactions exist — the single exception is [`AssessmentStore::commit_stage`],
//! which must make the stage record and the macro-stage advance visible
//! together so a crash between them cannot lose canonical data.

use crate::audit::{seal_entry, AuditDraft};
use crate::error::StoreError;
use crate::types::{
    AuditEntry, AuditEventId, CandidateId, DocumentRecord, EmployerId, MacroStage, Session,
    SessionId, StepRecord,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::Debug;

/// Table-like seam over the authoritative relational store.
#[async_trait]
pub trait AssessmentStore: Debug + Send + Sync {
    /// Trivial read used to probe whether the store is reachable at all.
    async fn ping(&self) -> Result<(), StoreError>;

    async fn insert_session(&self, session: Session) -> Result<(), StoreError>;

    async fn session(&self, id: SessionId) -> Result<Option<Session>, StoreError>;

    /// The unique in-progress session for the pair, if one exists.
    async fn in_progress_session(
        &self,
        employer: &EmployerId,
        candidate: &CandidateId,
    ) -> Result<Option<Session>, StoreError>;

    /// Most recently started session for the candidate, any state.
    async fn latest_session_for_candidate(
        &self,
        candidate: &CandidateId,
    ) -> Result<Option<Session>, StoreError>;

    /// Single-row replace of an existing session.
    async fn update_session(&self, session: Session) -> Result<(), StoreError>;

    /// Upsert keyed by `(session_id, question_id)`: an existing record keeps
    /// its id and takes the new answer, notes, and step number.
    async fn upsert_step(&self, record: StepRecord) -> Result<(), StoreError>;

    async fn steps(&self, session: SessionId) -> Result<Vec<StepRecord>, StoreError>;

    async fn step_by_question(
        &self,
        session: SessionId,
        question_id: &str,
    ) -> Result<Option<StepRecord>, StoreError>;

    /// Append-only insert; documents are never updated in place.
    async fn insert_document(&self, document: DocumentRecord) -> Result<(), StoreError>;

    async fn documents(&self, session: SessionId) -> Result<Vec<DocumentRecord>, StoreError>;

    /// Seal the draft onto the audit chain and append it.
    async fn append_audit(&self, draft: AuditDraft) -> Result<AuditEventId, StoreError>;

    async fn audit_entries(&self, session: SessionId) -> Result<Vec<AuditEntry>, StoreError>;

    /// Commit a stage's canonical completion record and advance the
    /// macro-stage pointer, atomically.
    ///
    /// `next_stage` must be exactly one past the session's current stage;
    /// anything else is [`StoreError::StageOutOfOrder`].
    async fn commit_stage(
        &self,
        session: SessionId,
        record: StepRecord,
        next_stage: MacroStage,
    ) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
struct Tables {
    sessions: HashMap<SessionId, Session>,
    steps: HashMap<SessionId, Vec<StepRecord>>,
    documents: HashMap<SessionId, Vec<DocumentRecord>>,
    audit: Vec<AuditEntry>,
}

impl Tables {
    fn upsert_step(&mut self, mut record: StepRecord) {
        let rows = self.steps.entry(record.session_id).or_default();
        match rows
            .iter_mut()
            .find(|row| row.question_id == record.question_id)
        {
            Some(existing) => {
                record.id = existing.id;
                *existing = record;
            }
            None => rows.push(record),
        }
    }
}

/// In-memory reference store.
///
/// One lock over all tables keeps `commit_stage` atomic without cross-table
/// coordination.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssessmentStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let _ = self.inner.read().sessions.len();
        Ok(())
    }

    async fn insert_session(&self, session: Session) -> Result<(), StoreError> {
        self.inner.write().sessions.insert(session.id, session);
        Ok(())
    }

    async fn session(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        Ok(self.inner.read().sessions.get(&id).cloned())
    }

    async fn in_progress_session(
        &self,
        employer: &EmployerId,
        candidate: &CandidateId,
    ) -> Result<Option<Session>, StoreError> {
        Ok(self
            .inner
            .read()
            .sessions
            .values()
            .find(|s| s.is_open() && &s.employer_id == employer && &s.candidate_id == candidate)
            .cloned())
    }

    async fn latest_session_for_candidate(
        &self,
        candidate: &CandidateId,
    ) -> Result<Option<Session>, StoreError> {
        Ok(self
            .inner
            .read()
            .sessions
            .values()
            .filter(|s| &s.candidate_id == candidate)
            .max_by_key(|s| s.started_at)
            .cloned())
    }

    async fn update_session(&self, session: Session) -> Result<(), StoreError> {
        let mut tables = self.inner.write();
        if !tables.sessions.contains_key(&session.id) {
            return Err(StoreError::SessionNotFound(session.id));
        }
        tables.sessions.insert(session.id, session);
        Ok(())
    }

    async fn upsert_step(&self, record: StepRecord) -> Result<(), StoreError> {
        self.inner.write().upsert_step(record);
        Ok(())
    }

    async fn steps(&self, session: SessionId) -> Result<Vec<StepRecord>, StoreError> {
        Ok(self
            .inner
            .read()
            .steps
            .get(&session)
            .cloned()
            .unwrap_or_default())
    }

    async fn step_by_question(
        &self,
        session: SessionId,
        question_id: &str,
    ) -> Result<Option<StepRecord>, StoreError> {
        Ok(self.inner.read().steps.get(&session).and_then(|rows| {
            rows.iter()
                .find(|row| row.question_id == question_id)
                .cloned()
        }))
    }

    async fn insert_document(&self, document: DocumentRecord) -> Result<(), StoreError> {
        self.inner
            .write()
            .documents
            .entry(document.session_id)
            .or_default()
            .push(document);
        Ok(())
    }

    async fn documents(&self, session: SessionId) -> Result<Vec<DocumentRecord>, StoreError> {
        Ok(self
            .inner
            .read()
            .documents
            .get(&session)
            .cloned()
            .unwrap_or_default())
    }

    async fn append_audit(&self, draft: AuditDraft) -> Result<AuditEventId, StoreError> {
        let mut tables = self.inner.write();
        let prev_hash = tables.audit.last().map_or([0u8; 32], |entry| entry.hash);
        let entry = seal_entry(draft, prev_hash);
        let id = entry.id;
        tables.audit.push(entry);
        Ok(id)
    }

    async fn audit_entries(&self, session: SessionId) -> Result<Vec<AuditEntry>, StoreError> {
        Ok(self
            .inner
            .read()
            .audit
            .iter()
            .filter(|entry| entry.session_id == session)
            .cloned()
            .collect())
    }

    async fn commit_stage(
        &self,
        session: SessionId,
        record: StepRecord,
        next_stage: MacroStage,
    ) -> Result<(), StoreError> {
        let mut tables = self.inner.write();
        let current = tables
            .sessions
            .get(&session)
            .ok_or(StoreError::SessionNotFound(session))?
            .macro_stage;
        if current.next() != Some(next_stage) {
            return Err(StoreError::StageOutOfOrder {
                stage: next_stage,
                current,
            });
        }
        tables.upsert_step(record);
        let entry = tables.sessions.get_mut(&session).expect("checked above");
        entry.macro_stage = next_stage;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Decision, DocumentType, Metadata};
    use pretty_assertions::assert_eq;

    fn open_session() -> Session {
        Session::open(EmployerId::new("emp-1"), CandidateId::new("cand-1"))
    }

    #[tokio::test]
    async fn upsert_step_keeps_one_record_per_question() {
        let store = MemoryStore::new();
        let session = open_session();
        let id = session.id;
        store.insert_session(session).await.unwrap();

        store
            .upsert_step(StepRecord::new(id, 1, "q_duties", "first answer", None))
            .await
            .unwrap();
        store
            .upsert_step(StepRecord::new(
                id,
                1,
                "q_duties",
                "second answer",
                Some("revised".to_string()),
            ))
            .await
            .unwrap();

        let steps = store.steps(id).await.unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].answer, "second answer");
        assert_eq!(steps[0].notes.as_deref(), Some("revised"));
    }

    #[tokio::test]
    async fn documents_are_append_only() {
        let store = MemoryStore::new();
        let session = open_session();
        let id = session.id;
        store.insert_session(session).await.unwrap();

        for _ in 0..3 {
            let doc = DocumentRecord::new(
                id,
                DocumentType::OfferLetter,
                serde_json::json!({"position": "clerk"}),
            )
            .sent();
            store.insert_document(doc).await.unwrap();
        }

        assert_eq!(store.documents(id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn commit_stage_advances_exactly_one() {
        let store = MemoryStore::new();
        let session = open_session();
        let id = session.id;
        store.insert_session(session).await.unwrap();

        let record = StepRecord::new(id, 1, "conditional_offer", "{}", None);
        store
            .commit_stage(id, record.clone(), MacroStage::IndividualAssessment)
            .await
            .unwrap();

        let stored = store.session(id).await.unwrap().unwrap();
        assert_eq!(stored.macro_stage, MacroStage::IndividualAssessment);

        // Skipping ahead is rejected and leaves nothing half-applied.
        let err = store
            .commit_stage(id, record, MacroStage::Reassessment)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::StageOutOfOrder { .. }));
        let stored = store.session(id).await.unwrap().unwrap();
        assert_eq!(stored.macro_stage, MacroStage::IndividualAssessment);
    }

    #[tokio::test]
    async fn audit_entries_chain_across_sessions() {
        let store = MemoryStore::new();
        let first = open_session();
        let second = Session::open(EmployerId::new("emp-2"), CandidateId::new("cand-2"));
        let (a, b) = (first.id, second.id);
        store.insert_session(first).await.unwrap();
        store.insert_session(second).await.unwrap();

        store
            .append_audit(AuditDraft::new(a, "admin", "offer_letter_sent", Metadata::new(), "fp"))
            .await
            .unwrap();
        store
            .append_audit(AuditDraft::new(b, "admin", "offer_letter_sent", Metadata::new(), "fp"))
            .await
            .unwrap();

        assert_eq!(store.audit_entries(a).await.unwrap().len(), 1);
        assert_eq!(store.audit_entries(b).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn latest_session_prefers_most_recent_start() {
        let store = MemoryStore::new();
        let candidate = CandidateId::new("cand-1");
        let mut older = Session::open(EmployerId::new("emp-1"), candidate.clone());
        older.started_at -= chrono::Duration::days(2);
        older.decision = Decision::Revoked;
        let newer = Session::open(EmployerId::new("emp-1"), candidate.clone());
        let newer_id = newer.id;
        store.insert_session(older).await.unwrap();
        store.insert_session(newer).await.unwrap();

        let latest = store
            .latest_session_for_candidate(&candidate)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, newer_id);
    }
}
