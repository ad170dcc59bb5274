//! Testing utilities for the FCA workspace
//!
//! Shared fixtures, collaborator doubles, and a wired-up harness.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::NaiveDate;
use fca_cache::{DurableCache, MemoryBackend};
use fca_engine::{
    CandidateProfile, CandidateProfiles, ConditionalOfferForm, EmployerProfile, EmployerProfiles,
    FileStore, FinalDecisionForm, IndividualAssessmentForm, LetterPayload, NotificationSender,
    NotifyError, ReassessmentForm, RevocationNoticeForm, StageCommitter, StoredFile,
};
use fca_engine::availability::FileListError;
use fca_store::audit::AuditDraft;
use fca_store::{
    AssessmentService, AssessmentStore, AuditEntry, AuditEventId, CandidateId, Decision,
    DocumentRecord, EmployerId, MacroStage, MemoryStore, SafeTracking, ServiceConfig, Session,
    SessionId, StepRecord, StoreError,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Install a compact tracing subscriber for test output. Safe to call from
/// several tests; only the first call wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

// ---------------------------------------------------------------------------
// Form fixtures
// ---------------------------------------------------------------------------

pub fn filled_offer_form() -> ConditionalOfferForm {
    ConditionalOfferForm {
        candidate_name: "Jordan Doe".to_string(),
        position: "Warehouse Lead".to_string(),
        company_name: "Acme Logistics".to_string(),
        offer_date: NaiveDate::from_ymd_opt(2024, 2, 12),
        supervisor_name: "R. Alvarez".to_string(),
        pay_rate: "$24.50/hr".to_string(),
    }
}

pub fn filled_assessment_form() -> IndividualAssessmentForm {
    IndividualAssessmentForm {
        position: "Warehouse Lead".to_string(),
        job_duties: vec![
            "Forklift operation".to_string(),
            "Inventory counts".to_string(),
        ],
        conviction_summary: "2019 misdemeanor, property".to_string(),
        time_since_conduct: "5 years".to_string(),
        activities_since: vec!["Completed vocational program".to_string()],
        seriousness: "Low; no relation to violence".to_string(),
        fitness_rationale: "Conduct unrelated to inventory duties".to_string(),
    }
}

pub fn filled_revocation_form() -> RevocationNoticeForm {
    RevocationNoticeForm {
        candidate_name: "Jordan Doe".to_string(),
        position: "Warehouse Lead".to_string(),
        company_name: "Acme Logistics".to_string(),
        contact_name: "HR Desk".to_string(),
        notice_date: NaiveDate::from_ymd_opt(2024, 3, 1),
        convictions: vec!["2019 misdemeanor, property".to_string()],
        conviction_relationship: "Role involves unsupervised handling of goods".to_string(),
        seriousness_reason: "Directly related to core duties".to_string(),
        time_since_conduct: "5 years".to_string(),
        num_business_days: 5,
    }
}

pub fn filled_reassessment_form() -> ReassessmentForm {
    ReassessmentForm {
        candidate_name: "Jordan Doe".to_string(),
        position: "Warehouse Lead".to_string(),
        reassessment_date: NaiveDate::from_ymd_opt(2024, 3, 12),
        report_error_claimed: false,
        report_error_detail: String::new(),
        rehab_evidence: vec!["Completion certificate".to_string()],
        candidate_response: "Provided rehabilitation evidence".to_string(),
        decision_rationale: "Evidence reviewed against duties".to_string(),
    }
}

pub fn filled_final_form(decision: Decision) -> FinalDecisionForm {
    FinalDecisionForm {
        candidate_name: "Jordan Doe".to_string(),
        position: "Warehouse Lead".to_string(),
        company_name: "Acme Logistics".to_string(),
        decision,
        basis: "Individualized reassessment outcome".to_string(),
        convictions_considered: vec!["2019 misdemeanor, property".to_string()],
        decision_date: NaiveDate::from_ymd_opt(2024, 3, 20),
    }
}

// ---------------------------------------------------------------------------
// Collaborator doubles
// ---------------------------------------------------------------------------

/// Notifier that records every letter it delivers.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(LetterPayload, String)>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(LetterPayload, String)> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl NotificationSender for RecordingNotifier {
    async fn send(&self, letter: &LetterPayload, recipient: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .push((letter.clone(), recipient.to_string()));
        Ok(())
    }
}

/// Notifier that always refuses delivery.
#[derive(Debug, Default)]
pub struct FailingNotifier;

#[async_trait]
impl NotificationSender for FailingNotifier {
    async fn send(&self, _letter: &LetterPayload, _recipient: &str) -> Result<(), NotifyError> {
        Err(NotifyError::SendFailed("notifier double".to_string()))
    }
}

/// File store double serving a fixed listing.
#[derive(Debug, Default)]
pub struct StaticFileStore {
    pub files: Vec<StoredFile>,
}

#[async_trait]
impl FileStore for StaticFileStore {
    async fn list(&self, _candidate: &CandidateId) -> Result<Vec<StoredFile>, FileListError> {
        Ok(self.files.clone())
    }
}

/// Profile providers serving fixed objects.
#[derive(Debug, Default)]
pub struct StaticProfiles {
    pub candidate: Option<CandidateProfile>,
    pub employer: Option<EmployerProfile>,
}

#[async_trait]
impl CandidateProfiles for StaticProfiles {
    async fn profile(&self, _candidate: &CandidateId) -> Option<CandidateProfile> {
        self.candidate.clone()
    }
}

#[async_trait]
impl EmployerProfiles for StaticProfiles {
    async fn profile(&self, _employer: &EmployerId) -> Option<EmployerProfile> {
        self.employer.clone()
    }
}

// ---------------------------------------------------------------------------
// Store wrappers
// ---------------------------------------------------------------------------

fn outage() -> StoreError {
    StoreError::Backend("simulated outage".to_string())
}

/// Store wrapper with a switchable outage: while failing, every operation
/// returns a backend error.
#[derive(Debug)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing: AtomicBool,
}

impl FlakyStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(outage())
        } else {
            Ok(())
        }
    }
}

impl Default for FlakyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssessmentStore for FlakyStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.check()?;
        self.inner.ping().await
    }

    async fn insert_session(&self, session: Session) -> Result<(), StoreError> {
        self.check()?;
        self.inner.insert_session(session).await
    }

    async fn session(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        self.check()?;
        self.inner.session(id).await
    }

    async fn in_progress_session(
        &self,
        employer: &EmployerId,
        candidate: &CandidateId,
    ) -> Result<Option<Session>, StoreError> {
        self.check()?;
        self.inner.in_progress_session(employer, candidate).await
    }

    async fn latest_session_for_candidate(
        &self,
        candidate: &CandidateId,
    ) -> Result<Option<Session>, StoreError> {
        self.check()?;
        self.inner.latest_session_for_candidate(candidate).await
    }

    async fn update_session(&self, session: Session) -> Result<(), StoreError> {
        self.check()?;
        self.inner.update_session(session).await
    }

    async fn upsert_step(&self, record: StepRecord) -> Result<(), StoreError> {
        self.check()?;
        self.inner.upsert_step(record).await
    }

    async fn steps(&self, session: SessionId) -> Result<Vec<StepRecord>, StoreError> {
        self.check()?;
        self.inner.steps(session).await
    }

    async fn step_by_question(
        &self,
        session: SessionId,
        question_id: &str,
    ) -> Result<Option<StepRecord>, StoreError> {
        self.check()?;
        self.inner.step_by_question(session, question_id).await
    }

    async fn insert_document(&self, document: DocumentRecord) -> Result<(), StoreError> {
        self.check()?;
        self.inner.insert_document(document).await
    }

    async fn documents(&self, session: SessionId) -> Result<Vec<DocumentRecord>, StoreError> {
        self.check()?;
        self.inner.documents(session).await
    }

    async fn append_audit(&self, draft: AuditDraft) -> Result<AuditEventId, StoreError> {
        self.check()?;
        self.inner.append_audit(draft).await
    }

    async fn audit_entries(&self, session: SessionId) -> Result<Vec<AuditEntry>, StoreError> {
        self.check()?;
        self.inner.audit_entries(session).await
    }

    async fn commit_stage(
        &self,
        session: SessionId,
        record: StepRecord,
        next_stage: MacroStage,
    ) -> Result<(), StoreError> {
        self.check()?;
        self.inner.commit_stage(session, record, next_stage).await
    }
}

/// Store wrapper counting stage-record queries, for asserting the resolver's
/// query bound.
#[derive(Debug)]
pub struct CountingStore {
    inner: MemoryStore,
    step_queries: AtomicUsize,
    queried_questions: Mutex<Vec<String>>,
}

impl CountingStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            step_queries: AtomicUsize::new(0),
            queried_questions: Mutex::new(Vec::new()),
        }
    }

    pub fn step_query_count(&self) -> usize {
        self.step_queries.load(Ordering::SeqCst)
    }

    pub fn queried_questions(&self) -> Vec<String> {
        self.queried_questions.lock().clone()
    }

    pub fn reset_counts(&self) {
        self.step_queries.store(0, Ordering::SeqCst);
        self.queried_questions.lock().clear();
    }
}

impl Default for CountingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssessmentStore for CountingStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }

    async fn insert_session(&self, session: Session) -> Result<(), StoreError> {
        self.inner.insert_session(session).await
    }

    async fn session(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        self.inner.session(id).await
    }

    async fn in_progress_session(
        &self,
        employer: &EmployerId,
        candidate: &CandidateId,
    ) -> Result<Option<Session>, StoreError> {
        self.inner.in_progress_session(employer, candidate).await
    }

    async fn latest_session_for_candidate(
        &self,
        candidate: &CandidateId,
    ) -> Result<Option<Session>, StoreError> {
        self.inner.latest_session_for_candidate(candidate).await
    }

    async fn update_session(&self, session: Session) -> Result<(), StoreError> {
        self.inner.update_session(session).await
    }

    async fn upsert_step(&self, record: StepRecord) -> Result<(), StoreError> {
        self.inner.upsert_step(record).await
    }

    async fn steps(&self, session: SessionId) -> Result<Vec<StepRecord>, StoreError> {
        self.inner.steps(session).await
    }

    async fn step_by_question(
        &self,
        session: SessionId,
        question_id: &str,
    ) -> Result<Option<StepRecord>, StoreError> {
        self.step_queries.fetch_add(1, Ordering::SeqCst);
        self.queried_questions.lock().push(question_id.to_string());
        self.inner.step_by_question(session, question_id).await
    }

    async fn insert_document(&self, document: DocumentRecord) -> Result<(), StoreError> {
        self.inner.insert_document(document).await
    }

    async fn documents(&self, session: SessionId) -> Result<Vec<DocumentRecord>, StoreError> {
        self.inner.documents(session).await
    }

    async fn append_audit(&self, draft: AuditDraft) -> Result<AuditEventId, StoreError> {
        self.inner.append_audit(draft).await
    }

    async fn audit_entries(&self, session: SessionId) -> Result<Vec<AuditEntry>, StoreError> {
        self.inner.audit_entries(session).await
    }

    async fn commit_stage(
        &self,
        session: SessionId,
        record: StepRecord,
        next_stage: MacroStage,
    ) -> Result<(), StoreError> {
        self.inner.commit_stage(session, record, next_stage).await
    }
}

// ---------------------------------------------------------------------------
// Wired harness
// ---------------------------------------------------------------------------

/// Everything a workflow test needs, wired against in-memory collaborators.
#[derive(Debug)]
pub struct TestHarness {
    pub backend: Arc<MemoryBackend>,
    pub cache: DurableCache,
    pub service: AssessmentService,
    pub tracking: SafeTracking,
    pub notifier: Arc<RecordingNotifier>,
    pub committer: StageCommitter,
}

impl TestHarness {
    #[must_use]
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    #[must_use]
    pub fn with_store(store: Arc<dyn AssessmentStore>) -> Self {
        let backend = Arc::new(MemoryBackend::new());
        let cache = DurableCache::new(backend.clone());
        let service = AssessmentService::new(
            store,
            ServiceConfig::new()
                .with_actor("admin-1")
                .with_fingerprint("test-client"),
        );
        let tracking = SafeTracking::new(service.clone());
        let notifier = Arc::new(RecordingNotifier::new());
        let committer = StageCommitter::new(service.clone(), notifier.clone(), cache.clone());
        Self {
            backend,
            cache,
            service,
            tracking,
            notifier,
            committer,
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
