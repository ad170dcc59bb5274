//! Document availability resolver
//!
//! Answers "which compliance documents could exist for this candidate" while
//! issuing the minimum number of store queries: no session means no queries
//! at all, and a stage is never queried before the canonical macro-stage is
//! strictly past it (it could not possibly be complete earlier).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fca_store::{CandidateId, DocumentType, MacroStage, SafeTracking};
use futures::future::join_all;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

/// A supporting file already uploaded for the candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFile {
    pub name: String,
    pub uploaded_at: DateTime<Utc>,
}

/// File-listing failure from the storage provider
#[derive(Debug, Clone, thiserror::Error)]
#[error("file listing failed: {0}")]
pub struct FileListError(pub String);

/// Read-only seam over the file storage provider.
#[async_trait]
pub trait FileStore: Debug + Send + Sync {
    async fn list(&self, candidate: &CandidateId) -> Result<Vec<StoredFile>, FileListError>;
}

/// Which stage documents may exist, plus the uploaded supporting files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AvailabilitySnapshot {
    pub offer_letter: bool,
    pub assessment: bool,
    pub revocation_notice: bool,
    pub reassessment: bool,
    pub final_revocation: bool,
    pub uploaded_files: Vec<StoredFile>,
}

impl AvailabilitySnapshot {
    #[must_use]
    pub fn available(&self, doc_type: DocumentType) -> bool {
        match doc_type {
            DocumentType::OfferLetter => self.offer_letter,
            DocumentType::Assessment => self.assessment,
            DocumentType::RevocationNotice => self.revocation_notice,
            DocumentType::Reassessment => self.reassessment,
            DocumentType::FinalRevocation => self.final_revocation,
        }
    }

    #[must_use]
    pub fn any_document(&self) -> bool {
        self.offer_letter
            || self.assessment
            || self.revocation_notice
            || self.reassessment
            || self.final_revocation
    }

    fn set(&mut self, doc_type: DocumentType, available: bool) {
        match doc_type {
            DocumentType::OfferLetter => self.offer_letter = available,
            DocumentType::Assessment => self.assessment = available,
            DocumentType::RevocationNotice => self.revocation_notice = available,
            DocumentType::Reassessment => self.reassessment = available,
            DocumentType::FinalRevocation => self.final_revocation = available,
        }
    }
}

/// Computes and caches one candidate's availability snapshot.
#[derive(Debug)]
pub struct DocumentAvailabilityResolver {
    tracking: SafeTracking,
    files: Arc<dyn FileStore>,
    candidate_id: CandidateId,
    snapshot: Mutex<Option<AvailabilitySnapshot>>,
}

impl DocumentAvailabilityResolver {
    #[must_use]
    pub fn new(tracking: SafeTracking, files: Arc<dyn FileStore>, candidate_id: CandidateId) -> Self {
        Self {
            tracking,
            files,
            candidate_id,
            snapshot: Mutex::new(None),
        }
    }

    /// The current snapshot, computed on first use.
    pub async fn snapshot(&self) -> AvailabilitySnapshot {
        if let Some(cached) = self.snapshot.lock().clone() {
            return cached;
        }
        self.refresh().await
    }

    /// Recompute, for callers that mutated state elsewhere.
    pub async fn refresh(&self) -> AvailabilitySnapshot {
        let computed = self.compute().await;
        *self.snapshot.lock() = Some(computed.clone());
        computed
    }

    async fn compute(&self) -> AvailabilitySnapshot {
        let mut snapshot = AvailabilitySnapshot::default();

        // No session at all: nothing can exist, issue zero stage queries.
        let Some(session) = self.tracking.latest_session(&self.candidate_id).await else {
            return snapshot;
        };
        let canonical = session.macro_stage;
        let session_id = session.id;

        // Query only stages strictly below the canonical pointer.
        let checks = MacroStage::COMMITTABLE
            .into_iter()
            .filter(|stage| *stage < canonical)
            .map(|stage| {
                let tracking = self.tracking.clone();
                async move {
                    let present = tracking.stage_record(session_id, stage).await.is_some();
                    (stage, present)
                }
            });
        for (stage, present) in join_all(checks).await {
            if let Some(doc_type) = stage.document_type() {
                snapshot.set(doc_type, present);
            }
        }

        snapshot.uploaded_files = match self.files.list(&self.candidate_id).await {
            Ok(files) => files,
            Err(err) => {
                tracing::warn!(candidate = %self.candidate_id, %err, "file listing failed");
                Vec::new()
            }
        };
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fca_store::{
        AssessmentService, EmployerId, MemoryStore, ServiceConfig,
    };

    #[derive(Debug)]
    struct StaticFiles(Vec<StoredFile>);

    #[async_trait]
    impl FileStore for StaticFiles {
        async fn list(&self, _candidate: &CandidateId) -> Result<Vec<StoredFile>, FileListError> {
            Ok(self.0.clone())
        }
    }

    fn tracking(store: Arc<MemoryStore>) -> SafeTracking {
        SafeTracking::new(AssessmentService::new(store, ServiceConfig::default()))
    }

    #[tokio::test]
    async fn no_session_short_circuits_to_empty() {
        let resolver = DocumentAvailabilityResolver::new(
            tracking(Arc::new(MemoryStore::new())),
            Arc::new(StaticFiles(Vec::new())),
            CandidateId::new("cand-1"),
        );

        let snapshot = resolver.snapshot().await;
        assert_eq!(snapshot, AvailabilitySnapshot::default());
        assert!(!snapshot.any_document());
    }

    #[tokio::test]
    async fn committed_stages_become_available_after_refresh() {
        let store = Arc::new(MemoryStore::new());
        let tracking = tracking(store);
        let candidate = CandidateId::new("cand-1");
        let service = tracking.service().clone();
        let handle = service
            .get_or_create(&EmployerId::new("emp-1"), &candidate)
            .await
            .unwrap();

        let resolver = DocumentAvailabilityResolver::new(
            tracking,
            Arc::new(StaticFiles(vec![StoredFile {
                name: "rap_sheet.pdf".to_string(),
                uploaded_at: Utc::now(),
            }])),
            candidate,
        );

        // Session exists, nothing committed: stage 1 is not yet queried.
        let before = resolver.snapshot().await;
        assert!(!before.any_document());
        assert_eq!(before.uploaded_files.len(), 1);

        service
            .commit_stage(&handle, MacroStage::ConditionalOffer, &serde_json::json!({}))
            .await
            .unwrap();

        // Stale until explicitly refreshed.
        assert!(!resolver.snapshot().await.offer_letter);
        let after = resolver.refresh().await;
        assert!(after.offer_letter);
        assert!(!after.assessment);
        assert!(after.available(DocumentType::OfferLetter));
    }
}
