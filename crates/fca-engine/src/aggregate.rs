//! Cross-stage data aggregator
//!
//! Later stages autofill from what earlier stages produced. The source rule
//! per stage: once the canonical macro-stage is strictly past a stage, its
//! committed record in the authoritative store is the only source (its cache
//! entry is already gone); until then, the in-progress cache draft is used so
//! a half-finished stage is still visible to later-stage previews. A missing
//! source contributes defaults, never a failure.

use crate::forms::{
    ConditionalOfferForm, IndividualAssessmentForm, ReassessmentForm, RevocationNoticeForm,
    StageForm,
};
use crate::stage_store::StageStore;
use async_trait::async_trait;
use chrono::NaiveDate;
use fca_cache::DurableCache;
use fca_store::{CandidateId, EmployerId, MacroStage, SafeTracking, SessionId};
use serde::Serialize;
use std::fmt::Debug;
use std::sync::Arc;

/// Read-only candidate profile from the host HR system
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateProfile {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Read-only employer profile from the host HR system
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmployerProfile {
    pub company_name: String,
    pub contact_name: Option<String>,
}

/// Candidate profile provider seam.
#[async_trait]
pub trait CandidateProfiles: Debug + Send + Sync {
    async fn profile(&self, candidate: &CandidateId) -> Option<CandidateProfile>;
}

/// Employer profile provider seam.
#[async_trait]
pub trait EmployerProfiles: Debug + Send + Sync {
    async fn profile(&self, employer: &EmployerId) -> Option<EmployerProfile>;
}

/// Flat projection of earlier-stage data for later-stage autofill.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StageProjection {
    pub candidate_name: String,
    pub company_name: String,
    pub contact_name: String,
    pub position: String,
    pub offer_date: Option<NaiveDate>,
    pub notice_date: Option<NaiveDate>,
    pub convictions: Vec<String>,
    pub conviction_relationship: String,
    pub seriousness_reason: String,
    pub time_since_conduct: String,
    pub num_business_days: Option<u32>,
    pub rehab_evidence: Vec<String>,
    pub report_error_detail: String,
}

/// Assembles [`StageProjection`]s from the two persistence tiers plus the
/// profile providers.
#[derive(Debug, Clone)]
pub struct CrossStageAggregator {
    tracking: SafeTracking,
    cache: DurableCache,
    candidates: Arc<dyn CandidateProfiles>,
    employers: Arc<dyn EmployerProfiles>,
}

impl CrossStageAggregator {
    #[must_use]
    pub fn new(
        tracking: SafeTracking,
        cache: DurableCache,
        candidates: Arc<dyn CandidateProfiles>,
        employers: Arc<dyn EmployerProfiles>,
    ) -> Self {
        Self {
            tracking,
            cache,
            candidates,
            employers,
        }
    }

    /// Build the projection for one candidate.
    ///
    /// `preloaded_candidate` / `preloaded_employer` skip the provider lookup
    /// when the caller already holds the profile objects.
    pub async fn project(
        &self,
        candidate: &CandidateId,
        preloaded_candidate: Option<CandidateProfile>,
        preloaded_employer: Option<EmployerProfile>,
    ) -> StageProjection {
        let session = self.tracking.latest_session(candidate).await;
        let canonical = session.as_ref().map(|s| s.macro_stage);
        let session_id = session.as_ref().map(|s| s.id);
        let employer_id = session.as_ref().map(|s| s.employer_id.clone());

        let offer: Option<ConditionalOfferForm> =
            self.stage_form(candidate, session_id, canonical).await;
        let assessment: Option<IndividualAssessmentForm> =
            self.stage_form(candidate, session_id, canonical).await;
        let revocation: Option<RevocationNoticeForm> =
            self.stage_form(candidate, session_id, canonical).await;
        let reassessment: Option<ReassessmentForm> =
            self.stage_form(candidate, session_id, canonical).await;

        let mut projection = StageProjection::default();

        if let Some(offer) = offer {
            merge_text(&mut projection.candidate_name, &offer.candidate_name);
            merge_text(&mut projection.company_name, &offer.company_name);
            merge_text(&mut projection.position, &offer.position);
            projection.offer_date = offer.offer_date;
        }
        if let Some(assessment) = assessment {
            merge_text(&mut projection.position, &assessment.position);
            merge_text(&mut projection.time_since_conduct, &assessment.time_since_conduct);
        }
        if let Some(revocation) = revocation {
            merge_text(&mut projection.candidate_name, &revocation.candidate_name);
            merge_text(&mut projection.company_name, &revocation.company_name);
            merge_text(&mut projection.contact_name, &revocation.contact_name);
            merge_text(&mut projection.position, &revocation.position);
            merge_text(
                &mut projection.conviction_relationship,
                &revocation.conviction_relationship,
            );
            merge_text(&mut projection.seriousness_reason, &revocation.seriousness_reason);
            merge_text(&mut projection.time_since_conduct, &revocation.time_since_conduct);
            projection.notice_date = revocation.notice_date;
            projection.num_business_days = Some(revocation.num_business_days);
            if projection.convictions.is_empty() {
                projection.convictions = revocation.convictions;
            }
        }
        if let Some(reassessment) = reassessment {
            merge_text(&mut projection.candidate_name, &reassessment.candidate_name);
            merge_text(&mut projection.position, &reassessment.position);
            merge_text(&mut projection.report_error_detail, &reassessment.report_error_detail);
            if projection.rehab_evidence.is_empty() {
                projection.rehab_evidence = reassessment.rehab_evidence;
            }
        }

        // Profile providers fill whatever the stages left blank.
        if projection.candidate_name.trim().is_empty() {
            let profile = match preloaded_candidate {
                Some(profile) => Some(profile),
                None => self.candidates.profile(candidate).await,
            };
            if let Some(profile) = profile {
                projection.candidate_name = profile.name;
            }
        }
        if projection.company_name.trim().is_empty() || projection.contact_name.trim().is_empty() {
            let profile = match preloaded_employer {
                Some(profile) => Some(profile),
                None => match employer_id {
                    Some(id) => self.employers.profile(&id).await,
                    None => None,
                },
            };
            if let Some(profile) = profile {
                merge_text(&mut projection.company_name, &profile.company_name);
                if let Some(contact) = profile.contact_name {
                    merge_text(&mut projection.contact_name, &contact);
                }
            }
        }

        projection
    }

    /// Source rule: canonical strictly past the stage reads the committed
    /// record; otherwise the cache draft.
    async fn stage_form<F: StageForm>(
        &self,
        candidate: &CandidateId,
        session_id: Option<SessionId>,
        canonical: Option<MacroStage>,
    ) -> Option<F> {
        let committed = matches!(canonical, Some(current) if current > F::stage());
        if committed {
            let session_id = session_id?;
            let record = self.tracking.stage_record(session_id, F::stage()).await?;
            match serde_json::from_str(&record.answer) {
                Ok(form) => Some(form),
                Err(err) => {
                    tracing::warn!(stage = ?F::stage(), %err, "committed stage record failed to decode");
                    None
                }
            }
        } else {
            StageStore::<F>::new(self.cache.clone(), candidate.clone()).load()
        }
    }
}

fn merge_text(dst: &mut String, src: &str) {
    if dst.trim().is_empty() && !src.trim().is_empty() {
        *dst = src.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fca_cache::MemoryBackend;
    use fca_store::{AssessmentService, MemoryStore, ServiceConfig};

    #[derive(Debug)]
    struct NoProfiles;

    #[async_trait]
    impl CandidateProfiles for NoProfiles {
        async fn profile(&self, _candidate: &CandidateId) -> Option<CandidateProfile> {
            None
        }
    }

    #[async_trait]
    impl EmployerProfiles for NoProfiles {
        async fn profile(&self, _employer: &EmployerId) -> Option<EmployerProfile> {
            None
        }
    }

    fn harness() -> (SafeTracking, DurableCache, CrossStageAggregator) {
        let tracking = SafeTracking::new(AssessmentService::new(
            Arc::new(MemoryStore::new()),
            ServiceConfig::default(),
        ));
        let cache = DurableCache::new(Arc::new(MemoryBackend::new()));
        let aggregator = CrossStageAggregator::new(
            tracking.clone(),
            cache.clone(),
            Arc::new(NoProfiles),
            Arc::new(NoProfiles),
        );
        (tracking, cache, aggregator)
    }

    #[tokio::test]
    async fn empty_world_projects_defaults() {
        let (_, _, aggregator) = harness();
        let projection = aggregator
            .project(&CandidateId::new("cand-1"), None, None)
            .await;
        assert_eq!(projection, StageProjection::default());
    }

    #[tokio::test]
    async fn in_progress_stage_reads_from_cache() {
        let (_, cache, aggregator) = harness();
        let candidate = CandidateId::new("cand-1");

        let mut draft = ConditionalOfferForm::default();
        draft.candidate_name = "J. Doe".to_string();
        draft.position = "Warehouse Lead".to_string();
        StageStore::<ConditionalOfferForm>::new(cache, candidate.clone()).save(&draft);

        let projection = aggregator.project(&candidate, None, None).await;
        assert_eq!(projection.candidate_name, "J. Doe");
        assert_eq!(projection.position, "Warehouse Lead");
    }

    #[tokio::test]
    async fn committed_stage_reads_from_store_not_cache() {
        let (tracking, cache, aggregator) = harness();
        let candidate = CandidateId::new("cand-1");
        let service = tracking.service();
        let handle = service
            .get_or_create(&EmployerId::new("emp-1"), &candidate)
            .await
            .unwrap();

        let mut committed = ConditionalOfferForm::default();
        committed.candidate_name = "J. Doe".to_string();
        committed.position = "Committed Position".to_string();
        service
            .commit_stage(&handle, MacroStage::ConditionalOffer, &committed)
            .await
            .unwrap();

        // A stale cache draft must be ignored once the stage is committed.
        let mut stale = ConditionalOfferForm::default();
        stale.position = "Stale Draft Position".to_string();
        StageStore::<ConditionalOfferForm>::new(cache, candidate.clone()).save(&stale);

        let projection = aggregator.project(&candidate, None, None).await;
        assert_eq!(projection.position, "Committed Position");
    }

    #[tokio::test]
    async fn preloaded_profiles_fill_blanks() {
        let (_, _, aggregator) = harness();
        let projection = aggregator
            .project(
                &CandidateId::new("cand-1"),
                Some(CandidateProfile {
                    name: "J. Doe".to_string(),
                    email: Some("jdoe@example.com".to_string()),
                    phone: None,
                }),
                Some(EmployerProfile {
                    company_name: "Acme Logistics".to_string(),
                    contact_name: Some("HR Desk".to_string()),
                }),
            )
            .await;
        assert_eq!(projection.candidate_name, "J. Doe");
        assert_eq!(projection.company_name, "Acme Logistics");
        assert_eq!(projection.contact_name, "HR Desk");
    }
}
