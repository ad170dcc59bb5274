//! Service-level walk: one session from first action to export.

use fca_store::{
    AssessmentService, CandidateId, Decision, DocumentType, EmployerId, MacroStage, MemoryStore,
    Metadata, ServiceConfig,
};
use std::collections::BTreeMap;
use std::sync::Arc;

fn service() -> AssessmentService {
    AssessmentService::new(
        Arc::new(MemoryStore::new()),
        ServiceConfig::new()
            .with_actor("admin-7")
            .with_fingerprint("ip:203.0.113.9"),
    )
}

#[tokio::test]
async fn full_session_exports_every_table() {
    let service = service();
    let employer = EmployerId::new("emp-1");
    let candidate = CandidateId::new("cand-1");
    let handle = service.get_or_create(&employer, &candidate).await.unwrap();

    // Scratch answers, revised once.
    let mut answers = BTreeMap::new();
    answers.insert("q_duties".to_string(), "forklift".to_string());
    answers.insert("q_schedule".to_string(), "night shift".to_string());
    service.save_all_answers(&handle, &answers).await.unwrap();
    service
        .save_step(&handle, 1, "q_duties", "forklift and loading dock", None)
        .await
        .unwrap();

    // Two stage commits with their letters recorded.
    for (stage, doc_type) in [
        (MacroStage::ConditionalOffer, DocumentType::OfferLetter),
        (MacroStage::IndividualAssessment, DocumentType::Assessment),
    ] {
        service
            .save_document(&handle, doc_type, serde_json::json!({"stage": stage.as_u8()}), true)
            .await
            .unwrap();
        service
            .commit_stage(&handle, stage, &serde_json::json!({"stage": stage.as_u8()}))
            .await
            .unwrap();
        let mut detail = Metadata::new();
        detail.insert("stage".to_string(), u64::from(stage.as_u8()).into());
        service
            .log_action(&handle, &format!("{doc_type}_sent"), detail)
            .await;
    }

    let mut patch = Metadata::new();
    patch.insert("reviewer".to_string(), "legal".into());
    service.update_metadata(&handle, patch).await.unwrap();

    let record = service.assessment_record(&handle).await.unwrap();

    // Steps: two scratch answers (one revised in place) + two stage records.
    assert_eq!(record.steps.len(), 4);
    let duties = record
        .steps
        .iter()
        .find(|s| s.question_id == "q_duties")
        .unwrap();
    assert_eq!(duties.answer, "forklift and loading dock");

    assert_eq!(record.documents.len(), 2);
    assert_eq!(record.session.macro_stage, MacroStage::PreliminaryRevocation);
    assert_eq!(
        record.session.metadata.get("reviewer"),
        Some(&serde_json::json!("legal"))
    );
    assert_eq!(
        record.session.metadata.get("last_step_completed"),
        Some(&serde_json::json!(2))
    );

    // assessment_started + two letter actions, chained intact, with the
    // configured actor and fingerprint on every entry.
    assert_eq!(record.audit.len(), 3);
    assert!(record.audit_chain_intact);
    assert!(record
        .audit
        .iter()
        .all(|entry| entry.actor_id == "admin-7" && entry.client_fingerprint == "ip:203.0.113.9"));
}

#[tokio::test]
async fn metadata_merges_are_last_writer_wins() {
    let service = service();
    let handle = service
        .get_or_create(&EmployerId::new("emp-1"), &CandidateId::new("cand-1"))
        .await
        .unwrap();

    let mut first = Metadata::new();
    first.insert("reviewer".to_string(), "legal".into());
    first.insert("priority".to_string(), "high".into());
    service.update_metadata(&handle, first).await.unwrap();

    let mut second = Metadata::new();
    second.insert("reviewer".to_string(), "hr".into());
    service.update_metadata(&handle, second).await.unwrap();

    let session = service.session(&handle).await.unwrap();
    // Overlapping key takes the later write; untouched keys survive.
    assert_eq!(session.metadata.get("reviewer"), Some(&serde_json::json!("hr")));
    assert_eq!(session.metadata.get("priority"), Some(&serde_json::json!("high")));
}

#[tokio::test]
async fn sessions_are_isolated_per_pair() {
    let service = service();
    let candidate = CandidateId::new("cand-1");
    let first = service
        .get_or_create(&EmployerId::new("emp-1"), &candidate)
        .await
        .unwrap();
    let second = service
        .get_or_create(&EmployerId::new("emp-2"), &candidate)
        .await
        .unwrap();
    assert_ne!(first.id(), second.id());

    service.complete(&first, Decision::Hired).await.unwrap();
    // The other employer's session is untouched.
    let session = service.session(&second).await.unwrap();
    assert!(session.is_open());
}
