//! Per-stage form types and completeness predicates
//!
//! Each committable stage has one form struct holding the full snapshot the
//! stage's letter is generated from. The completeness predicate gates the
//! commit handler: the UI checks it before the handler is reachable, and the
//! handler re-checks it defensively.

use crate::error::ValidationError;
use chrono::NaiveDate;
use fca_store::{Decision, MacroStage};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Minimum business days a candidate must get to respond to a preliminary
/// revocation notice.
pub const MIN_RESPONSE_BUSINESS_DAYS: u32 = 5;

/// A stage's in-progress form: cache placement, owning stage, and
/// completeness predicate.
pub trait StageForm:
    Serialize + DeserializeOwned + Default + Clone + Debug + Send + Sync
{
    /// Durable-cache key prefix for the form snapshot.
    const PURPOSE: &'static str;

    /// Additional cache key prefixes owned by this stage (multi-part
    /// wizards); cleared together with the form on commit.
    const SUB_PURPOSES: &'static [&'static str] = &[];

    /// The macro-stage this form completes.
    fn stage() -> MacroStage;

    /// Completeness predicate checked before the stage may commit.
    fn validate(&self) -> Result<(), ValidationError>;

    /// Terminal decision carried by the form, if this is the closing stage.
    fn terminal_decision(&self) -> Option<Decision> {
        None
    }
}

fn require(missing: &mut Vec<&'static str>, name: &'static str, value: &str) {
    if value.trim().is_empty() {
        missing.push(name);
    }
}

fn has_non_blank(entries: &[String]) -> bool {
    entries.iter().any(|entry| !entry.trim().is_empty())
}

/// Stage 1: conditional offer of employment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionalOfferForm {
    pub candidate_name: String,
    pub position: String,
    pub company_name: String,
    pub offer_date: Option<NaiveDate>,
    pub supervisor_name: String,
    pub pay_rate: String,
}

impl StageForm for ConditionalOfferForm {
    const PURPOSE: &'static str = "offer_form";

    fn stage() -> MacroStage {
        MacroStage::ConditionalOffer
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let mut missing = Vec::new();
        require(&mut missing, "candidate_name", &self.candidate_name);
        require(&mut missing, "position", &self.position);
        require(&mut missing, "company_name", &self.company_name);
        if self.offer_date.is_none() {
            missing.push("offer_date");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::MissingFields(missing))
        }
    }
}

/// Stage 2: individualized assessment of the conviction history against the
/// duties of the position
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndividualAssessmentForm {
    pub position: String,
    pub job_duties: Vec<String>,
    pub conviction_summary: String,
    pub time_since_conduct: String,
    pub activities_since: Vec<String>,
    pub seriousness: String,
    pub fitness_rationale: String,
}

impl StageForm for IndividualAssessmentForm {
    const PURPOSE: &'static str = "assessment_form";

    fn stage() -> MacroStage {
        MacroStage::IndividualAssessment
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let mut missing = Vec::new();
        require(&mut missing, "position", &self.position);
        require(&mut missing, "conviction_summary", &self.conviction_summary);
        require(&mut missing, "seriousness", &self.seriousness);
        if !has_non_blank(&self.job_duties) {
            missing.push("job_duties");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::MissingFields(missing))
        }
    }
}

/// Stage 3: preliminary revocation notice.
///
/// The stage 3 wizard is multi-part; its position within the wizard is cached
/// under a sub-key and cleared with the form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevocationNoticeForm {
    pub candidate_name: String,
    pub position: String,
    pub company_name: String,
    pub contact_name: String,
    pub notice_date: Option<NaiveDate>,
    pub convictions: Vec<String>,
    pub conviction_relationship: String,
    pub seriousness_reason: String,
    pub time_since_conduct: String,
    pub num_business_days: u32,
}

impl StageForm for RevocationNoticeForm {
    const PURPOSE: &'static str = "revocation_form";
    const SUB_PURPOSES: &'static [&'static str] = &["revocation_wizard_step"];

    fn stage() -> MacroStage {
        MacroStage::PreliminaryRevocation
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let mut missing = Vec::new();
        require(&mut missing, "candidate_name", &self.candidate_name);
        require(&mut missing, "position", &self.position);
        require(&mut missing, "company_name", &self.company_name);
        require(&mut missing, "contact_name", &self.contact_name);
        require(
            &mut missing,
            "conviction_relationship",
            &self.conviction_relationship,
        );
        require(&mut missing, "seriousness_reason", &self.seriousness_reason);
        require(&mut missing, "time_since_conduct", &self.time_since_conduct);
        if self.notice_date.is_none() {
            missing.push("notice_date");
        }
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }
        if !has_non_blank(&self.convictions) {
            return Err(ValidationError::NoConvictions);
        }
        if self.num_business_days < MIN_RESPONSE_BUSINESS_DAYS {
            return Err(ValidationError::ResponseWindowTooShort {
                got: self.num_business_days,
                min: MIN_RESPONSE_BUSINESS_DAYS,
            });
        }
        Ok(())
    }
}

/// Stage 4: reassessment after the candidate's response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReassessmentForm {
    pub candidate_name: String,
    pub position: String,
    pub reassessment_date: Option<NaiveDate>,
    pub report_error_claimed: bool,
    pub report_error_detail: String,
    pub rehab_evidence: Vec<String>,
    pub candidate_response: String,
    pub decision_rationale: String,
}

impl StageForm for ReassessmentForm {
    const PURPOSE: &'static str = "reassessment_form";

    fn stage() -> MacroStage {
        MacroStage::Reassessment
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let mut missing = Vec::new();
        require(&mut missing, "candidate_name", &self.candidate_name);
        require(&mut missing, "position", &self.position);
        require(&mut missing, "decision_rationale", &self.decision_rationale);
        if self.report_error_claimed {
            require(&mut missing, "report_error_detail", &self.report_error_detail);
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::MissingFields(missing))
        }
    }
}

/// Stage 5: final decision, closing the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalDecisionForm {
    pub candidate_name: String,
    pub position: String,
    pub company_name: String,
    pub decision: Decision,
    pub basis: String,
    pub convictions_considered: Vec<String>,
    pub decision_date: Option<NaiveDate>,
}

impl Default for FinalDecisionForm {
    fn default() -> Self {
        Self {
            candidate_name: String::new(),
            position: String::new(),
            company_name: String::new(),
            decision: Decision::InProgress,
            basis: String::new(),
            convictions_considered: Vec::new(),
            decision_date: None,
        }
    }
}

impl StageForm for FinalDecisionForm {
    const PURPOSE: &'static str = "final_decision_form";

    fn stage() -> MacroStage {
        MacroStage::FinalDecision
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let mut missing = Vec::new();
        require(&mut missing, "candidate_name", &self.candidate_name);
        require(&mut missing, "position", &self.position);
        require(&mut missing, "company_name", &self.company_name);
        require(&mut missing, "basis", &self.basis);
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }
        if !self.decision.is_terminal() {
            return Err(ValidationError::NonTerminalDecision);
        }
        if self.decision == Decision::Revoked && !has_non_blank(&self.convictions_considered) {
            return Err(ValidationError::NoConvictions);
        }
        Ok(())
    }

    fn terminal_decision(&self) -> Option<Decision> {
        Some(self.decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_revocation() -> RevocationNoticeForm {
        RevocationNoticeForm {
            candidate_name: "J. Doe".to_string(),
            position: "Warehouse Lead".to_string(),
            company_name: "Acme Logistics".to_string(),
            contact_name: "HR Desk".to_string(),
            notice_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            convictions: vec!["2019 misdemeanor".to_string()],
            conviction_relationship: "Role involves unsupervised driving".to_string(),
            seriousness_reason: "Directly related to core duties".to_string(),
            time_since_conduct: "5 years".to_string(),
            num_business_days: MIN_RESPONSE_BUSINESS_DAYS,
        }
    }

    #[test]
    fn revocation_with_minimum_window_passes() {
        assert_eq!(valid_revocation().validate(), Ok(()));
    }

    #[test]
    fn revocation_with_short_window_fails() {
        let mut form = valid_revocation();
        form.num_business_days = 4;
        assert_eq!(
            form.validate(),
            Err(ValidationError::ResponseWindowTooShort { got: 4, min: 5 })
        );
    }

    #[test]
    fn revocation_requires_a_conviction_entry() {
        let mut form = valid_revocation();
        form.convictions = vec!["   ".to_string()];
        assert_eq!(form.validate(), Err(ValidationError::NoConvictions));
    }

    #[test]
    fn revocation_reports_every_blank_field() {
        let form = RevocationNoticeForm::default();
        match form.validate() {
            Err(ValidationError::MissingFields(missing)) => {
                assert!(missing.contains(&"candidate_name"));
                assert!(missing.contains(&"notice_date"));
                assert!(missing.len() >= 8);
            }
            other => panic!("expected missing fields, got {other:?}"),
        }
    }

    #[test]
    fn offer_requires_date() {
        let form = ConditionalOfferForm {
            candidate_name: "J. Doe".to_string(),
            position: "Clerk".to_string(),
            company_name: "Acme".to_string(),
            offer_date: None,
            ..ConditionalOfferForm::default()
        };
        assert_eq!(
            form.validate(),
            Err(ValidationError::MissingFields(vec!["offer_date"]))
        );
    }

    #[test]
    fn assessment_requires_one_duty() {
        let form = IndividualAssessmentForm {
            position: "Clerk".to_string(),
            conviction_summary: "2019 misdemeanor".to_string(),
            seriousness: "low".to_string(),
            job_duties: vec![String::new()],
            ..IndividualAssessmentForm::default()
        };
        assert_eq!(
            form.validate(),
            Err(ValidationError::MissingFields(vec!["job_duties"]))
        );
    }

    #[test]
    fn reassessment_error_claim_needs_detail() {
        let form = ReassessmentForm {
            candidate_name: "J. Doe".to_string(),
            position: "Clerk".to_string(),
            decision_rationale: "proceed".to_string(),
            report_error_claimed: true,
            report_error_detail: String::new(),
            ..ReassessmentForm::default()
        };
        assert_eq!(
            form.validate(),
            Err(ValidationError::MissingFields(vec!["report_error_detail"]))
        );
    }

    #[test]
    fn final_decision_must_be_terminal() {
        let form = FinalDecisionForm {
            candidate_name: "J. Doe".to_string(),
            position: "Clerk".to_string(),
            company_name: "Acme".to_string(),
            basis: "unrelated conviction".to_string(),
            ..FinalDecisionForm::default()
        };
        assert_eq!(form.validate(), Err(ValidationError::NonTerminalDecision));
    }

    #[test]
    fn final_revocation_requires_convictions() {
        let form = FinalDecisionForm {
            candidate_name: "J. Doe".to_string(),
            position: "Clerk".to_string(),
            company_name: "Acme".to_string(),
            basis: "related conviction".to_string(),
            decision: Decision::Revoked,
            convictions_considered: Vec::new(),
            ..FinalDecisionForm::default()
        };
        assert_eq!(form.validate(), Err(ValidationError::NoConvictions));
    }

    #[test]
    fn forms_own_distinct_cache_purposes() {
        let purposes = [
            ConditionalOfferForm::PURPOSE,
            IndividualAssessmentForm::PURPOSE,
            RevocationNoticeForm::PURPOSE,
            ReassessmentForm::PURPOSE,
            FinalDecisionForm::PURPOSE,
        ];
        let unique: std::collections::HashSet<_> = purposes.iter().collect();
        assert_eq!(unique.len(), purposes.len());
    }
}
