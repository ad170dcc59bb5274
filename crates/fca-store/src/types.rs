//! Domain types for assessment tracking
//!
//! One session per (employer, candidate) pair, step records upserted by
//! question id, append-only document records, and hash-chained audit entries.
//! Macro-stages (1-6) are the legally defined phases of the process and are a
//! different numbering space from step-record step numbers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;
use uuid::Uuid;

/// Unique session identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Ulid);

impl SessionId {
    /// Generate new session ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique step record identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StepRecordId(pub Ulid);

impl StepRecordId {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for StepRecordId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique document record identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Ulid);

impl DocumentId {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique audit event identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditEventId(pub Uuid);

impl AuditEventId {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AuditEventId {
    fn default() -> Self {
        Self::new()
    }
}

/// Candidate identifier issued by the host HR system
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateId(pub String);

impl CandidateId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CandidateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Employer identifier issued by the host HR system
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmployerId(pub String);

impl EmployerId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EmployerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Terminal decision of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    InProgress,
    Hired,
    Revoked,
}

impl Decision {
    /// Whether this decision closes the session.
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Decision::InProgress)
    }
}

/// The six legally defined phases of the fair-chance process.
///
/// Declaration order gives the ordinal comparison used throughout: a stage's
/// data may only be read from the canonical store once the session's
/// macro-stage is strictly past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MacroStage {
    ConditionalOffer,
    IndividualAssessment,
    PreliminaryRevocation,
    Reassessment,
    FinalDecision,
    Closed,
}

impl MacroStage {
    /// All stages that carry a commit handler, in process order.
    pub const COMMITTABLE: [MacroStage; 5] = [
        MacroStage::ConditionalOffer,
        MacroStage::IndividualAssessment,
        MacroStage::PreliminaryRevocation,
        MacroStage::Reassessment,
        MacroStage::FinalDecision,
    ];

    /// 1-based stage number.
    #[inline]
    #[must_use]
    pub fn as_u8(self) -> u8 {
        match self {
            MacroStage::ConditionalOffer => 1,
            MacroStage::IndividualAssessment => 2,
            MacroStage::PreliminaryRevocation => 3,
            MacroStage::Reassessment => 4,
            MacroStage::FinalDecision => 5,
            MacroStage::Closed => 6,
        }
    }

    /// Stage for a 1-based number, if in range.
    #[must_use]
    pub fn from_u8(stage: u8) -> Option<Self> {
        match stage {
            1 => Some(MacroStage::ConditionalOffer),
            2 => Some(MacroStage::IndividualAssessment),
            3 => Some(MacroStage::PreliminaryRevocation),
            4 => Some(MacroStage::Reassessment),
            5 => Some(MacroStage::FinalDecision),
            6 => Some(MacroStage::Closed),
            _ => None,
        }
    }

    /// The stage the process moves to after committing this one.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        Self::from_u8(self.as_u8() + 1)
    }

    /// Question id under which this stage's completion record is stored.
    #[must_use]
    pub fn question_key(self) -> &'static str {
        match self {
            MacroStage::ConditionalOffer => "conditional_offer",
            MacroStage::IndividualAssessment => "individual_assessment",
            MacroStage::PreliminaryRevocation => "preliminary_revocation",
            MacroStage::Reassessment => "candidate_reassessment",
            MacroStage::FinalDecision => "final_decision",
            MacroStage::Closed => "closed",
        }
    }

    /// Compliance letter produced by committing this stage.
    #[must_use]
    pub fn document_type(self) -> Option<DocumentType> {
        match self {
            MacroStage::ConditionalOffer => Some(DocumentType::OfferLetter),
            MacroStage::IndividualAssessment => Some(DocumentType::Assessment),
            MacroStage::PreliminaryRevocation => Some(DocumentType::RevocationNotice),
            MacroStage::Reassessment => Some(DocumentType::Reassessment),
            MacroStage::FinalDecision => Some(DocumentType::FinalRevocation),
            MacroStage::Closed => None,
        }
    }
}

/// Compliance letter types, one per committable stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    OfferLetter,
    Assessment,
    RevocationNotice,
    Reassessment,
    FinalRevocation,
}

impl DocumentType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentType::OfferLetter => "offer_letter",
            DocumentType::Assessment => "assessment",
            DocumentType::RevocationNotice => "revocation_notice",
            DocumentType::Reassessment => "reassessment",
            DocumentType::FinalRevocation => "final_revocation",
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form session metadata map (last step completed, last-updated, ...)
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// One employer-candidate compliance process, first action to terminal decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub employer_id: EmployerId,
    pub candidate_id: CandidateId,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub decision: Decision,
    /// Canonical macro-stage pointer. Advanced only by stage commits.
    pub macro_stage: MacroStage,
    pub metadata: Metadata,
}

impl Session {
    /// Open a fresh session at stage 1.
    #[must_use]
    pub fn open(employer_id: EmployerId, candidate_id: CandidateId) -> Self {
        Self {
            id: SessionId::new(),
            employer_id,
            candidate_id,
            started_at: Utc::now(),
            completed_at: None,
            decision: Decision::InProgress,
            macro_stage: MacroStage::ConditionalOffer,
            metadata: Metadata::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.decision == Decision::InProgress
    }
}

/// One persisted question/answer unit within a session.
///
/// `(session_id, question_id)` is unique; later writes update in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub id: StepRecordId,
    pub session_id: SessionId,
    /// Ordinal within the workflow. Not a macro-stage number.
    pub step_number: u32,
    pub question_id: String,
    pub answer: String,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl StepRecord {
    #[must_use]
    pub fn new(
        session_id: SessionId,
        step_number: u32,
        question_id: impl Into<String>,
        answer: impl Into<String>,
        notes: Option<String>,
    ) -> Self {
        Self {
            id: StepRecordId::new(),
            session_id,
            step_number,
            question_id: question_id.into(),
            answer: answer.into(),
            notes,
            updated_at: Utc::now(),
        }
    }
}

/// Immutable snapshot of one generated compliance letter.
///
/// Append-only: every send produces a new record, so a session's document
/// list is its full letter history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub session_id: SessionId,
    pub doc_type: DocumentType,
    /// Full form snapshot of the stage that produced the letter.
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl DocumentRecord {
    #[must_use]
    pub fn new(session_id: SessionId, doc_type: DocumentType, payload: serde_json::Value) -> Self {
        Self {
            id: DocumentId::new(),
            session_id,
            doc_type,
            payload,
            created_at: Utc::now(),
            sent_at: None,
        }
    }

    /// Mark the letter as sent now.
    #[must_use]
    pub fn sent(mut self) -> Self {
        self.sent_at = Some(Utc::now());
        self
    }
}

/// One compliance-relevant action, hash-chained to its predecessor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditEventId,
    pub session_id: SessionId,
    pub actor_id: String,
    pub action: String,
    pub detail: Metadata,
    pub client_fingerprint: String,
    pub created_at: DateTime<Utc>,
    pub prev_hash: [u8; 32],
    pub hash: [u8; 32],
}

/// Read-only export join of one session and everything recorded under it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentRecord {
    pub session: Session,
    pub steps: Vec<StepRecord>,
    pub documents: Vec<DocumentRecord>,
    pub audit: Vec<AuditEntry>,
    /// Result of walking the audit hash chain at export time.
    pub audit_chain_intact: bool,
    /// Hex chain head, for attaching to the exported report.
    pub audit_chain_head: Option<String>,
}
