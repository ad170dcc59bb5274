//! Notification collaborator seam
//!
//! The compliance letter must be sent, and the send must succeed, before any
//! document record is persisted for a stage. The sender itself (mail, portal
//! message) lives outside this core.

use async_trait::async_trait;
use fca_store::DocumentType;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A rendered compliance letter ready to send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LetterPayload {
    pub doc_type: DocumentType,
    pub subject: String,
    /// Full form snapshot of the stage the letter is generated from.
    pub body: serde_json::Value,
}

impl LetterPayload {
    #[must_use]
    pub fn new(doc_type: DocumentType, body: serde_json::Value) -> Self {
        Self {
            doc_type,
            subject: subject_for(doc_type).to_string(),
            body,
        }
    }
}

fn subject_for(doc_type: DocumentType) -> &'static str {
    match doc_type {
        DocumentType::OfferLetter => "Conditional offer of employment",
        DocumentType::Assessment => "Individualized assessment",
        DocumentType::RevocationNotice => "Preliminary notice of offer revocation",
        DocumentType::Reassessment => "Individualized reassessment",
        DocumentType::FinalRevocation => "Final decision notice",
    }
}

/// Notification send failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    /// The collaborator rejected the recipient address
    #[error("recipient address rejected: {0}")]
    BadRecipient(String),

    /// Delivery failed
    #[error("delivery failed: {0}")]
    SendFailed(String),
}

/// External letter delivery seam.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSender: Debug + Send + Sync {
    /// Deliver `letter` to `recipient`. Must succeed before any document
    /// record is persisted for the stage.
    async fn send(&self, letter: &LetterPayload, recipient: &str) -> Result<(), NotifyError>;
}
