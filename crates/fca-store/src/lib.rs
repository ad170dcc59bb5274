//! FCA Store - Authoritative assessment tracking
//!
//! The canonical side of the two-tier persistence model:
//! - Table-like store seam over sessions, step records, document records,
//!   and an append-only audit log
//! - Session/audit service with an explicit session handle per
//!   (employer, candidate) pair
//! - Safe tracking facade that degrades every failure to a logged no-op so
//!   nothing raises into presentation code
//!
//! # Example
//!
//! ```rust,ignore
//! use fca_store::{AssessmentService, MemoryStore, ServiceConfig};
//! use std::sync::Arc;
//!
//! let service = AssessmentService::new(Arc::new(MemoryStore::new()), ServiceConfig::default());
//! let handle = service.get_or_create(&employer, &candidate).await?;
//! service.save_step(&handle, 1, "q_duties", "forklift operation", None).await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod audit;
pub mod error;
pub mod facade;
pub mod service;
pub mod store;
pub mod types;

pub use audit::{seal_entry, verify_chain, AuditDraft};
pub use error::StoreError;
pub use facade::SafeTracking;
pub use service::{AssessmentService, ServiceConfig, SessionHandle};
pub use store::{AssessmentStore, MemoryStore};
pub use types::{
    AssessmentRecord, AuditEntry, AuditEventId, CandidateId, Decision, DocumentId,
    DocumentRecord, DocumentType, EmployerId, MacroStage, Metadata, Session, SessionId,
    StepRecord, StepRecordId,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
