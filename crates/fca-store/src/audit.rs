//! Hash-chained audit trail
//!
//! Audit entries are append-only and write-only from the application's
//! perspective; the only read path is export. Each entry carries the SHA-256
//! of its predecessor, so a dropped or rewritten entry is detectable when the
//! chain is walked at export time.

use crate::types::{AuditEntry, AuditEventId, Metadata, SessionId};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// An audit entry before it is sealed into the chain
#[derive(Debug, Clone)]
pub struct AuditDraft {
    pub session_id: SessionId,
    pub actor_id: String,
    pub action: String,
    pub detail: Metadata,
    pub client_fingerprint: String,
}

impl AuditDraft {
    #[must_use]
    pub fn new(
        session_id: SessionId,
        actor_id: impl Into<String>,
        action: impl Into<String>,
        detail: Metadata,
        client_fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            session_id,
            actor_id: actor_id.into(),
            action: action.into(),
            detail,
            client_fingerprint: client_fingerprint.into(),
        }
    }
}

/// Seal a draft onto the chain whose head is `prev_hash`.
#[must_use]
pub fn seal_entry(draft: AuditDraft, prev_hash: [u8; 32]) -> AuditEntry {
    let mut entry = AuditEntry {
        id: AuditEventId::new(),
        session_id: draft.session_id,
        actor_id: draft.actor_id,
        action: draft.action,
        detail: draft.detail,
        client_fingerprint: draft.client_fingerprint,
        created_at: Utc::now(),
        prev_hash,
        hash: [0u8; 32],
    };
    entry.hash = compute_hash(&entry);
    entry
}

/// Walk a chain in append order and confirm every link.
#[must_use]
pub fn verify_chain(entries: &[AuditEntry]) -> bool {
    let mut prev = [0u8; 32];
    for entry in entries {
        if entry.prev_hash != prev || entry.hash != compute_hash(entry) {
            return false;
        }
        prev = entry.hash;
    }
    true
}

fn compute_hash(entry: &AuditEntry) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(entry.id.0.as_bytes());
    hasher.update(entry.session_id.0.to_bytes());
    hasher.update(entry.actor_id.as_bytes());
    hasher.update([0]);
    hasher.update(entry.action.as_bytes());
    hasher.update([0]);
    hasher.update(detail_bytes(&entry.detail, entry.created_at));
    hasher.update(entry.client_fingerprint.as_bytes());
    hasher.update(entry.prev_hash);
    hasher.finalize().into()
}

fn detail_bytes(detail: &Metadata, created_at: DateTime<Utc>) -> Vec<u8> {
    let mut bytes = serde_json::to_vec(detail).unwrap_or_default();
    bytes.extend_from_slice(created_at.to_rfc3339().as_bytes());
    bytes
}

/// Hex rendering of a chain hash, for export and logs.
#[must_use]
pub fn hash_hex(hash: &[u8; 32]) -> String {
    hex::encode(hash)
}
