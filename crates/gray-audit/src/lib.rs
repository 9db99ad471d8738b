//! gray-audit
//!
//! Append-only JSON Lines log of admission decisions. With the hash chain on,
//! every record carries `hash_prev` (the previous record's `hash_self`) and
//! `hash_self` (SHA-256 over its own canonical JSON), so edits, deletions and
//! reordering are caught by [`verify_hash_chain`].

mod record;
mod verify;
mod writer;

pub use record::{compute_event_hash, derive_event_id, AuditEvent};
pub use verify::{verify_hash_chain, verify_hash_chain_str, VerifyResult};
pub use writer::{AuditWriter, ADMISSION_TOPIC};
