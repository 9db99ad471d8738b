use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::record::{compute_event_hash, AuditEvent};

/// Outcome of walking a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    Valid { lines: usize },
    /// First broken line (1-based).
    Broken { line: usize, reason: String },
}

impl VerifyResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerifyResult::Valid { .. })
    }
}

/// Non-blank lines of a log as (1-based line number, record).
pub(crate) fn read_records(
    content: &str,
) -> impl Iterator<Item = Result<(usize, AuditEvent)>> + '_ {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| -> Result<(usize, AuditEvent)> {
            let ev = AuditEvent::from_line(line.trim())
                .with_context(|| format!("parse audit event at line {}", i + 1))?;
            Ok((i + 1, ev))
        })
}

pub fn verify_hash_chain(path: impl AsRef<Path>) -> Result<VerifyResult> {
    let path = path.as_ref();
    let content =
        fs::read_to_string(path).with_context(|| format!("read audit log {}", path.display()))?;
    verify_hash_chain_str(&content)
}

/// Each record must link to its predecessor's `hash_self` and, when sealed,
/// hash to its own `hash_self`. Unsealed records are only checked for links.
pub fn verify_hash_chain_str(content: &str) -> Result<VerifyResult> {
    let mut head: Option<String> = None;
    let mut lines = 0usize;

    for record in read_records(content) {
        let (line, ev) = record?;
        lines += 1;

        if ev.hash_prev != head {
            return Ok(VerifyResult::Broken {
                line,
                reason: format!(
                    "hash_prev mismatch: expected {:?}, got {:?}",
                    head, ev.hash_prev
                ),
            });
        }
        if let Some(sealed) = ev.hash_self.as_deref() {
            let actual = compute_event_hash(&ev)?;
            if sealed != actual {
                return Ok(VerifyResult::Broken {
                    line,
                    reason: format!("hash_self mismatch: claimed {sealed}, recomputed {actual}"),
                });
            }
        }
        head = ev.hash_self;
    }

    Ok(VerifyResult::Valid { lines })
}
