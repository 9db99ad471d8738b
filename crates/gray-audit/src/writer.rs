use anyhow::{Context, Result};
use chrono::Utc;
use gray_admission::Event;
use gray_reconcile::Decision;
use serde_json::{json, Value};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::record::{compute_event_hash, derive_event_id, AuditEvent};
use crate::verify::read_records;

/// Topic for every record written by [`AuditWriter::record_decision`].
pub const ADMISSION_TOPIC: &str = "ADMISSION";

/// Appends records to one JSONL file and tracks the chain head.
pub struct AuditWriter {
    path: PathBuf,
    hash_chain: bool,
    last_hash: Option<String>,
    /// Records appended so far; feeds `event_id` derivation.
    seq: u64,
}

impl AuditWriter {
    /// Start a fresh chain at `path`, creating parent directories.
    pub fn new(path: impl AsRef<Path>, hash_chain: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("create audit directory {}", dir.display()))?;
        }
        Ok(Self {
            path,
            hash_chain,
            last_hash: None,
            seq: 0,
        })
    }

    /// Continue the log at `path`: the chain head and sequence are restored
    /// from its last record. A missing file starts a fresh chain.
    pub fn resume(path: impl AsRef<Path>, hash_chain: bool) -> Result<Self> {
        let mut writer = Self::new(path, hash_chain)?;
        if writer.path.exists() {
            let content = fs::read_to_string(&writer.path)
                .with_context(|| format!("read audit log {}", writer.path.display()))?;
            for record in read_records(&content) {
                let (_, ev) = record?;
                writer.last_hash = ev.hash_self;
                writer.seq += 1;
            }
        }
        Ok(writer)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn set_last_hash(&mut self, last_hash: Option<String>) {
        self.last_hash = last_hash;
    }

    pub fn last_hash(&self) -> Option<String> {
        self.last_hash.clone()
    }

    /// Restore together with [`AuditWriter::set_last_hash`].
    pub fn set_seq(&mut self, seq: u64) {
        self.seq = seq;
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn append(
        &mut self,
        run_id: Uuid,
        topic: &str,
        event_type: &str,
        payload: Value,
    ) -> Result<AuditEvent> {
        let mut ev = AuditEvent {
            event_id: derive_event_id(self.last_hash.as_deref(), &payload, self.seq)?,
            run_id,
            ts_utc: Utc::now(),
            topic: topic.to_string(),
            event_type: event_type.to_string(),
            payload,
            hash_prev: None,
            hash_self: None,
        };
        if self.hash_chain {
            ev.hash_prev = self.last_hash.clone();
            ev.hash_self = Some(compute_event_hash(&ev)?);
        }

        self.write_line(&ev.to_line()?)?;

        // The head only moves once the line is on disk.
        self.seq += 1;
        if self.hash_chain {
            self.last_hash = ev.hash_self.clone();
        }
        Ok(ev)
    }

    /// Record one admission outcome under [`ADMISSION_TOPIC`], with the
    /// decision as the event type. `event` is the admitted event, or the
    /// submitted one for a rejection.
    pub fn record_decision(
        &mut self,
        run_id: Uuid,
        event: &Event,
        decision: Decision,
        reason: &str,
        rule_id: Option<&str>,
    ) -> Result<AuditEvent> {
        let payload = json!({
            "event_id": event.id,
            "environment": event.environment,
            "kind": event.kind,
            "decision": decision,
            "reason": reason,
            "rule_id": rule_id,
            "tags": event.tags,
        });
        self.append(run_id, ADMISSION_TOPIC, decision.as_str(), payload)
    }

    fn write_line(&self, line: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open audit log {}", self.path.display()))?;
        writeln!(file, "{line}")
            .with_context(|| format!("append to audit log {}", self.path.display()))
    }
}
