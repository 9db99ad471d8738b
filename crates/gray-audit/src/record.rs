use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Namespace for deterministic `event_id` derivation.
const EVENT_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6a1e_52c4_8f0b_4c59_9d27_3b8e_e1f0_7a11);

/// One line of the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub run_id: Uuid,
    pub ts_utc: DateTime<Utc>,
    pub topic: String,
    pub event_type: String,
    pub payload: Value,
    pub hash_prev: Option<String>,
    pub hash_self: Option<String>,
}

impl AuditEvent {
    pub(crate) fn to_line(&self) -> Result<String> {
        let value = serde_json::to_value(self).context("serialize audit event failed")?;
        Ok(canonical(&value))
    }

    pub(crate) fn from_line(line: &str) -> Result<Self> {
        serde_json::from_str(line).context("audit line is not a valid event")
    }
}

/// SHA-256 (hex) over the canonical record with `hash_self` cleared.
pub fn compute_event_hash(ev: &AuditEvent) -> Result<String> {
    let unsealed = AuditEvent {
        hash_self: None,
        ..ev.clone()
    };
    let digest = Sha256::digest(unsealed.to_line()?.as_bytes());
    Ok(hex::encode(digest))
}

/// UUIDv5 over (previous hash, canonical payload, sequence). The same chain
/// state and payload always yield the same id.
pub fn derive_event_id(last_hash: Option<&str>, payload: &Value, seq: u64) -> Result<Uuid> {
    let name = format!(
        "{}|{}|{}",
        last_hash.unwrap_or("GENESIS"),
        canonical(payload),
        seq
    );
    Ok(Uuid::new_v5(&EVENT_ID_NAMESPACE, name.as_bytes()))
}

/// Compact JSON with object keys sorted at every depth.
fn canonical(v: &Value) -> String {
    sorted(v).to_string()
}

fn sorted(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sorted(v)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}
