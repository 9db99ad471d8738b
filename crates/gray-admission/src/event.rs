use std::fmt;

use gray_reconcile::{Decision, EventKind};
use serde::{Deserialize, Serialize};

/// An inbound alert or blackout as the ingestion API hands it over.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub environment: String,
    pub kind: EventKind,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Event {
    pub fn new<I, S>(
        id: impl Into<String>,
        environment: impl Into<String>,
        kind: EventKind,
        tags: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            environment: environment.into(),
            kind,
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }
}

/// An admitted event plus what the engine decided, for audit and notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Admitted {
    pub event: Event,
    pub decision: Decision,
    pub reason: String,
    pub rule_id: Option<String>,
}

/// The event must not be persisted. Callers surface this as a client-visible
/// admission error (HTTP 403 at the ingestion API).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AdmissionRejected {
    pub event_id: String,
    pub reason: String,
}

impl fmt::Display for AdmissionRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event '{}' rejected: {}", self.event_id, self.reason)
    }
}

impl std::error::Error for AdmissionRejected {}
