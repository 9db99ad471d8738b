use std::fmt;

use gray_tags::ParsedTags;
use serde::{Deserialize, Serialize};

/// Event kind. Doubles as the role a graylist rule grants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Alert,
    Blackout,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Alert => "alert",
            EventKind::Blackout => "blackout",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity asserted by the ingesting agent through the reserved channel.
/// Only ever constructed complete.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReporterIdentity {
    pub host: String,
    pub external_id: String,
    pub customer_prefix: String,
}

impl ReporterIdentity {
    pub fn new(
        host: impl Into<String>,
        external_id: impl Into<String>,
        customer_prefix: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            external_id: external_id.into(),
            customer_prefix: customer_prefix.into(),
        }
    }
}

/// Outcome of one reconciliation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Bypass,
    SelfMatch,
    Delegated,
    RuleMatch,
    Impersonated,
    Rejected,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Bypass => "BYPASS",
            Decision::SelfMatch => "SELF_MATCH",
            Decision::Delegated => "DELEGATED",
            Decision::RuleMatch => "RULE_MATCH",
            Decision::Impersonated => "IMPERSONATED",
            Decision::Rejected => "REJECTED",
        }
    }

    pub fn is_accept(&self) -> bool {
        !matches!(self, Decision::Rejected)
    }

    /// Outcomes the host pipeline is expected to audit.
    pub fn is_notable(&self) -> bool {
        matches!(
            self,
            Decision::RuleMatch | Decision::Impersonated | Decision::Rejected
        )
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full result. `tags` is `None` exactly when the decision is REJECTED.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReconciliationResult {
    pub decision: Decision,
    pub tags: Option<ParsedTags>,
    pub reason: String,
    /// Id of the admitting rule, for RULE_MATCH.
    pub rule_id: Option<String>,
}

impl ReconciliationResult {
    pub fn bypass(tags: ParsedTags, reason: impl Into<String>) -> Self {
        Self {
            decision: Decision::Bypass,
            tags: Some(tags),
            reason: reason.into(),
            rule_id: None,
        }
    }

    pub fn accept(decision: Decision, tags: ParsedTags, reason: impl Into<String>) -> Self {
        debug_assert!(decision.is_accept());
        Self {
            decision,
            tags: Some(tags),
            reason: reason.into(),
            rule_id: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            decision: Decision::Rejected,
            tags: None,
            reason: reason.into(),
            rule_id: None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.decision == Decision::Rejected
    }
}
