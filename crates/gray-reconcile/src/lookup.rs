//! Graylist rule boundary.
//!
//! The rule store lives outside this crate. The engine only consumes
//! [`FilterLookup::find`], once per reconciliation, and treats the returned
//! rules as an immutable, order-significant snapshot (lookup order is
//! precedence).
//!
//! [`StaticFilterStore`] is the in-process implementation used by the CLI and
//! tests: a fixed rule list loaded from JSON.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::EventKind;

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// A rule as stored. `attributes` stays untyped until the engine needs it, so
/// one malformed rule cannot poison the whole lookup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraylistRule {
    pub id: String,
    pub environment: String,
    #[serde(rename = "type")]
    pub rule_type: String,
    #[serde(default)]
    pub attributes: Value,
}

impl GraylistRule {
    pub fn new(
        id: impl Into<String>,
        environment: impl Into<String>,
        rule_type: impl Into<String>,
        attributes: Value,
    ) -> Self {
        Self {
            id: id.into(),
            environment: environment.into(),
            rule_type: rule_type.into(),
            attributes,
        }
    }

    /// Parse the typed attributes. Missing `host`/`roles`, a non-string host
    /// or an unknown role make the rule unusable.
    pub fn attributes(&self) -> Result<GrayAttributes, MalformedRule> {
        GrayAttributes::deserialize(&self.attributes).map_err(|e| MalformedRule {
            rule_id: self.id.clone(),
            reason: e.to_string(),
        })
    }
}

/// Typed view over a rule's attributes.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct GrayAttributes {
    pub host: String,
    pub roles: BTreeSet<EventKind>,
    /// Opaque to the engine (ticket references and the like).
    #[serde(default)]
    pub metadata: Value,
}

impl GrayAttributes {
    pub fn allows(&self, reporter_host: &str, kind: EventKind) -> bool {
        self.host == reporter_host && self.roles.contains(&kind)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A rule whose attributes do not parse. Non-fatal: the rule is skipped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MalformedRule {
    pub rule_id: String,
    pub reason: String,
}

impl fmt::Display for MalformedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "graylist rule '{}' has invalid attributes: {}",
            self.rule_id, self.reason
        )
    }
}

impl std::error::Error for MalformedRule {}

/// The rule store could not be read. Treated the same as "no rules".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LookupError {
    pub message: String,
}

impl LookupError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "filter lookup failed: {}", self.message)
    }
}

impl std::error::Error for LookupError {}

// ---------------------------------------------------------------------------
// Lookup boundary
// ---------------------------------------------------------------------------

/// Read-only access to the external rule store.
///
/// # Contract
/// Returns the candidate rules for `environment` and `rule_type` in
/// precedence order. Implementations must not depend on call ordering across
/// events; the engine may call `find` from many threads at once.
pub trait FilterLookup: Send + Sync {
    fn find(&self, environment: &str, rule_type: &str) -> Result<Vec<GraylistRule>, LookupError>;
}

impl<T: FilterLookup + ?Sized> FilterLookup for Arc<T> {
    fn find(&self, environment: &str, rule_type: &str) -> Result<Vec<GraylistRule>, LookupError> {
        (**self).find(environment, rule_type)
    }
}

impl<T: FilterLookup + ?Sized> FilterLookup for &T {
    fn find(&self, environment: &str, rule_type: &str) -> Result<Vec<GraylistRule>, LookupError> {
        (**self).find(environment, rule_type)
    }
}

/// Fixed, insertion-ordered rule snapshot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StaticFilterStore {
    rules: Vec<GraylistRule>,
}

impl StaticFilterStore {
    pub fn new(rules: Vec<GraylistRule>) -> Self {
        Self { rules }
    }

    /// Load from a JSON array of rules. Rule *attributes* are not validated
    /// here; that happens per use.
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        let rules: Vec<GraylistRule> = serde_json::from_str(raw)?;
        Ok(Self::new(rules))
    }

    pub fn rules(&self) -> &[GraylistRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FilterLookup for StaticFilterStore {
    fn find(&self, environment: &str, rule_type: &str) -> Result<Vec<GraylistRule>, LookupError> {
        Ok(self
            .rules
            .iter()
            .filter(|r| r.environment == environment && r.rule_type == rule_type)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_attributes_are_malformed() {
        let r = GraylistRule::new("f1", "Development", "graylist", json!({}));
        let err = r.attributes().unwrap_err();
        assert_eq!(err.rule_id, "f1");
        assert!(err.reason.contains("host"), "{err}");
    }

    #[test]
    fn unknown_role_is_malformed() {
        let r = GraylistRule::new(
            "f2",
            "Development",
            "graylist",
            json!({"host": "h", "roles": ["alert", "page"]}),
        );
        assert!(r.attributes().is_err());
    }

    #[test]
    fn metadata_is_optional_and_opaque() {
        let r = GraylistRule::new(
            "f3",
            "Development",
            "graylist",
            json!({"host": "h", "roles": ["blackout"], "metadata": {"ticket": "OPS-31"}}),
        );
        let a = r.attributes().unwrap();
        assert!(a.allows("h", EventKind::Blackout));
        assert!(!a.allows("h", EventKind::Alert));
        assert_eq!(a.metadata["ticket"], "OPS-31");
    }

    #[test]
    fn store_filters_by_environment_and_type_in_order() {
        let store = StaticFilterStore::new(vec![
            GraylistRule::new("a", "Production", "graylist", Value::Null),
            GraylistRule::new("b", "Development", "graylist", Value::Null),
            GraylistRule::new("c", "Production", "blocklist", Value::Null),
            GraylistRule::new("d", "Production", "graylist", Value::Null),
        ]);
        let ids: Vec<String> = store
            .find("Production", "graylist")
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["a".to_string(), "d".to_string()]);
    }
}
