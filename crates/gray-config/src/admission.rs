//! Typed admission config.
//!
//! Config layout (all keys optional, defaults shown by [`AdmissionConfig::default`]):
//!
//! ```yaml
//! tags:
//!   reporter_prefix: "reporter:"
//!   host: [host]
//!   target_host: [targethost]
//!   external_id: [externalid]
//!   customer_prefix: [customerprefix]
//! reporter:
//!   source: tags            # tags | headers
//!   keys:
//!     host: "reporter:host"
//!     external_id: "reporter:externalid"
//!     customer_prefix: "reporter:customerprefix"
//!   headers:
//!     host: X-Graylist-Reporter-Host
//!     external_id: X-Graylist-Reporter-External-ID
//!     customer_prefix: X-Graylist-Reporter-Customer-Prefix
//! filters:
//!   rule_type: graylist
//! policy:
//!   alert:    { fallback: impersonate, backfill: true,  customer_tags: enforce, plain_host_match: false }
//!   blackout: { fallback: reject,      backfill: false, customer_tags: enforce, plain_host_match: true }
//! ```

use std::collections::BTreeSet;

use anyhow::{bail, Context, Result};
use gray_tags::ReservedTags;
use serde_json::Value;

/// Terminal policy when no self-match, delegation or rule admits the event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Overwrite claimed identity with the reporter's and drop target-host tags.
    Impersonate,
    /// Refuse the event.
    Reject,
}

impl FallbackPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackPolicy::Impersonate => "impersonate",
            FallbackPolicy::Reject => "reject",
        }
    }

    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "impersonate" => Ok(FallbackPolicy::Impersonate),
            "reject" => Ok(FallbackPolicy::Reject),
            other => bail!(
                "CONFIG_INVALID fallback '{}': expected one of: impersonate | reject",
                other
            ),
        }
    }
}

/// What a self-match does with the claimed customer tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CustomerTagPolicy {
    /// Overwrite claimed customer tags with the reporter's.
    Enforce,
    /// Customer tags that are present must equal the reporter's; they are
    /// passed through unchanged. A mismatch falls through to rule lookup.
    Validate,
}

impl CustomerTagPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerTagPolicy::Enforce => "enforce",
            CustomerTagPolicy::Validate => "validate",
        }
    }

    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "enforce" => Ok(CustomerTagPolicy::Enforce),
            "validate" => Ok(CustomerTagPolicy::Validate),
            other => bail!(
                "CONFIG_INVALID customer_tags '{}': expected one of: enforce | validate",
                other
            ),
        }
    }
}

/// Where the reporter-asserted identity is read from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentitySource {
    Tags,
    Headers,
}

impl IdentitySource {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "tags" => Ok(IdentitySource::Tags),
            "headers" => Ok(IdentitySource::Headers),
            other => bail!(
                "CONFIG_INVALID reporter.source '{}': expected one of: tags | headers",
                other
            ),
        }
    }
}

/// Per event-kind reconciliation policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KindPolicy {
    pub fallback: FallbackPolicy,
    /// Copy reporter identity into absent claimed host/customer tags first.
    pub backfill: bool,
    pub customer_tags: CustomerTagPolicy,
    /// A plain tag equal to the reporter host counts as a host match.
    pub plain_host_match: bool,
}

impl KindPolicy {
    pub fn alert_default() -> Self {
        Self {
            fallback: FallbackPolicy::Impersonate,
            backfill: true,
            customer_tags: CustomerTagPolicy::Enforce,
            plain_host_match: false,
        }
    }

    pub fn blackout_default() -> Self {
        Self {
            fallback: FallbackPolicy::Reject,
            backfill: false,
            customer_tags: CustomerTagPolicy::Enforce,
            plain_host_match: true,
        }
    }

    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }
}

/// Names of the three reporter identity fields in some namespace
/// (reserved tag keys or request header names).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReporterFieldNames {
    pub host: String,
    pub external_id: String,
    pub customer_prefix: String,
}

impl ReporterFieldNames {
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

    pub fn all(&self) -> [&str; 3] {
        [&self.host, &self.external_id, &self.customer_prefix]
    }
}

/// Immutable engine configuration, injected at construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdmissionConfig {
    pub reporter_prefix: String,
    pub host_tags: Vec<String>,
    pub target_host_tags: Vec<String>,
    pub external_id_tags: Vec<String>,
    pub customer_prefix_tags: Vec<String>,
    pub reporter_keys: ReporterFieldNames,
    pub reporter_headers: ReporterFieldNames,
    pub identity_source: IdentitySource,
    pub rule_type: String,
    pub alert: KindPolicy,
    pub blackout: KindPolicy,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            reporter_prefix: "reporter:".to_string(),
            host_tags: vec!["host".to_string()],
            target_host_tags: vec!["targethost".to_string()],
            external_id_tags: vec!["externalid".to_string()],
            customer_prefix_tags: vec!["customerprefix".to_string()],
            reporter_keys: ReporterFieldNames::new(
                "reporter:host",
                "reporter:externalid",
                "reporter:customerprefix",
            ),
            reporter_headers: ReporterFieldNames::new(
                "X-Graylist-Reporter-Host",
                "X-Graylist-Reporter-External-ID",
                "X-Graylist-Reporter-Customer-Prefix",
            ),
            identity_source: IdentitySource::Tags,
            rule_type: "graylist".to_string(),
            alert: KindPolicy::alert_default(),
            blackout: KindPolicy::blackout_default(),
        }
    }
}

impl AdmissionConfig {
    /// Build from canonical config JSON (produced by [`crate::load_layered_yaml`]).
    pub fn from_config_json(cfg: &Value) -> Result<Self> {
        let d = Self::default();

        let reporter_keys = ReporterFieldNames::new(
            str_at(cfg, "/reporter/keys/host")?.unwrap_or(d.reporter_keys.host),
            str_at(cfg, "/reporter/keys/external_id")?.unwrap_or(d.reporter_keys.external_id),
            str_at(cfg, "/reporter/keys/customer_prefix")?
                .unwrap_or(d.reporter_keys.customer_prefix),
        );
        let reporter_headers = ReporterFieldNames::new(
            str_at(cfg, "/reporter/headers/host")?.unwrap_or(d.reporter_headers.host),
            str_at(cfg, "/reporter/headers/external_id")?
                .unwrap_or(d.reporter_headers.external_id),
            str_at(cfg, "/reporter/headers/customer_prefix")?
                .unwrap_or(d.reporter_headers.customer_prefix),
        );
        let identity_source = match str_at(cfg, "/reporter/source")? {
            Some(s) => IdentitySource::parse(&s)?,
            None => d.identity_source,
        };

        let out = Self {
            reporter_prefix: str_at(cfg, "/tags/reporter_prefix")?.unwrap_or(d.reporter_prefix),
            host_tags: list_at(cfg, "/tags/host")?.unwrap_or(d.host_tags),
            target_host_tags: list_at(cfg, "/tags/target_host")?.unwrap_or(d.target_host_tags),
            external_id_tags: list_at(cfg, "/tags/external_id")?.unwrap_or(d.external_id_tags),
            customer_prefix_tags: list_at(cfg, "/tags/customer_prefix")?
                .unwrap_or(d.customer_prefix_tags),
            reporter_keys,
            reporter_headers,
            identity_source,
            rule_type: str_at(cfg, "/filters/rule_type")?.unwrap_or(d.rule_type),
            alert: kind_policy_at(cfg, "/policy/alert", d.alert)?,
            blackout: kind_policy_at(cfg, "/policy/blackout", d.blackout)?,
        };

        out.validate()?;
        Ok(out)
    }

    /// Structural checks. Called by [`Self::from_config_json`]; call it again
    /// after building a config by hand.
    pub fn validate(&self) -> Result<()> {
        if self.reporter_prefix.trim().is_empty() {
            bail!("CONFIG_INVALID tags.reporter_prefix must not be empty");
        }
        for (name, keys) in [
            ("tags.host", &self.host_tags),
            ("tags.target_host", &self.target_host_tags),
            ("tags.external_id", &self.external_id_tags),
            ("tags.customer_prefix", &self.customer_prefix_tags),
        ] {
            if keys.is_empty() || keys.iter().any(|k| k.trim().is_empty()) {
                bail!("CONFIG_INVALID {} must be a non-empty list of non-empty keys", name);
            }
        }

        let claimed: BTreeSet<&str> = self.claimed_keys().collect();
        for key in self.reporter_keys.all() {
            if key.trim().is_empty() {
                bail!("CONFIG_INVALID reporter.keys entries must not be empty");
            }
            if claimed.contains(key) {
                bail!(
                    "CONFIG_INVALID reporter key '{}' collides with a claimed identity tag",
                    key
                );
            }
        }
        let distinct: BTreeSet<&str> = self.reporter_keys.all().into_iter().collect();
        if distinct.len() != 3 {
            bail!("CONFIG_INVALID reporter.keys must be three distinct keys");
        }
        for key in claimed {
            if key.starts_with(&self.reporter_prefix) {
                bail!(
                    "CONFIG_INVALID claimed identity tag '{}' starts with the reserved prefix '{}'",
                    key,
                    self.reporter_prefix
                );
            }
        }

        if self
            .reporter_headers
            .all()
            .iter()
            .any(|h| http_header_name_invalid(h))
        {
            bail!("CONFIG_INVALID reporter.headers entries must be valid header names");
        }
        if self.rule_type.trim().is_empty() {
            bail!("CONFIG_INVALID filters.rule_type must not be empty");
        }
        Ok(())
    }

    /// Every tag key that makes up the claimed identity.
    pub fn claimed_keys(&self) -> impl Iterator<Item = &str> {
        self.host_tags
            .iter()
            .chain(&self.target_host_tags)
            .chain(&self.external_id_tags)
            .chain(&self.customer_prefix_tags)
            .map(String::as_str)
    }

    /// The strip rule applied to every accepted event.
    pub fn reserved_tags(&self) -> ReservedTags {
        ReservedTags::new(self.reporter_prefix.clone(), self.reporter_keys.all())
    }
}

/// RFC 7230 token check, enough to catch typos before the first request.
fn http_header_name_invalid(name: &str) -> bool {
    name.is_empty()
        || !name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}

fn str_at(cfg: &Value, ptr: &str) -> Result<Option<String>> {
    match cfg.pointer(ptr) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => bail!("CONFIG_INVALID {} must be a string, got {}", ptr, other),
    }
}

fn bool_at(cfg: &Value, ptr: &str) -> Result<Option<bool>> {
    match cfg.pointer(ptr) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(other) => bail!("CONFIG_INVALID {} must be a boolean, got {}", ptr, other),
    }
}

/// A list of keys; a single string is accepted as a one-element list.
fn list_at(cfg: &Value, ptr: &str) -> Result<Option<Vec<String>>> {
    match cfg.pointer(ptr) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(vec![s.clone()])),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .with_context(|| format!("CONFIG_INVALID {} entries must be strings", ptr))
            })
            .collect::<Result<Vec<_>>>()
            .map(Some),
        Some(other) => bail!("CONFIG_INVALID {} must be a list of strings, got {}", ptr, other),
    }
}

fn kind_policy_at(cfg: &Value, base: &str, default: KindPolicy) -> Result<KindPolicy> {
    let fallback = match str_at(cfg, &format!("{base}/fallback"))? {
        Some(s) => FallbackPolicy::parse(&s)?,
        None => default.fallback,
    };
    let customer_tags = match str_at(cfg, &format!("{base}/customer_tags"))? {
        Some(s) => CustomerTagPolicy::parse(&s)?,
        None => default.customer_tags,
    };
    Ok(KindPolicy {
        fallback,
        backfill: bool_at(cfg, &format!("{base}/backfill"))?.unwrap_or(default.backfill),
        customer_tags,
        plain_host_match: bool_at(cfg, &format!("{base}/plain_host_match"))?
            .unwrap_or(default.plain_host_match),
    })
}
