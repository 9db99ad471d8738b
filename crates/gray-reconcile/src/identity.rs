//! Reporter identity extraction and the claimed-identity view.

use std::collections::BTreeMap;

use gray_config::AdmissionConfig;
use gray_tags::ParsedTags;
use http::HeaderMap;

use crate::ReporterIdentity;

/// Channel the reporter identity is read from.
#[derive(Clone, Copy, Debug)]
pub enum ReporterSource<'a> {
    /// Reserved keys inside the event's own tags.
    Tags,
    /// Reserved request headers supplied by the ingestion API.
    Headers(&'a HeaderMap),
}

/// Pull the reporter identity from `source`.
///
/// Returns `None` unless all three fields are present; callers must then pass
/// the event through untouched. A present but empty value is still present.
pub fn extract(
    parsed: &ParsedTags,
    source: ReporterSource<'_>,
    config: &AdmissionConfig,
) -> Option<ReporterIdentity> {
    match source {
        ReporterSource::Tags => {
            let keys = &config.reporter_keys;
            let field = |key: &str| parsed.value(key);
            Some(ReporterIdentity::new(
                field(&keys.host)?,
                field(&keys.external_id)?,
                field(&keys.customer_prefix)?,
            ))
        }
        ReporterSource::Headers(headers) => {
            let names = &config.reporter_headers;
            let field = |name: &str| {
                headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(str::trim)
            };
            Some(ReporterIdentity::new(
                field(&names.host)?,
                field(&names.external_id)?,
                field(&names.customer_prefix)?,
            ))
        }
    }
}

/// Claimed identity: the event's ordinary tags restricted to the configured
/// host, target-host and customer keys. `None` marks an absent or valueless key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClaimedIdentity {
    pub host: BTreeMap<String, Option<String>>,
    pub target_host: BTreeMap<String, Option<String>>,
    pub external_id: BTreeMap<String, Option<String>>,
    pub customer_prefix: BTreeMap<String, Option<String>>,
}

impl ClaimedIdentity {
    pub fn from_parsed(parsed: &ParsedTags, config: &AdmissionConfig) -> Self {
        let view = |keys: &[String]| -> BTreeMap<String, Option<String>> {
            keys.iter()
                .map(|k| (k.clone(), parsed.value(k).map(str::to_string)))
                .collect()
        };
        Self {
            host: view(&config.host_tags),
            target_host: view(&config.target_host_tags),
            external_id: view(&config.external_id_tags),
            customer_prefix: view(&config.customer_prefix_tags),
        }
    }

    /// Any target-host key is present, valued or not.
    pub fn has_target_host(&self, parsed: &ParsedTags) -> bool {
        self.target_host.keys().any(|k| parsed.contains_key(k))
    }

    /// Every host key equals the reporter host.
    pub fn host_matches(&self, reporter: &ReporterIdentity) -> bool {
        all_equal(&self.host, &reporter.host)
    }

    /// Every customer key equals the reporter's corresponding field.
    pub fn customer_matches(&self, reporter: &ReporterIdentity) -> bool {
        all_equal(&self.external_id, &reporter.external_id)
            && all_equal(&self.customer_prefix, &reporter.customer_prefix)
    }

    /// Customer keys that are present agree with the reporter; absent ones
    /// are not checked.
    pub fn customer_consistent(&self, reporter: &ReporterIdentity) -> bool {
        present_equal(&self.external_id, &reporter.external_id)
            && present_equal(&self.customer_prefix, &reporter.customer_prefix)
    }
}

fn all_equal(fields: &BTreeMap<String, Option<String>>, expected: &str) -> bool {
    fields.values().all(|v| v.as_deref() == Some(expected))
}

fn present_equal(fields: &BTreeMap<String, Option<String>>, expected: &str) -> bool {
    fields
        .values()
        .flatten()
        .all(|v| v == expected)
}
