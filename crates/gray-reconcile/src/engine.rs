use gray_config::{AdmissionConfig, CustomerTagPolicy, FallbackPolicy, KindPolicy};
use gray_tags::{ParsedTags, ReservedTags};
use tracing::{debug, warn};

use crate::{
    ClaimedIdentity, Decision, EventKind, FilterLookup, GraylistRule, ReconciliationResult,
    ReporterIdentity,
};

/// One event, ready for reconciliation. The reporter identity is complete by
/// construction; incomplete identities are bypassed before this point.
#[derive(Clone, Debug)]
pub struct ReconcileInput<'a> {
    pub event_id: &'a str,
    pub environment: &'a str,
    pub kind: EventKind,
    pub tags: ParsedTags,
    pub reporter: &'a ReporterIdentity,
}

/// The reconciliation engine.
///
/// Holds only immutable configuration, so one instance can be shared across
/// threads and reconcile any number of events concurrently.
#[derive(Clone, Debug)]
pub struct Reconciler {
    config: AdmissionConfig,
    reserved: ReservedTags,
}

impl Reconciler {
    pub fn new(config: AdmissionConfig) -> Self {
        let reserved = config.reserved_tags();
        Self { config, reserved }
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// The strip rule applied to every accepted tag set.
    pub fn reserved(&self) -> &ReservedTags {
        &self.reserved
    }

    pub fn policy_for(&self, kind: EventKind) -> KindPolicy {
        match kind {
            EventKind::Alert => self.config.alert,
            EventKind::Blackout => self.config.blackout,
        }
    }

    /// Single pass, terminal on the first matching branch:
    ///
    /// 1. backfill absent claimed host/customer tags (if the kind's policy says
    ///    so and its fallback is impersonate)
    /// 2. target-host present: DELEGATED iff every host and customer tag equals
    ///    the reporter's; otherwise go to 4
    /// 3. no target-host: SELF_MATCH iff the claimed host equals the reporter
    ///    host (customer tags enforced or validated per policy); otherwise go to 4
    /// 4. first usable rule for the reporter host and event role: RULE_MATCH
    /// 5. fallback: IMPERSONATED or REJECTED
    ///
    /// Reserved tags are stripped from every accepted tag set.
    pub fn reconcile(
        &self,
        input: ReconcileInput<'_>,
        lookup: &dyn FilterLookup,
    ) -> ReconciliationResult {
        let ReconcileInput {
            event_id,
            environment,
            kind,
            mut tags,
            reporter,
        } = input;
        let policy = self.policy_for(kind);

        if backfills(policy) {
            self.backfill(&mut tags, reporter);
        }

        let claimed = ClaimedIdentity::from_parsed(&tags, &self.config);

        if claimed.has_target_host(&tags) {
            if claimed.host_matches(reporter) && claimed.customer_matches(reporter) {
                return self.accept(
                    Decision::Delegated,
                    tags,
                    format!(
                        "reporter '{}' routed {} to target host with unmodified own identity",
                        reporter.host, kind
                    ),
                );
            }
            debug!(
                event_id,
                reporter_host = %reporter.host,
                "target-host event carries modified identity; checking graylist"
            );
        } else if self.host_self_matches(&claimed, &tags, reporter, policy) {
            match policy.customer_tags {
                CustomerTagPolicy::Enforce => {
                    self.overwrite_customer(&mut tags, reporter);
                    return self.accept(
                        Decision::SelfMatch,
                        tags,
                        format!(
                            "claimed host matches reporter '{}'; customer tags enforced",
                            reporter.host
                        ),
                    );
                }
                CustomerTagPolicy::Validate if claimed.customer_consistent(reporter) => {
                    return self.accept(
                        Decision::SelfMatch,
                        tags,
                        format!(
                            "claimed host matches reporter '{}'; customer tags validated",
                            reporter.host
                        ),
                    );
                }
                CustomerTagPolicy::Validate => {
                    debug!(
                        event_id,
                        reporter_host = %reporter.host,
                        "self-matched host carries foreign customer tags; checking graylist"
                    );
                }
            }
        } else {
            debug!(
                event_id,
                reporter_host = %reporter.host,
                "claimed host differs from reporter; checking graylist"
            );
        }

        let rules = self.candidate_rules(event_id, environment, lookup);
        if let Some(rule) = first_allowing_rule(&rules, reporter, kind, event_id) {
            let mut result = self.accept(
                Decision::RuleMatch,
                tags,
                format!(
                    "graylist rule '{}' allows reporter '{}' for {}",
                    rule.id, reporter.host, kind
                ),
            );
            result.rule_id = Some(rule.id.clone());
            return result;
        }

        match policy.fallback {
            FallbackPolicy::Impersonate => {
                warn!(
                    event_id,
                    environment,
                    reporter_host = %reporter.host,
                    "no graylist rule matched; overwriting claimed identity with reporter identity"
                );
                self.impersonate(&mut tags, reporter);
                self.accept(
                    Decision::Impersonated,
                    tags,
                    format!(
                        "no graylist rule for reporter '{}' in '{}'; claimed identity overwritten",
                        reporter.host, environment
                    ),
                )
            }
            FallbackPolicy::Reject => ReconciliationResult::rejected(format!(
                "{} not allowed: no graylist rule for reporter '{}' in '{}'",
                kind, reporter.host, environment
            )),
        }
    }

    fn accept(
        &self,
        decision: Decision,
        mut tags: ParsedTags,
        reason: String,
    ) -> ReconciliationResult {
        tags.strip_reserved(&self.reserved);
        ReconciliationResult::accept(decision, tags, reason)
    }

    /// Fills only what the event did not claim: absent host keys, and absent
    /// or empty customer keys. Claimed values are never touched.
    fn backfill(&self, tags: &mut ParsedTags, reporter: &ReporterIdentity) {
        for key in &self.config.host_tags {
            if !tags.contains_key(key) {
                tags.set(key.clone(), reporter.host.clone());
            }
        }
        let customer = self
            .config
            .external_id_tags
            .iter()
            .map(|k| (k, &reporter.external_id))
            .chain(
                self.config
                    .customer_prefix_tags
                    .iter()
                    .map(|k| (k, &reporter.customer_prefix)),
            );
        for (key, value) in customer {
            if tags.value(key).map_or(true, str::is_empty) {
                tags.set(key.clone(), value.clone());
            }
        }
    }

    fn host_self_matches(
        &self,
        claimed: &ClaimedIdentity,
        tags: &ParsedTags,
        reporter: &ReporterIdentity,
        policy: KindPolicy,
    ) -> bool {
        if policy.plain_host_match && tags.has_plain(&reporter.host) {
            return true;
        }
        claimed.host_matches(reporter)
    }

    fn overwrite_customer(&self, tags: &mut ParsedTags, reporter: &ReporterIdentity) {
        for key in &self.config.external_id_tags {
            tags.set(key.clone(), reporter.external_id.clone());
        }
        for key in &self.config.customer_prefix_tags {
            tags.set(key.clone(), reporter.customer_prefix.clone());
        }
    }

    fn impersonate(&self, tags: &mut ParsedTags, reporter: &ReporterIdentity) {
        for key in &self.config.host_tags {
            tags.set(key.clone(), reporter.host.clone());
        }
        self.overwrite_customer(tags, reporter);
        for key in &self.config.target_host_tags {
            tags.remove(key);
        }
    }

    fn candidate_rules(
        &self,
        event_id: &str,
        environment: &str,
        lookup: &dyn FilterLookup,
    ) -> Vec<GraylistRule> {
        match lookup.find(environment, &self.config.rule_type) {
            Ok(rules) => rules,
            Err(e) => {
                warn!(
                    event_id,
                    environment,
                    error = %e,
                    "graylist lookup failed; treating as no rules"
                );
                Vec::new()
            }
        }
    }
}

/// Under a reject fallback an unclaimed identity stays unclaimed, so a bare
/// reporter cannot self-match its way past the graylist.
fn backfills(policy: KindPolicy) -> bool {
    policy.backfill && policy.fallback == FallbackPolicy::Impersonate
}

/// Lookup order is precedence: the first usable rule that allows the reporter
/// host for this role wins. Malformed rules are skipped, never fatal.
fn first_allowing_rule<'r>(
    rules: &'r [GraylistRule],
    reporter: &ReporterIdentity,
    kind: EventKind,
    event_id: &str,
) -> Option<&'r GraylistRule> {
    rules.iter().find(|rule| match rule.attributes() {
        Ok(attrs) => attrs.allows(&reporter.host, kind),
        Err(e) => {
            warn!(event_id, rule_id = %rule.id, error = %e, "skipping unusable graylist rule");
            false
        }
    })
}
