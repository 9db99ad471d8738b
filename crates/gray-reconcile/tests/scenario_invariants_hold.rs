use std::collections::BTreeSet;

use gray_config::AdmissionConfig;
use gray_reconcile::*;
use proptest::prelude::*;
use serde_json::json;

const PREFIX: &str = "reporter:";

fn store() -> StaticFilterStore {
    StaticFilterStore::new(vec![GraylistRule::new(
        "relay-rule",
        "Production",
        "graylist",
        json!({"host": "relay", "roles": ["alert", "blackout"]}),
    )])
}

fn reporter_tags(host: &str) -> Vec<String> {
    vec![
        format!("{PREFIX}host={host}"),
        format!("{PREFIX}externalid=E"),
        format!("{PREFIX}customerprefix=C"),
    ]
}

fn run(engine: &Reconciler, kind: EventKind, tags: &[String]) -> ReconciliationResult {
    let parsed = gray_tags::parse(tags);
    let reporter = extract(&parsed, ReporterSource::Tags, engine.config()).expect("reporter");
    engine.reconcile(
        ReconcileInput {
            event_id: "prop",
            environment: "Production",
            kind,
            tags: parsed,
            reporter: &reporter,
        },
        &store(),
    )
}

fn out(r: &ReconciliationResult) -> BTreeSet<String> {
    gray_tags::serialize(r.tags.as_ref().expect("accepted"), None)
        .into_iter()
        .collect()
}

fn optional(key: &'static str, values: &'static [&'static str]) -> BoxedStrategy<Option<String>> {
    prop_oneof![
        Just(None),
        proptest::sample::select(values).prop_map(move |v| Some(format!("{key}={v}"))),
    ]
    .boxed()
}

prop_compose! {
    /// Claimed tags drawn around a reporter host of "h" or "relay", plus
    /// unrelated plain tags and stray reserved-prefixed tags.
    fn claimed_tags()(
        host in optional("host", &["h", "relay", "other", ""]),
        target in optional("targethost", &["h", "t"]),
        external_id in optional("externalid", &["E", "X", ""]),
        customer_prefix in optional("customerprefix", &["C", "Y"]),
        plain in proptest::collection::vec("[a-z]{1,6}", 0..3),
        stray in proptest::collection::vec("reporter:x[a-z]{0,4}(=[a-z]{0,3})?", 0..3),
    ) -> Vec<String> {
        let mut tags: Vec<String> = [host, target, external_id, customer_prefix]
            .into_iter()
            .flatten()
            .collect();
        tags.extend(plain);
        tags.extend(stray);
        tags
    }
}

fn kind() -> impl Strategy<Value = EventKind> {
    prop_oneof![Just(EventKind::Alert), Just(EventKind::Blackout)]
}

fn reporter_host() -> impl Strategy<Value = &'static str> {
    proptest::sample::select(&["h", "relay"][..])
}

proptest! {
    #[test]
    fn accepted_output_never_contains_reserved_tags(
        claimed in claimed_tags(),
        kind in kind(),
        host in reporter_host(),
    ) {
        let engine = Reconciler::new(AdmissionConfig::default());
        let mut tags = claimed;
        tags.extend(reporter_tags(host));
        let r = run(&engine, kind, &tags);
        if let Some(parsed) = &r.tags {
            for tag in gray_tags::serialize(parsed, None) {
                prop_assert!(!tag.starts_with(PREFIX), "leaked {tag}");
            }
        }
    }

    #[test]
    fn self_match_forces_reporter_customer_fields(
        claimed in claimed_tags(),
        kind in kind(),
    ) {
        let engine = Reconciler::new(AdmissionConfig::default());
        let mut tags: Vec<String> = claimed
            .into_iter()
            .filter(|t| !t.starts_with("host=") && !t.starts_with("targethost="))
            .collect();
        tags.push("host=h".to_string());
        tags.extend(reporter_tags("h"));

        let r = run(&engine, kind, &tags);
        prop_assert_eq!(r.decision, Decision::SelfMatch);
        let parsed = r.tags.as_ref().expect("accepted");
        prop_assert_eq!(parsed.value("externalid"), Some("E"));
        prop_assert_eq!(parsed.value("customerprefix"), Some("C"));
    }

    #[test]
    fn delegation_requires_full_identity_match(
        claimed in claimed_tags(),
        kind in kind(),
        host in reporter_host(),
    ) {
        let engine = Reconciler::new(AdmissionConfig::default());
        let mut tags = claimed;
        tags.extend(reporter_tags(host));
        let parsed = gray_tags::parse(&tags);
        let r = run(&engine, kind, &tags);

        if r.decision == Decision::Delegated {
            prop_assert!(parsed.contains_key("targethost"));
            if let Some(v) = parsed.value("host") {
                prop_assert_eq!(v, host);
            }
            // Backfill only fills what was never claimed; every claimed
            // value must already agree with the reporter.
            for (key, want) in [("externalid", "E"), ("customerprefix", "C")] {
                match parsed.value(key).filter(|v| !v.is_empty()) {
                    Some(v) => {
                        prop_assert_eq!(v, want);
                    }
                    None => {
                        prop_assert_eq!(kind, EventKind::Alert);
                    }
                }
            }
            if kind == EventKind::Blackout {
                prop_assert_eq!(parsed.value("host"), Some(host));
            }
        } else if parsed.contains_key("targethost") {
            let full = parsed.value("host") == Some(host)
                && parsed.value("externalid") == Some("E")
                && parsed.value("customerprefix") == Some("C");
            prop_assert!(!full, "full identity match must delegate");
        }
    }

    #[test]
    fn reconciling_accepted_output_again_is_stable(
        claimed in claimed_tags(),
        kind in kind(),
        host in reporter_host(),
    ) {
        let engine = Reconciler::new(AdmissionConfig::default());
        let mut tags = claimed;
        tags.extend(reporter_tags(host));
        let first = run(&engine, kind, &tags);
        prop_assume!(!first.is_rejected());

        let mut again: Vec<String> = out(&first).into_iter().collect();
        again.extend(reporter_tags(host));
        let second = run(&engine, kind, &again);

        prop_assert!(!second.is_rejected());
        prop_assert_eq!(out(&first), out(&second));
    }
}

#[test]
fn example_self_match_strips_reporter_tags() {
    let engine = Reconciler::new(AdmissionConfig::default());
    let tags: Vec<String> = [
        "host=a.b",
        "reporter:host=a.b",
        "reporter:externalid=E",
        "reporter:customerprefix=C",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    let r = run(&engine, EventKind::Alert, &tags);
    assert_eq!(r.decision, Decision::SelfMatch);
    let expected: BTreeSet<String> = ["host=a.b", "externalid=E", "customerprefix=C"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(out(&r), expected);
}

#[test]
fn example_delegated_preserves_all_claimed_tags() {
    let engine = Reconciler::new(AdmissionConfig::default());
    let tags: Vec<String> = [
        "targethost=h",
        "host=h",
        "externalid=E",
        "customerprefix=C",
        "reporter:host=h",
        "reporter:externalid=E",
        "reporter:customerprefix=C",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    let r = run(&engine, EventKind::Alert, &tags);
    assert_eq!(r.decision, Decision::Delegated);
    let expected: BTreeSet<String> = ["targethost=h", "host=h", "externalid=E", "customerprefix=C"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(out(&r), expected);
}
