use std::sync::Arc;
use std::thread;

use gray_config::AdmissionConfig;
use gray_reconcile::*;
use serde_json::json;

#[test]
fn scenario_shared_engine_and_snapshot_across_threads() {
    let engine = Reconciler::new(AdmissionConfig::default());
    let store: Arc<dyn FilterLookup> = Arc::new(StaticFilterStore::new(vec![GraylistRule::new(
        "relay-rule",
        "Production",
        "graylist",
        json!({"host": "relay", "roles": ["alert"]}),
    )]));

    let decisions: Vec<(usize, Decision)> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let engine = &engine;
                let store = &store;
                s.spawn(move || {
                    let reporter_host = if i % 2 == 0 { "relay" } else { "unknown" };
                    let parsed = gray_tags::parse([
                        format!("host=device-{i}"),
                        format!("reporter:host={reporter_host}"),
                        "reporter:externalid=E".to_string(),
                        "reporter:customerprefix=C".to_string(),
                    ]);
                    let reporter = extract(&parsed, ReporterSource::Tags, engine.config())
                        .expect("reporter");
                    let event_id = format!("evt-{i}");
                    let r = engine.reconcile(
                        ReconcileInput {
                            event_id: &event_id,
                            environment: "Production",
                            kind: EventKind::Alert,
                            tags: parsed,
                            reporter: &reporter,
                        },
                        &**store,
                    );
                    (i, r.decision)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("worker panicked"))
            .collect()
    });

    for (i, decision) in decisions {
        let want = if i % 2 == 0 {
            Decision::RuleMatch
        } else {
            Decision::Impersonated
        };
        assert_eq!(decision, want, "event {i}");
    }
}
