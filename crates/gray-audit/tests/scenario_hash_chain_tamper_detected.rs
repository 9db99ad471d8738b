//! Decision log integrity: an untouched chain verifies; an edited payload, a
//! deleted line and a swapped pair are each located.

use gray_admission::Event;
use gray_audit::{verify_hash_chain, verify_hash_chain_str, AuditWriter, VerifyResult};
use gray_reconcile::{Decision, EventKind};
use std::path::Path;
use uuid::Uuid;

const DECISIONS: [Decision; 5] = [
    Decision::RuleMatch,
    Decision::Impersonated,
    Decision::Rejected,
    Decision::RuleMatch,
    Decision::Impersonated,
];

fn write_five(path: &Path) {
    let run_id = Uuid::new_v4();
    let mut writer = AuditWriter::new(path, true).unwrap();
    for (i, decision) in DECISIONS.iter().enumerate() {
        let event = Event::new(
            format!("evt-{i}"),
            "Production",
            EventKind::Alert,
            [format!("host=device-{i}")],
        );
        writer
            .record_decision(run_id, &event, *decision, &format!("reason {i}"), None)
            .unwrap();
    }
}

fn rewrite(path: &Path, f: impl FnOnce(&mut Vec<String>)) {
    let content = std::fs::read_to_string(path).unwrap();
    let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
    f(&mut lines);
    std::fs::write(path, lines.join("\n") + "\n").unwrap();
}

#[test]
fn untampered_chain_verifies_valid() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    write_five(&path);

    assert_eq!(
        verify_hash_chain(&path).unwrap(),
        VerifyResult::Valid { lines: 5 }
    );
}

#[test]
fn tampered_payload_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    write_five(&path);

    rewrite(&path, |lines| {
        let mut ev: serde_json::Value = serde_json::from_str(&lines[2]).unwrap();
        ev["payload"]["decision"] = serde_json::json!("RULE_MATCH");
        lines[2] = serde_json::to_string(&ev).unwrap();
    });

    match verify_hash_chain(&path).unwrap() {
        VerifyResult::Broken { line, reason } => {
            assert_eq!(line, 3, "{reason}");
            assert!(reason.contains("hash_self mismatch"), "{reason}");
        }
        VerifyResult::Valid { lines } => panic!("tampered chain verified ({lines} lines)"),
    }
}

#[test]
fn deleted_line_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    write_five(&path);

    rewrite(&path, |lines| {
        lines.remove(2);
    });

    match verify_hash_chain(&path).unwrap() {
        VerifyResult::Broken { line, reason } => {
            assert_eq!(line, 3, "{reason}");
            assert!(reason.contains("hash_prev mismatch"), "{reason}");
        }
        VerifyResult::Valid { lines } => panic!("truncated chain verified ({lines} lines)"),
    }
}

#[test]
fn swapped_lines_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    write_five(&path);

    rewrite(&path, |lines| lines.swap(1, 2));

    assert!(matches!(
        verify_hash_chain(&path).unwrap(),
        VerifyResult::Broken { line: 2, .. }
    ));
}

#[test]
fn empty_log_is_valid() {
    assert_eq!(
        verify_hash_chain_str("").unwrap(),
        VerifyResult::Valid { lines: 0 }
    );
}

#[test]
fn garbage_line_is_an_error() {
    let err = verify_hash_chain_str("{not json}\n").unwrap_err();
    assert!(format!("{err:#}").contains("line 1"), "{err:#}");
}
