//! Offline admission replay.

use anyhow::{Context, Result};
use gray_admission::{AdmissionAdapter, Event};
use gray_audit::AuditWriter;
use gray_config::UnusedKeyPolicy;
use gray_reconcile::{Decision, StaticFilterStore};
use serde::Serialize;
use std::fs;
use std::io::{self, BufWriter, Write};
use tracing::{debug, info};
use uuid::Uuid;

pub struct AdmitArgs<'a> {
    pub config_paths: &'a [String],
    pub filters_path: &'a str,
    pub events_path: &'a str,
    pub audit_path: Option<&'a str>,
    pub unused_keys: UnusedKeyPolicy,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AdmitSummary {
    pub admitted: usize,
    pub rejected: usize,
    pub audited: usize,
}

/// One stdout line per event.
#[derive(Serialize)]
struct AdmitLine<'a> {
    id: &'a str,
    status: &'static str,
    decision: Decision,
    reason: &'a str,
    rule_id: Option<&'a str>,
    tags: Option<&'a [String]>,
}

pub fn run(args: AdmitArgs<'_>) -> Result<AdmitSummary> {
    let (loaded, config) = super::load_admission_config(args.config_paths, args.unused_keys)?;
    info!(config_hash = %loaded.config_hash, "admission config loaded");

    let raw_filters = fs::read_to_string(args.filters_path)
        .with_context(|| format!("failed to read filters: {}", args.filters_path))?;
    let store = StaticFilterStore::from_json_str(&raw_filters)
        .with_context(|| format!("failed to parse filters: {}", args.filters_path))?;
    debug!(rules = store.len(), "rule snapshot loaded");

    let events = read_events(args.events_path)?;
    let adapter = AdmissionAdapter::new(config, store);

    let mut audit = match args.audit_path {
        Some(p) => Some(AuditWriter::resume(p, true)?),
        None => None,
    };
    let run_id = Uuid::new_v4();

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut summary = AdmitSummary::default();

    for event in events {
        let (line, record) = match adapter.admit(event.clone(), None) {
            Ok(admitted) => {
                summary.admitted += 1;
                let line = serde_json::to_string(&AdmitLine {
                    id: &admitted.event.id,
                    status: "admitted",
                    decision: admitted.decision,
                    reason: &admitted.reason,
                    rule_id: admitted.rule_id.as_deref(),
                    tags: Some(&admitted.event.tags),
                })?;
                let record = admitted.decision.is_notable().then(|| {
                    (
                        admitted.event.clone(),
                        admitted.decision,
                        admitted.reason.clone(),
                        admitted.rule_id.clone(),
                    )
                });
                (line, record)
            }
            Err(rejected) => {
                summary.rejected += 1;
                let line = serde_json::to_string(&AdmitLine {
                    id: &rejected.event_id,
                    status: "rejected",
                    decision: Decision::Rejected,
                    reason: &rejected.reason,
                    rule_id: None,
                    tags: None,
                })?;
                (line, Some((event, Decision::Rejected, rejected.reason, None)))
            }
        };
        writeln!(out, "{line}").context("write stdout failed")?;

        if let (Some(writer), Some((ev, decision, reason, rule_id))) = (audit.as_mut(), record) {
            writer.record_decision(run_id, &ev, decision, &reason, rule_id.as_deref())?;
            summary.audited += 1;
        }
    }
    out.flush().context("flush stdout failed")?;

    Ok(summary)
}

/// JSON Lines; blank lines are skipped.
fn read_events(path: &str) -> Result<Vec<Event>> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read events: {path}"))?;
    let mut events = Vec::new();
    for (i, line) in raw.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let ev: Event = serde_json::from_str(trimmed)
            .with_context(|| format!("parse event at {path}:{}", i + 1))?;
        events.push(ev);
    }
    Ok(events)
}
