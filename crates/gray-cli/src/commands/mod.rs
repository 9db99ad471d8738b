//! Command handler modules for the `gray` CLI.

pub mod admit;

use anyhow::{Context, Result};
use gray_config::{AdmissionConfig, LoadedConfig, UnusedKeyPolicy};
use tracing::warn;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Parse a CLI `--unused-keys` string into an [`UnusedKeyPolicy`].
pub fn parse_unused_key_policy(raw: &str) -> Result<UnusedKeyPolicy> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "warn" => Ok(UnusedKeyPolicy::Warn),
        "fail" => Ok(UnusedKeyPolicy::Fail),
        other => anyhow::bail!(
            "invalid --unused-keys '{}'. expected one of: warn | fail",
            other
        ),
    }
}

/// Load layered config, run the unused-key guard, build the typed config.
pub fn load_admission_config(
    paths: &[String],
    unused_keys: UnusedKeyPolicy,
) -> Result<(LoadedConfig, AdmissionConfig)> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = gray_config::load_layered_yaml(&path_refs)?;

    let report = gray_config::report_unused_keys(&loaded.config_json, unused_keys)?;
    for pointer in &report.unused_leaf_pointers {
        warn!(pointer = %pointer, "config key is not read by admission");
    }

    let admission = loaded
        .admission()
        .with_context(|| format!("invalid admission config from {:?}", paths))?;
    Ok((loaded, admission))
}
