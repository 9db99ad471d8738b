use gray_config::*;

fn repo_path(rel: &str) -> String {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join(rel)
        .to_string_lossy()
        .to_string()
}

#[test]
fn scenario_shipped_defaults_equal_builtin_defaults() {
    let base = repo_path("config/defaults/graylist.yaml");
    let loaded = load_layered_yaml(&[base.as_str()]).expect("defaults must load");

    assert_eq!(loaded.admission().unwrap(), AdmissionConfig::default());

    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail)
        .expect("shipped defaults must not carry unused keys");
    assert!(report.is_clean());
}

#[test]
fn scenario_strict_site_layers_over_defaults() {
    let base = repo_path("config/defaults/graylist.yaml");
    let site = repo_path("config/sites/strict.yaml");
    let cfg = load_layered_yaml(&[base.as_str(), site.as_str()])
        .unwrap()
        .admission()
        .unwrap();

    assert_eq!(cfg.alert.fallback, FallbackPolicy::Reject);
    assert!(cfg.alert.backfill, "untouched keys keep the base value");
    assert_eq!(cfg.blackout.customer_tags, CustomerTagPolicy::Validate);
    assert_eq!(cfg.blackout.fallback, FallbackPolicy::Reject);
}

#[test]
fn scenario_empty_config_is_all_defaults() {
    let loaded = load_layered_yaml_from_strings(&["{}"]).unwrap();
    assert_eq!(loaded.admission().unwrap(), AdmissionConfig::default());
}
