use gray_config::{load_layered_yaml_from_strings, report_unused_keys, UnusedKeyPolicy};

#[test]
fn warn_mode_reports_misspelled_policy_without_error() {
    let yaml = r#"
policy:
  alerts:
    fallback: reject
  blackout:
    fallback: reject
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)
        .expect("warn mode must not error");

    assert_eq!(
        report.unused_leaf_pointers,
        vec!["/policy/alerts/fallback".to_string()]
    );
}

#[test]
fn fail_mode_errors_on_unused_keys() {
    let yaml = "tags:\n  hots: [host]\n";
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();

    let err = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap_err();
    assert!(format!("{err}").contains("CONFIG_UNUSED_KEYS"));
}

#[test]
fn key_lists_count_as_single_leaves() {
    let yaml = "tags:\n  host: [host, fqdn, hostname]\n";
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap();
    assert!(report.is_clean());
}

#[test]
fn deterministic_unused_pointer_ordering() {
    let yaml = "unused:\n  b: 2\n  a: 1\n";
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn).unwrap();
    assert_eq!(
        report.unused_leaf_pointers,
        vec!["/unused/a".to_string(), "/unused/b".to_string()]
    );
}
