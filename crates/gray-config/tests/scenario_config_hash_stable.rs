use gray_config::load_layered_yaml_from_strings;

#[test]
fn scenario_hash_ignores_key_order() {
    let a = "policy:\n  alert:\n    fallback: reject\n    backfill: true\n";
    let b = "policy:\n  alert:\n    backfill: true\n    fallback: reject\n";

    let ha = load_layered_yaml_from_strings(&[a]).unwrap().config_hash;
    let hb = load_layered_yaml_from_strings(&[b]).unwrap().config_hash;
    assert_eq!(ha, hb);
    assert_eq!(ha.len(), 64);
}

#[test]
fn scenario_hash_changes_with_policy() {
    let a = "policy:\n  alert:\n    fallback: reject\n";
    let b = "policy:\n  alert:\n    fallback: impersonate\n";
    assert_ne!(
        load_layered_yaml_from_strings(&[a]).unwrap().config_hash,
        load_layered_yaml_from_strings(&[b]).unwrap().config_hash
    );
}

#[test]
fn scenario_layering_is_order_sensitive() {
    let a = "filters:\n  rule_type: graylist\n";
    let b = "filters:\n  rule_type: allowlist\n";
    let ab = load_layered_yaml_from_strings(&[a, b]).unwrap();
    let ba = load_layered_yaml_from_strings(&[b, a]).unwrap();
    assert_ne!(ab.config_hash, ba.config_hash);
    assert_eq!(
        ab.config_json.pointer("/filters/rule_type").and_then(|v| v.as_str()),
        Some("allowlist")
    );
}
