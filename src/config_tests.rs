use super::*;
use std::path::Path;

fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent directory");
    }
    std::fs::write(path, contents.as_bytes()).expect("write file");
}

#[test]
fn default_path_lives_under_project_root() {
    let root = Path::new("/srv/app");
    assert_eq!(
        resolve_custom_config_path(None, root),
        Path::new("/srv/app/ord/custom.ord.json")
    );
    assert_eq!(
        resolve_custom_config_path(Some(Path::new("cfg/overrides.json")), root),
        Path::new("/srv/app/cfg/overrides.json")
    );
    assert_eq!(
        resolve_custom_config_path(Some(Path::new("/etc/ord.json")), root),
        Path::new("/etc/ord.json")
    );
}

#[test]
fn loads_override_document_from_default_location() {
    let root = tempfile::tempdir().expect("create temp dir");
    write_file(
        &root.path().join(DEFAULT_CUSTOM_CONFIG_REL),
        r#"{ "dataProducts": [ { "id": "ns:dataProduct:Svc:v1", "title": "Custom" } ] }"#,
    );

    let config = load_custom_configuration(None, root.path()).expect("override document");
    assert_eq!(config.data_products.len(), 1);
    assert_eq!(config.data_products[0]["title"], "Custom");
}

#[test]
fn missing_override_document_means_no_overrides() {
    let root = tempfile::tempdir().expect("create temp dir");
    assert!(load_custom_configuration(None, root.path()).is_none());
    assert!(read_custom_configuration(&root.path().join("absent.json"))
        .expect("missing file is not an error")
        .is_none());
}

#[test]
fn malformed_override_document_degrades_to_none() {
    let root = tempfile::tempdir().expect("create temp dir");
    let path = root.path().join("broken.json");
    write_file(&path, "{ not json");

    assert!(read_custom_configuration(&path).is_err());
    assert!(load_custom_configuration(Some(&path), root.path()).is_none());
}

#[test]
fn override_document_without_products_is_empty() {
    let root = tempfile::tempdir().expect("create temp dir");
    let path = root.path().join("empty.json");
    write_file(&path, "{}");

    let config = read_custom_configuration(&path)
        .expect("read")
        .expect("present");
    assert!(config.is_empty());
}

#[test]
fn feature_gate_accepts_env_or_settings_flag() {
    let disabled = OrdSettings::default();
    assert!(!feature_enabled(None, &disabled));
    assert!(!feature_enabled(Some("1"), &disabled));
    assert!(feature_enabled(Some("true"), &disabled));

    let mut enabled = OrdSettings::default();
    enabled.features.data_products = true;
    assert!(feature_enabled(None, &enabled));
}

#[test]
fn settings_parse_camel_case_json() {
    let root = tempfile::tempdir().expect("create temp dir");
    let path = root.path().join("ord.json");
    write_file(
        &path,
        r#"{ "customOrdContentFile": "custom/ord.json", "features": { "dataProducts": true } }"#,
    );

    let settings = load_settings(&path).expect("load settings");
    assert!(settings.features.data_products);
    assert_eq!(
        settings.custom_ord_content_file.as_deref(),
        Some(Path::new("custom/ord.json"))
    );
}

#[test]
fn validation_reports_only_broken_entries() {
    let config: CustomConfiguration = serde_json::from_str(
        r#"{ "dataProducts": [
            { "id": "ns:dataProduct:A:v1", "title": "A", "version": "1.0.0", "type": "primary" },
            { "title": "B", "version": "1.0.0", "type": "derived" }
        ] }"#,
    )
    .expect("parse configuration");

    let report = validate_custom_configuration(&config);
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].index, 1);
    assert!(report[0].id.is_none());
    assert_eq!(report[0].errors, vec!["Data product ID is required"]);
}
