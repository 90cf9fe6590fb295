mod common;

use common::{customer_model, TestProject};
use serde_json::{json, Value};

#[test]
fn generate_prints_data_products_json() {
    let project = TestProject::new(&customer_model(true));
    let model = project.model_path();
    let output = project.dpgen(&[
        "generate",
        "--model",
        model.to_str().expect("utf-8 path"),
        "--namespace",
        "com.example",
        "--enable",
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let value: Value = serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    let products = value["dataProducts"].as_array().expect("dataProducts array");
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["ordId"], "com.example:dataProduct:CustomerService:v1");
    assert_eq!(products[0]["outputPorts"].as_array().map(Vec::len), Some(2));
}

#[test]
fn generate_without_gate_prints_empty_list() {
    let project = TestProject::new(&customer_model(false));
    let model = project.model_path();
    let output = project.dpgen(&[
        "generate",
        "--model",
        model.to_str().expect("utf-8 path"),
        "--namespace",
        "com.example",
    ]);
    assert!(output.status.success());
    let value: Value = serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(value, json!({ "dataProducts": [] }));
}

#[test]
fn generate_reads_settings_and_writes_output_file() {
    let project = TestProject::new(&customer_model(false));
    project.write(
        "overrides/products.json",
        &json!({
            "dataProducts": [
                { "id": "com.example:dataProduct:CustomerService:v1", "title": "Customers" }
            ]
        })
        .to_string(),
    );
    let settings = project.write(
        "ord.json",
        &json!({
            "customOrdContentFile": "overrides/products.json",
            "features": { "dataProducts": true }
        })
        .to_string(),
    );
    let model = project.model_path();
    let out = project.root().join("out/data-products.json");
    let output = project.dpgen(&[
        "generate",
        "--model",
        model.to_str().expect("utf-8 path"),
        "--namespace",
        "com.example",
        "--settings",
        settings.to_str().expect("utf-8 path"),
        "--package",
        "com.example:package:Main:v1",
        "--out",
        out.to_str().expect("utf-8 path"),
    ]);
    assert!(output.status.success());

    let written = std::fs::read_to_string(&out).expect("read output");
    let value: Value = serde_json::from_str(&written).expect("output is JSON");
    let product = &value["dataProducts"][0];
    assert_eq!(product["title"], "Customers");
    assert_eq!(product["source"], "custom");
    assert_eq!(product["partOfPackage"], "com.example:package:Main:v1");
}

#[test]
fn validate_config_accepts_valid_document() {
    let project = TestProject::new(&customer_model(false));
    let config = project.write_overrides(&json!({
        "dataProducts": [{
            "id": "com.example:dataProduct:CustomerService:v1",
            "title": "Customers",
            "version": "1.2.0",
            "type": "primary",
            "visibility": "internal"
        }]
    }));
    let output = project.dpgen(&[
        "validate-config",
        "--config",
        config.to_str().expect("utf-8 path"),
    ]);
    assert!(output.status.success());
}

#[test]
fn validate_config_reports_errors_and_fails() {
    let project = TestProject::new(&customer_model(false));
    let config = project.write_overrides(&json!({
        "dataProducts": [{
            "id": "com.example:dataProduct:CustomerService:v1",
            "title": "Customers",
            "version": "v1",
            "type": "mixed"
        }]
    }));
    let output = project.dpgen(&[
        "validate-config",
        "--config",
        config.to_str().expect("utf-8 path"),
    ]);
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Valid semantic version is required (e.g., 1.0.0)"));
    assert!(stdout.contains("Type must be one of: primary, derived"));
}
