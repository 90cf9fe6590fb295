//! Stateless rule checks for published documents and override entries.
//!
//! Both checks return the list of violated rules; an empty list means valid.
use crate::builder::DataProductDocument;
use crate::record::{DataProductType, Visibility};
use regex::Regex;
use serde_json::{Map, Value};

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Rules every assembled document must satisfy before it is published.
pub fn validate_document(document: &DataProductDocument) -> Vec<String> {
    let required = [
        ("ordId", document.ord_id.as_str()),
        ("title", document.title.as_str()),
        ("version", document.version.as_str()),
        ("type", document.product_type.as_str()),
        ("visibility", document.visibility.as_str()),
        ("responsible", document.responsible.as_str()),
    ];
    let mut errors: Vec<String> = required
        .iter()
        .filter(|(_, value)| blank(value))
        .map(|(field, _)| format!("{field} is required"))
        .collect();
    if document.output_ports.is_empty() {
        errors.push("at least one output port is required".to_string());
    }
    errors
}

fn field_text<'a>(entry: &'a Map<String, Value>, key: &str) -> &'a str {
    entry.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn joined<T>(values: &[T], as_str: fn(&T) -> &'static str) -> String {
    values.iter().map(as_str).collect::<Vec<_>>().join(", ")
}

/// Rules for one entry of an override document, checked before merging.
pub fn validate_configuration(entry: &Map<String, Value>) -> Vec<String> {
    let text = |key: &str| field_text(entry, key);
    let mut errors = Vec::new();

    if blank(text("id")) {
        errors.push("Data product ID is required".to_string());
    }
    if blank(text("title")) {
        errors.push("Data product title is required".to_string());
    }
    let semver = Regex::new(r"^\d+\.\d+\.\d+$").expect("regex for semantic version");
    if !semver.is_match(text("version")) {
        errors.push("Valid semantic version is required (e.g., 1.0.0)".to_string());
    }
    if DataProductType::parse(text("type")).is_none() {
        errors.push(format!(
            "Type must be one of: {}",
            joined(&DataProductType::ALL, DataProductType::as_str)
        ));
    }
    if let Some(visibility) = entry.get("visibility").filter(|value| !value.is_null()) {
        if visibility.as_str().and_then(Visibility::parse).is_none() {
            errors.push(format!(
                "Visibility must be one of: {}",
                joined(&Visibility::ALL, Visibility::as_str)
            ));
        }
    }
    errors
}
