//! Annotation keys and typed extraction helpers.
//!
//! Stages never poke at raw annotation JSON directly; they go through these
//! helpers so that a missing key is `None` and a key with the wrong shape is a
//! reportable error for that one record.
use crate::model::Definition;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub const DATA_PRODUCT: &str = "@ORD.dataProduct";
pub const SCHEMA: &str = "@ORD.schema";
pub const LINEAGE: &str = "@ORD.lineage";
pub const TAG: &str = "@ORD.tag";

pub const LIFECYCLE: &str = "@ORD.lifecycle";
pub const DEPRECATED: &str = "@ORD.deprecated";
pub const SUCCESSOR: &str = "@ORD.successor";

pub const TAXONOMY: &str = "@ORD.taxonomy";
pub const INDUSTRY: &str = "@ORD.industry";
pub const LINE_OF_BUSINESS: &str = "@ORD.lineOfBusiness";
pub const COUNTRIES: &str = "@ORD.countries";
pub const LABELS: &str = "@ORD.labels";
pub const DOCUMENTATION_LABELS: &str = "@ORD.documentationLabels";
pub const CORRELATION_IDS: &str = "@ORD.correlationIds";

pub const ENTITY_TYPES: &str = "@ORD.entityTypes";
pub const ENTITY_TYPE: &str = "@ORD.entityType";

pub const INPUT_PORTS: &str = "@ORD.inputPorts";
pub const INTEGRATION_DEPENDENCY: &str = "@ORD.integrationDependency";
pub const EXTERNAL_SOURCE: &str = "@ORD.externalSource";
pub const CONSUMES: &str = "@ORD.consumes";

pub const DATA_PRODUCT_LINKS: &str = "@ORD.dataProductLinks";
pub const LINKS: &str = "@ORD.links";
pub const CUSTOM_LINK_TYPE: &str = "@ORD.customLinkType";

pub const GOVERNANCE: &str = "@ORD.governance";
pub const POLICY_LEVEL: &str = "@ORD.policyLevel";
pub const SYSTEM_INSTANCE_AWARE: &str = "@ORD.systemInstanceAware";
pub const COMPLIANCE: &str = "@ORD.compliance";
pub const DATA_CLASSIFICATION: &str = "@ORD.dataClassification";
pub const DATA_RETENTION: &str = "@ORD.dataRetention";
pub const PERSONAL_DATA: &str = "@ORD.personalData";

/// Annotation key for a typed data-product link shorthand (`@ORD.supportLink`).
pub fn link_annotation(link_type: &str) -> String {
    format!("@ORD.{link_type}Link")
}

/// Whether an annotation value counts as "set".
///
/// `null`, `false`, `0`, and the empty string are treated as unset, matching
/// how annotation authors switch a flag off.
pub fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Look up a set annotation on a definition.
pub fn get<'a>(definition: &'a Definition, key: &str) -> Option<&'a Value> {
    definition.annotation(key).filter(|value| is_set(value))
}

/// Deserialize a set annotation into a typed block.
pub fn parse<T: DeserializeOwned>(definition: &Definition, key: &str) -> Result<Option<T>> {
    let Some(value) = get(definition, key) else {
        return Ok(None);
    };
    let parsed = serde_json::from_value(value.clone())
        .with_context(|| format!("parse {key} on {}", definition.name))?;
    Ok(Some(parsed))
}

/// Non-empty string value.
pub fn string(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// Render a scalar as a string (`true` -> `"true"`, `3` -> `"3"`).
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// View a value as a list: arrays yield their items, anything else is a single item.
pub fn one_or_many(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

/// Normalize a list-like value into strings.
///
/// Arrays keep their string items; a single string is split on commas with
/// blanks dropped; anything else yields an empty list.
pub fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Value::String(text) => text
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Strings from a value that is either one string or a list of strings.
pub fn strings_one_or_many(value: &Value) -> Vec<String> {
    one_or_many(value)
        .into_iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unset_values_are_skipped() {
        assert!(!is_set(&json!(null)));
        assert!(!is_set(&json!("")));
        assert!(!is_set(&json!(false)));
        assert!(!is_set(&json!(0)));
        assert!(is_set(&json!([])));
        assert!(is_set(&json!("x")));
    }

    #[test]
    fn string_list_splits_comma_separated_strings() {
        assert_eq!(string_list(&json!("DE, US,,fr ")), vec!["DE", "US", "fr"]);
        assert_eq!(string_list(&json!(["a", 1, "b"])), vec!["a", "b"]);
        assert!(string_list(&json!(42)).is_empty());
    }

    #[test]
    fn parse_reports_wrong_shapes_with_context() {
        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Block {
            title: Option<String>,
        }
        let definition = Definition::from_value(
            "Svc",
            json!({ "kind": "service", "@ORD.dataProduct": { "title": 7 } }),
        )
        .expect("definition");
        let err = parse::<Block>(&definition, DATA_PRODUCT).expect_err("wrong shape");
        assert!(format!("{err:#}").contains("@ORD.dataProduct on Svc"));
        assert!(parse::<Block>(&definition, LIFECYCLE)
            .expect("missing key")
            .is_none());
    }
}
