//! Data-product record threaded through the enrichment pipeline.
//!
//! Records serialize with the same camelCase field names that override
//! documents use, so an override entry is a sparse patch over this shape.
use crate::annotations;
use anyhow::{anyhow, Result};
use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

pub const DEFAULT_VERSION: &str = "1.0.0";
pub const DEFAULT_CATEGORY: &str = "business-object";
pub const DEFAULT_RELEASE_STATUS: &str = "active";
pub const DEFAULT_RESPONSIBLE: &str = "sap:ach:CIC-DP-CO";
pub const DESCRIPTION_PREFIX: &str = "Data product for ";

/// Provenance of a record's current field values.
///
/// Ordered from least to most authoritative; [`Source::advance`] never moves
/// backwards.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    #[default]
    Default,
    Annotated,
    Custom,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Default => "default",
            Source::Annotated => "annotated",
            Source::Custom => "custom",
        }
    }

    /// Move to `proposed` only when it is more authoritative than `self`.
    pub fn advance(self, proposed: Source) -> Source {
        self.max(proposed)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataProductType {
    Primary,
    Derived,
}

impl DataProductType {
    pub const DEFAULT: DataProductType = DataProductType::Primary;
    pub const ALL: [DataProductType; 2] = [DataProductType::Primary, DataProductType::Derived];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataProductType::Primary => "primary",
            DataProductType::Derived => "derived",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }

    /// Accepted value, or the default when `value` is outside the enum.
    pub fn normalize(value: &str) -> &'static str {
        Self::parse(value).unwrap_or(Self::DEFAULT).as_str()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Internal,
    Private,
}

impl Visibility {
    pub const DEFAULT: Visibility = Visibility::Internal;
    pub const ALL: [Visibility; 3] = [
        Visibility::Public,
        Visibility::Internal,
        Visibility::Private,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Internal => "internal",
            Visibility::Private => "private",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|visibility| visibility.as_str() == value)
    }

    pub fn normalize(value: &str) -> &'static str {
        Self::parse(value).unwrap_or(Self::DEFAULT).as_str()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseStatus {
    Beta,
    Active,
    Deprecated,
    Decommissioned,
}

impl ReleaseStatus {
    pub const ALL: [ReleaseStatus; 4] = [
        ReleaseStatus::Beta,
        ReleaseStatus::Active,
        ReleaseStatus::Deprecated,
        ReleaseStatus::Decommissioned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseStatus::Beta => "beta",
            ReleaseStatus::Active => "active",
            ReleaseStatus::Deprecated => "deprecated",
            ReleaseStatus::Decommissioned => "decommissioned",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStatus {
    Inactive,
    Provisioning,
    Active,
    Deprovisioning,
    ActiveWithErrors,
}

impl LifecycleStatus {
    pub const ALL: [LifecycleStatus; 5] = [
        LifecycleStatus::Inactive,
        LifecycleStatus::Provisioning,
        LifecycleStatus::Active,
        LifecycleStatus::Deprovisioning,
        LifecycleStatus::ActiveWithErrors,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStatus::Inactive => "inactive",
            LifecycleStatus::Provisioning => "provisioning",
            LifecycleStatus::Active => "active",
            LifecycleStatus::Deprovisioning => "deprovisioning",
            LifecycleStatus::ActiveWithErrors => "active-with-errors",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Read one tag from annotation JSON.
    ///
    /// A bare string is a flag tag with value `"true"`; objects need a
    /// non-empty `key` and stringify their `value` (default `"true"`).
    pub fn from_annotation(value: &Value) -> Option<Self> {
        match value {
            Value::String(key) if !key.is_empty() => Some(Tag::new(key.clone(), "true")),
            Value::Object(fields) => {
                let key = fields.get("key").and_then(annotations::string)?;
                let value = fields
                    .get("value")
                    .filter(|value| annotations::is_set(value))
                    .and_then(annotations::scalar_string)
                    .unwrap_or_else(|| "true".to_string());
                Some(Tag::new(key, value))
            }
            _ => None,
        }
    }
}

/// Normalize a tags annotation (list of strings, list of objects, or a map).
pub fn process_tags(value: &Value) -> Vec<Tag> {
    match value {
        Value::Array(items) => items.iter().filter_map(Tag::from_annotation).collect(),
        Value::Object(fields) => fields
            .iter()
            .filter_map(|(key, value)| {
                annotations::scalar_string(value).map(|value| Tag::new(key.clone(), value))
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Add tags whose key is not already present; returns how many were added.
///
/// Existing keys always win, so repeated merges are idempotent.
pub fn merge_unique_tags(
    existing: &mut Vec<Tag>,
    incoming: impl IntoIterator<Item = Tag>,
) -> usize {
    let mut added = 0;
    for tag in incoming {
        if existing.iter().any(|current| current.key == tag.key) {
            continue;
        }
        existing.push(tag);
        added += 1;
    }
    added
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    pub ord_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Port {
    pub fn new(ord_id: impl Into<String>) -> Self {
        Self {
            ord_id: ord_id.into(),
            description: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataProductLink {
    #[serde(rename = "type")]
    pub link_type: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangelogEntry {
    pub date: String,
    #[serde(default)]
    pub description: String,
    pub release_status: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

pub type Labels = BTreeMap<String, Vec<String>>;

/// The working unit of the pipeline: one publishable data product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataProductRecord {
    pub id: String,
    pub service_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    #[serde(default)]
    pub description: String,
    pub version: String,
    #[serde(rename = "type")]
    pub product_type: String,
    pub visibility: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_of_package: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub source: Source,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunset_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub successors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog_entries: Option<Vec<ChangelogEntry>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_of_business: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub countries: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Labels>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_labels: Option<Labels>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_ids: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_ports: Option<Vec<Port>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_ports: Option<Vec<Port>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_product_links: Option<Vec<DataProductLink>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<Link>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_policy_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instance_aware: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lineage: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_details: Option<Value>,
}

impl DataProductRecord {
    /// Default record for a service definition.
    pub fn new(namespace: &str, service_name: &str) -> Self {
        let id = data_product_id(namespace, service_name, Some(DEFAULT_VERSION));
        debug_assert!(
            has_version_suffix(&id),
            "derived id {id} must end in a major-version suffix"
        );
        let description = format!("{DESCRIPTION_PREFIX}{service_name}");
        Self {
            id,
            service_name: service_name.to_string(),
            local_id: Some(service_name.to_string()),
            title: service_name.to_string(),
            short_description: None,
            description,
            version: DEFAULT_VERSION.to_string(),
            product_type: DataProductType::DEFAULT.as_str().to_string(),
            visibility: Visibility::DEFAULT.as_str().to_string(),
            category: Some(DEFAULT_CATEGORY.to_string()),
            responsible: None,
            part_of_package: None,
            tags: Vec::new(),
            source: Source::Default,
            release_status: None,
            lifecycle_status: None,
            deprecation_date: None,
            sunset_date: None,
            last_update: None,
            successors: None,
            changelog_entries: None,
            industry: None,
            line_of_business: None,
            countries: None,
            labels: None,
            documentation_labels: None,
            correlation_ids: None,
            entity_types: None,
            input_ports: None,
            output_ports: None,
            data_product_links: None,
            links: None,
            policy_level: None,
            custom_policy_level: None,
            system_instance_aware: None,
            schema: None,
            lineage: None,
            additional_details: None,
        }
    }

    pub fn is_derived(&self) -> bool {
        self.product_type == DataProductType::Derived.as_str()
    }

    /// Set a new version and recompute the id's major-version suffix.
    pub fn set_version(&mut self, version: &str) -> Result<()> {
        self.id = replace_version_suffix(&self.id, version)?;
        self.version = version.to_string();
        Ok(())
    }
}

/// Field-level difference recorded when an override replaces a prior value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictField {
    pub field: String,
    pub previous_value: Value,
    pub custom_value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeConflict {
    pub record_id: String,
    pub fields: Vec<ConflictField>,
}

/// Major component of a semantic version (`"2.1.0"` -> `"2"`).
pub fn major_version(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}

/// `{namespace}:dataProduct:{service}:v{major}`; a missing version yields `v1`.
pub fn data_product_id(namespace: &str, service_name: &str, version: Option<&str>) -> String {
    let major = version.map(major_version).unwrap_or("1");
    format!("{namespace}:dataProduct:{service_name}:v{major}")
}

fn version_suffix_regex() -> Regex {
    Regex::new(r"v\d+$").expect("regex for version suffix")
}

pub fn has_version_suffix(id: &str) -> bool {
    version_suffix_regex().is_match(id)
}

/// Replace the trailing `v<digits>` of an id with the major version of `version`.
pub fn replace_version_suffix(id: &str, version: &str) -> Result<String> {
    let regex = version_suffix_regex();
    if !regex.is_match(id) {
        return Err(anyhow!(
            "id {id} does not end in a major-version suffix; cannot apply version {version}"
        ));
    }
    let suffix = format!("v{}", major_version(version));
    Ok(regex.replace(id, NoExpand(&suffix)).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn source_advance_is_monotonic() {
        assert_eq!(Source::Default.advance(Source::Annotated), Source::Annotated);
        assert_eq!(Source::Annotated.advance(Source::Default), Source::Annotated);
        assert_eq!(Source::Custom.advance(Source::Annotated), Source::Custom);
        assert_eq!(Source::Default.advance(Source::Custom), Source::Custom);
    }

    #[test]
    fn default_record_uses_namespace_and_major_version() {
        let record = DataProductRecord::new("com.example", "CustomerService");
        assert_eq!(record.id, "com.example:dataProduct:CustomerService:v1");
        assert_eq!(record.title, "CustomerService");
        assert_eq!(record.description, "Data product for CustomerService");
        assert_eq!(record.product_type, "primary");
        assert_eq!(record.visibility, "internal");
        assert_eq!(record.source, Source::Default);
        assert!(record.tags.is_empty());
    }

    #[test]
    fn version_change_rewrites_only_the_suffix() {
        let mut record = DataProductRecord::new("v1.ns", "Svc");
        record.set_version("3.2.1").expect("set version");
        assert_eq!(record.id, "v1.ns:dataProduct:Svc:v3");
        assert_eq!(record.version, "3.2.1");
    }

    #[test]
    fn version_suffix_is_inserted_literally() {
        assert_eq!(
            replace_version_suffix("ns:dataProduct:Svc:v1", "$2.0.0").expect("replace"),
            "ns:dataProduct:Svc:v$2"
        );
    }

    #[test]
    fn version_change_rejects_ids_without_suffix() {
        let err = replace_version_suffix("ns:dataProduct:Svc", "2.0.0").expect_err("no suffix");
        assert!(err.to_string().contains("major-version suffix"));
    }

    #[test]
    fn enum_normalization_falls_back_to_defaults() {
        assert_eq!(DataProductType::normalize("derived"), "derived");
        assert_eq!(DataProductType::normalize("weird"), "primary");
        assert_eq!(Visibility::normalize("public"), "public");
        assert_eq!(Visibility::normalize("secret"), "internal");
        assert!(ReleaseStatus::parse("retired").is_none());
        assert_eq!(
            LifecycleStatus::parse("active-with-errors"),
            Some(LifecycleStatus::ActiveWithErrors)
        );
    }

    #[test]
    fn tags_accept_strings_objects_and_maps() {
        let from_list = process_tags(&json!([
            "pii",
            { "key": "domain", "value": "sales" },
            { "key": "n", "value": 3 }
        ]));
        assert_eq!(
            from_list,
            vec![
                Tag::new("pii", "true"),
                Tag::new("domain", "sales"),
                Tag::new("n", "3")
            ]
        );
        let from_map = process_tags(&json!({ "tier": "gold", "hot": true }));
        assert_eq!(from_map, vec![Tag::new("tier", "gold"), Tag::new("hot", "true")]);
    }

    #[test]
    fn merge_unique_tags_never_overwrites_existing_keys() {
        let mut tags = vec![Tag::new("domain", "sales")];
        let incoming = vec![Tag::new("domain", "finance"), Tag::new("pii", "true")];
        assert_eq!(merge_unique_tags(&mut tags, incoming.clone()), 1);
        assert_eq!(merge_unique_tags(&mut tags, incoming), 0);
        assert_eq!(tags, vec![Tag::new("domain", "sales"), Tag::new("pii", "true")]);
    }

    #[test]
    fn record_serializes_with_camel_case_keys() {
        let record = DataProductRecord::new("ns", "Svc");
        let value = serde_json::to_value(&record).expect("serialize");
        assert_eq!(value["serviceName"], "Svc");
        assert_eq!(value["type"], "primary");
        assert_eq!(value["source"], "default");
        assert!(value.get("releaseStatus").is_none());
    }
}
