//! Maps enriched records to published data product documents.
use crate::config::PackageInfo;
use crate::model::DomainModel;
use crate::record::{
    ChangelogEntry, DataProductLink, DataProductRecord, Labels, Link, Port, Source, Tag,
    DEFAULT_CATEGORY, DEFAULT_RELEASE_STATUS, DEFAULT_RESPONSIBLE,
};
use crate::validate::validate_document;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Published data product document.
///
/// Optional sequences and maps are omitted when empty.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataProductDocument {
    pub ord_id: String,
    pub local_id: String,
    pub title: String,
    pub short_description: String,
    pub description: String,
    pub version: String,
    pub release_status: String,
    pub visibility: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_of_package: Option<String>,
    pub responsible: String,
    #[serde(rename = "type")]
    pub product_type: String,
    pub category: String,
    #[serde(default)]
    pub output_ports: Vec<Port>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input_ports: Vec<Port>,
    #[serde(default)]
    pub source: Source,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub industry: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line_of_business: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub countries: Vec<String>,
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub documentation_labels: Labels,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub correlation_ids: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunset_date: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub successors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changelog_entries: Vec<ChangelogEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_policy_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instance_aware: Option<bool>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_product_links: Vec<DataProductLink>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lineage: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entity_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_details: Option<Value>,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|text| !text.is_empty()).map(str::to_string)
}

fn list<T: Clone>(value: &Option<Vec<T>>) -> Vec<T> {
    value.clone().unwrap_or_default()
}

fn empty_object_as_none(value: &Option<Value>) -> Option<Value> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::Object(fields)) if fields.is_empty() => None,
        Some(Value::Array(items)) if items.is_empty() => None,
        Some(other) => Some(other.clone()),
    }
}

/// Assemble and validate the document for one record.
///
/// Explicit output ports on the record win; otherwise they are derived from
/// the originating service. The short description is the description unless
/// an override set one.
pub fn build_data_product(
    record: &DataProductRecord,
    model: &DomainModel,
) -> Result<DataProductDocument> {
    let description =
        non_empty(Some(record.description.as_str())).unwrap_or_else(|| record.title.clone());
    let output_ports = match record.output_ports.as_ref().filter(|ports| !ports.is_empty()) {
        Some(ports) => ports.clone(),
        None => generate_output_ports(&record.service_name, model, &record.id),
    };

    let document = DataProductDocument {
        ord_id: record.id.clone(),
        local_id: non_empty(record.local_id.as_deref())
            .unwrap_or_else(|| record.service_name.clone()),
        title: record.title.clone(),
        short_description: non_empty(record.short_description.as_deref())
            .unwrap_or_else(|| description.clone()),
        description,
        version: record.version.clone(),
        release_status: non_empty(record.release_status.as_deref())
            .unwrap_or_else(|| DEFAULT_RELEASE_STATUS.to_string()),
        visibility: record.visibility.clone(),
        part_of_package: non_empty(record.part_of_package.as_deref()),
        responsible: non_empty(record.responsible.as_deref())
            .unwrap_or_else(|| DEFAULT_RESPONSIBLE.to_string()),
        product_type: record.product_type.clone(),
        category: non_empty(record.category.as_deref())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        output_ports,
        input_ports: list(&record.input_ports),
        source: record.source,
        tags: record.tags.clone(),
        industry: list(&record.industry),
        line_of_business: list(&record.line_of_business),
        countries: list(&record.countries),
        labels: record.labels.clone().unwrap_or_default(),
        documentation_labels: record.documentation_labels.clone().unwrap_or_default(),
        correlation_ids: list(&record.correlation_ids),
        lifecycle_status: non_empty(record.lifecycle_status.as_deref()),
        deprecation_date: non_empty(record.deprecation_date.as_deref()),
        sunset_date: non_empty(record.sunset_date.as_deref()),
        successors: list(&record.successors),
        changelog_entries: list(&record.changelog_entries),
        last_update: non_empty(record.last_update.as_deref()),
        policy_level: non_empty(record.policy_level.as_deref()),
        custom_policy_level: non_empty(record.custom_policy_level.as_deref()),
        system_instance_aware: record.system_instance_aware,
        data_product_links: list(&record.data_product_links),
        links: list(&record.links),
        schema: empty_object_as_none(&record.schema),
        lineage: empty_object_as_none(&record.lineage),
        entity_types: list(&record.entity_types),
        additional_details: empty_object_as_none(&record.additional_details),
    };

    let errors = validate_document(&document);
    if !errors.is_empty() {
        return Err(anyhow!(
            "data product {} has validation errors: {}",
            record.id,
            errors.join(", ")
        ));
    }
    Ok(document)
}

/// Output ports derived from the service: an API resource port, plus an
/// event resource port when the service exposes events.
pub fn generate_output_ports(
    service_name: &str,
    model: &DomainModel,
    data_product_id: &str,
) -> Vec<Port> {
    let Some(service) = model.definition(service_name) else {
        return Vec::new();
    };
    let namespace = data_product_id.split(':').next().unwrap_or_default();
    let mut ports = vec![Port::new(format!(
        "{namespace}:apiResource:{service_name}:v1"
    ))];
    if model.exposes_events(service) {
        ports.push(Port::new(format!(
            "{namespace}:eventResource:{service_name}:v1"
        )));
    }
    ports
}

/// Build every record, dropping (and logging) the ones that fail validation.
pub fn build_data_products(
    records: &[DataProductRecord],
    model: &DomainModel,
    package: Option<&PackageInfo>,
) -> Vec<DataProductDocument> {
    let mut documents = Vec::with_capacity(records.len());
    for record in records {
        let result = if record.part_of_package.is_none() && package.is_some() {
            let mut packaged = record.clone();
            packaged.part_of_package = package.map(|package| package.ord_id.clone());
            build_data_product(&packaged, model)
        } else {
            build_data_product(record, model)
        };
        match result {
            Ok(document) => documents.push(document),
            Err(err) => {
                tracing::error!(
                    record_id = %record.id,
                    error = %format!("{err:#}"),
                    "failed to build data product"
                );
            }
        }
    }
    documents
}

#[cfg(test)]
#[path = "builder_tests.rs"]
mod tests;
