use super::{enrich_each, Stage, StageContext};
use crate::annotations;
use crate::model::Definition;
use crate::record::{DataProductRecord, Port};
use anyhow::Result;
use serde_json::Value;

const INTEGRATION_DEPENDENCY_MARKER: &str = ":integrationDependency:";
const FALLBACK_DEPENDENCY_NAME: &str = "ExternalData";

/// Normalizes explicit input ports and auto-detects dependencies of derived products.
pub struct InputPortsStage;

impl Stage for InputPortsStage {
    fn name(&self) -> &'static str {
        "input_ports"
    }

    fn process(
        &self,
        records: Vec<DataProductRecord>,
        ctx: &StageContext<'_>,
    ) -> Result<Vec<DataProductRecord>> {
        ctx.model.definitions()?;
        tracing::info!(stage = self.name(), count = records.len(), "processing input ports");
        Ok(enrich_each(self.name(), records, |record| enrich(record, ctx)))
    }
}

fn enrich(record: &DataProductRecord, ctx: &StageContext<'_>) -> Result<DataProductRecord> {
    let Some(service) = ctx.service(record) else {
        return Ok(record.clone());
    };
    let mut enriched = record.clone();

    let ports = if let Some(explicit) = annotations::get(service, annotations::INPUT_PORTS) {
        annotations::one_or_many(explicit)
            .into_iter()
            .filter_map(|entry| explicit_port(entry, ctx.namespace))
            .collect()
    } else if let Some(dependencies) =
        annotations::get(service, annotations::INTEGRATION_DEPENDENCY)
    {
        annotations::strings_one_or_many(dependencies)
            .iter()
            .map(|dependency| Port::new(normalize_dependency_id(dependency, ctx.namespace)))
            .collect()
    } else if record.is_derived() && record.input_ports.is_none() {
        detect_external_dependencies(service, ctx)
            .iter()
            .map(|name| Port::new(dependency_id(name, ctx.namespace)))
            .collect()
    } else {
        Vec::new()
    };

    if !ports.is_empty() {
        enriched.input_ports = Some(ports);
    }
    Ok(enriched)
}

fn explicit_port(entry: &Value, namespace: &str) -> Option<Port> {
    match entry {
        Value::String(id) if !id.is_empty() => {
            Some(Port::new(normalize_dependency_id(id, namespace)))
        }
        Value::Object(fields) => {
            let id = fields.get("ordId").and_then(annotations::string)?;
            Some(Port {
                ord_id: normalize_dependency_id(&id, namespace),
                description: fields.get("description").and_then(annotations::string),
            })
        }
        _ => None,
    }
}

/// Fully qualified ids pass through; bare names are expanded with the namespace.
fn normalize_dependency_id(id: &str, namespace: &str) -> String {
    if id.contains(':') {
        return id.to_string();
    }
    dependency_id(id, namespace)
}

fn dependency_id(name: &str, namespace: &str) -> String {
    format!("{namespace}{INTEGRATION_DEPENDENCY_MARKER}{name}:v1")
}

/// Dependency names from `@ORD.externalSource` on targeted definitions and
/// `@ORD.consumes` on the service itself.
fn detect_external_dependencies(service: &Definition, ctx: &StageContext<'_>) -> Vec<String> {
    let mut names = Vec::new();
    for (_, target) in ctx.model.element_targets(service) {
        if let Some(source) = annotations::get(target, annotations::EXTERNAL_SOURCE) {
            names.push(dependency_name(source));
        }
    }
    if let Some(consumed) = annotations::get(service, annotations::CONSUMES) {
        for service_name in annotations::one_or_many(consumed) {
            names.push(dependency_name(service_name));
        }
    }
    names
}

fn dependency_name(value: &Value) -> String {
    let name = match value {
        Value::Object(fields) => fields
            .get("name")
            .or_else(|| fields.get("service"))
            .and_then(annotations::string),
        other => annotations::string(other),
    };
    name.unwrap_or_else(|| FALLBACK_DEPENDENCY_NAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dependency_ids_expand_short_names_only() {
        assert_eq!(
            normalize_dependency_id("Billing", "ns"),
            "ns:integrationDependency:Billing:v1"
        );
        assert_eq!(
            normalize_dependency_id("other:integrationDependency:X:v2", "ns"),
            "other:integrationDependency:X:v2"
        );
        assert_eq!(normalize_dependency_id("a:b", "ns"), "a:b");
    }

    #[test]
    fn explicit_ports_drop_unusable_entries() {
        assert!(explicit_port(&json!(5), "ns").is_none());
        assert!(explicit_port(&json!({ "description": "no id" }), "ns").is_none());
        let port = explicit_port(&json!({ "ordId": "Feed", "description": "raw feed" }), "ns")
            .expect("object port");
        assert_eq!(port.ord_id, "ns:integrationDependency:Feed:v1");
        assert_eq!(port.description.as_deref(), Some("raw feed"));
    }

    #[test]
    fn dependency_names_fall_back_to_placeholder() {
        assert_eq!(dependency_name(&json!("CRM")), "CRM");
        assert_eq!(dependency_name(&json!({ "service": "ERP" })), "ERP");
        assert_eq!(dependency_name(&json!(true)), "ExternalData");
    }
}
