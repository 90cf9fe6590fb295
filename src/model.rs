//! Typed view of the compiled domain model.
//!
//! The model is a mapping from definition name to definition. Each definition
//! carries an optional `kind`, an optional `target` (for elements that point at
//! another definition), its `@`-prefixed annotations, and nested `elements`.
//! Definition and element order from the source JSON is preserved so that
//! "first match" lookups are deterministic.
use anyhow::{anyhow, Context, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const SERVICE_KIND: &str = "service";
pub const ENTITY_KIND: &str = "entity";
pub const EVENT_KIND: &str = "event";

/// A single definition (or nested element) of the domain model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Definition {
    pub name: String,
    pub kind: Option<String>,
    pub target: Option<String>,
    pub annotations: Map<String, Value>,
    pub elements: Vec<Definition>,
}

impl Definition {
    /// Parse one definition object; `name` is only used for error context.
    pub fn from_value(name: &str, value: Value) -> Result<Self> {
        let Value::Object(fields) = value else {
            return Err(anyhow!("definition {name} must be a JSON object"));
        };
        let mut definition = Definition {
            name: name.to_string(),
            ..Definition::default()
        };
        for (key, value) in fields {
            if key.starts_with('@') {
                definition.annotations.insert(key, value);
                continue;
            }
            match key.as_str() {
                "kind" => definition.kind = value.as_str().map(str::to_string),
                "target" => definition.target = value.as_str().map(str::to_string),
                "elements" => {
                    let Value::Object(elements) = value else {
                        return Err(anyhow!("elements of {name} must be a JSON object"));
                    };
                    for (element_name, element) in elements {
                        let element = Definition::from_value(&element_name, element)
                            .with_context(|| format!("parse element of {name}"))?;
                        definition.elements.push(element);
                    }
                }
                _ => {}
            }
        }
        Ok(definition)
    }

    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind.as_deref() == Some(kind)
    }

    pub fn annotation(&self, key: &str) -> Option<&Value> {
        self.annotations.get(key)
    }

    /// Last dotted segment of the definition name (`Sales.Orders` -> `Orders`).
    pub fn bare_name(&self) -> &str {
        bare_name(&self.name)
    }
}

pub fn bare_name(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}

/// The compiled domain model handed to the pipeline.
///
/// `definitions` is `None` when the source document has no `definitions`
/// mapping at all; stages treat that as a fatal condition.
#[derive(Debug, Clone, Default)]
pub struct DomainModel {
    definitions: Option<Vec<Definition>>,
    index: BTreeMap<String, usize>,
}

impl DomainModel {
    pub fn new(definitions: Vec<Definition>) -> Self {
        let index = definitions
            .iter()
            .enumerate()
            .map(|(idx, definition)| (definition.name.clone(), idx))
            .collect();
        Self {
            definitions: Some(definitions),
            index,
        }
    }

    /// A model without a definitions mapping.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut root) = value else {
            return Err(anyhow!("domain model must be a JSON object"));
        };
        let Some(definitions) = root.remove("definitions") else {
            return Ok(Self::empty());
        };
        let Value::Object(definitions) = definitions else {
            return Err(anyhow!("domain model definitions must be a JSON object"));
        };
        let mut parsed = Vec::with_capacity(definitions.len());
        for (name, definition) in definitions {
            parsed.push(Definition::from_value(&name, definition)?);
        }
        Ok(Self::new(parsed))
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).context("parse domain model JSON")?;
        Self::from_value(value)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read domain model {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("load {}", path.display()))
    }

    /// All definitions in source order, or an error when the model has none.
    pub fn definitions(&self) -> Result<&[Definition]> {
        self.definitions
            .as_deref()
            .ok_or_else(|| anyhow!("domain model has no definitions"))
    }

    pub fn definition(&self, name: &str) -> Option<&Definition> {
        let idx = *self.index.get(name)?;
        self.definitions.as_ref()?.get(idx)
    }

    pub fn services(&self) -> Result<impl Iterator<Item = &Definition>> {
        Ok(self
            .definitions()?
            .iter()
            .filter(|definition| definition.is_kind(SERVICE_KIND)))
    }

    /// Definitions targeted by the service's entity-kind elements.
    pub fn service_entities<'a>(&'a self, service: &'a Definition) -> Vec<&'a Definition> {
        service
            .elements
            .iter()
            .filter(|element| element.is_kind(ENTITY_KIND))
            .filter_map(|element| element.target.as_deref())
            .filter_map(|target| self.definition(target))
            .collect()
    }

    /// Pairs of (element, resolved target definition) for every element with a target.
    pub fn element_targets<'a>(
        &'a self,
        service: &'a Definition,
    ) -> impl Iterator<Item = (&'a Definition, &'a Definition)> + 'a {
        service.elements.iter().filter_map(move |element| {
            let target = element.target.as_deref()?;
            self.definition(target).map(|definition| (element, definition))
        })
    }

    /// True when the service exposes an event directly or through a referenced event definition.
    pub fn exposes_events(&self, service: &Definition) -> bool {
        service.elements.iter().any(|element| {
            element.is_kind(EVENT_KIND)
                || element
                    .target
                    .as_deref()
                    .and_then(|target| self.definition(target))
                    .is_some_and(|definition| definition.is_kind(EVENT_KIND))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sales_model() -> DomainModel {
        DomainModel::from_value(json!({
            "definitions": {
                "SalesService": {
                    "kind": "service",
                    "@ORD.dataProduct": { "title": "Sales" },
                    "elements": {
                        "Orders": { "kind": "entity", "target": "SalesService.Orders" },
                        "Shipped": { "target": "Sales.Shipped" }
                    }
                },
                "SalesService.Orders": { "kind": "entity" },
                "Sales.Shipped": { "kind": "event" },
                "Helper": { "kind": "type" }
            }
        }))
        .expect("parse model")
    }

    #[test]
    fn preserves_definition_order_and_annotations() {
        let model = sales_model();
        let names: Vec<&str> = model
            .definitions()
            .expect("definitions")
            .iter()
            .map(|definition| definition.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["SalesService", "SalesService.Orders", "Sales.Shipped", "Helper"]
        );
        let service = model.definition("SalesService").expect("service");
        assert!(service.annotation("@ORD.dataProduct").is_some());
        assert_eq!(service.elements.len(), 2);
    }

    #[test]
    fn resolves_entities_and_events_through_targets() {
        let model = sales_model();
        let service = model.definition("SalesService").expect("service");
        let entities = model.service_entities(service);
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].bare_name(), "Orders");
        assert!(model.exposes_events(service));
    }

    #[test]
    fn missing_definitions_is_reported_on_access() {
        let model = DomainModel::from_value(json!({ "namespace": "x" })).expect("parse");
        assert!(model.definitions().is_err());
        assert!(model.definition("anything").is_none());
    }

    #[test]
    fn rejects_non_object_definitions() {
        let err = DomainModel::from_value(json!({ "definitions": { "Broken": 3 } }))
            .expect_err("non-object definition");
        assert!(err.to_string().contains("Broken"));
    }
}
