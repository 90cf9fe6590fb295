use super::{enrich_each, Stage, StageContext};
use crate::annotations;
use crate::model::{Definition, DomainModel};
use crate::record::{
    merge_unique_tags, process_tags, DataProductRecord, DataProductType, Source, Tag, Visibility,
};
use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;

/// `@ORD.dataProduct` block on a service.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataProductAnnotation {
    title: Option<String>,
    description: Option<String>,
    version: Option<String>,
    #[serde(rename = "type")]
    product_type: Option<String>,
    visibility: Option<String>,
    responsible: Option<String>,
    tags: Option<Value>,
}

/// Applies service-level `@ORD.dataProduct` metadata and entity-level schema,
/// lineage, and property tags.
pub struct AnnotationStage;

impl Stage for AnnotationStage {
    fn name(&self) -> &'static str {
        "annotations"
    }

    fn process(
        &self,
        records: Vec<DataProductRecord>,
        ctx: &StageContext<'_>,
    ) -> Result<Vec<DataProductRecord>> {
        ctx.model.definitions()?;
        let records = enrich_each(self.name(), records, |record| annotate(record, ctx));
        let annotated = records
            .iter()
            .filter(|record| record.source == Source::Annotated)
            .count();
        tracing::info!(
            stage = self.name(),
            annotated,
            total = records.len(),
            "applied annotations"
        );
        Ok(records)
    }
}

fn annotate(record: &DataProductRecord, ctx: &StageContext<'_>) -> Result<DataProductRecord> {
    let Some(service) = ctx.service(record) else {
        return Ok(record.clone());
    };
    let mut updated = record.clone();
    let mut changed = false;
    if let Some(block) =
        annotations::parse::<DataProductAnnotation>(service, annotations::DATA_PRODUCT)?
    {
        changed |= apply_service_annotation(&mut updated, block)?;
    }
    changed |= apply_entity_annotations(&mut updated, service, ctx.model);
    if changed {
        updated.source = updated.source.advance(Source::Annotated);
    }
    Ok(updated)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.is_empty())
}

fn apply_service_annotation(
    record: &mut DataProductRecord,
    block: DataProductAnnotation,
) -> Result<bool> {
    let mut changed = false;
    if let Some(title) = non_empty(block.title) {
        record.title = title;
        changed = true;
    }
    if let Some(description) = non_empty(block.description) {
        record.description = description;
        changed = true;
    }
    if let Some(version) = non_empty(block.version) {
        record.set_version(&version)?;
        changed = true;
    }
    if let Some(product_type) = non_empty(block.product_type) {
        record.product_type = DataProductType::normalize(&product_type).to_string();
        changed = true;
    }
    if let Some(visibility) = non_empty(block.visibility) {
        record.visibility = Visibility::normalize(&visibility).to_string();
        changed = true;
    }
    if let Some(responsible) = non_empty(block.responsible) {
        record.responsible = Some(responsible);
        changed = true;
    }
    if let Some(tags) = block.tags.as_ref().filter(|tags| annotations::is_set(tags)) {
        let tags = process_tags(tags);
        if !tags.is_empty() {
            merge_unique_tags(&mut record.tags, tags);
            changed = true;
        }
    }
    Ok(changed)
}

fn apply_entity_annotations(
    record: &mut DataProductRecord,
    service: &Definition,
    model: &DomainModel,
) -> bool {
    let entities = model.service_entities(service);
    let mut changed = false;

    if let Some(schema) = first_annotation(&entities, annotations::SCHEMA) {
        record.schema = Some(schema.clone());
        changed = true;
    }
    if let Some(lineage) = first_annotation(&entities, annotations::LINEAGE) {
        record.lineage = Some(lineage.clone());
        changed = true;
    }

    let property_tags: Vec<Tag> = entities
        .iter()
        .copied()
        .flat_map(|entity| entity.elements.iter())
        .filter_map(|property| annotations::get(property, annotations::TAG))
        .filter_map(Tag::from_annotation)
        .collect();
    if !property_tags.is_empty() {
        merge_unique_tags(&mut record.tags, property_tags);
        changed = true;
    }
    changed
}

fn first_annotation<'a>(entities: &[&'a Definition], key: &str) -> Option<&'a Value> {
    entities
        .iter()
        .copied()
        .find_map(|entity| annotations::get(entity, key))
}
