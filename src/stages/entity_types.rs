use super::{enrich_each, Stage, StageContext};
use crate::annotations;
use crate::model::{bare_name, ENTITY_KIND};
use crate::record::DataProductRecord;
use anyhow::Result;

/// Collects entity-type identifiers from annotations and the service's entity elements.
pub struct EntityTypesStage;

impl Stage for EntityTypesStage {
    fn name(&self) -> &'static str {
        "entity_types"
    }

    fn process(
        &self,
        records: Vec<DataProductRecord>,
        ctx: &StageContext<'_>,
    ) -> Result<Vec<DataProductRecord>> {
        ctx.model.definitions()?;
        tracing::info!(stage = self.name(), count = records.len(), "applying entity types");
        Ok(enrich_each(self.name(), records, |record| enrich(record, ctx)))
    }
}

fn push_unique(entity_types: &mut Vec<String>, entity_type: String) {
    if !entity_types.contains(&entity_type) {
        entity_types.push(entity_type);
    }
}

fn enrich(record: &DataProductRecord, ctx: &StageContext<'_>) -> Result<DataProductRecord> {
    let Some(service) = ctx.service(record) else {
        return Ok(record.clone());
    };
    let mut entity_types = Vec::new();

    if let Some(annotated) = annotations::get(service, annotations::ENTITY_TYPES) {
        for entity_type in annotations::strings_one_or_many(annotated) {
            push_unique(&mut entity_types, entity_type);
        }
    }

    for element in service.elements.iter().filter(|element| element.is_kind(ENTITY_KIND)) {
        let declared = element
            .target
            .as_deref()
            .and_then(|target| ctx.model.definition(target))
            .and_then(|entity| annotations::get(entity, annotations::ENTITY_TYPE))
            .and_then(annotations::string);
        let entity_type = declared.unwrap_or_else(|| {
            let name = element.target.as_deref().map(bare_name).unwrap_or(&element.name);
            format!("{}:entityType:{name}:v1", ctx.namespace)
        });
        push_unique(&mut entity_types, entity_type);
    }

    for (_, target) in ctx.model.element_targets(service) {
        if !target.is_kind(ENTITY_KIND) {
            continue;
        }
        if let Some(entity_type) =
            annotations::get(target, annotations::ENTITY_TYPE).and_then(annotations::string)
        {
            push_unique(&mut entity_types, entity_type);
        }
    }

    let mut enriched = record.clone();
    if !entity_types.is_empty() {
        enriched.entity_types = Some(entity_types);
    }
    Ok(enriched)
}
