use super::{enrich_each, Stage, StageContext};
use crate::annotations;
use crate::record::{DataProductLink, DataProductRecord, Link};
use anyhow::Result;
use serde_json::Value;

const DEFAULT_LINK_TYPE: &str = "support";
const CUSTOM_LINK_TYPE: &str = "custom";
const DEFAULT_LINK_TITLE: &str = "Related Link";
const SHORTHAND_LINK_TYPES: [&str; 4] = ["support", "payment", "service-level-agreement", "custom"];

/// Maps `@ORD.dataProductLinks`, `@ORD.links`, and the `@ORD.<type>Link`
/// shorthands to typed links.
pub struct LinksStage;

impl Stage for LinksStage {
    fn name(&self) -> &'static str {
        "links"
    }

    fn process(
        &self,
        records: Vec<DataProductRecord>,
        ctx: &StageContext<'_>,
    ) -> Result<Vec<DataProductRecord>> {
        ctx.model.definitions()?;
        tracing::info!(stage = self.name(), count = records.len(), "processing data product links");
        Ok(enrich_each(self.name(), records, |record| enrich(record, ctx)))
    }
}

fn enrich(record: &DataProductRecord, ctx: &StageContext<'_>) -> Result<DataProductRecord> {
    let Some(service) = ctx.service(record) else {
        return Ok(record.clone());
    };
    let mut enriched = record.clone();

    if let Some(links) = annotations::get(service, annotations::DATA_PRODUCT_LINKS) {
        let links: Vec<DataProductLink> = annotations::one_or_many(links)
            .into_iter()
            .filter_map(data_product_link)
            .collect();
        if !links.is_empty() {
            enriched.data_product_links = Some(links);
        }
    }

    if let Some(links) = annotations::get(service, annotations::LINKS) {
        let links: Vec<Link> = annotations::one_or_many(links)
            .into_iter()
            .filter_map(general_link)
            .collect();
        if !links.is_empty() {
            enriched.links = Some(links);
        }
    }

    let shorthand: Vec<DataProductLink> = SHORTHAND_LINK_TYPES
        .iter()
        .filter_map(|link_type| {
            let url = annotations::get(service, &annotations::link_annotation(link_type))
                .and_then(annotations::string)?;
            let custom_type = if *link_type == CUSTOM_LINK_TYPE {
                annotations::get(service, annotations::CUSTOM_LINK_TYPE)
                    .and_then(annotations::string)
            } else {
                None
            };
            Some(DataProductLink {
                link_type: link_type.to_string(),
                url,
                custom_type,
            })
        })
        .collect();
    if !shorthand.is_empty() {
        enriched
            .data_product_links
            .get_or_insert_with(Vec::new)
            .extend(shorthand);
    }

    Ok(enriched)
}

/// A bare URL becomes a support link; objects need a `url`.
fn data_product_link(value: &Value) -> Option<DataProductLink> {
    match value {
        Value::String(url) if !url.is_empty() => Some(DataProductLink {
            link_type: DEFAULT_LINK_TYPE.to_string(),
            url: url.clone(),
            custom_type: None,
        }),
        Value::Object(fields) => {
            let url = fields.get("url").and_then(annotations::string)?;
            let link_type = fields
                .get("type")
                .and_then(annotations::string)
                .unwrap_or_else(|| DEFAULT_LINK_TYPE.to_string());
            let custom_type = if link_type == CUSTOM_LINK_TYPE {
                fields.get("customType").and_then(annotations::string)
            } else {
                None
            };
            Some(DataProductLink {
                link_type,
                url,
                custom_type,
            })
        }
        _ => None,
    }
}

fn general_link(value: &Value) -> Option<Link> {
    match value {
        Value::String(url) if !url.is_empty() => Some(Link {
            title: DEFAULT_LINK_TITLE.to_string(),
            description: String::new(),
            url: url.clone(),
        }),
        Value::Object(fields) => {
            let url = fields.get("url").and_then(annotations::string)?;
            Some(Link {
                title: fields
                    .get("title")
                    .and_then(annotations::string)
                    .unwrap_or_else(|| DEFAULT_LINK_TITLE.to_string()),
                description: fields
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                url,
            })
        }
        _ => None,
    }
}
