use super::{enrich_each, Stage, StageContext};
use crate::annotations;
use crate::record::{DataProductRecord, Labels};
use anyhow::Result;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaxonomyAnnotation {
    industry: Option<Value>,
    line_of_business: Option<Value>,
    countries: Option<Value>,
}

/// Normalizes industry, line of business, countries, labels, and correlation ids.
pub struct TaxonomyStage;

impl Stage for TaxonomyStage {
    fn name(&self) -> &'static str {
        "taxonomy"
    }

    fn process(
        &self,
        records: Vec<DataProductRecord>,
        ctx: &StageContext<'_>,
    ) -> Result<Vec<DataProductRecord>> {
        ctx.model.definitions()?;
        tracing::info!(stage = self.name(), count = records.len(), "applying taxonomy fields");
        Ok(enrich_each(self.name(), records, |record| enrich(record, ctx)))
    }
}

fn set(value: Option<&Value>) -> Option<&Value> {
    value.filter(|value| annotations::is_set(value))
}

fn enrich(record: &DataProductRecord, ctx: &StageContext<'_>) -> Result<DataProductRecord> {
    let Some(service) = ctx.service(record) else {
        return Ok(record.clone());
    };
    let mut enriched = record.clone();

    if let Some(taxonomy) =
        annotations::parse::<TaxonomyAnnotation>(service, annotations::TAXONOMY)?
    {
        if let Some(industry) = set(taxonomy.industry.as_ref()) {
            enriched.industry = Some(annotations::string_list(industry));
        }
        if let Some(line_of_business) = set(taxonomy.line_of_business.as_ref()) {
            enriched.line_of_business = Some(annotations::string_list(line_of_business));
        }
        if let Some(countries) = set(taxonomy.countries.as_ref()) {
            enriched.countries = Some(country_codes(countries));
        }
    }

    if enriched.industry.is_none() {
        if let Some(industry) = annotations::get(service, annotations::INDUSTRY) {
            enriched.industry = Some(annotations::string_list(industry));
        }
    }
    if enriched.line_of_business.is_none() {
        if let Some(line_of_business) = annotations::get(service, annotations::LINE_OF_BUSINESS) {
            enriched.line_of_business = Some(annotations::string_list(line_of_business));
        }
    }
    if enriched.countries.is_none() {
        if let Some(countries) = annotations::get(service, annotations::COUNTRIES) {
            enriched.countries = Some(country_codes(countries));
        }
    }

    if let Some(labels) = annotations::get(service, annotations::LABELS).and_then(process_labels) {
        enriched.labels = Some(labels);
    }
    if let Some(labels) =
        annotations::get(service, annotations::DOCUMENTATION_LABELS).and_then(process_labels)
    {
        enriched.documentation_labels = Some(labels);
    }
    if let Some(correlation_ids) = annotations::get(service, annotations::CORRELATION_IDS) {
        enriched.correlation_ids = Some(annotations::string_list(correlation_ids));
    }

    Ok(enriched)
}

/// Upper-cased ISO 3166-1 alpha-2 codes; anything else is dropped.
fn country_codes(value: &Value) -> Vec<String> {
    let alpha2 = Regex::new(r"^[A-Z]{2}$").expect("regex for country codes");
    annotations::string_list(value)
        .into_iter()
        .map(|country| country.to_uppercase())
        .filter(|country| alpha2.is_match(country))
        .collect()
}

/// Label maps: list values keep their strings, scalars become one-element lists.
pub(crate) fn process_labels(value: &Value) -> Option<Labels> {
    let fields = value.as_object()?;
    let mut labels = Labels::new();
    for (key, value) in fields {
        match value {
            Value::Array(items) => {
                let values = items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect();
                labels.insert(key.clone(), values);
            }
            Value::String(text) => {
                labels.insert(key.clone(), vec![text.clone()]);
            }
            _ => {}
        }
    }
    (!labels.is_empty()).then_some(labels)
}
