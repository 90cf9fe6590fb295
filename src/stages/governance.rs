use super::{enrich_each, Stage, StageContext};
use crate::annotations;
use crate::record::DataProductRecord;
use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;

const COMPLIANCE_LABEL: &str = "compliance";
const DATA_CLASSIFICATION_LABEL: &str = "data-classification";
const PERSONAL_DATA_LABEL: &str = "personal-data";
const DATA_RETENTION_LABEL: &str = "Data Retention";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GovernanceAnnotation {
    policy_level: Option<String>,
    system_instance_aware: Option<Value>,
    custom_policy_level: Option<String>,
}

/// Maps `@ORD.governance` and the individual governance annotations to policy
/// fields and classification labels.
pub struct GovernanceStage;

impl Stage for GovernanceStage {
    fn name(&self) -> &'static str {
        "governance"
    }

    fn process(
        &self,
        records: Vec<DataProductRecord>,
        ctx: &StageContext<'_>,
    ) -> Result<Vec<DataProductRecord>> {
        ctx.model.definitions()?;
        tracing::info!(stage = self.name(), count = records.len(), "applying governance fields");
        Ok(enrich_each(self.name(), records, |record| enrich(record, ctx)))
    }
}

fn enrich(record: &DataProductRecord, ctx: &StageContext<'_>) -> Result<DataProductRecord> {
    let Some(service) = ctx.service(record) else {
        return Ok(record.clone());
    };
    let mut enriched = record.clone();

    if let Some(governance) =
        annotations::parse::<GovernanceAnnotation>(service, annotations::GOVERNANCE)?
    {
        if let Some(policy_level) = governance.policy_level.filter(|level| !level.is_empty()) {
            enriched.policy_level = Some(policy_level);
        }
        if let Some(Value::Bool(aware)) = governance.system_instance_aware {
            enriched.system_instance_aware = Some(aware);
        }
        if let Some(level) = governance.custom_policy_level.filter(|level| !level.is_empty()) {
            enriched.custom_policy_level = Some(level);
        }
    }

    if enriched.policy_level.is_none() {
        if let Some(policy_level) =
            annotations::get(service, annotations::POLICY_LEVEL).and_then(annotations::string)
        {
            enriched.policy_level = Some(policy_level);
        }
    }
    if enriched.system_instance_aware.is_none() {
        if let Some(Value::Bool(aware)) = service.annotation(annotations::SYSTEM_INSTANCE_AWARE) {
            enriched.system_instance_aware = Some(*aware);
        }
    }

    if let Some(compliance) = annotations::get(service, annotations::COMPLIANCE) {
        let values: Vec<String> = annotations::one_or_many(compliance)
            .into_iter()
            .filter_map(annotations::scalar_string)
            .collect();
        enriched
            .labels
            .get_or_insert_with(Default::default)
            .insert(COMPLIANCE_LABEL.to_string(), values);
    }
    if let Some(classification) = annotations::get(service, annotations::DATA_CLASSIFICATION)
        .and_then(annotations::scalar_string)
    {
        enriched
            .labels
            .get_or_insert_with(Default::default)
            .insert(DATA_CLASSIFICATION_LABEL.to_string(), vec![classification]);
    }
    if let Some(retention) = annotations::get(service, annotations::DATA_RETENTION)
        .and_then(annotations::scalar_string)
    {
        enriched
            .documentation_labels
            .get_or_insert_with(Default::default)
            .insert(DATA_RETENTION_LABEL.to_string(), vec![retention]);
    }
    if let Some(personal_data) = annotations::get(service, annotations::PERSONAL_DATA)
        .and_then(annotations::scalar_string)
    {
        enriched
            .labels
            .get_or_insert_with(Default::default)
            .insert(PERSONAL_DATA_LABEL.to_string(), vec![personal_data]);
    }

    Ok(enriched)
}
