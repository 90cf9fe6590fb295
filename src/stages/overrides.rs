use super::{Stage, StageContext};
use crate::config::load_custom_configuration;
use crate::merge::merge_configuration;
use crate::record::DataProductRecord;
use anyhow::Result;

/// Merges the external override document into the pipeline output.
pub struct OverrideStage;

impl Stage for OverrideStage {
    fn name(&self) -> &'static str {
        "overrides"
    }

    fn process(
        &self,
        records: Vec<DataProductRecord>,
        ctx: &StageContext<'_>,
    ) -> Result<Vec<DataProductRecord>> {
        let Some(config) = load_custom_configuration(ctx.custom_config_path, ctx.project_root)
            .filter(|config| !config.is_empty())
        else {
            tracing::info!(stage = self.name(), "no custom data products defined");
            return Ok(records);
        };

        let outcome = merge_configuration(records, &config);
        tracing::info!(
            stage = self.name(),
            merged = outcome.merged_count,
            ignored = outcome.ignored_ids.len(),
            conflicts = outcome.conflicts.len(),
            "merged custom data products"
        );
        for conflict in &outcome.conflicts {
            let fields: Vec<&str> = conflict
                .fields
                .iter()
                .map(|field| field.field.as_str())
                .collect();
            tracing::debug!(
                record_id = %conflict.record_id,
                fields = %fields.join(", "),
                "custom configuration overrode fields"
            );
        }
        Ok(outcome.records)
    }
}
