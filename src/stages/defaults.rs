use super::{Stage, StageContext};
use crate::record::DataProductRecord;
use anyhow::Result;

/// Seeds one default record per service definition.
///
/// This is the only stage that adds records; incoming records are discarded.
pub struct DefaultStage;

impl Stage for DefaultStage {
    fn name(&self) -> &'static str {
        "defaults"
    }

    fn process(
        &self,
        _records: Vec<DataProductRecord>,
        ctx: &StageContext<'_>,
    ) -> Result<Vec<DataProductRecord>> {
        let records: Vec<DataProductRecord> = ctx
            .model
            .services()?
            .map(|service| DataProductRecord::new(ctx.namespace, &service.name))
            .collect();
        tracing::info!(
            stage = self.name(),
            count = records.len(),
            "created default data products"
        );
        Ok(records)
    }
}
