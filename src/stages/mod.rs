//! Enrichment stages and the pipeline that chains them.
//!
//! Every stage receives the full record collection and returns the collection
//! the next stage should see. Stages always run, front to back. A stage that
//! cannot start at all returns `Err`, which aborts the run; failures while
//! enriching a single record are absorbed by [`enrich_each`] and leave that
//! record untouched.
use crate::model::{Definition, DomainModel};
use crate::record::DataProductRecord;
use anyhow::Result;
use std::path::Path;

mod annotate;
mod defaults;
mod entity_types;
mod governance;
mod input_ports;
mod lifecycle;
mod links;
mod overrides;
mod taxonomy;

pub use annotate::AnnotationStage;
pub use defaults::DefaultStage;
pub use entity_types::EntityTypesStage;
pub use governance::GovernanceStage;
pub use input_ports::InputPortsStage;
pub use lifecycle::LifecycleStage;
pub use links::LinksStage;
pub use overrides::OverrideStage;
pub use taxonomy::TaxonomyStage;

/// Immutable inputs shared by all stages of one run.
#[derive(Debug, Clone, Copy)]
pub struct StageContext<'a> {
    pub model: &'a DomainModel,
    pub namespace: &'a str,
    /// Explicit override document path; `None` means the default location.
    pub custom_config_path: Option<&'a Path>,
    /// Root that relative override paths resolve against.
    pub project_root: &'a Path,
}

impl<'a> StageContext<'a> {
    pub fn new(model: &'a DomainModel, namespace: &'a str, project_root: &'a Path) -> Self {
        Self {
            model,
            namespace,
            custom_config_path: None,
            project_root,
        }
    }

    pub fn with_custom_config(mut self, path: Option<&'a Path>) -> Self {
        self.custom_config_path = path;
        self
    }

    /// Originating service definition for a record, if it still exists.
    pub fn service(&self, record: &DataProductRecord) -> Option<&'a Definition> {
        self.model.definition(&record.service_name)
    }
}

/// One unit of enrichment.
pub trait Stage {
    /// Stable name used in logs.
    fn name(&self) -> &'static str;

    fn process(
        &self,
        records: Vec<DataProductRecord>,
        ctx: &StageContext<'_>,
    ) -> Result<Vec<DataProductRecord>>;
}

/// Apply `enrich` to every record, isolating failures per record.
///
/// A failing record is logged and forwarded unchanged.
pub(crate) fn enrich_each<F>(
    stage: &'static str,
    records: Vec<DataProductRecord>,
    mut enrich: F,
) -> Vec<DataProductRecord>
where
    F: FnMut(&DataProductRecord) -> Result<DataProductRecord>,
{
    records
        .into_iter()
        .map(|record| match enrich(&record) {
            Ok(enriched) => enriched,
            Err(err) => {
                tracing::warn!(
                    stage,
                    record_id = %record.id,
                    error = %format!("{err:#}"),
                    "record enrichment failed; passing record through unchanged"
                );
                record
            }
        })
        .collect()
}

/// Ordered chain of stages.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// The standard chain: defaults, annotations, the specialized stages, then overrides.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(DefaultStage),
            Box::new(AnnotationStage),
            Box::new(LifecycleStage),
            Box::new(TaxonomyStage),
            Box::new(EntityTypesStage),
            Box::new(InputPortsStage),
            Box::new(LinksStage),
            Box::new(GovernanceStage),
            Box::new(OverrideStage),
        ])
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Run every stage in order, starting from an empty collection.
    pub fn run(&self, ctx: &StageContext<'_>) -> Result<Vec<DataProductRecord>> {
        tracing::info!(stages = self.stages.len(), "starting data product pipeline");
        let records = self
            .stages
            .iter()
            .try_fold(Vec::new(), |records, stage| match stage.process(records, ctx) {
                Ok(records) => Ok(records),
                Err(err) => {
                    tracing::error!(
                        stage = stage.name(),
                        error = %format!("{err:#}"),
                        "pipeline stage failed"
                    );
                    Err(err.context(format!("stage {}", stage.name())))
                }
            })?;
        tracing::info!(count = records.len(), "data product pipeline complete");
        Ok(records)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
#[path = "stages_tests.rs"]
mod tests;
