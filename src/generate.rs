//! Entry point that turns a domain model into published data products.
use crate::builder::{build_data_products, DataProductDocument};
use crate::config::{data_products_enabled, resolve_custom_config_path, AppConfig, OrdSettings};
use crate::model::DomainModel;
use crate::stages::{Pipeline, StageContext};
use anyhow::Result;
use std::path::Path;

/// Run the pipeline and build documents, without consulting the feature gate.
///
/// Fails only when a stage cannot start (for example, a model without
/// definitions); per-record problems are logged and absorbed.
pub fn run_data_products(
    model: &DomainModel,
    app: &AppConfig,
    settings: &OrdSettings,
    project_root: &Path,
) -> Result<Vec<DataProductDocument>> {
    let ctx = StageContext::new(model, &app.ord_namespace, project_root)
        .with_custom_config(settings.custom_ord_content_file.as_deref());
    let records = Pipeline::standard().run(&ctx)?;
    let documents = build_data_products(&records, model, app.primary_package());
    tracing::info!(
        records = records.len(),
        documents = documents.len(),
        "built data products"
    );
    Ok(documents)
}

/// Generate data products when the feature is enabled.
///
/// Returns an empty list when the feature is off or the run fails; the
/// failure is logged with enough context to locate the inputs.
pub fn process_data_products(
    model: &DomainModel,
    app: &AppConfig,
    settings: &OrdSettings,
    project_root: &Path,
) -> Vec<DataProductDocument> {
    if !data_products_enabled(settings) {
        tracing::debug!("data product generation is disabled");
        return Vec::new();
    }
    match run_data_products(model, app, settings, project_root) {
        Ok(documents) => documents,
        Err(err) => {
            let custom_config = resolve_custom_config_path(
                settings.custom_ord_content_file.as_deref(),
                project_root,
            );
            tracing::error!(
                namespace = %app.ord_namespace,
                custom_config = %custom_config.display(),
                error = %format!("{err:#}"),
                "data product generation failed"
            );
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn enabled() -> OrdSettings {
        let mut settings = OrdSettings::default();
        settings.features.data_products = true;
        settings
    }

    fn customer_model() -> DomainModel {
        DomainModel::from_value(json!({
            "definitions": {
                "CustomerService": { "kind": "service" }
            }
        }))
        .expect("parse model")
    }

    #[test]
    fn enabled_generation_builds_documents_with_package() {
        let root = tempfile::tempdir().expect("create temp dir");
        let app = AppConfig::new("com.example").with_package("com.example:package:Main:v1");
        let documents = process_data_products(&customer_model(), &app, &enabled(), root.path());
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].ord_id, "com.example:dataProduct:CustomerService:v1");
        assert_eq!(
            documents[0].part_of_package.as_deref(),
            Some("com.example:package:Main:v1")
        );
    }

    #[test]
    fn fatal_errors_degrade_to_empty_output() {
        let root = tempfile::tempdir().expect("create temp dir");
        let app = AppConfig::new("com.example");
        assert!(run_data_products(&DomainModel::empty(), &app, &enabled(), root.path()).is_err());
        assert!(
            process_data_products(&DomainModel::empty(), &app, &enabled(), root.path()).is_empty()
        );
    }

    #[test]
    fn custom_content_file_setting_is_honored() {
        let root = tempfile::tempdir().expect("create temp dir");
        let overrides = json!({
            "dataProducts": [
                { "id": "com.example:dataProduct:CustomerService:v1", "title": "Customers" }
            ]
        });
        std::fs::write(root.path().join("overrides.json"), overrides.to_string())
            .expect("write overrides");
        let mut settings = enabled();
        settings.custom_ord_content_file = Some("overrides.json".into());

        let app = AppConfig::new("com.example");
        let documents =
            run_data_products(&customer_model(), &app, &settings, root.path()).expect("run");
        assert_eq!(documents[0].title, "Customers");
        assert_eq!(documents[0].source.as_str(), "custom");
    }
}
