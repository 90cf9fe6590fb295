//! Override document loading and generator settings.
//!
//! The override document is optional input: a missing file and an unreadable
//! or malformed file both mean "no overrides" for the run.
use crate::validate::validate_configuration;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default override document location, relative to the project root.
pub const DEFAULT_CUSTOM_CONFIG_REL: &str = "ord/custom.ord.json";
/// Environment switch that enables data product generation.
pub const ENABLE_ENV_VAR: &str = "ORD_ENABLE_DATA_PRODUCTS";

/// External override document: `{ "dataProducts": [partial-record, ...] }`.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomConfiguration {
    #[serde(default)]
    pub data_products: Vec<Map<String, Value>>,
}

impl CustomConfiguration {
    pub fn is_empty(&self) -> bool {
        self.data_products.is_empty()
    }
}

/// Generator settings (the `ord` section of the host build configuration).
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_ord_content_file: Option<PathBuf>,
    #[serde(default)]
    pub features: Features,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Features {
    #[serde(default)]
    pub data_products: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageInfo {
    pub ord_id: String,
}

/// Application-level inputs: the target namespace and known packages.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub ord_namespace: String,
    #[serde(default)]
    pub packages: Vec<PackageInfo>,
}

impl AppConfig {
    pub fn new(ord_namespace: impl Into<String>) -> Self {
        Self {
            ord_namespace: ord_namespace.into(),
            packages: Vec::new(),
        }
    }

    pub fn with_package(mut self, ord_id: impl Into<String>) -> Self {
        self.packages.push(PackageInfo {
            ord_id: ord_id.into(),
        });
        self
    }

    /// The first package; simple projects have exactly one.
    pub fn primary_package(&self) -> Option<&PackageInfo> {
        self.packages.first()
    }
}

/// Load settings from a JSON file.
pub fn load_settings(path: &Path) -> Result<OrdSettings> {
    let bytes = fs::read(path).with_context(|| format!("read settings {}", path.display()))?;
    let settings: OrdSettings =
        serde_json::from_slice(&bytes).context("parse ord settings JSON")?;
    Ok(settings)
}

/// Whether generation is switched on by `env_value` (the enable variable) or the settings flag.
pub fn feature_enabled(env_value: Option<&str>, settings: &OrdSettings) -> bool {
    env_value == Some("true") || settings.features.data_products
}

/// Feature gate against the process environment.
pub fn data_products_enabled(settings: &OrdSettings) -> bool {
    let env_value = env::var(ENABLE_ENV_VAR).ok();
    feature_enabled(env_value.as_deref(), settings)
}

/// Resolve the override document path: explicit paths are taken relative to
/// the project root, otherwise the default location is used.
pub fn resolve_custom_config_path(explicit: Option<&Path>, project_root: &Path) -> PathBuf {
    match explicit {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => project_root.join(path),
        None => project_root.join(DEFAULT_CUSTOM_CONFIG_REL),
    }
}

/// Read the override document; `Ok(None)` when the file does not exist.
pub fn read_custom_configuration(path: &Path) -> Result<Option<CustomConfiguration>> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let config: CustomConfiguration = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse custom ORD configuration {}", path.display()))?;
    Ok(Some(config))
}

/// Load the override document, degrading every failure to `None`.
pub fn load_custom_configuration(
    explicit: Option<&Path>,
    project_root: &Path,
) -> Option<CustomConfiguration> {
    let path = resolve_custom_config_path(explicit, project_root);
    match read_custom_configuration(&path) {
        Ok(Some(config)) => {
            tracing::info!(path = %path.display(), "loaded custom ORD configuration");
            Some(config)
        }
        Ok(None) => {
            tracing::debug!(path = %path.display(), "no custom ORD configuration");
            None
        }
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %format!("{err:#}"),
                "failed to load custom ORD configuration; continuing without overrides"
            );
            None
        }
    }
}

/// Validation problems for one override entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryErrors {
    pub index: usize,
    pub id: Option<String>,
    pub errors: Vec<String>,
}

/// Check every override entry; entries without problems are omitted.
pub fn validate_custom_configuration(config: &CustomConfiguration) -> Vec<EntryErrors> {
    config
        .data_products
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let errors = validate_configuration(entry);
            if errors.is_empty() {
                return None;
            }
            Some(EntryErrors {
                index,
                id: entry.get("id").and_then(Value::as_str).map(str::to_string),
                errors,
            })
        })
        .collect()
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
