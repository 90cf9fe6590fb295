use anyhow::{anyhow, Context, Result};
use clap::Parser;
use ord_data_products::config::{
    load_settings, read_custom_configuration, validate_custom_configuration, AppConfig,
    OrdSettings,
};
use ord_data_products::{process_data_products, DataProductDocument, DomainModel};
use serde::Serialize;
use std::path::Path;
use tracing_subscriber::EnvFilter;

mod cli;
use cli::{Command, GenerateArgs, RootArgs, ValidateConfigArgs};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateOutput {
    data_products: Vec<DataProductDocument>,
}

fn main() -> Result<()> {
    init_tracing();
    let args = RootArgs::parse();

    match args.command {
        Command::Generate(args) => run_generate(args),
        Command::ValidateConfig(args) => run_validate_config(args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    let model = DomainModel::load(&args.model)?;
    let mut settings = match &args.settings {
        Some(path) => load_settings(path)?,
        None => OrdSettings::default(),
    };
    if args.custom_config.is_some() {
        settings.custom_ord_content_file = args.custom_config.clone();
    }
    if args.enable {
        settings.features.data_products = true;
    }
    let mut app = AppConfig::new(args.namespace.as_str());
    if let Some(package) = &args.package {
        app = app.with_package(package.as_str());
    }

    let documents = process_data_products(&model, &app, &settings, &args.project_root);
    let output = GenerateOutput {
        data_products: documents,
    };
    let json = serde_json::to_string_pretty(&output).context("serialize data products")?;
    match &args.out {
        Some(path) => write_output(path, &json)?,
        None => println!("{json}"),
    }
    Ok(())
}

fn write_output(path: &Path, json: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    std::fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    tracing::info!(path = %path.display(), "wrote data products");
    Ok(())
}

fn run_validate_config(args: ValidateConfigArgs) -> Result<()> {
    let config = read_custom_configuration(&args.config)?
        .ok_or_else(|| anyhow!("override document {} not found", args.config.display()))?;
    let report = validate_custom_configuration(&config);
    if report.is_empty() {
        println!(
            "{}: {} data product(s) valid",
            args.config.display(),
            config.data_products.len()
        );
        return Ok(());
    }
    for entry in &report {
        let label = entry
            .id
            .clone()
            .unwrap_or_else(|| format!("entry {}", entry.index));
        for error in &entry.errors {
            println!("{label}: {error}");
        }
    }
    Err(anyhow!(
        "{} of {} data product(s) failed validation",
        report.len(),
        config.data_products.len()
    ))
}
