//! CLI argument parsing for `dpgen`.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "dpgen",
    version,
    about = "Generate ORD data product descriptors from a compiled domain model",
    after_help = "Examples:\n  dpgen generate --model gen/csn.json --namespace com.example --enable\n  dpgen generate --model gen/csn.json --namespace com.example --settings ord.json --out dp.json\n  dpgen validate-config --config ord/custom.ord.json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Generate(GenerateArgs),
    ValidateConfig(ValidateConfigArgs),
}

/// Generate command inputs.
#[derive(Parser, Debug)]
#[command(about = "Run the enrichment pipeline and print data product documents")]
pub struct GenerateArgs {
    /// Compiled domain model (JSON with a `definitions` mapping)
    #[arg(long, value_name = "PATH")]
    pub model: PathBuf,

    /// ORD namespace used for derived identifiers
    #[arg(long, value_name = "NS")]
    pub namespace: String,

    /// Root that the override document path resolves against
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub project_root: PathBuf,

    /// Override document (defaults to ord/custom.ord.json under the project root)
    #[arg(long, value_name = "PATH")]
    pub custom_config: Option<PathBuf>,

    /// ORD settings JSON (customOrdContentFile, features.dataProducts)
    #[arg(long, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// Package ORD id assigned to products without one
    #[arg(long, value_name = "ORD_ID")]
    pub package: Option<String>,

    /// Turn on the data product feature for this run
    #[arg(long)]
    pub enable: bool,

    /// Output path; stdout when omitted
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

/// Validate-config command inputs.
#[derive(Parser, Debug)]
#[command(about = "Check an override document against the configuration rules")]
pub struct ValidateConfigArgs {
    /// Override document to check
    #[arg(long, value_name = "PATH")]
    pub config: PathBuf,
}
