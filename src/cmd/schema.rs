//! The `schema` subcommand.

use clap::{Args, ValueEnum};
use schemars::schema_for;

use crate::{
    models::{AnalysisOutcome, AnalysisRequest, HealthResponse, ModelsResponse},
    prelude::*,
};

use super::write_json;

/// The different schema types we support.
///
/// We parse these as PascalCase, because they represent type names.
#[derive(Debug, Clone, Copy, ValueEnum)]
#[clap(rename_all = "PascalCase")]
pub enum SchemaType {
    /// Body of `POST /analyze`.
    AnalysisRequest,
    /// Response from `POST /analyze`.
    AnalysisOutcome,
    /// Response from `GET /health`.
    HealthResponse,
    /// Response from `GET /models`.
    ModelsResponse,
}

/// Schema command line arguments.
#[derive(Debug, Args)]
pub struct SchemaOpts {
    /// The schema type to generate.
    #[clap(value_enum, value_name = "TYPE")]
    pub schema_type: SchemaType,

    /// The output path to write the schema to.
    #[clap(short = 'o', long = "out")]
    pub output_path: Option<PathBuf>,
}

/// The `schema` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_schema(schema_opts: &SchemaOpts) -> Result<()> {
    let schema = match schema_opts.schema_type {
        SchemaType::AnalysisRequest => schema_for!(AnalysisRequest),
        SchemaType::AnalysisOutcome => schema_for!(AnalysisOutcome),
        SchemaType::HealthResponse => schema_for!(HealthResponse),
        SchemaType::ModelsResponse => schema_for!(ModelsResponse),
    };
    write_json(schema_opts.output_path.as_deref(), &schema).await
}
