//! The `analyze` subcommand, for analyzing a single local file.

use std::sync::Arc;

use clap::Args;

use crate::{
    analyzer::azure::AzureDocumentAnalyzer,
    config::{AzureOpts, LimitOpts},
    data_url::{DEFAULT_MIME_TYPE, data_url},
    models::DocumentModel,
    prelude::*,
    service::AnalysisService,
    validate::check_upload,
};

use super::write_json;

/// Analyze command line arguments.
#[derive(Debug, Args)]
pub struct AnalyzeOpts {
    /// The image or PDF to analyze.
    pub input_path: PathBuf,

    /// The model to use.
    #[clap(long, value_enum, default_value = "prebuilt-read")]
    pub model: DocumentModel,

    /// Write the outcome here instead of standard output.
    #[clap(short = 'o', long = "out")]
    pub output_path: Option<PathBuf>,

    #[clap(flatten)]
    pub azure: AzureOpts,

    #[clap(flatten)]
    pub limits: LimitOpts,
}

/// The `analyze` subcommand.
///
/// This goes through the same checks as `POST /analyze`, and writes the same
/// outcome. A failed analysis is still written out, but makes us exit with an
/// error.
#[instrument(level = "debug", skip_all, fields(path = %opts.input_path.display()))]
pub async fn cmd_analyze(opts: &AnalyzeOpts) -> Result<()> {
    let data = tokio::fs::read(&opts.input_path)
        .await
        .with_context(|| format!("failed to read {:?}", opts.input_path.display()))?;
    let mime_type = mime_guess::from_path(&opts.input_path)
        .first_raw()
        .unwrap_or(DEFAULT_MIME_TYPE);
    let upload = check_upload(&data_url(mime_type, &data), &opts.limits)?;
    info!("Analyzing {} as {}", upload.content_type, opts.model);

    let analyzer = AzureDocumentAnalyzer::new(&opts.azure)?;
    let service = AnalysisService::new(Arc::new(analyzer));
    let outcome = service.analyze(upload.payload.bytes, opts.model).await;
    write_json(opts.output_path.as_deref(), &outcome).await?;

    if !outcome.success {
        let error = outcome.error.unwrap_or_default();
        return Err(anyhow!("analysis failed: {error}"));
    }
    Ok(())
}
