//! The `serve` subcommand.

use std::sync::Arc;

use clap::Args;

use crate::{
    analyzer::azure::AzureDocumentAnalyzer,
    config::{AzureOpts, LimitOpts, ServerOpts, ServiceConfig},
    prelude::*,
    server::{AppState, run_server},
    service::AnalysisService,
};

/// Serve command line arguments.
#[derive(Debug, Args)]
pub struct ServeOpts {
    #[clap(flatten)]
    pub server: ServerOpts,

    #[clap(flatten)]
    pub azure: AzureOpts,

    #[clap(flatten)]
    pub limits: LimitOpts,
}

/// The `serve` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_serve(opts: &ServeOpts) -> Result<()> {
    let config = ServiceConfig {
        limits: opts.limits.clone(),
        allowed_origins: opts.server.allowed_origins.clone(),
    };
    config.validate()?;

    let analyzer = AzureDocumentAnalyzer::new(&opts.azure)?;
    info!(
        endpoint = %opts.azure.endpoint,
        max_file_size = config.limits.max_file_size,
        "Configured Document Intelligence client"
    );
    let state = AppState {
        config: Arc::new(config),
        service: AnalysisService::new(Arc::new(analyzer)),
    };
    run_server(&opts.server.bind_addr(), state).await
}
