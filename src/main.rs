use std::str::FromStr;

use clap::{Parser, Subcommand};
use tracing_subscriber::{
    EnvFilter, Layer as _, filter::Directive, fmt::format::FmtSpan, layer::SubscriberExt,
    util::SubscriberInitExt as _,
};

use self::prelude::*;

mod analyzer;
mod cmd;
mod config;
mod data_url;
mod mapper;
mod models;
mod prelude;
mod server;
mod service;
mod validate;

/// Analyze documents with Azure AI Document Intelligence, over HTTP or from
/// the command line.
#[derive(Debug, Parser)]
#[clap(
    version,
    author,
    after_help = r#"
Environment Variables:
  - DI_ENDPOINT: The Document Intelligence endpoint URL.
  - DI_KEY: The Document Intelligence API key.
  - DI_API_VERSION, DI_POLL_INTERVAL_MS: Optional REST API tuning.
  - ALLOWED_ORIGINS, MAX_FILE_SIZE, SUPPORTED_FORMATS, API_HOST, API_PORT:
    Optional overrides for the matching command-line flags.

  These variables may be set in a standard `.env` file.
"#
)]
struct Opts {
    #[clap(subcommand)]
    subcmd: Cmd,
}

/// The subcommands we support.
#[derive(Debug, Subcommand)]
enum Cmd {
    /// Serve the HTTP API (`/health`, `/models` and `/analyze`).
    Serve(cmd::serve::ServeOpts),
    /// Analyze a single local image or PDF and print the outcome as JSON.
    Analyze(cmd::analyze::AnalyzeOpts),
    /// Print JSON Schemas for our request and response formats.
    Schema(cmd::schema::SchemaOpts),
}

/// Our entry point, which can return an error. [`anyhow::Result`] will
/// automatically print a nice error message with optional backtrace.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing.
    let directive = Directive::from_str("info")?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();

    let subscriber = tracing_subscriber::fmt::layer()
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    // We can stack multiple layers here if we need to.
    tracing_subscriber::registry().with(subscriber).init();

    // Call our real `main` function now that logging is set up.
    real_main().await
}

/// Our real entry point.
#[instrument(level = "debug", name = "main", skip_all)]
async fn real_main() -> Result<()> {
    // Load environment variables from a `.env` file, if it exists. This must
    // happen before we parse options, because many options fall back to
    // environment variables.
    dotenvy::dotenv().ok();

    // Parse command-line arguments.
    let opts = Opts::parse();
    debug!("Parsed options: {:?}", opts);

    // Run the appropriate subcommand.
    match &opts.subcmd {
        Cmd::Serve(serve_opts) => cmd::serve::cmd_serve(serve_opts).await?,
        Cmd::Analyze(analyze_opts) => cmd::analyze::cmd_analyze(analyze_opts).await?,
        Cmd::Schema(schema_opts) => cmd::schema::cmd_schema(schema_opts).await?,
    }
    Ok(())
}
