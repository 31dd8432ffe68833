//! Service configuration.
//!
//! Everything here is read once at startup, from the command line or the
//! environment (optionally via a `.env` file), and never changes afterwards.

use std::{fmt, time::Duration};

use clap::Args;

use crate::prelude::*;

/// Default maximum decoded upload size: 10 MiB.
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Default Document Intelligence REST API version.
pub const DEFAULT_API_VERSION: &str = "2023-07-31";

/// Options for talking to Azure AI Document Intelligence.
#[derive(Args, Clone)]
pub struct AzureOpts {
    /// The Document Intelligence endpoint, e.g.
    /// `https://<resource>.cognitiveservices.azure.com/`.
    #[clap(long, env = "DI_ENDPOINT")]
    pub endpoint: String,

    /// The Document Intelligence API key.
    #[clap(long, env = "DI_KEY", hide_env_values = true)]
    pub key: String,

    /// The REST API version to request.
    #[clap(long, env = "DI_API_VERSION", default_value = DEFAULT_API_VERSION)]
    pub api_version: String,

    /// How long to wait between polls of a running analysis, in milliseconds,
    /// when the service doesn't send `Retry-After`.
    #[clap(long, env = "DI_POLL_INTERVAL_MS", default_value = "1000")]
    pub poll_interval_ms: u64,
}

// Written by hand so we never log the key.
impl fmt::Debug for AzureOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureOpts")
            .field("endpoint", &self.endpoint)
            .field("key", &"<redacted>")
            .field("api_version", &self.api_version)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .finish()
    }
}

impl AzureOpts {
    /// The fallback poll interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Limits applied to uploads before we call the remote service.
#[derive(Args, Clone, Debug)]
pub struct LimitOpts {
    /// Maximum decoded file size, in bytes.
    #[clap(long, env = "MAX_FILE_SIZE", default_value_t = DEFAULT_MAX_FILE_SIZE)]
    pub max_file_size: usize,

    /// MIME types we accept, separated by commas.
    #[clap(
        long,
        env = "SUPPORTED_FORMATS",
        value_delimiter = ',',
        default_value = "image/jpeg,image/png,application/pdf"
    )]
    pub supported_formats: Vec<String>,
}

impl Default for LimitOpts {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            supported_formats: vec![
                "image/jpeg".to_owned(),
                "image/png".to_owned(),
                "application/pdf".to_owned(),
            ],
        }
    }
}

/// Options for our HTTP server.
#[derive(Args, Clone, Debug)]
pub struct ServerOpts {
    /// Address to listen on.
    #[clap(long, env = "API_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on.
    #[clap(long, env = "API_PORT", default_value = "8000")]
    pub port: u16,

    /// Origins allowed to make cross-origin requests, separated by commas.
    /// Use `*` to allow any origin.
    #[clap(
        long,
        env = "ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = "*"
    )]
    pub allowed_origins: Vec<String>,
}

impl ServerOpts {
    /// The address to bind to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// The complete, immutable configuration handed to our HTTP handlers.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// Upload limits.
    pub limits: LimitOpts,

    /// Allowed CORS origins.
    pub allowed_origins: Vec<String>,
}

impl ServiceConfig {
    /// Check that the configuration makes sense before we start serving.
    pub fn validate(&self) -> Result<()> {
        if self.limits.max_file_size == 0 {
            return Err(anyhow!("--max-file-size must be greater than zero"));
        }
        if self.limits.supported_formats.is_empty() {
            return Err(anyhow!("--supported-formats must list at least one type"));
        }
        Ok(())
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            limits: LimitOpts::default(),
            allowed_origins: vec!["*".to_owned()],
        }
    }
}
