//! Document analysis using Azure AI Document Intelligence.
//!
//! Analysis is a long-running operation. We `POST` the document, get back an
//! `Operation-Location` URL, and poll that until the operation finishes. We
//! make exactly one submission per document: if the operation fails, we
//! report it and stop.

use std::time::Duration;

use reqwest::{
    Response,
    header::{CONTENT_TYPE, HeaderMap, RETRY_AFTER},
};

use crate::{config::AzureOpts, models::DocumentModel, prelude::*};

use super::{DocumentAnalyzer, RemoteServiceError};

/// The header carrying our API key.
const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// The header carrying the URL of a submitted operation.
const OPERATION_LOCATION_HEADER: &str = "Operation-Location";

/// Analyzer backed by the Document Intelligence REST API.
pub struct AzureDocumentAnalyzer {
    /// Shared HTTP client.
    client: reqwest::Client,

    /// Service endpoint, without a trailing slash.
    endpoint: String,

    /// API key.
    key: String,

    /// REST API version.
    api_version: String,

    /// How long to wait between polls if the service doesn't tell us.
    poll_interval: Duration,
}

impl AzureDocumentAnalyzer {
    /// Create a new analyzer.
    pub fn new(opts: &AzureOpts) -> Result<Self> {
        let endpoint = opts.endpoint.trim().trim_end_matches('/').to_owned();
        if endpoint.is_empty() {
            return Err(anyhow!("a Document Intelligence endpoint is required"));
        }
        if opts.key.trim().is_empty() {
            return Err(anyhow!("a Document Intelligence key is required"));
        }
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint,
            key: opts.key.trim().to_owned(),
            api_version: opts.api_version.clone(),
            poll_interval: opts.poll_interval(),
        })
    }

    /// The URL used to submit a document to `model`.
    fn analyze_url(&self, model: DocumentModel) -> String {
        format!(
            "{}/formrecognizer/documentModels/{}:analyze?api-version={}",
            self.endpoint, model, self.api_version
        )
    }

    /// Submit a document, returning the URL of the new operation.
    async fn submit(&self, data: Vec<u8>, model: DocumentModel) -> Result<String> {
        let response = self
            .client
            .post(self.analyze_url(model))
            .header(SUBSCRIPTION_KEY_HEADER, &self.key)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(data)
            .send()
            .await
            .map_err(RemoteServiceError::from)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await.into());
        }
        let operation_url = response
            .headers()
            .get(OPERATION_LOCATION_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| anyhow!("analysis was accepted without an Operation-Location"))?
            .to_owned();
        debug!(%operation_url, "Submitted document");
        Ok(operation_url)
    }

    /// Poll an operation until it finishes, returning its `analyzeResult`.
    async fn wait_for_result(&self, operation_url: &str) -> Result<Value> {
        loop {
            let response = self
                .client
                .get(operation_url)
                .header(SUBSCRIPTION_KEY_HEADER, &self.key)
                .send()
                .await
                .map_err(RemoteServiceError::from)?;
            if !response.status().is_success() {
                return Err(error_from_response(response).await.into());
            }
            let delay = retry_after(response.headers()).unwrap_or(self.poll_interval);
            let operation = response
                .json::<AnalyzeOperation>()
                .await
                .context("failed to parse analysis operation status")?;

            match operation.status {
                OperationStatus::NotStarted | OperationStatus::Running => {
                    trace!(status = ?operation.status, ?delay, "Analysis still running");
                    tokio::time::sleep(delay).await;
                }
                OperationStatus::Succeeded => {
                    return operation.analyze_result.ok_or_else(|| {
                        anyhow!("analysis succeeded but returned no analyzeResult")
                    });
                }
                OperationStatus::Failed | OperationStatus::Canceled => {
                    let detail = operation.error.unwrap_or_else(|| ServiceErrorDetail {
                        code: format!("{:?}", operation.status),
                        message: "analysis did not complete".to_owned(),
                    });
                    return Err(RemoteServiceError::Service {
                        status: None,
                        code: detail.code,
                        message: detail.message,
                    }
                    .into());
                }
                OperationStatus::Unknown => {
                    return Err(anyhow!("analysis operation has an unknown status"));
                }
            }
        }
    }
}

#[async_trait]
impl DocumentAnalyzer for AzureDocumentAnalyzer {
    #[instrument(level = "debug", skip_all, fields(model = %model, bytes = data.len()))]
    async fn analyze(&self, data: Vec<u8>, model: DocumentModel) -> Result<Value> {
        let operation_url = self.submit(data, model).await?;
        self.wait_for_result(&operation_url).await
    }
}

/// A long-running analysis operation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeOperation {
    /// How far along the operation is.
    status: OperationStatus,

    /// The result, once `status` is `succeeded`.
    #[serde(default)]
    analyze_result: Option<Value>,

    /// The error, if `status` is `failed`.
    #[serde(default)]
    error: Option<ServiceErrorDetail>,
}

/// Status of an analysis operation.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
enum OperationStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

/// Error response body.
#[derive(Debug, Deserialize)]
struct ServiceErrorResponse {
    error: ServiceErrorDetail,
}

/// Error details from the service.
#[derive(Debug, Deserialize)]
struct ServiceErrorDetail {
    code: String,
    message: String,
}

/// Build a [`RemoteServiceError`] from a non-success response.
async fn error_from_response(response: Response) -> RemoteServiceError {
    let status = response.status();
    let body = match response.text().await {
        Ok(body) => body,
        Err(err) => return RemoteServiceError::Transport(err),
    };
    error_from_body(status.as_u16(), &body)
}

/// Parse an error body, falling back to the raw text if it isn't the usual
/// `{"error": {"code", "message"}}` shape.
fn error_from_body(status: u16, body: &str) -> RemoteServiceError {
    match serde_json::from_str::<ServiceErrorResponse>(body) {
        Ok(ServiceErrorResponse { error }) => RemoteServiceError::Service {
            status: Some(status),
            code: error.code,
            message: error.message,
        },
        Err(_) => RemoteServiceError::Service {
            status: Some(status),
            code: "HttpError".to_owned(),
            message: body.trim().to_owned(),
        },
    }
}

/// Parse a `Retry-After` header given in seconds.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
