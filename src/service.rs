//! Running an analysis and packaging up the outcome.

use std::{sync::Arc, time::Instant};

use crate::{
    analyzer::{DocumentAnalyzer, RemoteServiceError},
    mapper::{document_summary, map_result, serialize_result},
    models::{AnalysisOutcome, DocumentModel},
    prelude::*,
};

/// Runs analyses against a [`DocumentAnalyzer`].
///
/// This is the only place where analysis failures are caught. Every call
/// makes a single attempt and always returns an [`AnalysisOutcome`], never an
/// error.
#[derive(Clone)]
pub struct AnalysisService {
    analyzer: Arc<dyn DocumentAnalyzer>,
}

impl AnalysisService {
    /// Create a new service wrapping `analyzer`.
    pub fn new(analyzer: Arc<dyn DocumentAnalyzer>) -> Self {
        Self { analyzer }
    }

    /// Analyze a document.
    #[instrument(level = "debug", skip_all, fields(model = %model, bytes = data.len()))]
    pub async fn analyze(&self, data: Vec<u8>, model: DocumentModel) -> AnalysisOutcome {
        info!("Starting analysis with model {model}");
        let start = Instant::now();
        let result = self.analyzer.analyze(data, model).await;
        let processing_time = start.elapsed().as_secs_f64();

        match result {
            Ok(raw) => {
                info!("Analysis finished in {processing_time:.2}s");
                let (document_type, confidence) = document_summary(&raw);
                AnalysisOutcome {
                    success: true,
                    document_type,
                    confidence,
                    extracted_data: Some(map_result(&raw, model)),
                    raw_response: Some(serialize_result(&raw)),
                    processing_time,
                    error: None,
                }
            }
            Err(err) => {
                let message = describe_failure(&err);
                error!("{message}");
                AnalysisOutcome::failure(message, processing_time)
            }
        }
    }
}

/// Turn an analysis error into a message for the client.
fn describe_failure(err: &anyhow::Error) -> String {
    if err.downcast_ref::<RemoteServiceError>().is_some() {
        format!("Remote analysis service error: {err:#}")
    } else {
        format!("Internal error: {err:#}")
    }
}
