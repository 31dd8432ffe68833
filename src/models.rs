//! Wire types for our HTTP API.

use std::fmt;

use clap::ValueEnum;
use schemars::JsonSchema;

use crate::prelude::*;

/// The kind of file a client says it is sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    /// A JPEG or PNG image.
    Image,
    /// A PDF document.
    Pdf,
}

/// The prebuilt Document Intelligence models we expose.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema, ValueEnum,
)]
pub enum DocumentModel {
    /// Receipts.
    #[serde(rename = "prebuilt-receipt")]
    #[value(name = "prebuilt-receipt")]
    Receipt,
    /// Invoices.
    #[serde(rename = "prebuilt-invoice")]
    #[value(name = "prebuilt-invoice")]
    Invoice,
    /// Page layout: lines, tables and structure.
    #[serde(rename = "prebuilt-layout")]
    #[value(name = "prebuilt-layout")]
    Layout,
    /// Business cards.
    #[serde(rename = "prebuilt-businessCard")]
    #[value(name = "prebuilt-businessCard")]
    BusinessCard,
    /// Identity documents.
    #[serde(rename = "prebuilt-idDocument")]
    #[value(name = "prebuilt-idDocument")]
    IdDocument,
    /// Plain text extraction.
    #[serde(rename = "prebuilt-read")]
    #[value(name = "prebuilt-read")]
    Read,
}

impl DocumentModel {
    /// Every model, in the order we advertise them.
    pub const ALL: [DocumentModel; 6] = [
        DocumentModel::Receipt,
        DocumentModel::Invoice,
        DocumentModel::Layout,
        DocumentModel::BusinessCard,
        DocumentModel::IdDocument,
        DocumentModel::Read,
    ];

    /// The model ID used by the remote service.
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentModel::Receipt => "prebuilt-receipt",
            DocumentModel::Invoice => "prebuilt-invoice",
            DocumentModel::Layout => "prebuilt-layout",
            DocumentModel::BusinessCard => "prebuilt-businessCard",
            DocumentModel::IdDocument => "prebuilt-idDocument",
            DocumentModel::Read => "prebuilt-read",
        }
    }
}

impl fmt::Display for DocumentModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to analyze a document.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct AnalysisRequest {
    /// The file, as Base64 or as a `data:` URL. Missing and empty are both
    /// rejected with a 400, so we default this instead of letting the JSON
    /// extractor fail.
    #[serde(default)]
    pub file_data: String,

    /// What kind of file this is.
    pub file_type: FileType,

    /// Which model to run.
    pub model: DocumentModel,

    /// Additional options. Accepted for compatibility, but currently unused.
    /// `null` is treated like an empty object.
    #[serde(default)]
    pub options: Option<Map<String, Value>>,
}

impl AnalysisRequest {
    /// Our options, or an empty map if none were sent.
    pub fn options(&self) -> Map<String, Value> {
        self.options.clone().unwrap_or_default()
    }
}

/// The result of analyzing a document.
///
/// Both successful and failed analyses use this type. On failure, only
/// `success`, `processing_time` and `error` are filled in.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct AnalysisOutcome {
    /// Did the remote analysis succeed?
    pub success: bool,

    /// The document type detected by the model, if any.
    pub document_type: Option<String>,

    /// The model's confidence in `document_type`, between 0.0 and 1.0.
    pub confidence: Option<f64>,

    /// Model-specific fields extracted from the result.
    pub extracted_data: Option<Map<String, Value>>,

    /// The full result returned by the remote service.
    pub raw_response: Option<Map<String, Value>>,

    /// Wall-clock seconds spent waiting on the remote service.
    pub processing_time: f64,

    /// What went wrong, if anything.
    pub error: Option<String>,
}

impl AnalysisOutcome {
    /// Build a failed outcome.
    pub fn failure(error: String, processing_time: f64) -> Self {
        Self {
            success: false,
            processing_time,
            error: Some(error),
            ..Self::default()
        }
    }
}

/// A single extracted field.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct ExtractedField {
    /// The field's value.
    pub value: Value,

    /// How confident the model is in this field.
    pub confidence: Option<f64>,
}

/// Response for `GET /health`.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Response for `GET /models`.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ModelsResponse {
    pub available_models: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_ids_round_trip_through_serde() {
        for model in DocumentModel::ALL {
            let json = serde_json::to_value(model).unwrap();
            assert_eq!(json, Value::String(model.as_str().to_owned()));
            let parsed: DocumentModel = serde_json::from_value(json).unwrap();
            assert_eq!(parsed, model);
        }
    }

    #[test]
    fn request_options_default_to_empty() {
        let request: AnalysisRequest = serde_json::from_value(json!({
            "file_data": "aGk=",
            "file_type": "image",
            "model": "prebuilt-layout",
        }))
        .unwrap();
        assert!(request.options().is_empty());
        assert_eq!(request.file_type, FileType::Image);
        assert_eq!(request.model, DocumentModel::Layout);
    }

    #[test]
    fn null_request_options_are_empty() {
        let request: AnalysisRequest = serde_json::from_value(json!({
            "file_data": "aGk=",
            "file_type": "pdf",
            "model": "prebuilt-read",
            "options": null,
        }))
        .unwrap();
        assert!(request.options().is_empty());

        let request: AnalysisRequest = serde_json::from_value(json!({
            "file_data": "aGk=",
            "file_type": "pdf",
            "model": "prebuilt-read",
            "options": {"locale": "en-US"},
        }))
        .unwrap();
        assert_eq!(request.options()["locale"], "en-US");
    }

    #[test]
    fn failed_outcome_serializes_missing_fields_as_null() {
        let outcome = AnalysisOutcome::failure("boom".to_owned(), 0.5);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            json!({
                "success": false,
                "document_type": null,
                "confidence": null,
                "extracted_data": null,
                "raw_response": null,
                "processing_time": 0.5,
                "error": "boom",
            })
        );
    }
}
