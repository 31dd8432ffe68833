//! Reshaping Document Intelligence results into our simplified format.
//!
//! Everything here is a pure function over the result tree returned by the
//! remote service. We only read the handful of fields we need, and treat
//! anything missing as absent rather than as an error.

use crate::{
    models::{DocumentModel, ExtractedField},
    prelude::*,
};

/// Receipt fields we extract, as `(remote name, our name)`.
const RECEIPT_FIELDS: &[(&str, &str)] = &[
    ("MerchantName", "merchant_name"),
    ("MerchantAddress", "merchant_address"),
    ("MerchantPhoneNumber", "merchant_phone"),
    ("TransactionDate", "transaction_date"),
    ("TransactionTime", "transaction_time"),
    ("Items", "items"),
    ("Subtotal", "subtotal"),
    ("TotalTax", "tax"),
    ("Tip", "tip"),
    ("Total", "total"),
];

/// Placeholder returned when `raw_response` isn't something we can pass on.
pub const UNSERIALIZABLE_PLACEHOLDER: &str = "Unable to serialize";

/// Extract model-specific data from a result.
pub fn map_result(raw: &Value, model: DocumentModel) -> Map<String, Value> {
    match model {
        DocumentModel::Receipt => map_receipt(raw),
        DocumentModel::Layout => map_layout(raw),
        DocumentModel::Invoice => placeholder("invoice"),
        DocumentModel::BusinessCard => placeholder("business_card"),
        DocumentModel::IdDocument => placeholder("id_document"),
        DocumentModel::Read => placeholder("generic"),
    }
}

/// The type and confidence of the first detected document, if there is one.
pub fn document_summary(raw: &Value) -> (Option<String>, Option<f64>) {
    match first_document(raw) {
        Some(document) => (
            document
                .get("docType")
                .and_then(Value::as_str)
                .map(str::to_owned),
            document.get("confidence").and_then(Value::as_f64),
        ),
        None => (None, None),
    }
}

/// Pass on the full result as a JSON object, or a placeholder if the result
/// isn't an object.
pub fn serialize_result(raw: &Value) -> Map<String, Value> {
    match raw {
        Value::Object(map) => map.clone(),
        other => {
            warn!(kind = %value_kind(other), "Could not serialize raw analysis result");
            let mut placeholder = Map::new();
            placeholder.insert(
                "raw_result".to_owned(),
                Value::String(UNSERIALIZABLE_PLACEHOLDER.to_owned()),
            );
            placeholder
        }
    }
}

/// The first entry in `documents`, if any.
fn first_document(raw: &Value) -> Option<&Map<String, Value>> {
    raw.get("documents")?.as_array()?.first()?.as_object()
}

/// An array-valued member of `value`, or an empty slice.
fn array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Extract receipt fields from the first document.
fn map_receipt(raw: &Value) -> Map<String, Value> {
    let mut extracted = Map::new();
    let Some(fields) = first_document(raw)
        .and_then(|document| document.get("fields"))
        .and_then(Value::as_object)
    else {
        return extracted;
    };

    for &(remote_name, our_name) in RECEIPT_FIELDS {
        if let Some(field) = fields.get(remote_name) {
            let field = ExtractedField {
                value: field_value(field),
                confidence: field.get("confidence").and_then(Value::as_f64),
            };
            extracted.insert(our_name.to_owned(), field.into());
        }
    }
    extracted
}

/// Get the value of a document field.
///
/// Fields store their value in a slot named after their type, like
/// `valueString` or `valueCurrency`. Currency values are reduced to their
/// amount, and arrays and objects of fields are converted recursively.
fn field_value(field: &Value) -> Value {
    let Some(field) = field.as_object() else {
        return Value::Null;
    };
    let typed_slot = field
        .get("type")
        .and_then(Value::as_str)
        .map(value_slot_name)
        .and_then(|name| field.get_key_value(name.as_str()));
    let slot = typed_slot.or_else(|| {
        field
            .iter()
            .find(|(name, _)| name.starts_with("value") && name.len() > "value".len())
    });

    match slot {
        None => Value::Null,
        Some((name, Value::Array(items))) if name == "valueArray" => {
            Value::Array(items.iter().map(field_value).collect())
        }
        Some((name, Value::Object(members))) if name == "valueObject" => Value::Object(
            members
                .iter()
                .map(|(key, member)| (key.clone(), field_value(member)))
                .collect(),
        ),
        Some((_, Value::Object(value))) if value.contains_key("amount") => {
            value["amount"].clone()
        }
        Some((_, value)) => value.clone(),
    }
}

/// `"phoneNumber"` becomes `"valuePhoneNumber"`.
fn value_slot_name(field_type: &str) -> String {
    let mut chars = field_type.chars();
    match chars.next() {
        Some(first) => format!("value{}{}", first.to_ascii_uppercase(), chars.as_str()),
        None => "value".to_owned(),
    }
}

/// Extract pages, lines and tables.
fn map_layout(raw: &Value) -> Map<String, Value> {
    let pages = array(raw, "pages")
        .iter()
        .map(|page| {
            let lines = array(page, "lines")
                .iter()
                .map(|line| {
                    json!({
                        "content": line.get("content"),
                        "confidence": line.get("confidence"),
                    })
                })
                .collect::<Vec<_>>();
            json!({
                "page_number": page.get("pageNumber"),
                "width": page.get("width"),
                "height": page.get("height"),
                "unit": page.get("unit"),
                "lines": lines,
            })
        })
        .collect::<Vec<_>>();

    let tables = array(raw, "tables")
        .iter()
        .map(|table| {
            let cells = array(table, "cells")
                .iter()
                .map(|cell| {
                    json!({
                        "row_index": cell.get("rowIndex"),
                        "column_index": cell.get("columnIndex"),
                        "content": cell.get("content"),
                    })
                })
                .collect::<Vec<_>>();
            json!({
                "row_count": table.get("rowCount"),
                "column_count": table.get("columnCount"),
                "cells": cells,
            })
        })
        .collect::<Vec<_>>();

    let mut extracted = Map::new();
    extracted.insert("pages".to_owned(), Value::Array(pages));
    extracted.insert("tables".to_owned(), Value::Array(tables));
    extracted.insert("text".to_owned(), Value::Array(vec![]));
    extracted
}

/// Placeholder for models we don't extract fields from yet.
///
/// TODO: Invoice, business card, ID document and read results are returned
/// only in `raw_response`. Map their fields the way `map_receipt` does.
fn placeholder(kind: &str) -> Map<String, Value> {
    let mut extracted = Map::new();
    extracted.insert("type".to_owned(), Value::String(kind.to_owned()));
    extracted.insert("data".to_owned(), Value::String(format!("{kind}_data")));
    extracted
}

/// A short name for a JSON value's type, for logging.
fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl From<ExtractedField> for Value {
    fn from(field: ExtractedField) -> Self {
        json!({
            "value": field.value,
            "confidence": field.confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::fake::{sample_layout_result, sample_receipt_result};

    #[test]
    fn receipt_keeps_only_present_fields() {
        let extracted = map_result(&sample_receipt_result(), DocumentModel::Receipt);
        let mut keys = extracted.keys().cloned().collect::<Vec<_>>();
        keys.sort();
        assert_eq!(
            keys,
            ["items", "merchant_name", "total", "transaction_date"]
        );
        assert_eq!(
            extracted["merchant_name"],
            json!({"value": "Contoso", "confidence": 0.98})
        );
        assert_eq!(extracted["transaction_date"]["value"], "2019-06-10");
    }

    #[test]
    fn receipt_currency_fields_use_amount() {
        let extracted = map_result(&sample_receipt_result(), DocumentModel::Receipt);
        assert_eq!(extracted["total"], json!({"value": 14.5, "confidence": 0.95}));
    }

    #[test]
    fn receipt_items_are_converted_recursively() {
        let extracted = map_result(&sample_receipt_result(), DocumentModel::Receipt);
        assert_eq!(
            extracted["items"]["value"],
            json!([
                {"Description": "Surface Pen", "TotalPrice": 10.0},
                {"Description": "Cable", "TotalPrice": 4.5},
            ])
        );
    }

    #[test]
    fn receipt_without_documents_is_empty() {
        let raw = json!({"documents": [], "pages": []});
        assert!(map_result(&raw, DocumentModel::Receipt).is_empty());
        assert!(map_result(&json!({}), DocumentModel::Receipt).is_empty());
    }

    #[test]
    fn field_without_value_maps_to_null() {
        let raw = json!({"documents": [{"fields": {
            "Tip": {"type": "currency", "content": "", "confidence": 0.2}
        }}]});
        let extracted = map_result(&raw, DocumentModel::Receipt);
        assert_eq!(extracted["tip"], json!({"value": null, "confidence": 0.2}));
    }

    #[test]
    fn layout_preserves_page_and_table_order() {
        let extracted = map_result(&sample_layout_result(), DocumentModel::Layout);

        let pages = extracted["pages"].as_array().unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0]["page_number"], 1);
        assert_eq!(pages[1]["page_number"], 2);
        assert_eq!(pages[0]["unit"], "inch");
        assert_eq!(pages[0]["lines"].as_array().unwrap().len(), 2);
        assert_eq!(pages[0]["lines"][0], json!({"content": "Hello", "confidence": null}));
        assert_eq!(pages[0]["lines"][1]["content"], "World");
        assert!(pages[1]["lines"].as_array().unwrap().is_empty());

        let tables = extracted["tables"].as_array().unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0]["row_count"], 1);
        assert_eq!(tables[0]["column_count"], 2);
        let cells = tables[0]["cells"].as_array().unwrap();
        assert_eq!(cells.len(), 2);
        assert_eq!(
            cells[1],
            json!({"row_index": 0, "column_index": 1, "content": "B"})
        );

        assert_eq!(extracted["text"], json!([]));
    }

    #[test]
    fn unimplemented_models_return_placeholders() {
        let raw = sample_receipt_result();
        assert_eq!(
            Value::Object(map_result(&raw, DocumentModel::Invoice)),
            json!({"type": "invoice", "data": "invoice_data"})
        );
        assert_eq!(
            map_result(&raw, DocumentModel::BusinessCard)["type"],
            "business_card"
        );
        assert_eq!(map_result(&raw, DocumentModel::IdDocument)["type"], "id_document");
        assert_eq!(map_result(&raw, DocumentModel::Read)["type"], "generic");
    }

    #[test]
    fn summarizes_first_document() {
        let (doc_type, confidence) = document_summary(&sample_receipt_result());
        assert_eq!(doc_type.as_deref(), Some("receipt.retailMeal"));
        assert_eq!(confidence, Some(0.99));
        assert_eq!(document_summary(&sample_layout_result()), (None, None));
    }

    #[test]
    fn serialize_result_falls_back_to_placeholder() {
        let raw = json!({"modelId": "prebuilt-read"});
        assert_eq!(Value::Object(serialize_result(&raw)), raw);
        assert_eq!(
            Value::Object(serialize_result(&json!("not an object"))),
            json!({"raw_result": UNSERIALIZABLE_PLACEHOLDER})
        );
    }
}
