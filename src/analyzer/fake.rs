//! A fake analyzer for tests, plus some canned results.

use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use crate::{models::DocumentModel, prelude::*};

use super::{DocumentAnalyzer, RemoteServiceError};

/// What our fake analyzer should do when called.
pub enum FakeBehavior {
    /// Return this result.
    Succeed(Value),
    /// Fail the way the remote service would.
    RemoteFailure(String),
    /// Fail with some other error.
    InternalFailure(String),
    /// Panic.
    Panic,
}

/// An analyzer that does whatever we tell it to, and counts calls.
pub struct FakeAnalyzer {
    behavior: FakeBehavior,
    calls: AtomicUsize,
}

impl FakeAnalyzer {
    pub fn new(behavior: FakeBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    /// How many times have we been called?
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentAnalyzer for FakeAnalyzer {
    async fn analyze(&self, _data: Vec<u8>, _model: DocumentModel) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Real analyses take a while.
        tokio::time::sleep(Duration::from_millis(2)).await;
        match &self.behavior {
            FakeBehavior::Succeed(result) => Ok(result.clone()),
            FakeBehavior::RemoteFailure(message) => Err(RemoteServiceError::Service {
                status: Some(500),
                code: "InternalServerError".to_owned(),
                message: message.clone(),
            }
            .into()),
            FakeBehavior::InternalFailure(message) => Err(anyhow!("{message}")),
            FakeBehavior::Panic => panic!("fake analyzer panicked"),
        }
    }
}

/// A receipt result with four of the ten receipt fields present.
pub fn sample_receipt_result() -> Value {
    json!({
        "apiVersion": "2023-07-31",
        "modelId": "prebuilt-receipt",
        "content": "Contoso\n6/10/2019\nSurface Pen 10.00\nCable 4.50\nTotal 14.50",
        "pages": [{"pageNumber": 1, "width": 1688, "height": 3000, "unit": "pixel", "lines": []}],
        "documents": [{
            "docType": "receipt.retailMeal",
            "confidence": 0.99,
            "fields": {
                "MerchantName": {
                    "type": "string",
                    "valueString": "Contoso",
                    "content": "Contoso",
                    "confidence": 0.98
                },
                "TransactionDate": {
                    "type": "date",
                    "valueDate": "2019-06-10",
                    "content": "6/10/2019",
                    "confidence": 0.97
                },
                "Items": {
                    "type": "array",
                    "valueArray": [
                        {
                            "type": "object",
                            "valueObject": {
                                "Description": {"type": "string", "valueString": "Surface Pen"},
                                "TotalPrice": {"type": "currency", "valueCurrency": {"amount": 10.0}}
                            }
                        },
                        {
                            "type": "object",
                            "valueObject": {
                                "Description": {"type": "string", "valueString": "Cable"},
                                "TotalPrice": {"type": "currency", "valueCurrency": {"amount": 4.5}}
                            }
                        }
                    ]
                },
                "Total": {
                    "type": "currency",
                    "valueCurrency": {"currencySymbol": "$", "amount": 14.5, "currencyCode": "USD"},
                    "content": "14.50",
                    "confidence": 0.95
                },
                "ReceiptType": {"type": "string", "valueString": "Meal", "confidence": 0.9}
            }
        }]
    })
}

/// A layout result with two pages and one table.
pub fn sample_layout_result() -> Value {
    json!({
        "apiVersion": "2023-07-31",
        "modelId": "prebuilt-layout",
        "content": "Hello\nWorld",
        "pages": [
            {
                "pageNumber": 1,
                "width": 8.5,
                "height": 11,
                "unit": "inch",
                "lines": [
                    {"content": "Hello", "polygon": [0, 0, 1, 0, 1, 1, 0, 1]},
                    {"content": "World", "polygon": [0, 1, 1, 1, 1, 2, 0, 2]}
                ]
            },
            {"pageNumber": 2, "width": 8.5, "height": 11, "unit": "inch", "lines": []}
        ],
        "tables": [{
            "rowCount": 1,
            "columnCount": 2,
            "cells": [
                {"rowIndex": 0, "columnIndex": 0, "content": "A"},
                {"rowIndex": 0, "columnIndex": 1, "content": "B"}
            ]
        }]
    })
}
