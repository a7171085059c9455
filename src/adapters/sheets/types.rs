//! Google API Request/Response Types
//!
//! Only the pieces of the Sheets v4 and OAuth2 token payloads this
//! service reads or writes.

use serde::{Deserialize, Serialize};

use crate::domain::export::Cell;

/// `spreadsheets.batchUpdate` request body.
#[derive(Debug, Clone, Serialize)]
pub struct BatchUpdateRequest {
    pub requests: Vec<SheetRequest>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetRequest {
    pub add_sheet: AddSheet,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddSheet {
    pub properties: SheetProperties,
}

#[derive(Debug, Clone, Serialize)]
pub struct SheetProperties {
    pub title: String,
}

impl BatchUpdateRequest {
    /// Request creating one tab named `title`.
    pub fn add_sheet(title: &str) -> Self {
        Self {
            requests: vec![SheetRequest {
                add_sheet: AddSheet {
                    properties: SheetProperties {
                        title: title.to_string(),
                    },
                },
            }],
        }
    }
}

/// `spreadsheets.values.update` request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRangeWrite<'a> {
    pub range: &'a str,
    pub major_dimension: &'static str,
    pub values: &'a [Vec<Cell>],
}

/// `spreadsheets.values.get` response body.
///
/// `values` is absent when the range is empty.
#[derive(Debug, Clone, Deserialize)]
pub struct ValueRangeRead {
    #[serde(default)]
    pub values: Vec<Vec<serde_json::Value>>,
}

impl ValueRangeRead {
    /// Cells as display strings.
    pub fn into_strings(self) -> Vec<Vec<String>> {
        self.values
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| match cell {
                        serde_json::Value::String(s) => s,
                        serde_json::Value::Null => String::new(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .collect()
    }
}

/// Google API error envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleErrorBody {
    pub error: GoogleError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleError {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}

/// OAuth2 token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// OAuth2 token endpoint error.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenError {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}
