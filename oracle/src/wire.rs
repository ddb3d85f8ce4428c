//! JSON bodies exchanged with the oracle.

use alchemist_types::{Element, ElementId, Language};
use serde::{Deserialize, Serialize};

/// `GET /elements/` response.
#[derive(Debug, Deserialize)]
pub(crate) struct ElementPage {
    #[serde(default)]
    pub elements: Vec<Element>,
}

/// `POST /elements/combine` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CombineRequest {
    pub element1_id: ElementId,
    pub element2_id: ElementId,
    pub player_name: Option<String>,
    #[serde(rename = "lang")]
    pub language: Language,
}

/// `POST /elements/combine` success body, before local reconciliation.
///
/// `result` and `error` are mutually exclusive on a well-behaved oracle; the
/// orchestrator decides what to do when they are not.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CombineReply {
    #[serde(default)]
    pub element1_id: Option<ElementId>,
    #[serde(default)]
    pub element2_id: Option<ElementId>,
    #[serde(default)]
    pub result_id: Option<ElementId>,
    #[serde(default)]
    pub result: Option<Element>,
    #[serde(default)]
    pub is_new_discovery: bool,
    #[serde(default)]
    pub is_first_discovery: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl CombineReply {
    #[must_use]
    pub fn with_result(result: Element) -> Self {
        Self {
            element1_id: None,
            element2_id: None,
            result_id: Some(result.id()),
            result: Some(result),
            is_new_discovery: false,
            is_first_discovery: false,
            error: None,
        }
    }

    #[must_use]
    pub fn with_error(error: impl Into<String>) -> Self {
        Self {
            element1_id: None,
            element2_id: None,
            result_id: None,
            result: None,
            is_new_discovery: false,
            is_first_discovery: false,
            error: Some(error.into()),
        }
    }
}

/// Error bodies look like `{"detail": "..."}`. Validation errors carry a list
/// of objects instead of a string.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// Best-effort human-readable message from an error body.
pub(crate) fn error_detail(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(detail),
        }) => detail,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) => body.trim().to_string(),
    }
}
