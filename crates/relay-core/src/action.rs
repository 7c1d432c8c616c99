//! Action-related types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

use crate::error::DispatchError;

/// Action type tag for file-report downloads.
pub const REPORT_DOWNLOAD_ACTION: &str = "ir_actions_report_download";

/// A tagged request describing an operation to execute.
///
/// `action_type` selects the handler. `data` is handler-specific; the only key
/// the dispatch path looks at is `options`, a JSON-encoded string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: String,

    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Action {
    /// Create an action with empty data.
    pub fn new(action_type: impl Into<String>) -> Result<Self, DispatchError> {
        let action_type = action_type.into();
        if action_type.is_empty() {
            return Err(DispatchError::EmptyActionType);
        }
        Ok(Self {
            action_type,
            data: Map::new(),
        })
    }

    /// Builder-style insert into `data`.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Raw `data.options` value, if present.
    pub fn options(&self) -> Option<&Value> {
        self.data.get("options")
    }

    /// Overwrite `data.options` with an encoded JSON string.
    pub fn set_options(&mut self, encoded: String) {
        self.data.insert("options".to_string(), Value::String(encoded));
    }

    /// Check whether this is a report download action.
    pub fn is_report_download(&self) -> bool {
        self.action_type == REPORT_DOWNLOAD_ACTION
    }
}

/// Options forwarded alongside an action to its handler or to the
/// default dispatch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DispatchOptions {
    #[serde(default)]
    pub clear_breadcrumbs: bool,

    #[serde(default)]
    pub additional_context: Map<String, Value>,
}

/// Outcome of a successful dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// Handled, nothing to report back.
    Done,

    /// A file was retrieved and saved.
    Downloaded(DownloadReceipt),

    /// Opaque outcome produced by the default dispatch.
    Handled(Value),
}

/// What the download transport saved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadReceipt {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    pub size: u64,
}

/// User-facing error envelope, shaped like the report service's error body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Value,
}

impl ErrorInfo {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: Value::Null,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}
