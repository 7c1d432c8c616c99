//! Error types for relay.

use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::action::ErrorInfo;

/// Errors produced while dispatching a single action.
///
/// None of these poison the dispatcher; the next action dispatches normally.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Action type tag was empty.
    #[error("Action type must not be empty")]
    EmptyActionType,

    /// `data.options` did not decode to a JSON object.
    #[error("Invalid action options: {0}")]
    InvalidActionOptions(String),

    /// Network or server-side failure while downloading.
    #[error("Download failed: {0}")]
    DownloadTransportFailure(#[from] TransportError),
}

impl DispatchError {
    fn kind(&self) -> &'static str {
        match self {
            DispatchError::EmptyActionType => "EmptyActionType",
            DispatchError::InvalidActionOptions(_) => "InvalidActionOptions",
            DispatchError::DownloadTransportFailure(_) => "DownloadTransportFailure",
        }
    }

    /// Convert into the envelope shown by the error reporter.
    pub fn to_error_info(&self) -> ErrorInfo {
        match self {
            DispatchError::DownloadTransportFailure(e) => e.to_error_info(),
            other => ErrorInfo::new(400, other.to_string()).with_data(json!({
                "name": other.kind(),
            })),
        }
    }
}

/// Serialize DispatchError as a tagged struct for structured handling.
///
/// ```json
/// { "kind": "InvalidActionOptions", "message": "Invalid action options: ..." }
/// ```
impl Serialize for DispatchError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("DispatchError", 2)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Download transport failures.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Connection, DNS, TLS or timeout failure.
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The service answered with its error envelope instead of a file.
    #[error("Server error {}: {}", .0.code, .0.message)]
    Server(ErrorInfo),

    /// Writing the file locally failed.
    #[error("IO error: {0}")]
    Io(String),

    /// The transport panicked before settling.
    #[error("Transport panicked")]
    Panicked,
}

impl TransportError {
    /// Convert into the envelope shown by the error reporter.
    pub fn to_error_info(&self) -> ErrorInfo {
        match self {
            TransportError::Server(info) => info.clone(),
            TransportError::Status { status, body } => {
                ErrorInfo::new(i64::from(*status), format!("HTTP {}", status))
                    .with_data(json!({ "body": body }))
            }
            other => ErrorInfo::new(0, other.to_string()),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No config directory found.
    #[error("Config directory not found")]
    NoConfigDir,

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),

    /// Parse error.
    #[error("Parse error: {0}")]
    Parse(String),
}
