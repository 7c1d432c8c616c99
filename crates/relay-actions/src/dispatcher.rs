//! Action Dispatcher
//!
//! ## Dispatch Flow
//!
//! ```text
//! dispatch(action, options)
//!        │
//!        ▼
//! ┌──────────────────┐
//! │ resolve handler  │
//! └────────┬─────────┘
//!     ┌────┴──────┐
//!     ▼           ▼
//!   found       not found
//!     │           │
//!     ▼           ▼
//! normalize    DefaultDispatch
//! options      (host behavior)
//! (downloads)
//!     │
//!     ▼
//! handler.execute
//! ```
//!
//! Normalization runs once, before the handler is invoked, for report
//! downloads only. It is keyed on the action type, so a handler installed
//! through [`ActionRegistry::wrap`] still receives normalized options.
//! An unknown type is never an error.

use serde_json::{Map, Value};
use std::sync::Arc;

use relay_core::{Action, ActionOutcome, DispatchError, DispatchOptions, TimeZoneSource};

use crate::handler::{DefaultDispatch, ErrorReporter};
use crate::registry::ActionRegistry;

/// Routes actions to registered handlers or to the default dispatch.
pub struct ActionDispatcher {
    registry: Arc<ActionRegistry>,
    fallback: Arc<dyn DefaultDispatch>,
    reporter: Arc<dyn ErrorReporter>,
    timezone: TimeZoneSource,
}

impl ActionDispatcher {
    pub fn new(
        registry: Arc<ActionRegistry>,
        fallback: Arc<dyn DefaultDispatch>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            registry,
            fallback,
            reporter,
            timezone: TimeZoneSource::System,
        }
    }

    /// Set where the `tz` option comes from.
    pub fn with_timezone(mut self, timezone: TimeZoneSource) -> Self {
        self.timezone = timezone;
        self
    }

    /// Get a reference to the registry.
    pub fn registry(&self) -> &Arc<ActionRegistry> {
        &self.registry
    }

    /// Dispatch one action.
    pub async fn dispatch(
        &self,
        mut action: Action,
        options: DispatchOptions,
    ) -> Result<ActionOutcome, DispatchError> {
        if action.action_type.is_empty() {
            return Err(self.fail(DispatchError::EmptyActionType));
        }

        let Some(handler) = self.registry.resolve(&action.action_type) else {
            tracing::debug!(
                "No handler for '{}', using default dispatch",
                action.action_type
            );
            return self.fallback.dispatch(action, options).await;
        };

        if action.is_report_download() {
            let tz = self.timezone.resolve();
            if let Err(e) = normalize_options(&mut action, &tz) {
                return Err(self.fail(e));
            }
        }

        tracing::debug!("Dispatching '{}'", action.action_type);
        handler.execute(action, options).await
    }

    fn fail(&self, error: DispatchError) -> DispatchError {
        tracing::error!("Dispatch aborted: {}", error);
        self.reporter.report_error(error.to_error_info());
        error
    }
}

/// Inject `tz` into `data.options` and store it back as a JSON string.
///
/// A missing or empty `options` counts as `{}`. Anything that does not decode
/// to a JSON object is rejected and the action is left untouched.
pub fn normalize_options(action: &mut Action, tz: &str) -> Result<(), DispatchError> {
    let mut options: Map<String, Value> = match action.options() {
        None => Map::new(),
        Some(Value::String(raw)) if raw.is_empty() => Map::new(),
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                return Err(DispatchError::InvalidActionOptions(format!(
                    "expected a JSON object, got {}",
                    json_kind(&other)
                )))
            }
            Err(e) => return Err(DispatchError::InvalidActionOptions(e.to_string())),
        },
        Some(Value::Object(map)) => map.clone(),
        Some(other) => {
            return Err(DispatchError::InvalidActionOptions(format!(
                "expected a JSON string, got {}",
                json_kind(other)
            )))
        }
    };

    options.insert("tz".to_string(), Value::String(tz.to_string()));
    let encoded = serde_json::to_string(&options)
        .map_err(|e| DispatchError::InvalidActionOptions(e.to_string()))?;
    action.set_options(encoded);
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
