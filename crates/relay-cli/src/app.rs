//! Composition root: wires config, transport, registry and dispatcher.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use relay_actions::{
    ActionDispatcher, ActionRegistry, DefaultDispatch, DownloadActionHandler, DownloadTransport,
    ErrorReporter, TracingErrorReporter,
};
use relay_core::{
    Action, ActionOutcome, DispatchError, DispatchOptions, RelayConfig, TimeZoneSource,
    REPORT_DOWNLOAD_ACTION,
};
use relay_http::HttpDownloadTransport;

use crate::cli::DownloadArgs;
use crate::error::CliError;

/// Host dispatch for types nothing is registered for: logs and echoes.
pub struct LoggingDispatch;

#[async_trait]
impl DefaultDispatch for LoggingDispatch {
    async fn dispatch(
        &self,
        action: Action,
        options: DispatchOptions,
    ) -> Result<ActionOutcome, DispatchError> {
        tracing::info!(
            action_type = %action.action_type,
            clear_breadcrumbs = options.clear_breadcrumbs,
            "Handled by default dispatch"
        );
        Ok(ActionOutcome::Handled(json!({
            "type": action.action_type,
            "data": action.data,
        })))
    }
}

pub struct App {
    dispatcher: ActionDispatcher,
}

impl App {
    /// Build the dispatcher over HTTP as configured.
    pub fn from_config(config: &RelayConfig) -> Result<Self, CliError> {
        let transport = Arc::new(HttpDownloadTransport::new(&config.download)?);
        tracing::info!(
            base_url = %config.download.base_url,
            output_dir = %transport.output_dir().display(),
            "Download transport ready"
        );
        Ok(Self::with_transport(config, transport))
    }

    pub fn with_transport(config: &RelayConfig, transport: Arc<dyn DownloadTransport>) -> Self {
        let reporter: Arc<dyn ErrorReporter> = Arc::new(TracingErrorReporter);
        let registry = Arc::new(ActionRegistry::new());
        registry.register(
            REPORT_DOWNLOAD_ACTION,
            Arc::new(
                DownloadActionHandler::new(transport, reporter.clone())
                    .with_url(config.download.url.clone()),
            ),
        );

        let dispatcher = ActionDispatcher::new(registry, Arc::new(LoggingDispatch), reporter)
            .with_timezone(TimeZoneSource::from_config(&config.client));
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &ActionDispatcher {
        &self.dispatcher
    }

    pub async fn dispatch(
        &self,
        action: Action,
        options: DispatchOptions,
    ) -> Result<ActionOutcome, DispatchError> {
        self.dispatcher.dispatch(action, options).await
    }
}

/// Parse an action from its JSON form.
pub fn parse_action(json: &str) -> Result<Action, CliError> {
    serde_json::from_str(json).map_err(|e| CliError::InvalidAction(e.to_string()))
}

/// Build a report download action from command-line arguments.
pub fn download_action(args: &DownloadArgs) -> Result<Action, CliError> {
    let record_id = args.record_id.map(Value::from).unwrap_or(Value::Null);
    let mut action = Action::new(REPORT_DOWNLOAD_ACTION)?
        .with_data("model", args.model.clone())
        .with_data("output_format", args.output_format.clone())
        .with_data("record_id", record_id);
    if let Some(options) = &args.options {
        action = action.with_data("options", options.clone());
    }
    Ok(action)
}
