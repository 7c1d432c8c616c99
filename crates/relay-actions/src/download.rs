//! Report download handler.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle -> Blocking -> InFlight -> Success | Failure -> Unblocking -> Terminal
//! ```
//!
//! The UI-busy guard is taken before the request and dropped after it
//! settles. A failure is reported once through the shared error reporter.
//! A panic inside the transport is caught and treated as a failure.

use async_trait::async_trait;
use futures::FutureExt;
use serde::Serialize;
use serde_json::{Map, Value};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use relay_core::{
    Action, ActionOutcome, DispatchError, DispatchOptions, DownloadReceipt, TransportError,
};

use crate::busy::UiBusy;
use crate::handler::{ActionHandler, ErrorReporter};

/// What the transport is asked to fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadRequest {
    /// Endpoint path, e.g. "/get_reports"
    pub url: String,

    /// Request fields, including the normalized `options` string.
    pub data: Map<String, Value>,
}

/// Performs the network retrieval and saves the file.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DownloadTransport: Send + Sync {
    async fn get_file(&self, request: DownloadRequest) -> Result<DownloadReceipt, TransportError>;
}

/// Executes `ir_actions_report_download` actions.
pub struct DownloadActionHandler {
    transport: Arc<dyn DownloadTransport>,
    reporter: Arc<dyn ErrorReporter>,
    busy: Arc<UiBusy>,
    url: String,
}

impl DownloadActionHandler {
    pub const DEFAULT_URL: &'static str = "/get_reports";

    /// Create a handler that blocks the process-wide busy resource.
    pub fn new(transport: Arc<dyn DownloadTransport>, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            transport,
            reporter,
            busy: UiBusy::global(),
            url: Self::DEFAULT_URL.to_string(),
        }
    }

    /// Use a specific busy resource.
    pub fn with_busy(mut self, busy: Arc<UiBusy>) -> Self {
        self.busy = busy;
        self
    }

    /// Use a different download endpoint.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    async fn fetch(&self, request: DownloadRequest) -> Result<DownloadReceipt, TransportError> {
        let transport = self.transport.clone();
        // The call itself happens inside the async block so that a panic in
        // a transport's synchronous prelude is caught too.
        AssertUnwindSafe(async move { transport.get_file(request).await })
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(TransportError::Panicked))
    }
}

#[async_trait]
impl ActionHandler for DownloadActionHandler {
    async fn execute(
        &self,
        action: Action,
        _options: DispatchOptions,
    ) -> Result<ActionOutcome, DispatchError> {
        tracing::debug!(state = "blocking", "Report download");
        let guard = self.busy.block("report download");

        let request = DownloadRequest {
            url: self.url.clone(),
            data: action.data,
        };
        tracing::debug!(state = "in_flight", url = %request.url, "Report download");

        let result = match self.fetch(request).await {
            Ok(receipt) => {
                tracing::info!(
                    file = receipt.file_name.as_deref().unwrap_or("<unnamed>"),
                    size = receipt.size,
                    "Report downloaded"
                );
                Ok(ActionOutcome::Downloaded(receipt))
            }
            Err(e) => {
                tracing::error!("Report download failed: {}", e);
                self.reporter.report_error(e.to_error_info());
                Err(DispatchError::DownloadTransportFailure(e))
            }
        };

        tracing::debug!(state = "unblocking", "Report download");
        drop(guard);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::MockErrorReporter;
    use relay_core::{ErrorInfo, REPORT_DOWNLOAD_ACTION};
    use serde_json::json;

    fn download_action() -> Action {
        Action::new(REPORT_DOWNLOAD_ACTION)
            .unwrap()
            .with_data("model", "stock.report")
            .with_data("options", "{\"tz\":\"UTC\"}")
            .with_data("output_format", "xlsx")
    }

    fn receipt() -> DownloadReceipt {
        DownloadReceipt {
            file_name: Some("stock.xlsx".to_string()),
            path: None,
            size: 128,
        }
    }

    struct PanickingTransport;

    #[async_trait]
    impl DownloadTransport for PanickingTransport {
        async fn get_file(
            &self,
            _request: DownloadRequest,
        ) -> Result<DownloadReceipt, TransportError> {
            panic!("transport exploded")
        }
    }

    fn silent_reporter() -> Arc<MockErrorReporter> {
        let mut reporter = MockErrorReporter::new();
        reporter.expect_report_error().never();
        Arc::new(reporter)
    }

    #[tokio::test]
    async fn test_success_passes_data_and_unblocks() {
        let busy = Arc::new(UiBusy::new());
        let mut transport = MockDownloadTransport::new();
        transport
            .expect_get_file()
            .withf(|req| {
                req.url == "/get_reports"
                    && req.data["model"] == json!("stock.report")
                    && req.data["options"] == json!("{\"tz\":\"UTC\"}")
            })
            .times(1)
            .returning(|_| Ok(receipt()));

        let handler = DownloadActionHandler::new(Arc::new(transport), silent_reporter())
            .with_busy(busy.clone());

        let outcome = handler
            .execute(download_action(), DispatchOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome, ActionOutcome::Downloaded(receipt()));
        assert!(!busy.is_busy());
        assert_eq!(busy.stats().acquired, 1);
        assert_eq!(busy.stats().released, 1);
    }

    #[tokio::test]
    async fn test_failure_reports_once_and_unblocks() {
        let busy = Arc::new(UiBusy::new());
        let mut transport = MockDownloadTransport::new();
        transport.expect_get_file().times(1).returning(|_| {
            Err(TransportError::Server(ErrorInfo::new(400, "Bad Request")))
        });

        let mut reporter = MockErrorReporter::new();
        reporter
            .expect_report_error()
            .withf(|info| info.code == 400 && info.message == "Bad Request")
            .times(1)
            .return_const(());

        let handler = DownloadActionHandler::new(Arc::new(transport), Arc::new(reporter))
            .with_busy(busy.clone());

        let result = handler
            .execute(download_action(), DispatchOptions::default())
            .await;

        assert!(matches!(
            result,
            Err(DispatchError::DownloadTransportFailure(TransportError::Server(_)))
        ));
        assert!(!busy.is_busy());
        assert_eq!(busy.stats().released, 1);
    }

    #[tokio::test]
    async fn test_transport_panic_unblocks_and_reports() {
        let busy = Arc::new(UiBusy::new());
        let mut reporter = MockErrorReporter::new();
        reporter.expect_report_error().times(1).return_const(());

        let handler = DownloadActionHandler::new(Arc::new(PanickingTransport), Arc::new(reporter))
            .with_busy(busy.clone());

        let result = handler
            .execute(download_action(), DispatchOptions::default())
            .await;

        assert!(matches!(
            result,
            Err(DispatchError::DownloadTransportFailure(TransportError::Panicked))
        ));
        assert!(!busy.is_busy());
        assert_eq!(busy.stats().acquired, 1);
        assert_eq!(busy.stats().released, 1);
    }

    #[tokio::test]
    async fn test_two_calls_are_two_downloads() {
        let busy = Arc::new(UiBusy::new());
        let mut transport = MockDownloadTransport::new();
        transport
            .expect_get_file()
            .times(2)
            .returning(|_| Ok(receipt()));

        let handler = DownloadActionHandler::new(Arc::new(transport), silent_reporter())
            .with_busy(busy.clone())
            .with_url("/custom/reports");

        for _ in 0..2 {
            handler
                .execute(download_action(), DispatchOptions::default())
                .await
                .unwrap();
        }
        assert_eq!(busy.stats().acquired, 2);
        assert_eq!(busy.stats().released, 2);
    }
}
