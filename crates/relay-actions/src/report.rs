//! Error reporters.

use std::sync::Arc;

use relay_core::ErrorInfo;

use crate::handler::ErrorReporter;
use crate::modal::ModalLayer;

/// Logs reported errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn report_error(&self, info: ErrorInfo) {
        tracing::error!(code = info.code, data = %info.data, "{}", info.message);
    }
}

/// Shows reported errors as dialogs on a modal layer.
///
/// Opening the dialog goes through the layer, so an error raised while other
/// dialogs are open is stacked above them.
pub struct DialogErrorReporter {
    layer: Arc<ModalLayer>,
}

impl DialogErrorReporter {
    pub fn new(layer: Arc<ModalLayer>) -> Self {
        Self { layer }
    }

    pub fn layer(&self) -> &Arc<ModalLayer> {
        &self.layer
    }
}

impl ErrorReporter for DialogErrorReporter {
    fn report_error(&self, info: ErrorInfo) {
        tracing::error!(code = info.code, data = %info.data, "{}", info.message);
        let title = match info.code {
            0 => info.message,
            code => format!("Error {}: {}", code, info.message),
        };
        let (id, correction) = self.layer.open(title);
        tracing::debug!("Error dialog {:?} opened ({:?})", id, correction);
    }
}
