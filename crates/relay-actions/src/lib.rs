//! Action dispatch for relay.
//!
//! This crate provides:
//! - `ActionRegistry` - type tag to handler, with override chains
//! - `ActionDispatcher` - option normalization and fallback dispatch
//! - `DownloadActionHandler` - report downloads behind the UI-busy resource
//! - `UiBusy` - the process-wide busy overlay with scoped acquisition
//! - `ModalStackManager` and `ModalLayer` - modal z-index layering

pub mod busy;
pub mod dispatcher;
pub mod download;
pub mod handler;
pub mod modal;
pub mod registry;
pub mod report;

pub use busy::{BusyGuard, BusyStats, UiBusy};
pub use dispatcher::{normalize_options, ActionDispatcher};
pub use download::{DownloadActionHandler, DownloadRequest, DownloadTransport};
pub use handler::{ActionHandler, DefaultDispatch, ErrorReporter};
pub use modal::{
    ModalEntry, ModalId, ModalLayer, ModalPart, ModalStackManager, ModalSurface, StackCorrection,
};
pub use registry::ActionRegistry;
pub use report::{DialogErrorReporter, TracingErrorReporter};

// Re-export relay_core types for convenience
pub use relay_core::{
    Action, ActionOutcome, DispatchError, DispatchOptions, DownloadReceipt, ErrorInfo,
    TransportError, REPORT_DOWNLOAD_ACTION,
};
