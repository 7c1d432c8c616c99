//! Collaborator seams of the dispatch path.

use async_trait::async_trait;
use relay_core::{Action, ActionOutcome, DispatchError, DispatchOptions, ErrorInfo};

/// Logic bound to one action type.
///
/// Stored in the [`ActionRegistry`](crate::ActionRegistry) as
/// `Arc<dyn ActionHandler>`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Execute the action end-to-end.
    async fn execute(
        &self,
        action: Action,
        options: DispatchOptions,
    ) -> Result<ActionOutcome, DispatchError>;
}

/// The host's own action execution, used when no handler is registered.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DefaultDispatch: Send + Sync {
    async fn dispatch(
        &self,
        action: Action,
        options: DispatchOptions,
    ) -> Result<ActionOutcome, DispatchError>;
}

/// Shows failures to the user through one consistent surface.
#[cfg_attr(test, mockall::automock)]
pub trait ErrorReporter: Send + Sync {
    fn report_error(&self, info: ErrorInfo);
}
