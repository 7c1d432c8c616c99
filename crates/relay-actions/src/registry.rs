//! Action Registry
//!
//! Maps an action type tag to the handler that executes it.
//!
//! ## Override Chain
//!
//! Registration never fails. A later registration for the same type shadows
//! the earlier one (last writer wins), so a more specific module can take
//! over a generic handler. Use [`ActionRegistry::wrap`] when the override
//! still needs the base behavior:
//!
//! ```ignore
//! registry.wrap("ir_actions_report_download", |previous| {
//!     Arc::new(AuditedHandler { inner: previous })
//! });
//! ```
//!
//! The wrapper owns the previous handler and decides when to call it.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::handler::ActionHandler;

/// A registered handler and how many registrations it shadows.
struct HandlerRegistration {
    handler: Arc<dyn ActionHandler>,
    depth: usize,
}

/// Registry of action handlers keyed by action type.
pub struct ActionRegistry {
    handlers: RwLock<HashMap<String, HandlerRegistration>>,
}

impl ActionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Install a handler for `action_type`, replacing any existing one.
    pub fn register(&self, action_type: impl Into<String>, handler: Arc<dyn ActionHandler>) {
        let action_type = action_type.into();
        let mut handlers = self.handlers.write();
        let depth = handlers.get(&action_type).map_or(1, |r| r.depth + 1);
        if depth > 1 {
            tracing::debug!(
                "Handler for '{}' shadows an earlier registration (depth {})",
                action_type,
                depth
            );
        }
        tracing::info!("Registered action handler: {}", action_type);
        handlers.insert(action_type, HandlerRegistration { handler, depth });
    }

    /// Install a handler built from the one it replaces.
    ///
    /// `build` receives the current handler for `action_type` (if any). It runs
    /// under the registry's write lock and must not call back into the registry.
    pub fn wrap<F>(&self, action_type: impl Into<String>, build: F)
    where
        F: FnOnce(Option<Arc<dyn ActionHandler>>) -> Arc<dyn ActionHandler>,
    {
        let action_type = action_type.into();
        let mut handlers = self.handlers.write();
        let (previous, depth) = match handlers.get(&action_type) {
            Some(r) => (Some(r.handler.clone()), r.depth + 1),
            None => (None, 1),
        };
        let handler = build(previous);
        tracing::info!(
            "Wrapped action handler: {} (depth {})",
            action_type,
            depth
        );
        handlers.insert(action_type, HandlerRegistration { handler, depth });
    }

    /// Look up the active handler for `action_type`.
    pub fn resolve(&self, action_type: &str) -> Option<Arc<dyn ActionHandler>> {
        self.handlers
            .read()
            .get(action_type)
            .map(|r| r.handler.clone())
    }

    /// Check if a handler is registered for `action_type`.
    pub fn contains(&self, action_type: &str) -> bool {
        self.handlers.read().contains_key(action_type)
    }

    /// Number of registrations stacked on `action_type` (0 if none).
    pub fn chain_depth(&self, action_type: &str) -> usize {
        self.handlers
            .read()
            .get(action_type)
            .map_or(0, |r| r.depth)
    }

    /// List all registered action types.
    pub fn types(&self) -> Vec<String> {
        self.handlers.read().keys().cloned().collect()
    }

    /// Get the count of registered action types.
    pub fn count(&self) -> usize {
        self.handlers.read().len()
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use relay_core::{Action, ActionOutcome, DispatchError, DispatchOptions};
    use serde_json::json;

    struct Fixed(&'static str);

    #[async_trait]
    impl ActionHandler for Fixed {
        async fn execute(
            &self,
            _action: Action,
            _options: DispatchOptions,
        ) -> Result<ActionOutcome, DispatchError> {
            Ok(ActionOutcome::Handled(json!(self.0)))
        }
    }

    /// Appends its own tag to whatever the wrapped handler returned.
    struct Suffix {
        inner: Option<Arc<dyn ActionHandler>>,
        tag: &'static str,
    }

    #[async_trait]
    impl ActionHandler for Suffix {
        async fn execute(
            &self,
            action: Action,
            options: DispatchOptions,
        ) -> Result<ActionOutcome, DispatchError> {
            let base = match &self.inner {
                Some(inner) => match inner.execute(action, options).await? {
                    ActionOutcome::Handled(v) => v.as_str().unwrap_or_default().to_string(),
                    _ => String::new(),
                },
                None => String::new(),
            };
            Ok(ActionOutcome::Handled(json!(format!("{}{}", base, self.tag))))
        }
    }

    async fn run(handler: Arc<dyn ActionHandler>) -> ActionOutcome {
        handler
            .execute(Action::new("test").unwrap(), DispatchOptions::default())
            .await
            .unwrap()
    }

    #[test]
    fn test_registry_new() {
        let registry = ActionRegistry::new();
        assert_eq!(registry.count(), 0);
        assert!(registry.resolve("anything").is_none());
        assert_eq!(registry.chain_depth("anything"), 0);
    }

    #[tokio::test]
    async fn test_later_registration_wins() {
        let registry = ActionRegistry::new();
        registry.register("test", Arc::new(Fixed("first")));
        registry.register("test", Arc::new(Fixed("second")));

        assert_eq!(registry.count(), 1);
        assert_eq!(registry.chain_depth("test"), 2);

        let handler = registry.resolve("test").unwrap();
        assert_eq!(run(handler).await, ActionOutcome::Handled(json!("second")));
    }

    #[tokio::test]
    async fn test_types_are_independent() {
        let registry = ActionRegistry::new();
        registry.register("a", Arc::new(Fixed("a")));
        registry.register("b", Arc::new(Fixed("b")));

        assert!(registry.contains("a"));
        assert!(registry.contains("b"));
        assert!(!registry.contains("c"));

        let mut types = registry.types();
        types.sort();
        assert_eq!(types, vec!["a".to_string(), "b".to_string()]);

        let a = registry.resolve("a").unwrap();
        assert_eq!(run(a).await, ActionOutcome::Handled(json!("a")));
    }

    #[tokio::test]
    async fn test_wrap_calls_previous() {
        let registry = ActionRegistry::new();
        registry.register("test", Arc::new(Fixed("base")));
        registry.wrap("test", |previous| {
            Arc::new(Suffix {
                inner: previous,
                tag: "+one",
            })
        });
        registry.wrap("test", |previous| {
            Arc::new(Suffix {
                inner: previous,
                tag: "+two",
            })
        });

        assert_eq!(registry.chain_depth("test"), 3);
        let handler = registry.resolve("test").unwrap();
        assert_eq!(
            run(handler).await,
            ActionOutcome::Handled(json!("base+one+two"))
        );
    }

    #[tokio::test]
    async fn test_wrap_without_previous() {
        let registry = ActionRegistry::new();
        registry.wrap("test", |previous| {
            assert!(previous.is_none());
            Arc::new(Suffix {
                inner: previous,
                tag: "only",
            })
        });

        let handler = registry.resolve("test").unwrap();
        assert_eq!(run(handler).await, ActionOutcome::Handled(json!("only")));
    }
}
