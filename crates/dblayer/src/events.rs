//! Lifecycle hooks for writes.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};

/// The write lifecycle phases a hook can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    BeforeCreate,
    AfterCreate,
    BeforeUpdate,
    AfterUpdate,
    BeforeDelete,
    AfterDelete,
}

impl EventKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BeforeCreate => "before_create",
            Self::AfterCreate => "after_create",
            Self::BeforeUpdate => "before_update",
            Self::AfterUpdate => "after_update",
            Self::BeforeDelete => "before_delete",
            Self::AfterDelete => "after_delete",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hook receives the payload of the write: the row for creates (with the
/// generated `id` added in `AfterCreate`), the new values for updates and
/// `null` for deletes.
pub type Handler = Arc<dyn Fn(&Value) -> std::result::Result<(), String> + Send + Sync>;

/// Per-table hook registry shared by a [`DbLayer`](crate::DbLayer) and
/// every transaction begun from it.
#[derive(Default)]
pub struct Hooks {
    handlers: RwLock<HashMap<(String, EventKind), Vec<Handler>>>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Hooks")
            .field("registered", &handlers.values().map(Vec::len).sum::<usize>())
            .finish()
    }
}

impl Hooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, table: &str, kind: EventKind, handler: Handler) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry((String::from(table), kind))
            .or_default()
            .push(handler);
    }

    /// Runs the handlers for `(table, kind)` in registration order,
    /// stopping at the first failure.
    pub fn run(&self, table: &str, kind: EventKind, payload: &Value) -> Result<()> {
        // Handlers may register further hooks, so the lock is released first.
        let handlers: Vec<Handler> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(String::from(table), kind))
            .cloned()
            .unwrap_or_default();
        for handler in handlers {
            handler(payload).map_err(|message| {
                debug!(table, event = %kind, %message, "hook failed");
                Error::Hook {
                    event: kind,
                    message,
                }
            })?;
        }
        Ok(())
    }

    #[must_use]
    pub fn count(&self, table: &str, kind: EventKind) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(String::from(table), kind))
            .map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn test_handlers_run_in_order_and_stop_on_error() {
        let hooks = Hooks::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for (i, fail) in [(1, false), (2, true), (3, false)] {
            let seen = Arc::clone(&seen);
            hooks.register(
                "users",
                EventKind::BeforeCreate,
                Arc::new(move |_: &Value| {
                    seen.lock().unwrap().push(i);
                    if fail {
                        Err(format!("hook {i} refused"))
                    } else {
                        Ok(())
                    }
                }),
            );
        }

        let err = hooks
            .run("users", EventKind::BeforeCreate, &Value::Null)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Hook { event: EventKind::BeforeCreate, ref message } if message == "hook 2 refused"
        ));
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_hooks_are_scoped_by_table_and_kind() {
        let hooks = Hooks::new();
        hooks.register("users", EventKind::AfterDelete, Arc::new(|_: &Value| Err(String::from("no"))));
        assert!(hooks.run("posts", EventKind::AfterDelete, &Value::Null).is_ok());
        assert!(hooks.run("users", EventKind::BeforeDelete, &Value::Null).is_ok());
        assert_eq!(hooks.count("users", EventKind::AfterDelete), 1);
    }
}
