//! Optional translation hook.
//!
//! The host may register functions under well-known names in a [`Globals`]
//! table. After each reconcile the controller looks up the configured hook
//! name and, if a function is registered, calls it with the current
//! language. A missing hook is skipped; a failing or panicking hook is
//! logged and contained so direction state stays correct.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use horizon_dirsync_core::logging::targets;
use parking_lot::RwLock;

/// Error returned by a host function.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HookError {
    message: String,
}

impl HookError {
    /// Create a hook error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A host function taking a language code.
pub type GlobalFunction = Arc<dyn Fn(&str) -> Result<(), HookError> + Send + Sync>;

/// Named host functions, the page's global scope.
#[derive(Default)]
pub struct Globals {
    functions: RwLock<HashMap<String, GlobalFunction>>,
}

impl Globals {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `function` under `name`, replacing any previous one.
    pub fn register<F>(&self, name: impl Into<String>, function: F)
    where
        F: Fn(&str) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.functions.write().insert(name.into(), Arc::new(function));
    }

    /// Remove the function registered under `name`.
    pub fn unregister(&self, name: &str) -> bool {
        self.functions.write().remove(name).is_some()
    }

    /// The function registered under `name`.
    pub fn get(&self, name: &str) -> Option<GlobalFunction> {
        self.functions.read().get(name).cloned()
    }

    /// Whether a function is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.functions.read().contains_key(name)
    }
}

impl fmt::Debug for Globals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.functions.read().keys().cloned().collect();
        names.sort();
        f.debug_struct("Globals").field("functions", &names).finish()
    }
}

/// What happened when the hook was invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    /// No function is registered under the hook name.
    Missing,
    /// The hook ran and returned `Ok`.
    Completed,
    /// The hook returned an error.
    Failed(String),
    /// The hook panicked.
    Panicked(String),
}

impl HookOutcome {
    /// Whether the hook was found and called.
    pub fn was_called(&self) -> bool {
        !matches!(self, Self::Missing)
    }
}

/// The optional translation hook, resolved by name on every call.
#[derive(Debug, Clone)]
pub struct TranslationHook {
    globals: Arc<Globals>,
    name: String,
}

impl TranslationHook {
    /// Bind to the function named `name` in `globals`.
    pub fn new(globals: Arc<Globals>, name: impl Into<String>) -> Self {
        Self {
            globals,
            name: name.into(),
        }
    }

    /// The global name the hook is looked up under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Call the hook with `language`, containing any failure.
    pub fn invoke(&self, language: &str) -> HookOutcome {
        let Some(function) = self.globals.get(&self.name) else {
            tracing::debug!(
                target: targets::TRANSLATION,
                hook = %self.name,
                "translation hook not registered, skipping"
            );
            return HookOutcome::Missing;
        };

        match panic::catch_unwind(AssertUnwindSafe(|| function(language))) {
            Ok(Ok(())) => {
                tracing::trace!(
                    target: targets::TRANSLATION,
                    hook = %self.name,
                    language,
                    "translation hook completed"
                );
                HookOutcome::Completed
            }
            Ok(Err(err)) => {
                tracing::warn!(
                    target: targets::TRANSLATION,
                    hook = %self.name,
                    language,
                    error = %err,
                    "translation hook failed"
                );
                HookOutcome::Failed(err.to_string())
            }
            Err(payload) => {
                let message = if let Some(s) = payload.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = payload.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "unknown panic".to_string()
                };
                tracing::warn!(
                    target: targets::TRANSLATION,
                    hook = %self.name,
                    language,
                    panic = %message,
                    "translation hook panicked"
                );
                HookOutcome::Panicked(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_globals_registry() {
        let globals = Globals::new();
        assert!(!globals.contains("translatePage"));
        globals.register("translatePage", |_| Ok(()));
        assert!(globals.contains("translatePage"));
        assert!(globals.get("translatePage").is_some());
        assert!(globals.unregister("translatePage"));
        assert!(!globals.unregister("translatePage"));
        assert_eq!(format!("{globals:?}"), "Globals { functions: [] }");
    }

    #[test]
    fn test_missing_hook() {
        let hook = TranslationHook::new(Arc::new(Globals::new()), "translatePage");
        assert_eq!(hook.invoke("ar"), HookOutcome::Missing);
        assert!(!hook.invoke("ar").was_called());
    }

    #[test]
    fn test_hook_receives_language() {
        let globals = Arc::new(Globals::new());
        let calls = Arc::new(Mutex::new(Vec::new()));
        let calls_clone = calls.clone();
        globals.register("translatePage", move |code| {
            calls_clone.lock().push(code.to_string());
            Ok(())
        });

        let hook = TranslationHook::new(globals, "translatePage");
        assert_eq!(hook.invoke("ar"), HookOutcome::Completed);
        assert_eq!(*calls.lock(), vec!["ar".to_string()]);
    }

    #[test]
    fn test_hook_registered_later_is_found() {
        let globals = Arc::new(Globals::new());
        let hook = TranslationHook::new(globals.clone(), "translatePage");
        assert_eq!(hook.invoke("fa"), HookOutcome::Missing);

        globals.register("translatePage", |_| Ok(()));
        assert_eq!(hook.invoke("fa"), HookOutcome::Completed);
    }

    #[test]
    fn test_hook_failures_are_contained() {
        let globals = Arc::new(Globals::new());
        globals.register("fails", |_| Err(HookError::new("service unavailable")));
        globals.register("panics", |code| panic!("cannot translate {code}"));

        let failing = TranslationHook::new(globals.clone(), "fails");
        assert_eq!(
            failing.invoke("ur"),
            HookOutcome::Failed("service unavailable".into())
        );

        let panicking = TranslationHook::new(globals, "panics");
        assert_eq!(
            panicking.invoke("ur"),
            HookOutcome::Panicked("cannot translate ur".into())
        );
    }
}
