//! The reconcile and sweep routines.
//!
//! Both read the declared language through the state port, classify it and
//! write the verdict with the applier. [`Reconciler::reconcile`] always
//! writes and then calls the translation hook; [`Reconciler::sweep`] only
//! writes when the current state disagrees with the verdict and never calls
//! the hook.

use std::fmt;
use std::sync::Arc;

use horizon_dirsync_core::PerfSpan;
use horizon_dirsync_core::logging::{span_names, targets};

use crate::applier;
use crate::direction::{self, TextDirection};
use crate::port::DirectionState;
use crate::translation::{HookOutcome, TranslationHook};

/// Result of one reconcile pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// The language read at the start of the pass.
    pub language: Option<String>,
    /// The direction that was applied.
    pub direction: TextDirection,
    /// What the translation hook did.
    pub hook: HookOutcome,
}

/// Shared evaluation path for every trigger.
///
/// Cheap to clone; clones share the state port and hook.
#[derive(Clone)]
pub struct Reconciler {
    state: Arc<dyn DirectionState>,
    hook: Option<TranslationHook>,
}

impl Reconciler {
    /// Create a reconciler over `state` with no translation hook.
    pub fn new(state: Arc<dyn DirectionState>) -> Self {
        Self { state, hook: None }
    }

    /// Call `hook` after every reconcile.
    pub fn with_hook(mut self, hook: TranslationHook) -> Self {
        self.hook = Some(hook);
        self
    }

    /// The state port.
    pub fn state(&self) -> &Arc<dyn DirectionState> {
        &self.state
    }

    /// The translation hook, if one is configured.
    pub fn hook(&self) -> Option<&TranslationHook> {
        self.hook.as_ref()
    }

    /// Classify a language code.
    pub fn classify(&self, code: Option<&str>) -> TextDirection {
        direction::classify(code)
    }

    /// The direction the current language calls for.
    pub fn expected_direction(&self) -> TextDirection {
        direction::classify(self.state.language().as_deref())
    }

    /// Apply right-to-left.
    pub fn apply_rtl(&self) {
        applier::apply_rtl(&*self.state);
    }

    /// Apply left-to-right.
    pub fn apply_ltr(&self) {
        applier::apply_ltr(&*self.state);
    }

    /// Apply `direction`.
    pub fn apply(&self, direction: TextDirection) {
        applier::apply(&*self.state, direction);
    }

    /// Read the language, apply its direction, then call the translation
    /// hook with the language (empty when none is declared).
    pub fn reconcile(&self) -> ReconcileOutcome {
        let _span = PerfSpan::new(span_names::RECONCILE);

        let language = self.state.language();
        let direction = direction::classify(language.as_deref());
        self.apply(direction);

        let hook = match &self.hook {
            Some(hook) => hook.invoke(language.as_deref().unwrap_or_default()),
            None => HookOutcome::Missing,
        };

        tracing::debug!(
            target: targets::RECONCILE,
            language = language.as_deref().unwrap_or_default(),
            %direction,
            ?hook,
            "reconciled"
        );

        ReconcileOutcome {
            language,
            direction,
            hook,
        }
    }

    /// Apply the expected direction only if the declared direction or the
    /// marker disagrees with it. Returns the direction applied, if any.
    pub fn sweep(&self) -> Option<TextDirection> {
        let _span = PerfSpan::new(span_names::SWEEP);

        let expected = self.expected_direction();
        let current = self.state.direction();
        let consistent = current.as_deref() == Some(expected.as_str())
            && self.state.marker() == expected.is_rtl();
        if consistent {
            return None;
        }

        tracing::info!(
            target: targets::SWEEP,
            expected = %expected,
            current = current.as_deref().unwrap_or_default(),
            "direction out of sync, correcting"
        );
        self.apply(expected);
        Some(expected)
    }
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("hook", &self.hook.as_ref().map(TranslationHook::name))
            .finish_non_exhaustive()
    }
}
