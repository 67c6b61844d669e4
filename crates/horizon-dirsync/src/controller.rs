//! The direction controller.
//!
//! [`DirectionController`] binds a [`Reconciler`] to a [`Page`] using a
//! [`DirectionConfig`], and [`start`](DirectionController::start) wires the
//! triggers:
//!
//! 1. startup: reconcile once (now, or when the document finishes loading)
//!    and attach the language switcher if the page has one;
//! 2. attribute watch on the root's language attribute;
//! 3. the periodic consistency sweep;
//! 4. the translation widget watch.
//!
//! The classifier, applier and reconcile routine stay callable on their own
//! without starting anything.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use horizon_dirsync_core::logging::targets;
use parking_lot::Mutex;

use crate::config::DirectionConfig;
use crate::direction::TextDirection;
use crate::dom::SelectorList;
use crate::error::{Error, Result};
use crate::page::Page;
use crate::port::DocumentState;
use crate::reconcile::{ReconcileOutcome, Reconciler};
use crate::switcher::{attach_switcher, SwitcherHandle};
use crate::translation::TranslationHook;
use crate::triggers::{
    run_when_ready, start_sweep, watch_language_attribute, watch_widget, ObserverHandle,
    StartupHandle, SweepHandle, WidgetWatchHandle,
};

/// Keeps a page's root direction in sync with its declared language.
#[derive(Debug)]
pub struct DirectionController {
    page: Page,
    config: DirectionConfig,
    reconciler: Reconciler,
    widget_marker: SelectorList,
    started: AtomicBool,
}

impl DirectionController {
    /// Create a controller for `page`. Nothing runs until
    /// [`start`](Self::start).
    pub fn new(page: &Page, config: DirectionConfig) -> Result<Self> {
        config.validate()?;
        let widget_marker = config.widget_marker_selector()?;

        let state = DocumentState::new(
            page.document(),
            config.language_attribute.as_str(),
            config.direction_attribute.as_str(),
            config.rtl_marker_class.as_str(),
        );
        let hook = TranslationHook::new(page.globals().clone(), config.translation_hook.as_str());
        let reconciler = Reconciler::new(Arc::new(state)).with_hook(hook);

        Ok(Self {
            page: page.clone(),
            config,
            reconciler,
            widget_marker,
            started: AtomicBool::new(false),
        })
    }

    /// Create a controller with the default configuration.
    pub fn with_defaults(page: &Page) -> Result<Self> {
        Self::new(page, DirectionConfig::default())
    }

    /// The controller's configuration.
    pub fn config(&self) -> &DirectionConfig {
        &self.config
    }

    /// The page the controller is bound to.
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// The shared reconcile path.
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Classify a language code.
    pub fn classify(&self, code: Option<&str>) -> TextDirection {
        self.reconciler.classify(code)
    }

    /// Apply right-to-left to the page.
    pub fn apply_rtl(&self) {
        self.reconciler.apply_rtl();
    }

    /// Apply left-to-right to the page.
    pub fn apply_ltr(&self) {
        self.reconciler.apply_ltr();
    }

    /// Run one full reconcile, including the translation hook.
    pub fn reconcile(&self) -> ReconcileOutcome {
        self.reconciler.reconcile()
    }

    /// Wire the enabled triggers.
    ///
    /// Fails with [`Error::AlreadyStarted`] on a second call, even after the
    /// first handle was stopped.
    pub fn start(&self) -> Result<ControllerHandle> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyStarted);
        }

        let document = self.page.document();
        let triggers = &self.config.triggers;

        let attribute_watch = if triggers.attribute_watch {
            Some(watch_language_attribute(
                document,
                self.reconciler.clone(),
                &self.config.language_attribute,
            )?)
        } else {
            None
        };

        let sweep = triggers.sweep.then(|| {
            start_sweep(
                self.page.event_loop(),
                self.reconciler.clone(),
                self.config.sweep_interval(),
            )
        });

        let widget_watch = if triggers.widget_watch {
            Some(watch_widget(
                document,
                self.reconciler.clone(),
                self.widget_marker.clone(),
                self.config.widget_settle_delay(),
            )?)
        } else {
            None
        };

        let switcher = Arc::new(Mutex::new(None));
        let startup = {
            let reconciler = self.reconciler.clone();
            let weak = Arc::downgrade(document);
            let attach = triggers.switcher;
            let switcher_id = self.config.switcher_id.clone();
            let language_attribute = self.config.language_attribute.clone();
            let switcher = switcher.clone();
            run_when_ready(document, move || {
                reconciler.reconcile();
                if !attach {
                    return;
                }
                if let Some(document) = weak.upgrade() {
                    *switcher.lock() =
                        attach_switcher(&document, &switcher_id, &language_attribute);
                }
            })
        };

        tracing::info!(
            target: targets::CONTROLLER,
            attribute_watch = attribute_watch.is_some(),
            sweep = sweep.is_some(),
            widget_watch = widget_watch.is_some(),
            startup_deferred = startup.is_deferred(),
            "direction controller started"
        );

        Ok(ControllerHandle {
            startup,
            attribute_watch,
            sweep,
            widget_watch,
            switcher,
        })
    }
}

/// The running triggers of a started controller.
///
/// Dropping the handle leaves every trigger running for the page's
/// lifetime; call [`stop`](Self::stop) to tear them down.
#[derive(Debug)]
pub struct ControllerHandle {
    startup: StartupHandle,
    attribute_watch: Option<ObserverHandle>,
    sweep: Option<SweepHandle>,
    widget_watch: Option<WidgetWatchHandle>,
    switcher: Arc<Mutex<Option<SwitcherHandle>>>,
}

impl ControllerHandle {
    /// Whether startup is still waiting for the document to load.
    pub fn is_startup_pending(&self) -> bool {
        self.startup.is_deferred()
    }

    /// Whether a language switcher was found and attached.
    pub fn has_switcher(&self) -> bool {
        self.switcher.lock().is_some()
    }

    /// Whether the sweep is running.
    pub fn is_sweeping(&self) -> bool {
        self.sweep.as_ref().is_some_and(SweepHandle::is_active)
    }

    /// Tear down every trigger: pending startup, observers, the sweep,
    /// deferred reconciles and the switcher listener.
    pub fn stop(self) {
        self.startup.stop();
        if let Some(observer) = &self.attribute_watch {
            observer.stop();
        }
        if let Some(sweep) = &self.sweep {
            sweep.stop();
        }
        if let Some(widget_watch) = &self.widget_watch {
            widget_watch.stop();
        }
        if let Some(switcher) = self.switcher.lock().take() {
            switcher.stop();
        }
        tracing::info!(target: targets::CONTROLLER, "direction controller stopped");
    }
}
