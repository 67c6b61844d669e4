//! The four activation paths feeding the reconciler.
//!
//! - [`run_when_ready`]: run once, now or when the document finishes loading.
//! - [`watch_language_attribute`]: reconcile on every observed write to the
//!   root's language attribute, and only that attribute.
//! - [`start_sweep`]: periodically correct direction drift without calling
//!   the translation hook.
//! - [`watch_widget`]: when structural changes in the body reveal the
//!   third-party widget, reconcile again after a settle delay.
//!
//! Each returns a handle whose `stop` tears the trigger down. Dropping a
//! handle leaves the trigger running.

use std::sync::{Arc, Weak};
use std::time::Duration;

use horizon_dirsync_core::logging::targets;
use horizon_dirsync_core::{ConnectionId, EventLoop, ScheduledTaskId};
use parking_lot::Mutex;

use crate::dom::{Document, MutationObserverInit, ObserverId, ReadyState, SelectorList};
use crate::error::Result;
use crate::reconcile::Reconciler;

// -----------------------------------------------------------------------------
// Startup
// -----------------------------------------------------------------------------

/// Handle to a startup task.
#[derive(Debug)]
pub struct StartupHandle {
    document: Weak<Document>,
    connection: Arc<Mutex<Option<ConnectionId>>>,
}

impl StartupHandle {
    /// Whether the task is still waiting for the document to load.
    pub fn is_deferred(&self) -> bool {
        self.connection.lock().is_some()
    }

    /// Cancel the task if it has not run yet. Returns whether it was
    /// cancelled.
    pub fn stop(&self) -> bool {
        let Some(id) = self.connection.lock().take() else {
            return false;
        };
        self.document
            .upgrade()
            .is_some_and(|document| document.content_loaded().disconnect(id))
    }
}

/// Run `task` once: immediately if `document` is past `Loading`, otherwise
/// when its content finishes loading.
pub fn run_when_ready<F>(document: &Arc<Document>, task: F) -> StartupHandle
where
    F: FnOnce() + Send + 'static,
{
    let connection = Arc::new(Mutex::new(None));
    let handle = StartupHandle {
        document: Arc::downgrade(document),
        connection: connection.clone(),
    };

    if document.ready_state() > ReadyState::Loading {
        tracing::debug!(target: targets::CONTROLLER, "document ready, running startup now");
        task();
        return handle;
    }

    tracing::debug!(target: targets::CONTROLLER, "document loading, deferring startup");
    let pending = Mutex::new(Some(task));
    let weak = Arc::downgrade(document);
    let connection_clone = connection.clone();
    let id = document.content_loaded().connect(move |_| {
        if let Some(id) = connection_clone.lock().take() {
            if let Some(document) = weak.upgrade() {
                document.content_loaded().disconnect(id);
            }
        }
        let task = pending.lock().take();
        if let Some(task) = task {
            task();
        }
    });
    *connection.lock() = Some(id);
    handle
}

// -----------------------------------------------------------------------------
// Attribute watch
// -----------------------------------------------------------------------------

/// Handle to a registered mutation observer.
#[derive(Debug)]
pub struct ObserverHandle {
    document: Weak<Document>,
    id: ObserverId,
}

impl ObserverHandle {
    /// The observer's id.
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Disconnect the observer. Returns `false` if it was already gone.
    pub fn stop(&self) -> bool {
        self.document
            .upgrade()
            .is_some_and(|document| document.disconnect_observer(self.id))
    }
}

/// Reconcile after every write to the root's `attribute`.
///
/// Writes to any other attribute are filtered out by the observer.
pub fn watch_language_attribute(
    document: &Arc<Document>,
    reconciler: Reconciler,
    attribute: &str,
) -> Result<ObserverHandle> {
    let init = MutationObserverInit::attribute_filter([attribute]);
    let id = document.observe(document.root(), init, move |records| {
        for record in records {
            tracing::info!(
                target: targets::OBSERVER,
                attribute = record.attribute_name().unwrap_or_default(),
                "language attribute changed"
            );
            reconciler.reconcile();
        }
    })?;

    Ok(ObserverHandle {
        document: Arc::downgrade(document),
        id,
    })
}

// -----------------------------------------------------------------------------
// Consistency sweep
// -----------------------------------------------------------------------------

/// Handle to the repeating sweep.
#[derive(Debug)]
pub struct SweepHandle {
    event_loop: Weak<EventLoop>,
    id: ScheduledTaskId,
}

impl SweepHandle {
    /// Whether the sweep is still scheduled.
    pub fn is_active(&self) -> bool {
        self.event_loop
            .upgrade()
            .is_some_and(|event_loop| event_loop.is_scheduled(self.id))
    }

    /// Cancel the sweep. Returns `false` if it was already cancelled.
    pub fn stop(&self) -> bool {
        self.event_loop
            .upgrade()
            .is_some_and(|event_loop| event_loop.cancel_scheduled(self.id).is_ok())
    }
}

/// Run [`Reconciler::sweep`] every `interval`.
pub fn start_sweep(
    event_loop: &Arc<EventLoop>,
    reconciler: Reconciler,
    interval: Duration,
) -> SweepHandle {
    let id = event_loop.schedule_repeating(interval, move || {
        if let Some(direction) = reconciler.sweep() {
            tracing::trace!(target: targets::SWEEP, %direction, "sweep corrected direction");
        }
    });
    tracing::debug!(target: targets::SWEEP, ?interval, "sweep started");

    SweepHandle {
        event_loop: Arc::downgrade(event_loop),
        id,
    }
}

// -----------------------------------------------------------------------------
// Widget watch
// -----------------------------------------------------------------------------

/// Handle to the widget watch and its pending deferred reconciles.
#[derive(Debug)]
pub struct WidgetWatchHandle {
    observer: ObserverHandle,
    event_loop: Weak<EventLoop>,
    pending: Arc<Mutex<Vec<ScheduledTaskId>>>,
}

impl WidgetWatchHandle {
    /// Number of deferred reconciles that have not run yet.
    pub fn pending_count(&self) -> usize {
        let Some(event_loop) = self.event_loop.upgrade() else {
            return 0;
        };
        let mut pending = self.pending.lock();
        pending.retain(|&id| event_loop.is_scheduled(id));
        pending.len()
    }

    /// Disconnect the observer and cancel pending deferred reconciles.
    pub fn stop(&self) -> bool {
        let stopped = self.observer.stop();
        let pending = std::mem::take(&mut *self.pending.lock());
        if let Some(event_loop) = self.event_loop.upgrade() {
            for id in pending {
                let _ = event_loop.cancel_scheduled(id);
            }
        }
        stopped
    }
}

/// Watch the body subtree for structural changes. Whenever a batch arrives
/// while an element matching `marker` is present, reconcile after `delay`.
///
/// Every qualifying batch schedules its own reconcile; nothing is merged.
pub fn watch_widget(
    document: &Arc<Document>,
    reconciler: Reconciler,
    marker: SelectorList,
    delay: Duration,
) -> Result<WidgetWatchHandle> {
    let pending = Arc::new(Mutex::new(Vec::new()));
    let weak = Arc::downgrade(document);
    let pending_clone = pending.clone();

    let init = MutationObserverInit::child_list().with_subtree();
    let id = document.observe(document.body(), init, move |_records| {
        let Some(document) = weak.upgrade() else {
            return;
        };
        if document.query_selector_list(&marker).is_none() {
            return;
        }

        tracing::debug!(
            target: targets::WIDGET,
            marker = %marker,
            ?delay,
            "translation widget present, deferring reconcile"
        );
        let event_loop = document.event_loop();
        let reconciler = reconciler.clone();
        let id = event_loop.schedule_once(delay, move || {
            reconciler.reconcile();
        });

        let mut pending = pending_clone.lock();
        pending.retain(|&id| event_loop.is_scheduled(id));
        pending.push(id);
    })?;

    Ok(WidgetWatchHandle {
        observer: ObserverHandle {
            document: Arc::downgrade(document),
            id,
        },
        event_loop: Arc::downgrade(document.event_loop()),
        pending,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::DocumentState;
    use horizon_dirsync_core::ManualClock;

    fn setup() -> (Arc<Document>, Reconciler) {
        let event_loop = EventLoop::with_clock(Arc::new(ManualClock::new()));
        let document = Document::new(event_loop);
        let state = DocumentState::new(&document, "lang", "dir", "rtl-mode");
        (document, Reconciler::new(Arc::new(state)))
    }

    fn dir(document: &Document) -> Option<String> {
        document.attribute(document.root(), "dir")
    }

    #[test]
    fn test_run_when_ready_immediate() {
        let (document, _) = setup();
        document.set_ready_state(ReadyState::Interactive);

        let ran = Arc::new(Mutex::new(0));
        let ran_clone = ran.clone();
        let handle = run_when_ready(&document, move || *ran_clone.lock() += 1);
        assert_eq!(*ran.lock(), 1);
        assert!(!handle.is_deferred());
        assert!(!handle.stop());
    }

    #[test]
    fn test_run_when_ready_deferred_runs_once() {
        let (document, _) = setup();
        let ran = Arc::new(Mutex::new(0));
        let ran_clone = ran.clone();
        let handle = run_when_ready(&document, move || *ran_clone.lock() += 1);
        assert!(handle.is_deferred());
        assert_eq!(document.content_loaded().connection_count(), 1);

        document.set_ready_state(ReadyState::Interactive);
        document.content_loaded().emit(());
        document.set_ready_state(ReadyState::Complete);
        assert_eq!(*ran.lock(), 1);
        assert!(!handle.is_deferred());
        assert_eq!(document.content_loaded().connection_count(), 0);
    }

    #[test]
    fn test_run_when_ready_stop() {
        let (document, _) = setup();
        let ran = Arc::new(Mutex::new(false));
        let ran_clone = ran.clone();
        let handle = run_when_ready(&document, move || *ran_clone.lock() = true);
        assert!(handle.stop());
        document.set_ready_state(ReadyState::Complete);
        assert!(!*ran.lock());
    }

    #[test]
    fn test_attribute_watch_ignores_other_attributes() {
        let (document, reconciler) = setup();
        let handle = watch_language_attribute(&document, reconciler, "lang").unwrap();
        let root = document.root();

        document.set_attribute(root, "data-theme", "dark").unwrap();
        document.event_loop().run_until_idle();
        assert_eq!(dir(&document), None);

        document.set_attribute(root, "lang", "ar").unwrap();
        document.event_loop().run_until_idle();
        assert_eq!(dir(&document).as_deref(), Some("rtl"));

        assert!(handle.stop());
        document.set_attribute(root, "lang", "en").unwrap();
        document.event_loop().run_until_idle();
        assert_eq!(dir(&document).as_deref(), Some("rtl"));
    }

    #[test]
    fn test_sweep_corrects_each_interval() {
        let (document, reconciler) = setup();
        let event_loop = document.event_loop().clone();
        let root = document.root();
        document.set_attribute(root, "lang", "he").unwrap();

        let handle = start_sweep(&event_loop, reconciler, Duration::from_secs(1));
        event_loop.run_for(Duration::from_millis(999));
        assert_eq!(dir(&document), None);
        event_loop.run_for(Duration::from_millis(1));
        assert_eq!(dir(&document).as_deref(), Some("rtl"));

        document.set_attribute(root, "dir", "ltr").unwrap();
        event_loop.run_for(Duration::from_secs(1));
        assert_eq!(dir(&document).as_deref(), Some("rtl"));

        assert!(handle.is_active());
        assert!(handle.stop());
        assert!(!handle.is_active());
        document.set_attribute(root, "dir", "ltr").unwrap();
        event_loop.run_for(Duration::from_secs(5));
        assert_eq!(dir(&document).as_deref(), Some("ltr"));
    }

    #[test]
    fn test_widget_watch_defers_reconcile() {
        let (document, reconciler) = setup();
        let event_loop = document.event_loop().clone();
        let marker = SelectorList::parse(".goog-te-banner-frame").unwrap();
        let handle =
            watch_widget(&document, reconciler, marker, Duration::from_millis(500)).unwrap();
        document.set_attribute(document.root(), "lang", "ar").unwrap();

        // Structural change without the widget: nothing scheduled.
        let div = document.create_element("div");
        document.append_child(document.body(), div).unwrap();
        event_loop.run_until_idle();
        assert_eq!(handle.pending_count(), 0);

        let frame = document.create_element("iframe");
        document.add_class(frame, "goog-te-banner-frame").unwrap();
        document.append_child(div, frame).unwrap();
        event_loop.run_until_idle();
        assert_eq!(handle.pending_count(), 1);
        assert_eq!(dir(&document), None);

        event_loop.run_for(Duration::from_millis(500));
        assert_eq!(dir(&document).as_deref(), Some("rtl"));
        assert_eq!(handle.pending_count(), 0);
    }

    #[test]
    fn test_widget_watch_stop_cancels_pending() {
        let (document, reconciler) = setup();
        let event_loop = document.event_loop().clone();
        let marker = SelectorList::parse(".goog-te-banner-frame").unwrap();
        let handle =
            watch_widget(&document, reconciler, marker, Duration::from_millis(500)).unwrap();

        let frame = document.create_element("iframe");
        document.add_class(frame, "goog-te-banner-frame").unwrap();
        document.append_child(document.body(), frame).unwrap();
        event_loop.run_until_idle();
        assert_eq!(handle.pending_count(), 1);

        assert!(handle.stop());
        assert_eq!(handle.pending_count(), 0);
        event_loop.run_for(Duration::from_secs(1));
        assert_eq!(dir(&document), None);
    }
}
