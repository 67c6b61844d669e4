//! The host environment a controller runs in.

use std::sync::Arc;
use std::time::Duration;

use horizon_dirsync_core::{Clock, EventLoop};

use crate::dom::Document;
use crate::translation::Globals;

/// An event loop, a document on it, and the page's global functions.
///
/// Cloning a page clones the handles, not the contents.
#[derive(Debug, Clone)]
pub struct Page {
    event_loop: Arc<EventLoop>,
    document: Arc<Document>,
    globals: Arc<Globals>,
}

impl Page {
    /// Create a page driven by the real clock.
    pub fn new() -> Self {
        Self::from_event_loop(EventLoop::new())
    }

    /// Create a page driven by `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::from_event_loop(EventLoop::with_clock(clock))
    }

    fn from_event_loop(event_loop: Arc<EventLoop>) -> Self {
        Self {
            document: Document::new(event_loop.clone()),
            event_loop,
            globals: Arc::new(Globals::new()),
        }
    }

    /// The page's event loop.
    pub fn event_loop(&self) -> &Arc<EventLoop> {
        &self.event_loop
    }

    /// The page's document.
    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    /// The page's global functions.
    pub fn globals(&self) -> &Arc<Globals> {
        &self.globals
    }

    /// Run the event loop for `duration`. Returns the number of tasks run.
    pub fn run_for(&self, duration: Duration) -> usize {
        self.event_loop.run_for(duration)
    }

    /// Run everything that is ready now. Returns the number of tasks run.
    pub fn run_until_idle(&self) -> usize {
        self.event_loop.run_until_idle()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}
