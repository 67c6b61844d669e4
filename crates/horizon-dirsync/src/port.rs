//! The direction state port.
//!
//! [`DirectionState`] is the narrow surface the classifier, applier and
//! reconcile logic see: the declared language, the declared direction and
//! the presentation marker. [`DocumentState`] backs it with a live
//! [`Document`]; [`MemoryState`] is an in-memory fake for unit tests and
//! headless use.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use horizon_dirsync_core::Property;

use crate::direction::TextDirection;
use crate::dom::Document;

/// Read and write access to document-level direction state.
///
/// Reads return the raw attribute values so callers can compare exactly
/// what is written. Writes are infallible; a state that has gone away
/// ignores them.
pub trait DirectionState: Send + Sync {
    /// The declared language, if any.
    fn language(&self) -> Option<String>;

    /// The raw declared direction, if any.
    fn direction(&self) -> Option<String>;

    /// Write the declared direction.
    fn set_direction(&self, direction: TextDirection);

    /// Add or remove the presentation marker.
    fn set_marker(&self, present: bool);

    /// Whether the presentation marker is present.
    fn marker(&self) -> bool;
}

impl<S: DirectionState + ?Sized> DirectionState for Arc<S> {
    fn language(&self) -> Option<String> {
        (**self).language()
    }

    fn direction(&self) -> Option<String> {
        (**self).direction()
    }

    fn set_direction(&self, direction: TextDirection) {
        (**self).set_direction(direction)
    }

    fn set_marker(&self, present: bool) {
        (**self).set_marker(present)
    }

    fn marker(&self) -> bool {
        (**self).marker()
    }
}

/// Direction state stored on a document's root element.
#[derive(Debug, Clone)]
pub struct DocumentState {
    document: Weak<Document>,
    language_attribute: String,
    direction_attribute: String,
    marker_class: String,
}

impl DocumentState {
    /// Bind to `document`'s root element using the given attribute and
    /// class names.
    pub fn new(
        document: &Arc<Document>,
        language_attribute: impl Into<String>,
        direction_attribute: impl Into<String>,
        marker_class: impl Into<String>,
    ) -> Self {
        Self {
            document: Arc::downgrade(document),
            language_attribute: language_attribute.into(),
            direction_attribute: direction_attribute.into(),
            marker_class: marker_class.into(),
        }
    }

    /// The bound document, while it is alive.
    pub fn document(&self) -> Option<Arc<Document>> {
        self.document.upgrade()
    }

    /// Name of the language attribute.
    pub fn language_attribute(&self) -> &str {
        &self.language_attribute
    }
}

impl DirectionState for DocumentState {
    fn language(&self) -> Option<String> {
        let document = self.document.upgrade()?;
        document.attribute(document.root(), &self.language_attribute)
    }

    fn direction(&self) -> Option<String> {
        let document = self.document.upgrade()?;
        document.attribute(document.root(), &self.direction_attribute)
    }

    fn set_direction(&self, direction: TextDirection) {
        let Some(document) = self.document.upgrade() else {
            return;
        };
        // The root always exists, so this cannot fail.
        let _ = document.set_attribute(
            document.root(),
            &self.direction_attribute,
            direction.as_str(),
        );
    }

    fn set_marker(&self, present: bool) {
        let Some(document) = self.document.upgrade() else {
            return;
        };
        let _ = document.toggle_class(document.root(), &self.marker_class, Some(present));
    }

    fn marker(&self) -> bool {
        self.document
            .upgrade()
            .is_some_and(|document| document.has_class(document.root(), &self.marker_class))
    }
}

/// In-memory direction state.
///
/// Counts writes so tests can check that the sweep leaves a consistent
/// state untouched.
#[derive(Debug, Default)]
pub struct MemoryState {
    language: Property<Option<String>>,
    direction: Property<Option<String>>,
    marker: Property<bool>,
    writes: AtomicUsize,
}

impl MemoryState {
    /// Create an empty state: no language, no direction, no marker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a state declaring `language`.
    pub fn with_language(language: &str) -> Self {
        let state = Self::new();
        state.set_language(Some(language));
        state
    }

    /// Change the declared language, as an external tool would.
    pub fn set_language(&self, language: Option<&str>) {
        self.language.set(language.map(str::to_string));
    }

    /// Overwrite the raw direction without touching the marker or the
    /// write count, as an external tool would.
    pub fn force_direction(&self, direction: Option<&str>) {
        self.direction.set(direction.map(str::to_string));
    }

    /// Number of direction and marker writes made through the port.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl DirectionState for MemoryState {
    fn language(&self) -> Option<String> {
        self.language.get()
    }

    fn direction(&self) -> Option<String> {
        self.direction.get()
    }

    fn set_direction(&self, direction: TextDirection) {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.direction.set_silent(Some(direction.as_str().to_string()));
    }

    fn set_marker(&self, present: bool) {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.marker.set_silent(present);
    }

    fn marker(&self) -> bool {
        self.marker.get()
    }
}
