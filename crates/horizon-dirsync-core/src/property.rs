//! Value cells with change detection.
//!
//! A [`Property`] wraps a value and reports whether a write actually changed
//! it, so the owner only emits a notification signal on real changes.
//!
//! # Example
//!
//! ```
//! use horizon_dirsync_core::{Property, Signal};
//!
//! struct Control {
//!     value: Property<String>,
//!     changed: Signal<String>,
//! }
//!
//! let control = Control {
//!     value: Property::new(String::new()),
//!     changed: Signal::new(),
//! };
//!
//! if control.value.set("ar".to_string()) {
//!     control.changed.emit(control.value.get());
//! }
//! assert!(!control.value.set("ar".to_string()));
//! ```

use std::fmt;

use parking_lot::RwLock;

/// A value with change detection.
pub struct Property<T> {
    value: RwLock<T>,
}

impl<T: Clone> Property<T> {
    /// Create a property holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Access the value through a closure without cloning.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.value.read())
    }

    /// Overwrite the value without comparing.
    pub fn set_silent(&self, value: T) {
        *self.value.write() = value;
    }
}

impl<T: Clone + PartialEq> Property<T> {
    /// Set the value, returning `true` if it changed.
    pub fn set(&self, value: T) -> bool {
        self.replace(value).is_some()
    }

    /// Set the value, returning the old value if it changed.
    pub fn replace(&self, value: T) -> Option<T> {
        let mut current = self.value.write();
        if *current != value {
            Some(std::mem::replace(&mut *current, value))
        } else {
            None
        }
    }
}

impl<T: Clone + Default> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("value", &self.get())
            .finish()
    }
}

static_assertions::assert_impl_all!(Property<String>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_set_reports_change() {
        let prop = Property::new(42);
        assert_eq!(prop.get(), 42);

        assert!(!prop.set(42));
        assert!(prop.set(100));
        assert_eq!(prop.get(), 100);
    }

    #[test]
    fn test_property_replace() {
        let prop = Property::new("ltr".to_string());
        assert_eq!(prop.replace("ltr".to_string()), None);
        assert_eq!(prop.replace("rtl".to_string()).as_deref(), Some("ltr"));
        assert_eq!(prop.with(|v| v.len()), 3);
    }

    #[test]
    fn test_property_set_silent() {
        let prop = Property::<Option<u8>>::default();
        prop.set_silent(Some(1));
        assert_eq!(prop.get(), Some(1));
    }
}
