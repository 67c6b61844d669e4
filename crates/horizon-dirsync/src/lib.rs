//! Horizon DirSync - keeps a document's text direction in sync with its
//! declared language.
//!
//! A [`DirectionController`] watches the root element's language attribute
//! and writes the matching direction (`rtl` or `ltr`) plus a presentation
//! marker class. Third-party translation tools that change the language
//! behind the page's back are caught by redundant triggers: an attribute
//! observer, a periodic sweep, and a watch for the translation widget.
//!
//! This crate re-exports the runtime primitives of `horizon-dirsync-core`.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use horizon_dirsync::prelude::*;
//!
//! let page = Page::with_clock(Arc::new(ManualClock::new()));
//! let document = page.document().clone();
//! document.set_attribute(document.root(), "lang", "en").unwrap();
//! document.set_ready_state(ReadyState::Interactive);
//!
//! let controller = DirectionController::with_defaults(&page).unwrap();
//! let _handle = controller.start().unwrap();
//! assert_eq!(document.attribute(document.root(), "dir").as_deref(), Some("ltr"));
//!
//! // A translation tool switches the page to Arabic.
//! document.set_attribute(document.root(), "lang", "ar").unwrap();
//! page.run_for(Duration::from_millis(10));
//! assert_eq!(document.attribute(document.root(), "dir").as_deref(), Some("rtl"));
//! assert!(document.has_class(document.root(), "rtl-mode"));
//! ```

pub use horizon_dirsync_core::*;

pub mod applier;
mod config;
mod controller;
pub mod direction;
pub mod dom;
mod error;
mod page;
pub mod port;
pub mod prelude;
mod reconcile;
pub mod switcher;
pub mod translation;
pub mod triggers;


pub use config::{DirectionConfig, TriggerConfig};
pub use controller::{ControllerHandle, DirectionController};
pub use direction::{classify, TextDirection};
pub use error::{Error, Result};
pub use page::Page;
pub use reconcile::{ReconcileOutcome, Reconciler};
