//! Prelude module for Horizon DirSync.
//!
//! ```ignore
//! use horizon_dirsync::prelude::*;
//! ```

// ============================================================================
// Runtime
// ============================================================================

pub use crate::{Clock, EventLoop, ManualClock, Signal, SystemClock};

// ============================================================================
// Document
// ============================================================================

pub use crate::dom::{ChangeEvent, Document, MutationObserverInit, MutationRecord, NodeId, ReadyState};
pub use crate::page::Page;

// ============================================================================
// Direction
// ============================================================================

pub use crate::config::{DirectionConfig, TriggerConfig};
pub use crate::controller::{ControllerHandle, DirectionController};
pub use crate::direction::{classify, TextDirection};
pub use crate::port::{DirectionState, DocumentState, MemoryState};
pub use crate::reconcile::{ReconcileOutcome, Reconciler};
pub use crate::translation::{Globals, HookError, HookOutcome};

pub use crate::error::{Error, Result};
