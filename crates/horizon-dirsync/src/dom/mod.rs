//! The host document model: element tree, selectors and mutation observers.

mod document;
mod mutation;
mod selector;

pub use document::{ChangeEvent, Document, NodeId, ReadyState};
pub use mutation::{
    MutationCallback, MutationKind, MutationObserverInit, MutationRecord, ObserverId,
};
pub use selector::{CompoundSelector, SelectorList};
