//! Manual language switcher.
//!
//! Forwards a selector control's chosen value into the root's language
//! attribute. The attribute watch picks the write up from there; the
//! switcher never touches direction itself.

use std::sync::{Arc, Weak};

use horizon_dirsync_core::ConnectionId;
use horizon_dirsync_core::logging::targets;

use crate::dom::{Document, NodeId};

/// Handle to an attached switcher listener.
#[derive(Debug)]
pub struct SwitcherHandle {
    document: Weak<Document>,
    control: NodeId,
    connection: ConnectionId,
}

impl SwitcherHandle {
    /// The selector control.
    pub fn control(&self) -> NodeId {
        self.control
    }

    /// Remove the change listener. Returns `false` if it was already gone.
    pub fn stop(&self) -> bool {
        self.document
            .upgrade()
            .is_some_and(|document| document.off_change(self.control, self.connection))
    }
}

/// Listen for change events on the element with id `switcher_id` and write
/// each selected value to the root's `language_attribute`.
///
/// Returns `None` when no such element is connected.
pub fn attach_switcher(
    document: &Arc<Document>,
    switcher_id: &str,
    language_attribute: &str,
) -> Option<SwitcherHandle> {
    let Some(control) = document.get_element_by_id(switcher_id) else {
        tracing::debug!(target: targets::SWITCHER, id = switcher_id, "no language switcher found");
        return None;
    };

    let weak = Arc::downgrade(document);
    let attribute = language_attribute.to_string();
    let connection = document
        .on_change(control, move |event| {
            let Some(document) = weak.upgrade() else {
                return;
            };
            tracing::info!(target: targets::SWITCHER, language = %event.value, "language selected");
            let _ = document.set_attribute(document.root(), &attribute, &event.value);
        })
        .ok()?;

    tracing::debug!(target: targets::SWITCHER, id = switcher_id, "language switcher attached");
    Some(SwitcherHandle {
        document: Arc::downgrade(document),
        control,
        connection,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_dirsync_core::{EventLoop, ManualClock};

    fn document() -> Arc<Document> {
        Document::new(EventLoop::with_clock(Arc::new(ManualClock::new())))
    }

    #[test]
    fn test_switcher_writes_language() {
        let doc = document();
        let select = doc.create_element("select");
        doc.set_attribute(select, "id", "language-switcher").unwrap();
        doc.append_child(doc.body(), select).unwrap();

        let handle = attach_switcher(&doc, "language-switcher", "lang").unwrap();
        assert_eq!(handle.control(), select);

        doc.select_value(select, "ur").unwrap();
        assert_eq!(doc.attribute(doc.root(), "lang").as_deref(), Some("ur"));
        // Direction is left to the attribute watch.
        assert_eq!(doc.attribute(doc.root(), "dir"), None);

        assert!(handle.stop());
        doc.select_value(select, "en").unwrap();
        assert_eq!(doc.attribute(doc.root(), "lang").as_deref(), Some("ur"));
    }

    #[test]
    fn test_missing_switcher_is_skipped() {
        let doc = document();
        assert!(attach_switcher(&doc, "language-switcher", "lang").is_none());
    }
}
