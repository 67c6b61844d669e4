//! Mutation observation.
//!
//! Observers register interest in a target node and receive
//! [`MutationRecord`]s in batches. Records are queued when the document
//! changes and delivered later, on a task posted to the event loop, so every
//! change made during one callback is reported together.

use std::sync::Arc;

use slotmap::{new_key_type, SlotMap};

use super::document::NodeId;
use crate::error::{Error, Result};

new_key_type! {
    /// Identifies a registered mutation observer.
    pub struct ObserverId;
}

/// What changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    /// An attribute was written on the target.
    Attributes {
        /// Lower-cased attribute name.
        name: String,
        /// Previous value, when the observer asked for old values and the
        /// attribute existed.
        old_value: Option<String>,
    },
    /// Children were added to or removed from the target.
    ChildList {
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
}

/// A single observed change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    /// The node whose attributes or children changed.
    pub target: NodeId,
    pub kind: MutationKind,
}

impl MutationRecord {
    /// The attribute name, for attribute records.
    pub fn attribute_name(&self) -> Option<&str> {
        match &self.kind {
            MutationKind::Attributes { name, .. } => Some(name),
            MutationKind::ChildList { .. } => None,
        }
    }

    /// Whether this is a child-list record.
    pub fn is_child_list(&self) -> bool {
        matches!(self.kind, MutationKind::ChildList { .. })
    }
}

/// Which changes an observer wants to hear about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationObserverInit {
    pub attributes: bool,
    /// Only report these attributes. Names are compared lower-cased.
    pub attribute_filter: Option<Vec<String>>,
    pub attribute_old_value: bool,
    pub child_list: bool,
    /// Also report changes on descendants of the target.
    pub subtree: bool,
}

impl MutationObserverInit {
    /// Observe every attribute of the target.
    pub fn attributes() -> Self {
        Self {
            attributes: true,
            ..Self::default()
        }
    }

    /// Observe only the named attributes of the target.
    pub fn attribute_filter<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            attributes: true,
            attribute_filter: Some(
                names
                    .into_iter()
                    .map(|name| name.as_ref().to_ascii_lowercase())
                    .collect(),
            ),
            ..Self::default()
        }
    }

    /// Observe additions and removals of the target's children.
    pub fn child_list() -> Self {
        Self {
            child_list: true,
            ..Self::default()
        }
    }

    /// Extend observation to the target's descendants.
    pub fn with_subtree(mut self) -> Self {
        self.subtree = true;
        self
    }

    /// Include previous attribute values in records.
    pub fn with_old_values(mut self) -> Self {
        self.attribute_old_value = true;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !self.attributes && !self.child_list {
            return Err(Error::InvalidObserverOptions);
        }
        Ok(())
    }

    fn wants(&self, record: &MutationRecord) -> bool {
        match &record.kind {
            MutationKind::Attributes { name, .. } => {
                self.attributes
                    && self
                        .attribute_filter
                        .as_ref()
                        .is_none_or(|filter| filter.iter().any(|n| n == name))
            }
            MutationKind::ChildList { .. } => self.child_list,
        }
    }
}

/// Callback invoked with a batch of records.
pub type MutationCallback = Arc<dyn Fn(&[MutationRecord]) + Send + Sync>;

struct Observer {
    target: NodeId,
    init: MutationObserverInit,
    callback: MutationCallback,
    pending: Vec<MutationRecord>,
    sequence: u64,
}

/// Per-document observer bookkeeping.
#[derive(Default)]
pub(crate) struct ObserverRegistry {
    observers: SlotMap<ObserverId, Observer>,
    next_sequence: u64,
}

impl ObserverRegistry {
    pub(crate) fn register(
        &mut self,
        target: NodeId,
        init: MutationObserverInit,
        callback: MutationCallback,
    ) -> ObserverId {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.observers.insert(Observer {
            target,
            init,
            callback,
            pending: Vec::new(),
            sequence,
        })
    }

    /// Drop an observer along with any undelivered records.
    pub(crate) fn remove(&mut self, id: ObserverId) -> bool {
        self.observers.remove(id).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    /// Queue `record` for every interested observer.
    ///
    /// `chain` is the record target followed by its ancestors, nearest first.
    /// Returns whether any observer queued the record.
    pub(crate) fn enqueue(&mut self, record: &MutationRecord, chain: &[NodeId]) -> bool {
        let mut queued = false;
        for observer in self.observers.values_mut() {
            let in_scope = match chain.iter().position(|&node| node == observer.target) {
                Some(0) => true,
                Some(_) => observer.init.subtree,
                None => false,
            };
            if !in_scope || !observer.init.wants(record) {
                continue;
            }

            let mut record = record.clone();
            if let MutationKind::Attributes { old_value, .. } = &mut record.kind {
                if !observer.init.attribute_old_value {
                    *old_value = None;
                }
            }
            observer.pending.push(record);
            queued = true;
        }
        queued
    }

    /// Take the queued records of one observer.
    pub(crate) fn take_records(&mut self, id: ObserverId) -> Vec<MutationRecord> {
        self.observers
            .get_mut(id)
            .map(|observer| std::mem::take(&mut observer.pending))
            .unwrap_or_default()
    }

    /// Take every non-empty batch, in observer registration order.
    pub(crate) fn take_all_pending(&mut self) -> Vec<(MutationCallback, Vec<MutationRecord>)> {
        let mut batches: Vec<_> = self
            .observers
            .values_mut()
            .filter(|observer| !observer.pending.is_empty())
            .map(|observer| {
                (
                    observer.sequence,
                    observer.callback.clone(),
                    std::mem::take(&mut observer.pending),
                )
            })
            .collect();
        batches.sort_by_key(|(sequence, _, _)| *sequence);
        batches
            .into_iter()
            .map(|(_, callback, records)| (callback, records))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(count: usize) -> Vec<NodeId> {
        let mut map: SlotMap<NodeId, ()> = SlotMap::with_key();
        (0..count).map(|_| map.insert(())).collect()
    }

    fn attribute_record(target: NodeId, name: &str, old: Option<&str>) -> MutationRecord {
        MutationRecord {
            target,
            kind: MutationKind::Attributes {
                name: name.to_string(),
                old_value: old.map(str::to_string),
            },
        }
    }

    fn noop() -> MutationCallback {
        Arc::new(|_| {})
    }

    #[test]
    fn test_init_validation() {
        assert!(MutationObserverInit::default().validate().is_err());
        assert!(MutationObserverInit::attributes().validate().is_ok());
        assert!(MutationObserverInit::child_list().with_subtree().validate().is_ok());
    }

    #[test]
    fn test_attribute_filter() {
        let ids = nodes(1);
        let mut registry = ObserverRegistry::default();
        let id = registry.register(ids[0], MutationObserverInit::attribute_filter(["LANG"]), noop());

        assert!(!registry.enqueue(&attribute_record(ids[0], "dir", None), &ids));
        assert!(registry.enqueue(&attribute_record(ids[0], "lang", Some("en")), &ids));

        let records = registry.take_records(id);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].attribute_name(), Some("lang"));
        // Old values are only kept on request.
        assert_eq!(
            records[0].kind,
            MutationKind::Attributes {
                name: "lang".into(),
                old_value: None
            }
        );
        assert!(registry.take_records(id).is_empty());
    }

    #[test]
    fn test_old_values() {
        let ids = nodes(1);
        let mut registry = ObserverRegistry::default();
        let id = registry.register(
            ids[0],
            MutationObserverInit::attributes().with_old_values(),
            noop(),
        );
        registry.enqueue(&attribute_record(ids[0], "lang", Some("en")), &ids);
        assert_eq!(
            registry.take_records(id)[0].kind,
            MutationKind::Attributes {
                name: "lang".into(),
                old_value: Some("en".into())
            }
        );
    }

    #[test]
    fn test_subtree_scope() {
        // chain: child, parent, grandparent
        let ids = nodes(3);
        let mut registry = ObserverRegistry::default();
        let direct = registry.register(ids[1], MutationObserverInit::child_list(), noop());
        let deep = registry.register(
            ids[2],
            MutationObserverInit::child_list().with_subtree(),
            noop(),
        );

        let record = MutationRecord {
            target: ids[0],
            kind: MutationKind::ChildList {
                added: vec![],
                removed: vec![],
            },
        };
        assert!(registry.enqueue(&record, &ids));
        assert!(registry.take_records(direct).is_empty());
        assert_eq!(registry.take_records(deep).len(), 1);
    }

    #[test]
    fn test_take_all_pending_in_registration_order() {
        let ids = nodes(1);
        let mut registry = ObserverRegistry::default();
        let first = registry.register(ids[0], MutationObserverInit::attributes(), noop());
        let second = registry.register(ids[0], MutationObserverInit::attributes(), noop());
        registry.remove(first);
        let third = registry.register(ids[0], MutationObserverInit::attributes(), noop());
        assert_eq!(registry.len(), 2);

        registry.enqueue(&attribute_record(ids[0], "lang", None), &ids);
        registry.enqueue(&attribute_record(ids[0], "dir", None), &ids);

        let batches = registry.take_all_pending();
        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|(_, records)| records.len() == 2));
        assert!(registry.take_records(second).is_empty());
        assert!(registry.take_records(third).is_empty());
        assert!(registry.take_all_pending().is_empty());
    }
}
