// Redundancy filter for seedprobe
// Per-scan record of (element kind, element id, injected value) already audited

use crate::elements::{Element, ElementKind};
use parking_lot::Mutex;
use std::collections::HashSet;

/// Identity of a single audit unit
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RedundancyKey {
    pub kind: ElementKind,
    pub id: String,
    pub injected: String,
}

impl RedundancyKey {
    pub fn new(kind: ElementKind, id: impl Into<String>, injected: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            injected: injected.into(),
        }
    }

    /// Key of a mutated element; an unmutated one keys on its original value
    pub fn for_element(element: &Element) -> Self {
        Self::new(element.kind, element.id(), element.current_value())
    }
}

#[derive(Debug, Default)]
pub struct RedundancyFilter {
    seen: Mutex<HashSet<RedundancyKey>>,
}

impl RedundancyFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the unit identified by `key` should be audited.
    ///
    /// With `allow_redundant` nothing is recorded and the answer is always
    /// yes. Otherwise the first caller for a key gets `true` and every later
    /// caller `false`; the check and the record happen under one lock.
    pub fn should_audit(&self, key: RedundancyKey, allow_redundant: bool) -> bool {
        if allow_redundant {
            return true;
        }
        self.seen.lock().insert(key)
    }

    pub fn contains(&self, key: &RedundancyKey) -> bool {
        self.seen.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }

    /// Forget every key (scan start)
    pub fn reset(&self) {
        self.seen.lock().clear();
    }
}
