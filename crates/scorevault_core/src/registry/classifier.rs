//! System/auxiliary placement decisions.
//!
//! # Invariants
//! - The system-slot set never grows past its cap.
//! - An id recorded as System stays System for the process lifetime.

use crate::model::record::{RecordId, RecordPtr};
use std::collections::BTreeSet;

/// Where an id's record lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Host-native storage, at the address the host returned.
    System(Option<RecordPtr>),
    Auxiliary,
}

#[derive(Debug)]
pub struct SlotClassifier {
    system_slots: BTreeSet<RecordId>,
    cap: usize,
}

impl SlotClassifier {
    pub fn new(cap: usize) -> Self {
        Self {
            system_slots: BTreeSet::new(),
            cap,
        }
    }

    pub fn is_system(&self, id: RecordId) -> bool {
        self.system_slots.contains(&id)
    }

    /// Whether the host's native path should be tried for `id`.
    pub fn admits_native(&self, id: RecordId) -> bool {
        self.is_system(id) || self.system_slots.len() < self.cap
    }

    /// Remembers `id` as System. Returns `false` once the cap is reached.
    pub fn record_system(&mut self, id: RecordId) -> bool {
        if self.is_system(id) {
            return true;
        }
        if self.system_slots.len() >= self.cap {
            return false;
        }
        self.system_slots.insert(id)
    }

    pub fn len(&self) -> usize {
        self.system_slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.system_slots.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }
}
