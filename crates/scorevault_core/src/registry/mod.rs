//! Auxiliary score registry.
//!
//! # Responsibility
//! - Map score ids to record addresses for ids the host cannot hold natively.
//! - Decide once per id between host-native and auxiliary storage.
//! - Announce auxiliary records to the host's registration routine.
//!
//! # Invariants
//! - An id is either a system slot or indexed here, never both, and the
//!   placement never changes once decided.
//! - An address announced for an id is never changed or freed.
//! - Ids `<= 0` are never classified, stored or announced.
//!
//! # Locking
//! One re-entrant lock guards all state. Host code (native creation,
//! registration, `for_each` callbacks) may call back into the registry on the
//! same thread, so no `RefCell` borrow is held while host code runs and state
//! is re-checked after every host call.

use crate::model::record::{Record, RecordId, RecordPtr, RecordTemplate};
use crate::store::SlotStore;
use log::{debug, info, warn};
use parking_lot::ReentrantMutex;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::BTreeMap;

pub mod classifier;
pub mod host;

pub use classifier::{Placement, SlotClassifier};
pub use host::{DetachedRegistrar, HostRegistrar};

struct RegistryState {
    slots: SlotStore,
    index: BTreeMap<RecordId, RecordPtr>,
    classifier: SlotClassifier,
}

/// Point-in-time registry counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub auxiliary_records: usize,
    pub system_slots: usize,
    pub slot_store_len: usize,
}

/// Outcome of applying a loaded record set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RehydrateReport {
    /// Records newly allocated.
    pub inserted: usize,
    /// Records copied into an already indexed slot.
    pub refreshed: usize,
    /// Records dropped because the id is invalid or already a system slot.
    pub skipped: usize,
}

pub struct Registry {
    state: ReentrantMutex<RefCell<RegistryState>>,
    template: RecordTemplate,
    registrar: Box<dyn HostRegistrar>,
}

impl Registry {
    pub fn new(
        system_slot_cap: usize,
        template: RecordTemplate,
        registrar: Box<dyn HostRegistrar>,
    ) -> Self {
        Self {
            state: ReentrantMutex::new(RefCell::new(RegistryState {
                slots: SlotStore::new(),
                index: BTreeMap::new(),
                classifier: SlotClassifier::new(system_slot_cap),
            })),
            template,
            registrar,
        }
    }

    /// Resolves `id` to a record address, creating an auxiliary record when
    /// the host cannot hold it natively.
    ///
    /// `native` is the host's original find-or-create routine. It is called
    /// for invalid ids (result returned unchanged), for known system slots,
    /// and once while classifying a new id under the system-slot cap.
    ///
    /// A newly created auxiliary record is announced to the host before its
    /// address is returned.
    pub fn find_or_create(
        &self,
        id: RecordId,
        native: impl FnOnce(RecordId) -> Option<RecordPtr>,
    ) -> Option<RecordPtr> {
        if !Record::is_valid_id(id) {
            return native(id);
        }

        let guard = self.state.lock();
        let existing = guard.borrow().index.get(&id).copied();
        if existing.is_some() {
            return existing;
        }

        if let Placement::System(result) = self.classify(&guard, id, native) {
            return result;
        }

        let (ptr, created) = {
            let mut state = guard.borrow_mut();
            // A nested call during classification may have created it.
            match state.index.get(&id).copied() {
                Some(ptr) => (ptr, false),
                None => {
                    let ptr = state.slots.allocate(self.template.instantiate(id));
                    state.index.insert(id, ptr);
                    (ptr, true)
                }
            }
        };

        if created {
            info!(
                "event=record_create module=registry status=ok placement=auxiliary id={}",
                id
            );
            self.force_announce(id, ptr);
        }
        Some(ptr)
    }

    fn classify(
        &self,
        state: &RefCell<RegistryState>,
        id: RecordId,
        native: impl FnOnce(RecordId) -> Option<RecordPtr>,
    ) -> Placement {
        let (admits, known) = {
            let state = state.borrow();
            (
                state.classifier.admits_native(id),
                state.classifier.is_system(id),
            )
        };
        if !admits {
            return Placement::Auxiliary;
        }

        let result = native(id);
        if known {
            return Placement::System(result);
        }
        let Some(ptr) = result else {
            return Placement::Auxiliary;
        };

        let mut state = state.borrow_mut();
        if state.index.contains_key(&id) {
            return Placement::Auxiliary;
        }
        if !state.classifier.record_system(id) {
            warn!(
                "event=record_classify module=registry status=skip reason=cap_reached_during_native id={}",
                id
            );
            return Placement::Auxiliary;
        }
        debug!(
            "event=record_classify module=registry status=ok placement=system id={} system_slots={}",
            id,
            state.classifier.len()
        );
        Placement::System(Some(ptr))
    }

    /// Looks `id` up, letting host-native records take precedence.
    ///
    /// The registry is only consulted when `native` reports nothing and the
    /// id is valid.
    pub fn find(
        &self,
        id: RecordId,
        native: impl FnOnce(RecordId) -> Option<RecordPtr>,
    ) -> Option<RecordPtr> {
        let result = native(id);
        if result.is_some() || !Record::is_valid_id(id) {
            return result;
        }
        self.get(id)
    }

    /// Auxiliary address for `id`, without consulting the host.
    pub fn get(&self, id: RecordId) -> Option<RecordPtr> {
        let guard = self.state.lock();
        let found = guard.borrow().index.get(&id).copied();
        found
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.get(id).is_some()
    }

    pub fn is_system_slot(&self, id: RecordId) -> bool {
        let guard = self.state.lock();
        let known = guard.borrow().classifier.is_system(id);
        known
    }

    /// Calls `f` for every indexed record in ascending id order.
    ///
    /// Iterates a snapshot of the index taken under the lock; records `f`
    /// creates are not visited.
    pub fn for_each(&self, mut f: impl FnMut(RecordId, RecordPtr)) {
        let guard = self.state.lock();
        let snapshot: Vec<(RecordId, RecordPtr)> = guard
            .borrow()
            .index
            .iter()
            .map(|(id, ptr)| (*id, *ptr))
            .collect();
        for (id, ptr) in snapshot {
            f(id, ptr);
        }
    }

    /// Pushes `(id, ptr)` into the host's registration routine.
    pub fn force_announce(&self, id: RecordId, ptr: RecordPtr) {
        if !Record::is_valid_id(id) {
            return;
        }
        let _guard = self.state.lock();
        debug!("event=record_announce module=registry status=start id={}", id);
        self.registrar.register_record(id, ptr);
    }

    /// Re-announces every indexed record. Returns how many were announced.
    pub fn announce_all(&self) -> usize {
        let mut announced = 0;
        self.for_each(|id, ptr| {
            self.force_announce(id, ptr);
            announced += 1;
        });
        announced
    }

    /// Applies records read from storage, announcing each one applied.
    ///
    /// Ids already indexed keep their address and take the loaded contents.
    /// Ids already classified as system slots are left to the host.
    pub fn rehydrate(&self, records: Vec<Record>) -> RehydrateReport {
        let guard = self.state.lock();
        let mut report = RehydrateReport::default();

        for record in records {
            let id = record.id;
            if !Record::is_valid_id(id) {
                report.skipped += 1;
                continue;
            }

            let applied = {
                let mut state = guard.borrow_mut();
                if state.classifier.is_system(id) {
                    None
                } else if let Some(ptr) = state.index.get(&id).copied() {
                    state.slots.overwrite(ptr, &record);
                    report.refreshed += 1;
                    Some(ptr)
                } else {
                    let ptr = state.slots.allocate(record);
                    state.index.insert(id, ptr);
                    report.inserted += 1;
                    Some(ptr)
                }
            };

            match applied {
                Some(ptr) => self.force_announce(id, ptr),
                None => {
                    warn!(
                        "event=record_rehydrate module=registry status=skip reason=system_slot id={}",
                        id
                    );
                    report.skipped += 1;
                }
            }
        }

        info!(
            "event=record_rehydrate module=registry status=ok inserted={} refreshed={} skipped={}",
            report.inserted, report.refreshed, report.skipped
        );
        report
    }

    /// Current contents of every indexed record, in ascending id order.
    ///
    /// Reads through the issued addresses so host-side writes are captured.
    pub fn records(&self) -> Vec<Record> {
        let guard = self.state.lock();
        let state = guard.borrow();
        state
            .index
            .values()
            .filter_map(|ptr| state.slots.read(*ptr))
            .collect()
    }

    pub fn len(&self) -> usize {
        let guard = self.state.lock();
        let len = guard.borrow().index.len();
        len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> RegistryStats {
        let guard = self.state.lock();
        let state = guard.borrow();
        RegistryStats {
            auxiliary_records: state.index.len(),
            system_slots: state.classifier.len(),
            slot_store_len: state.slots.len(),
        }
    }

    /// Runs `f` while holding the registry lock.
    ///
    /// Lets persistence work on the record file under the same lock as the
    /// registry itself. `f` may call back into the registry.
    pub fn exclusive<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.state.lock();
        f()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
