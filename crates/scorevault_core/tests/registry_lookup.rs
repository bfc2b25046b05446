use scorevault_core::{HostRegistrar, Record, RecordId, RecordPtr, RecordTemplate, Registry};
use std::cell::RefCell;
use std::ptr::NonNull;
use std::sync::{Arc, Mutex, OnceLock, Weak};

#[derive(Clone, Default)]
struct RecordingRegistrar {
    calls: Arc<Mutex<Vec<(RecordId, RecordPtr)>>>,
}

impl RecordingRegistrar {
    fn calls(&self) -> Vec<(RecordId, RecordPtr)> {
        self.calls.lock().unwrap().clone()
    }
}

impl HostRegistrar for RecordingRegistrar {
    fn register_record(&self, id: RecordId, record: RecordPtr) {
        self.calls.lock().unwrap().push((id, record));
    }
}

/// Stand-in for the host's fixed-size native score table.
struct NativeTable {
    records: RefCell<Vec<Box<Record>>>,
    capacity: usize,
    calls: RefCell<Vec<RecordId>>,
}

impl NativeTable {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            records: RefCell::new(Vec::new()),
            capacity,
            calls: RefCell::new(Vec::new()),
        }
    }

    fn find_or_create(&self, id: RecordId) -> Option<RecordPtr> {
        self.calls.borrow_mut().push(id);
        let mut records = self.records.borrow_mut();
        if let Some(record) = records.iter_mut().find(|record| record.id == id) {
            return Some(RecordPtr::new(NonNull::from(&mut **record)));
        }
        if records.len() >= self.capacity {
            return None;
        }
        records.push(Box::new(Record::zeroed(id)));
        let record = records.last_mut().unwrap();
        Some(RecordPtr::new(NonNull::from(&mut **record)))
    }

    fn find(&self, id: RecordId) -> Option<RecordPtr> {
        let mut records = self.records.borrow_mut();
        records
            .iter_mut()
            .find(|record| record.id == id)
            .map(|record| RecordPtr::new(NonNull::from(&mut **record)))
    }

    fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

fn registry_with_cap(cap: usize) -> (Registry, RecordingRegistrar) {
    let registrar = RecordingRegistrar::default();
    let registry = Registry::new(cap, RecordTemplate::zeroed(), Box::new(registrar.clone()));
    (registry, registrar)
}

#[test]
fn invalid_ids_are_forwarded_and_never_stored() {
    let (registry, registrar) = registry_with_cap(300);
    let mut forwarded = Vec::new();

    for id in [0, -5] {
        let result = registry.find_or_create(id, |id| {
            forwarded.push(id);
            None
        });
        assert!(result.is_none());
    }

    assert_eq!(forwarded, vec![0, -5]);
    assert!(registry.is_empty());
    assert_eq!(registry.stats().slot_store_len, 0);
    assert_eq!(registry.stats().system_slots, 0);
    assert!(registrar.calls().is_empty());
}

#[test]
fn find_or_create_is_idempotent() {
    let (registry, registrar) = registry_with_cap(0);

    let first = registry.find_or_create(42, |_| None).expect("auxiliary record");
    let second = registry.find_or_create(42, |_| None).expect("same record");

    assert_eq!(first, second);
    assert_eq!(registry.stats().slot_store_len, 1);
    assert_eq!(registrar.calls(), vec![(42, first)]);
}

#[test]
fn native_table_is_used_until_cap_then_overflows() {
    let (registry, registrar) = registry_with_cap(3);
    let native = NativeTable::with_capacity(100);

    for id in 1..=3 {
        let ptr = registry
            .find_or_create(id, |id| native.find_or_create(id))
            .expect("native record");
        assert_eq!(Some(ptr), native.find(id));
        assert!(registry.is_system_slot(id));
    }
    assert_eq!(native.call_count(), 3);

    // The host would accept id 4, but the cap is already reached.
    let overflow = registry
        .find_or_create(4, |id| native.find_or_create(id))
        .expect("auxiliary record");
    assert_eq!(native.call_count(), 3);
    assert!(!registry.is_system_slot(4));
    assert_eq!(registry.get(4), Some(overflow));
    assert_eq!(registry.stats().system_slots, 3);
    assert_eq!(registrar.calls(), vec![(4, overflow)]);
}

#[test]
fn host_declining_under_cap_falls_back_to_auxiliary() {
    let (registry, _registrar) = registry_with_cap(300);
    let native = NativeTable::with_capacity(0);

    let ptr = registry
        .find_or_create(7, |id| native.find_or_create(id))
        .expect("auxiliary record");

    assert_eq!(registry.get(7), Some(ptr));
    assert!(!registry.is_system_slot(7));
    assert_eq!(registry.stats().system_slots, 0);
}

#[test]
fn classification_never_changes_on_repeat_lookups() {
    let (registry, registrar) = registry_with_cap(1);
    let native = NativeTable::with_capacity(100);

    let system = registry
        .find_or_create(1, |id| native.find_or_create(id))
        .expect("native record");
    let auxiliary = registry
        .find_or_create(2, |id| native.find_or_create(id))
        .expect("auxiliary record");

    for _ in 0..3 {
        assert_eq!(
            registry.find_or_create(1, |id| native.find_or_create(id)),
            Some(system)
        );
        assert_eq!(
            registry.find_or_create(2, |id| native.find_or_create(id)),
            Some(auxiliary)
        );
        assert_eq!(registry.find(1, |id| native.find(id)), Some(system));
        assert_eq!(registry.find(2, |id| native.find(id)), Some(auxiliary));
    }

    assert!(registry.is_system_slot(1));
    assert!(!registry.contains(1));
    assert!(!registry.is_system_slot(2));
    assert!(registry.contains(2));
    assert_eq!(registrar.calls().len(), 1);
}

#[test]
fn known_system_slot_returns_native_result_even_when_host_declines() {
    let (registry, _registrar) = registry_with_cap(5);
    let native = NativeTable::with_capacity(100);
    registry
        .find_or_create(9, |id| native.find_or_create(id))
        .expect("native record");

    assert_eq!(registry.find_or_create(9, |_| None), None);
    assert!(!registry.contains(9));
    assert!(registry.is_system_slot(9));
}

#[test]
fn full_system_table_routes_new_id_to_template_record() {
    let mut image = vec![0x11u8; scorevault_core::RECORD_SIZE];
    image[..4].copy_from_slice(&(-1i32).to_le_bytes());
    let template = RecordTemplate::from_bytes(&image).expect("template image");
    let registrar = RecordingRegistrar::default();
    let registry = Registry::new(300, template.clone(), Box::new(registrar.clone()));
    let native = NativeTable::with_capacity(1000);

    for id in 1..=300 {
        registry
            .find_or_create(id, |id| native.find_or_create(id))
            .expect("native record");
    }
    assert_eq!(registry.stats().system_slots, 300);

    let ptr = registry
        .find_or_create(5000, |id| native.find_or_create(id))
        .expect("auxiliary record");
    let record = unsafe { ptr.as_non_null().as_ref() };

    assert_eq!(record.id, 5000);
    assert_eq!(&record.payload, template.payload());
    assert_eq!(registrar.calls(), vec![(5000, ptr)]);
    assert_eq!(native.call_count(), 300);
}

#[test]
fn find_prefers_host_and_only_falls_back_for_valid_ids() {
    let (registry, _registrar) = registry_with_cap(0);
    let auxiliary = registry.find_or_create(15, |_| None).expect("auxiliary");

    assert_eq!(registry.find(15, |_| None), Some(auxiliary));
    assert_eq!(registry.find(16, |_| None), None);

    let mut native_record = Box::new(Record::zeroed(15));
    let native_ptr = RecordPtr::new(NonNull::from(&mut *native_record));
    assert_eq!(registry.find(15, |_| Some(native_ptr)), Some(native_ptr));

    let mut consulted = false;
    assert_eq!(
        registry.find(-15, |_| {
            consulted = true;
            None
        }),
        None
    );
    assert!(consulted);
}

#[test]
fn for_each_visits_ids_in_ascending_order() {
    let (registry, _registrar) = registry_with_cap(0);
    for id in [30, 10, 20] {
        registry.find_or_create(id, |_| None).expect("auxiliary");
    }

    let mut seen = Vec::new();
    registry.for_each(|id, ptr| {
        assert_eq!(unsafe { ptr.as_non_null().as_ref() }.id, id);
        seen.push(id);
    });
    assert_eq!(seen, vec![10, 20, 30]);
}

/// Registrar that calls back into the registry while being announced to.
struct ReentrantRegistrar {
    registry: Arc<OnceLock<Weak<Registry>>>,
    nested: Arc<Mutex<Vec<(RecordId, Option<RecordPtr>)>>>,
}

impl HostRegistrar for ReentrantRegistrar {
    fn register_record(&self, id: RecordId, _record: RecordPtr) {
        let Some(registry) = self.registry.get().and_then(Weak::upgrade) else {
            return;
        };
        let again = registry.find_or_create(id, |_| None);
        self.nested.lock().unwrap().push((id, again));
        if id == 10 {
            let other = registry.find_or_create(11, |_| None);
            self.nested.lock().unwrap().push((11, other));
        }
    }
}

#[test]
fn nested_lookup_during_announcement_does_not_deadlock_or_double_allocate() {
    let slot = Arc::new(OnceLock::new());
    let nested = Arc::new(Mutex::new(Vec::new()));
    let registry = Arc::new(Registry::new(
        0,
        RecordTemplate::zeroed(),
        Box::new(ReentrantRegistrar {
            registry: Arc::clone(&slot),
            nested: Arc::clone(&nested),
        }),
    ));
    slot.set(Arc::downgrade(&registry)).unwrap();

    let ptr = registry.find_or_create(10, |_| None).expect("auxiliary");

    let nested = nested.lock().unwrap().clone();
    assert!(nested.contains(&(10, Some(ptr))));
    assert_eq!(registry.get(10), Some(ptr));
    assert!(registry.contains(11));
    assert_eq!(registry.stats().slot_store_len, 2);

    assert_eq!(registry.announce_all(), 2);
    assert_eq!(registry.stats().slot_store_len, 2);
}

#[test]
fn concurrent_callers_share_one_record_per_id() {
    let (registry, registrar) = registry_with_cap(0);
    let registry = Arc::new(registry);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                (1..=20)
                    .map(|id| registry.find_or_create(id, |_| None).unwrap().as_ptr() as usize)
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    let results: Vec<Vec<usize>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    for result in &results[1..] {
        assert_eq!(result, &results[0]);
    }
    assert_eq!(registry.stats().slot_store_len, 20);
    assert_eq!(registrar.calls().len(), 20);
}
