use scorevault_core::{
    HostRegistrar, Record, RecordFile, RecordId, RecordPtr, RecordTemplate, RegistryConfig,
    SyncController, RECORD_SIZE,
};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Shared, ordered log of host-side effects.
#[derive(Clone, Default)]
struct HostLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl HostLog {
    fn push(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl HostRegistrar for HostLog {
    fn register_record(&self, id: RecordId, _record: RecordPtr) {
        self.push(format!("register:{id}"));
    }
}

fn controller_in(dir: &Path, system_slot_cap: usize) -> (SyncController, HostLog) {
    let host = HostLog::default();
    let config = RegistryConfig {
        system_slot_cap,
        ..RegistryConfig::in_dir(dir)
    };
    let controller =
        SyncController::from_config(&config, RecordTemplate::zeroed(), Box::new(host.clone()));
    (controller, host)
}

fn record_with(id: i32, fill: u8) -> Record {
    let mut record = Record::zeroed(id);
    record.payload.fill(fill);
    record
}

#[test]
fn boot_complete_runs_host_first_then_announces_every_record() {
    let dir = tempfile::tempdir().unwrap();
    let (controller, host) = controller_in(dir.path(), 0);
    for id in [2, 1] {
        controller.registry().find_or_create(id, |_| None).unwrap();
    }
    host.clear();

    controller.boot_complete(|| host.push("original"));

    assert_eq!(host.events(), vec!["original", "register:1", "register:2"]);
}

#[test]
fn mode_resync_only_reannounces_auxiliary_records() {
    let dir = tempfile::tempdir().unwrap();
    let (controller, host) = controller_in(dir.path(), 0);
    controller.registry().find_or_create(8, |_| None).unwrap();
    host.clear();

    controller.mode_resync();

    assert_eq!(host.events(), vec!["register:8"]);
}

#[test]
fn save_modes_write_the_record_file_and_keep_host_status() {
    for mode in [1, 2] {
        let dir = tempfile::tempdir().unwrap();
        let (controller, _host) = controller_in(dir.path(), 0);
        controller.registry().find_or_create(31, |_| None).unwrap();
        controller.registry().find_or_create(4, |_| None).unwrap();

        let mut seen_mode = None;
        let status = controller.save_manager(mode, |mode| {
            seen_mode = Some(mode);
            0xBEEF
        });

        assert_eq!(status, 0xBEEF);
        assert_eq!(seen_mode, Some(mode));
        let path = controller.record_file().path();
        assert_eq!(fs::metadata(path).unwrap().len(), (2 * RECORD_SIZE) as u64);
        let ids: Vec<i32> = RecordFile::new(path)
            .load()
            .unwrap()
            .records
            .iter()
            .map(|record| record.id)
            .collect();
        assert_eq!(ids, vec![4, 31]);
    }
}

#[test]
fn unknown_save_mode_is_forwarded_without_core_action() {
    let dir = tempfile::tempdir().unwrap();
    let (controller, host) = controller_in(dir.path(), 0);
    controller.registry().find_or_create(3, |_| None).unwrap();
    host.clear();

    assert_eq!(controller.save_manager(9, |_| 1), 1);
    assert!(!controller.record_file().path().exists());
    assert!(host.events().is_empty());
}

#[test]
fn boot_load_populates_registry_and_announces_each_record() {
    let dir = tempfile::tempdir().unwrap();
    let (controller, host) = controller_in(dir.path(), 300);
    let mut bytes = Vec::new();
    for record in [record_with(50, 1), record_with(0, 2), record_with(40, 3)] {
        bytes.extend_from_slice(&record.to_bytes());
    }
    fs::write(controller.record_file().path(), bytes).unwrap();

    let status = controller.save_manager(0, |_| 7);

    assert_eq!(status, 7);
    assert_eq!(host.events(), vec!["register:50", "register:40"]);
    assert_eq!(controller.registry().len(), 2);
    let forty = controller.registry().get(40).unwrap();
    assert!(unsafe { forty.as_non_null().as_ref() }
        .payload
        .iter()
        .all(|byte| *byte == 3));
}

#[test]
fn boot_load_without_file_leaves_registry_empty() {
    let dir = tempfile::tempdir().unwrap();
    let (controller, host) = controller_in(dir.path(), 300);

    assert_eq!(controller.save_manager(0, |_| 0), 0);
    assert!(controller.registry().is_empty());
    assert!(host.events().is_empty());
}

#[test]
fn load_refreshes_existing_record_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let (controller, _host) = controller_in(dir.path(), 0);
    let before = controller.registry().find_or_create(12, |_| None).unwrap();
    fs::write(
        controller.record_file().path(),
        record_with(12, 0x77).to_bytes(),
    )
    .unwrap();

    controller.load();

    assert_eq!(controller.registry().get(12), Some(before));
    assert_eq!(unsafe { before.as_non_null().as_ref() }.payload[0], 0x77);
    assert_eq!(controller.registry().stats().slot_store_len, 1);
}

#[test]
fn load_leaves_system_slots_to_the_host() {
    let dir = tempfile::tempdir().unwrap();
    let (controller, host) = controller_in(dir.path(), 10);
    let mut native = Box::new(Record::zeroed(6));
    let native_ptr = RecordPtr::new(std::ptr::NonNull::from(&mut *native));
    controller
        .registry()
        .find_or_create(6, |_| Some(native_ptr))
        .unwrap();
    fs::write(controller.record_file().path(), record_with(6, 1).to_bytes()).unwrap();

    controller.load();

    assert!(!controller.registry().contains(6));
    assert!(controller.registry().is_system_slot(6));
    assert!(host.events().is_empty());
    assert_eq!(native.payload[0], 0);
}
