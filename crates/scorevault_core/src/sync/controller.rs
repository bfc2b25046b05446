//! Host lifecycle event handling.
//!
//! # Responsibility
//! - Bridge the host's boot, mode-resync and save-manager events to the
//!   registry and the record file.
//! - Keep every failure local: the host always gets its original result.
//!
//! # Invariants
//! - The host's original mode-resync handler is never invoked; running it
//!   alongside auxiliary records crashes the host.
//! - Record file access happens under the registry lock.

use crate::config::RegistryConfig;
use crate::model::record::RecordTemplate;
use crate::registry::{HostRegistrar, Registry};
use crate::store::{RecordFile, SaveOutcome};
use log::{error, info, warn};
use std::time::Instant;

/// Save-manager modes the core reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    /// Boot-time load.
    Load,
    Flush,
    Terminate,
}

impl SaveMode {
    pub fn from_raw(mode: i32) -> Option<Self> {
        match mode {
            0 => Some(Self::Load),
            1 => Some(Self::Flush),
            2 => Some(Self::Terminate),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Flush => "flush",
            Self::Terminate => "terminate",
        }
    }
}

pub struct SyncController {
    registry: Registry,
    record_file: RecordFile,
}

impl SyncController {
    pub fn new(registry: Registry, record_file: RecordFile) -> Self {
        Self {
            registry,
            record_file,
        }
    }

    pub fn from_config(
        config: &RegistryConfig,
        template: RecordTemplate,
        registrar: Box<dyn HostRegistrar>,
    ) -> Self {
        Self::new(
            Registry::new(config.system_slot_cap, template, registrar),
            RecordFile::new(config.record_path.clone()),
        )
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_file(&self) -> &RecordFile {
        &self.record_file
    }

    /// Runs the host's boot step, then re-announces every auxiliary record.
    pub fn boot_complete(&self, original: impl FnOnce()) {
        original();
        let announced = self.registry.announce_all();
        info!(
            "event=boot_complete module=sync status=ok announced={}",
            announced
        );
    }

    /// Re-announces every auxiliary record.
    ///
    /// Unlike the other events, the host's own resync routine is not run.
    pub fn mode_resync(&self) {
        // Why: running the host's resync routine here has been observed to
        // crash the host; only the announcement is replayed.
        let announced = self.registry.announce_all();
        info!(
            "event=mode_resync module=sync status=ok announced={} forwarded=false",
            announced
        );
    }

    /// Runs the host's save manager, then loads or saves auxiliary records.
    ///
    /// Returns the host's status code unchanged.
    pub fn save_manager(&self, raw_mode: i32, original: impl FnOnce(i32) -> u64) -> u64 {
        let status = original(raw_mode);
        match SaveMode::from_raw(raw_mode) {
            Some(SaveMode::Load) => self.load(),
            Some(mode @ (SaveMode::Flush | SaveMode::Terminate)) => self.save(mode),
            None => {}
        }
        status
    }

    /// Populates the registry from the record file.
    pub fn load(&self) {
        let started_at = Instant::now();
        self.registry.exclusive(|| match self.record_file.load() {
            Ok(loaded) => {
                let report = self.registry.rehydrate(loaded.records);
                info!(
                    "event=registry_load module=sync status=ok inserted={} refreshed={} skipped={} duration_ms={}",
                    report.inserted,
                    report.refreshed,
                    report.skipped + loaded.skipped,
                    started_at.elapsed().as_millis()
                );
            }
            Err(err) => {
                warn!(
                    "event=registry_load module=sync status=error error_code=record_file_read_failed error={}",
                    err
                );
            }
        });
    }

    fn save(&self, mode: SaveMode) {
        let started_at = Instant::now();
        self.registry.exclusive(|| {
            let records = self.registry.records();
            match self.record_file.save(&records) {
                Ok(SaveOutcome::Written { records, bytes }) => info!(
                    "event=registry_save module=sync status=ok mode={} records={} bytes={} duration_ms={}",
                    mode.label(),
                    records,
                    bytes,
                    started_at.elapsed().as_millis()
                ),
                Ok(SaveOutcome::Skipped) => info!(
                    "event=registry_save module=sync status=skip mode={} reason=empty",
                    mode.label()
                ),
                Err(err) => error!(
                    "event=registry_save module=sync status=error mode={} error_code=record_file_write_failed error={}",
                    mode.label(),
                    err
                ),
            }
        });
    }
}
