//! Auxiliary score registry for a closed host application.
//!
//! The host keeps scores in a fixed-size native table. This crate lets ids
//! overflow into an unbounded auxiliary store, announces those records to the
//! host as if they were native, and persists them to a flat file on the SD
//! volume across sessions.

pub mod config;
pub mod logging;
pub mod model;
pub mod registry;
pub mod store;
pub mod sync;

pub use config::{
    RegistryConfig, MOUNT_NAME, MOUNT_ROOT, RECORD_FILE_ENV, RECORD_SIZE, SYSTEM_SLOT_CAP,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::record::{
    Record, RecordError, RecordId, RecordPtr, RecordResult, RecordTemplate, PAYLOAD_SIZE,
};
pub use registry::{
    DetachedRegistrar, HostRegistrar, Placement, Registry, RegistryStats, RehydrateReport,
    SlotClassifier,
};
pub use store::{
    summarize, LoadedRecords, RecordFile, RecordFileSummary, SaveOutcome, SlotStore, StoreError,
    StoreResult,
};
pub use sync::{SaveMode, SyncController};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
