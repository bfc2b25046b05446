//! Build-time configuration for the auxiliary score registry.
//!
//! # Responsibility
//! - Hold the fixed constants shared by core and the FFI layer.
//! - Bundle the values the registry reads into one `RegistryConfig`.
//!
//! # Invariants
//! - Nothing here is runtime-configurable on device; `RegistryConfig` only
//!   exists so tests can point the registry at scratch directories.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Size of one score record, in host memory and on disk.
pub const RECORD_SIZE: usize = 0x11F4;

/// Maximum number of ids ever routed to the host's native score table.
pub const SYSTEM_SLOT_CAP: usize = 300;

/// Name under which the SD card volume is mounted.
pub const MOUNT_NAME: &str = "ExlSD";

/// Root of the mounted volume.
pub const MOUNT_ROOT: &str = "ExlSD:/";

/// Flat record file holding every auxiliary score.
pub const RECORD_FILE_NAME: &str = "DivaModData.dat";

/// Basename of the rolling log files written to the volume root.
pub const LOG_FILE_BASENAME: &str = "DivaLog";

/// Environment variable that relocates the record file on development hosts.
///
/// The console has no process environment, so this never applies on device.
pub const RECORD_FILE_ENV: &str = "SCOREVAULT_RECORD_FILE";

/// Values the registry and record file read at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Full path of the record file.
    pub record_path: PathBuf,
    /// See [`SYSTEM_SLOT_CAP`].
    pub system_slot_cap: usize,
}

impl RegistryConfig {
    /// Config rooted at an arbitrary directory, keeping the fixed file name.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            record_path: dir.into().join(RECORD_FILE_NAME),
            system_slot_cap: SYSTEM_SLOT_CAP,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            record_path: PathBuf::from(format!("{MOUNT_ROOT}{RECORD_FILE_NAME}")),
            system_slot_cap: SYSTEM_SLOT_CAP,
        }
    }
}
