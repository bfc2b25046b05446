//! Per-process hook runtime.
//!
//! # Responsibility
//! - Route each intercepted host call through the sync controller.
//! - Keep panics inside this crate: a panicking callback falls back to the
//!   host's original behavior.
//!
//! # Invariants
//! - Each original routine runs at most once per intercepted call, except
//!   find-or-create, which the host treats as idempotent.
//! - A find-or-create fallback never hands the host a native record for an id
//!   the registry already indexed.
//! - The original sync routine is never called.

use crate::host::HookOriginals;
use log::error;
use scorevault_core::{
    HostRegistrar, RecordPtr, RecordTemplate, RegistryConfig, SyncController, RECORD_FILE_ENV,
};
use std::cell::Cell;
use std::ffi::c_void;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::ptr;

pub struct HookRuntime {
    controller: SyncController,
    originals: HookOriginals,
}

impl HookRuntime {
    pub fn new(
        originals: HookOriginals,
        config: &RegistryConfig,
        template: RecordTemplate,
        registrar: Box<dyn HostRegistrar>,
    ) -> Self {
        Self {
            controller: SyncController::from_config(config, template, registrar),
            originals,
        }
    }

    pub fn controller(&self) -> &SyncController {
        &self.controller
    }

    pub fn find_or_create(&self, manager: *mut c_void, id: i32) -> *mut c_void {
        let original = self.originals.find_or_create;
        // SAFETY: `original` is the host routine being intercepted, called
        // with the arguments the host passed in.
        let forward = |id: i32| unsafe { original(manager, id) };
        guarded(
            "find_or_create",
            || {
                self.controller
                    .registry()
                    .find_or_create(id, |id| RecordPtr::from_raw(forward(id).cast()))
                    .map_or(ptr::null_mut(), |record| record.as_ptr().cast())
            },
            || match self.controller.registry().get(id) {
                Some(record) => record.as_ptr().cast(),
                None => forward(id),
            },
        )
    }

    pub fn find(&self, manager: *mut c_void, id: i32) -> *mut c_void {
        let original = self.originals.find;
        let host_result = Cell::new(None);
        // SAFETY: as in `find_or_create`.
        let forward = |id: i32| {
            let result = unsafe { original(manager, id) };
            host_result.set(Some(result));
            result
        };
        guarded(
            "find",
            || {
                self.controller
                    .registry()
                    .find(id, |id| RecordPtr::from_raw(forward(id).cast()))
                    .map_or(ptr::null_mut(), |record| record.as_ptr().cast())
            },
            || host_result.get().unwrap_or_else(|| forward(id)),
        )
    }

    pub fn save_manager(&self, mode: i32) -> u64 {
        let original = self.originals.save_manager;
        let status = Cell::new(None);
        let forward = |mode: i32| {
            // SAFETY: as in `find_or_create`.
            let result = unsafe { original(mode) };
            status.set(Some(result));
            result
        };
        guarded(
            "save_manager",
            || self.controller.save_manager(mode, forward),
            || status.get().unwrap_or_else(|| forward(mode)),
        )
    }

    pub fn post_boot(&self, arg: *mut c_void) {
        let original = self.originals.post_boot;
        let forwarded = Cell::new(false);
        let forward = || {
            forwarded.set(true);
            // SAFETY: as in `find_or_create`.
            unsafe { original(arg) };
        };
        guarded(
            "post_boot",
            || self.controller.boot_complete(forward),
            || {
                if !forwarded.get() {
                    forward();
                }
            },
        )
    }

    /// The host's sync routine is left untouched; `arg` is unused.
    pub fn sync(&self, _arg: *mut c_void) {
        guarded("sync", || self.controller.mode_resync(), || {})
    }
}

fn guarded<T>(hook: &str, body: impl FnOnce() -> T, fallback: impl FnOnce() -> T) -> T {
    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(value) => value,
        Err(_) => {
            error!(
                "event=hook_panic module=ffi status=error hook={} action=fallback_to_host",
                hook
            );
            fallback()
        }
    }
}

/// Registry config, honoring a record file override from the environment.
pub fn resolve_config() -> RegistryConfig {
    let mut config = RegistryConfig::default();
    if let Ok(raw) = std::env::var(RECORD_FILE_ENV) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            config.record_path = PathBuf::from(trimmed);
        }
    }
    config
}
