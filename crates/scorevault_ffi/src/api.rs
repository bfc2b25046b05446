//! C ABI callbacks bound by the interception layer.
//!
//! # Responsibility
//! - Expose one `extern "C"` callback per hooked host routine.
//! - Own the process-wide hook runtime.
//!
//! # Invariants
//! - Exported functions never unwind across the FFI boundary.
//! - Before `scorevault_init` succeeds, callbacks do nothing and return null
//!   or zero; the interception layer installs hooks only after init.

use crate::host::{HookOriginals, NativeRegistrar};
use crate::runtime::{resolve_config, HookRuntime};
use log::{info, warn};
use once_cell::sync::OnceCell;
use scorevault_core::{
    core_version, default_log_level, init_logging, RecordTemplate, MOUNT_NAME, MOUNT_ROOT,
};
use std::ffi::{c_char, c_void, CStr};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;

static RUNTIME: OnceCell<HookRuntime> = OnceCell::new();

/// Builds the hook runtime once per process.
///
/// Input semantics:
/// - `originals`: trampolined original routines, one per hook site.
/// - `module_base`: load address of the host's main module.
/// - `template` / `template_len`: blank record image new auxiliary records are
///   copied from; null or a wrong length falls back to an all-zero payload.
/// - `log_dir`: NUL-terminated log directory; null logs to the volume root.
///
/// Returns `true` when the runtime is ready. Repeated calls are no-ops that
/// return `true`.
///
/// # Safety
/// `originals` must point to a valid table. `template` must be readable for
/// `template_len` bytes when non-null, and `log_dir` must be null or a valid C
/// string.
#[no_mangle]
pub unsafe extern "C" fn scorevault_init(
    originals: *const HookOriginals,
    module_base: usize,
    template: *const u8,
    template_len: usize,
    log_dir: *const c_char,
) -> bool {
    if originals.is_null() {
        return false;
    }
    let originals = *originals;
    let log_dir = if log_dir.is_null() {
        MOUNT_ROOT.to_string()
    } else {
        CStr::from_ptr(log_dir).to_string_lossy().into_owned()
    };
    let template = if template.is_null() {
        None
    } else {
        Some(std::slice::from_raw_parts(template, template_len))
    };

    catch_unwind(AssertUnwindSafe(|| {
        // Logging is best-effort; the registry works without it.
        let _ = init_logging(default_log_level(), &log_dir);
        RUNTIME.get_or_init(|| {
            let template = match template.map(RecordTemplate::from_bytes) {
                Some(Ok(template)) => template,
                Some(Err(err)) => {
                    warn!(
                        "event=runtime_init module=ffi status=degraded reason=template error={}",
                        err
                    );
                    RecordTemplate::zeroed()
                }
                None => RecordTemplate::zeroed(),
            };
            let config = resolve_config();
            info!(
                "event=runtime_init module=ffi status=ok mount={} record_path={} system_slot_cap={} version={}",
                MOUNT_NAME,
                config.record_path.display(),
                config.system_slot_cap,
                core_version()
            );
            HookRuntime::new(
                originals,
                &config,
                template,
                Box::new(NativeRegistrar::at_module(module_base)),
            )
        });
    }))
    .is_ok()
}

/// Find-or-create hook.
///
/// # FFI contract
/// - Ids `<= 0` are forwarded to the original routine unchanged.
/// - Returns a host-native or auxiliary record address.
///
/// # Safety
/// Must only be called by the interception layer with the host's arguments.
#[no_mangle]
pub unsafe extern "C" fn scorevault_find_or_create(manager: *mut c_void, id: i32) -> *mut c_void {
    match RUNTIME.get() {
        Some(runtime) => runtime.find_or_create(manager, id),
        None => ptr::null_mut(),
    }
}

/// Find hook. Host-native records take precedence over auxiliary ones.
///
/// # Safety
/// Must only be called by the interception layer with the host's arguments.
#[no_mangle]
pub unsafe extern "C" fn scorevault_find(manager: *mut c_void, id: i32) -> *mut c_void {
    match RUNTIME.get() {
        Some(runtime) => runtime.find(manager, id),
        None => ptr::null_mut(),
    }
}

/// Save-manager hook. Mode 0 loads auxiliary records, 1 and 2 save them.
///
/// # FFI contract
/// - Always returns the original routine's status code.
///
/// # Safety
/// Must only be called by the interception layer with the host's arguments.
#[no_mangle]
pub unsafe extern "C" fn scorevault_save_manager(mode: i32) -> u64 {
    match RUNTIME.get() {
        Some(runtime) => runtime.save_manager(mode),
        None => 0,
    }
}

/// Post-boot hook: runs the original, then re-announces auxiliary records.
///
/// # Safety
/// Must only be called by the interception layer with the host's arguments.
#[no_mangle]
pub unsafe extern "C" fn scorevault_post_boot(arg: *mut c_void) {
    if let Some(runtime) = RUNTIME.get() {
        runtime.post_boot(arg);
    }
}

/// Mode-sync hook: re-announces auxiliary records without running the
/// original routine.
///
/// # Safety
/// Must only be called by the interception layer with the host's arguments.
#[no_mangle]
pub unsafe extern "C" fn scorevault_sync(arg: *mut c_void) {
    if let Some(runtime) = RUNTIME.get() {
        runtime.sync(arg);
    }
}
