//! Host routine signatures, fixed offsets and the registration adapter.
//!
//! # Invariants
//! - Offsets are relative to the start of the host's main module and already
//!   carry the module displacement.
//! - Function pointers in `HookOriginals` are the trampolined originals,
//!   never the hooked addresses themselves.

use scorevault_core::{HostRegistrar, RecordId, RecordPtr};
use std::ffi::c_void;

pub type FindOrCreateFn = unsafe extern "C" fn(manager: *mut c_void, id: i32) -> *mut c_void;
pub type FindFn = unsafe extern "C" fn(manager: *mut c_void, id: i32) -> *mut c_void;
pub type SaveManagerFn = unsafe extern "C" fn(mode: i32) -> u64;
pub type LifecycleFn = unsafe extern "C" fn(arg: *mut c_void);
pub type RegisterFn = unsafe extern "C" fn(id: i32, record: *mut c_void);

const MODULE_DISPLACEMENT: usize = 0x100;

/// Converts a disassembler address into a main-module offset.
pub const fn fix(address: usize) -> usize {
    address - MODULE_DISPLACEMENT
}

pub const FIND_OR_CREATE_OFFSET: usize = fix(0x0C_62E0);
pub const FIND_OFFSET: usize = fix(0x0C_7990);
pub const REGISTER_OFFSET: usize = fix(0x0C_87F0);
pub const SAVE_MANAGER_OFFSET: usize = fix(0x0C_9820);
pub const POST_BOOT_OFFSET: usize = fix(0x0C_5950);
pub const SYNC_OFFSET: usize = fix(0x0C_6440);

/// One routine the interception layer must hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookSite {
    pub name: &'static str,
    pub offset: usize,
}

/// Every hooked routine, in installation order.
pub const HOOK_SITES: [HookSite; 5] = [
    HookSite {
        name: "find_or_create",
        offset: FIND_OR_CREATE_OFFSET,
    },
    HookSite {
        name: "find",
        offset: FIND_OFFSET,
    },
    HookSite {
        name: "save_manager",
        offset: SAVE_MANAGER_OFFSET,
    },
    HookSite {
        name: "post_boot",
        offset: POST_BOOT_OFFSET,
    },
    HookSite {
        name: "sync",
        offset: SYNC_OFFSET,
    },
];

/// Original host routines handed over by the interception layer, one per
/// entry in [`HOOK_SITES`].
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct HookOriginals {
    pub find_or_create: FindOrCreateFn,
    pub find: FindFn,
    pub save_manager: SaveManagerFn,
    pub post_boot: LifecycleFn,
    pub sync: LifecycleFn,
}

/// Announces records through the host's own registration routine.
#[derive(Debug, Clone, Copy)]
pub struct NativeRegistrar {
    register: RegisterFn,
}

impl NativeRegistrar {
    pub fn new(register: RegisterFn) -> Self {
        Self { register }
    }

    /// Registrar calling the routine at [`REGISTER_OFFSET`] in the main module.
    ///
    /// # Safety
    /// `module_base` must be the load address of the host's main module.
    pub unsafe fn at_module(module_base: usize) -> Self {
        let address = module_base.wrapping_add(REGISTER_OFFSET);
        Self::new(std::mem::transmute::<usize, RegisterFn>(address))
    }
}

impl HostRegistrar for NativeRegistrar {
    fn register_record(&self, id: RecordId, record: RecordPtr) {
        // SAFETY: `register` points at the host registration routine and
        // `record` stays valid for the process lifetime.
        unsafe { (self.register)(id, record.as_ptr().cast()) };
    }
}
