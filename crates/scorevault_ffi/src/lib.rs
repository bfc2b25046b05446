//! C ABI layer between the interception hooks and `scorevault_core`.
//!
//! The interception layer installs one trampoline per [`host::HOOK_SITES`]
//! entry, hands the originals to [`api::scorevault_init`], and routes each
//! hooked call to the matching `scorevault_*` callback.

pub mod api;
pub mod host;
mod runtime;

pub use host::{HookOriginals, HookSite, NativeRegistrar, HOOK_SITES};
pub use runtime::{resolve_config, HookRuntime};
