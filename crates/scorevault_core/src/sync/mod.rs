//! Host lifecycle synchronization.
//!
//! # Responsibility
//! - React to host boot, mode-resync and save-manager events.
//!
//! # See also
//! - `crate::registry` for the announcement primitive.

pub mod controller;

pub use controller::{SaveMode, SyncController};
