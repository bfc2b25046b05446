//! Score record domain model.
//!
//! # Responsibility
//! - Define the record unit exchanged with host memory and the record file.
//!
//! # Invariants
//! - Every record is exactly `RECORD_SIZE` bytes with the id first.

pub mod record;
