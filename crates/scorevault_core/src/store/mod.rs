//! Auxiliary record storage.
//!
//! # Responsibility
//! - Keep auxiliary records at stable addresses for the process lifetime.
//! - Persist the auxiliary record set to one flat file on the mounted volume.
//!
//! # Invariants
//! - Issued slot addresses are never moved or freed.
//! - A failed save never destroys the previously saved file.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod record_file;
pub mod slots;

pub use record_file::{summarize, LoadedRecords, RecordFile, RecordFileSummary, SaveOutcome};
pub use slots::SlotStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Record file I/O failure, tagged with the path it happened on.
#[derive(Debug)]
pub enum StoreError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn read(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Read { path, source }
    }

    pub(crate) fn write(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Write { path, source }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read `{}`: {source}", path.display())
            }
            Self::Write { path, source } => {
                write!(f, "failed to write `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Write { source, .. } => Some(source),
        }
    }
}
