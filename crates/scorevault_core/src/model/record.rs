//! Score record model.
//!
//! # Responsibility
//! - Define the fixed-size record shared with host memory and the record file.
//! - Provide the blank template new auxiliary records are stamped from.
//!
//! # Invariants
//! - `size_of::<Record>() == RECORD_SIZE`; host code reads records in place.
//! - The payload is opaque: core copies it, never interprets it.

use crate::config::RECORD_SIZE;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::ptr::NonNull;

/// Score identifier. Host-native and auxiliary ids share one namespace.
pub type RecordId = i32;

/// Bytes following the id in one record.
pub const PAYLOAD_SIZE: usize = RECORD_SIZE - ID_SIZE;

const ID_SIZE: usize = std::mem::size_of::<RecordId>();

/// One score entry laid out exactly as the host stores it.
#[derive(Clone, PartialEq, Eq)]
#[repr(C)]
pub struct Record {
    pub id: RecordId,
    pub payload: [u8; PAYLOAD_SIZE],
}

const _: () = {
    assert!(std::mem::size_of::<Record>() == RECORD_SIZE);
};

impl Record {
    /// Record with the given id and an all-zero payload.
    pub fn zeroed(id: RecordId) -> Self {
        Self {
            id,
            payload: [0u8; PAYLOAD_SIZE],
        }
    }

    /// Whether the id can ever be classified or stored.
    pub fn is_valid_id(id: RecordId) -> bool {
        id > 0
    }

    /// Encodes the record into its on-disk form.
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut bytes = [0u8; RECORD_SIZE];
        bytes[..ID_SIZE].copy_from_slice(&self.id.to_le_bytes());
        bytes[ID_SIZE..].copy_from_slice(&self.payload);
        bytes
    }

    /// Decodes one on-disk block.
    pub fn from_bytes(bytes: &[u8; RECORD_SIZE]) -> Self {
        let mut id = [0u8; ID_SIZE];
        id.copy_from_slice(&bytes[..ID_SIZE]);
        let mut payload = [0u8; PAYLOAD_SIZE];
        payload.copy_from_slice(&bytes[ID_SIZE..]);
        Self {
            id: RecordId::from_le_bytes(id),
            payload,
        }
    }
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("id", &self.id)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

/// Blank payload a freshly created auxiliary record starts from.
#[derive(Clone, PartialEq, Eq)]
pub struct RecordTemplate {
    payload: Box<[u8; PAYLOAD_SIZE]>,
}

impl RecordTemplate {
    pub fn zeroed() -> Self {
        Self {
            payload: Box::new([0u8; PAYLOAD_SIZE]),
        }
    }

    /// Builds a template from a full record image; the id bytes are ignored.
    ///
    /// # Errors
    /// - Returns `RecordError::TemplateSize` unless `bytes` is exactly one record long.
    pub fn from_bytes(bytes: &[u8]) -> RecordResult<Self> {
        if bytes.len() != RECORD_SIZE {
            return Err(RecordError::TemplateSize {
                expected: RECORD_SIZE,
                actual: bytes.len(),
            });
        }
        let mut payload = Box::new([0u8; PAYLOAD_SIZE]);
        payload.copy_from_slice(&bytes[ID_SIZE..]);
        Ok(Self { payload })
    }

    pub fn payload(&self) -> &[u8; PAYLOAD_SIZE] {
        &self.payload
    }

    /// Stamps `id` onto a copy of the template.
    pub fn instantiate(&self, id: RecordId) -> Record {
        Record {
            id,
            payload: *self.payload,
        }
    }
}

impl Default for RecordTemplate {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl std::fmt::Debug for RecordTemplate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordTemplate").finish_non_exhaustive()
    }
}

/// Address of a record as handed to host code.
///
/// Points either into host-native storage or into the slot store. Slot store
/// addresses stay valid for the whole process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordPtr(NonNull<Record>);

// SAFETY: the pointer is only dereferenced while the registry lock is held,
// and slot store records are never freed.
unsafe impl Send for RecordPtr {}
unsafe impl Sync for RecordPtr {}

impl RecordPtr {
    pub fn new(ptr: NonNull<Record>) -> Self {
        Self(ptr)
    }

    /// Wraps a raw host pointer, mapping null to `None`.
    pub fn from_raw(ptr: *mut Record) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    pub fn as_ptr(self) -> *mut Record {
        self.0.as_ptr()
    }

    pub fn as_non_null(self) -> NonNull<Record> {
        self.0
    }
}

pub type RecordResult<T> = Result<T, RecordError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    TemplateSize { expected: usize, actual: usize },
}

impl Display for RecordError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TemplateSize { expected, actual } => write!(
                f,
                "record template must be {expected} bytes, got {actual}"
            ),
        }
    }
}

impl Error for RecordError {}
