//! Append-only slot store with stable record addresses.
//!
//! # Responsibility
//! - Hand out record addresses that host code may keep indefinitely.
//! - Grow without bound by appending fixed-capacity chunks.
//!
//! # Invariants
//! - A chunk's buffer is allocated once with a fixed length, so earlier
//!   records in the chunk never move.
//! - Records are never removed; the store only grows.
//! - Slots live in `UnsafeCell`s and are only touched through raw pointers
//!   derived from the cell, so host writes through an issued address never
//!   alias a Rust reference.

use crate::model::record::{Record, RecordPtr};
use std::cell::UnsafeCell;
use std::collections::BTreeMap;
use std::mem::{size_of, MaybeUninit};
use std::ptr::NonNull;

/// Records per chunk.
pub const CHUNK_RECORDS: usize = 64;

type Chunk = Box<[UnsafeCell<MaybeUninit<Record>>]>;

#[derive(Default)]
pub struct SlotStore {
    chunks: Vec<Chunk>,
    /// Chunk start address to chunk index.
    bases: BTreeMap<usize, usize>,
    len: usize,
}

impl SlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `record` and returns its permanent address.
    pub fn allocate(&mut self, record: Record) -> RecordPtr {
        let slot = self.len % CHUNK_RECORDS;
        if slot == 0 {
            let chunk: Chunk = (0..CHUNK_RECORDS)
                .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
                .collect();
            self.bases
                .insert(chunk.as_ptr() as usize, self.chunks.len());
            self.chunks.push(chunk);
        }

        let last = self.chunks.len() - 1;
        let cell = self.chunks[last][slot].get().cast::<Record>();
        // SAFETY: `cell` comes from an `UnsafeCell` in a live chunk and the
        // slot has never been issued.
        unsafe { cell.write(record) };
        self.len += 1;

        // SAFETY: derived from a boxed slice element, never null.
        RecordPtr::new(unsafe { NonNull::new_unchecked(cell) })
    }

    /// Number of records ever allocated.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Whether `ptr` addresses an initialized slot issued by this store.
    pub fn owns(&self, ptr: RecordPtr) -> bool {
        let addr = ptr.as_ptr() as usize;
        let Some((&base, &index)) = self.bases.range(..=addr).next_back() else {
            return false;
        };
        let offset = addr - base;
        if offset % size_of::<Record>() != 0 {
            return false;
        }
        let filled = if index + 1 == self.chunks.len() {
            self.len - index * CHUNK_RECORDS
        } else {
            CHUNK_RECORDS
        };
        offset / size_of::<Record>() < filled
    }

    /// Copies the current contents of an issued slot.
    ///
    /// Host code may have written to the slot since it was issued, so the read
    /// goes through the address rather than any cached copy.
    pub fn read(&self, ptr: RecordPtr) -> Option<Record> {
        if !self.owns(ptr) {
            return None;
        }
        // SAFETY: `ptr` addresses an initialized slot in a live chunk and
        // `Record` is plain data.
        Some(unsafe { ptr.as_ptr().read() })
    }

    /// Replaces the contents of an issued slot in place.
    ///
    /// Returns `false` without writing when `ptr` was not issued by this store.
    pub fn overwrite(&mut self, ptr: RecordPtr, record: &Record) -> bool {
        if !self.owns(ptr) {
            return false;
        }
        // SAFETY: `ptr` addresses a slot in a live chunk; `Record` has no
        // drop glue.
        unsafe { ptr.as_ptr().write(record.clone()) };
        true
    }
}

impl std::fmt::Debug for SlotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotStore")
            .field("len", &self.len)
            .field("chunks", &self.chunks.len())
            .finish()
    }
}
