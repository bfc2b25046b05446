//! Flat record file on the mounted volume.
//!
//! # Responsibility
//! - Load every auxiliary record saved by a previous session.
//! - Rewrite the full record set on save.
//!
//! # Invariants
//! - The file is a headerless sequence of `RECORD_SIZE` blocks; the record
//!   count is the file length divided by `RECORD_SIZE`.
//! - Blocks whose id is `<= 0` are stale and never loaded.
//! - Saves go to a sibling temp file that is renamed over the target only
//!   after it is fully written, so the previous file survives failed saves.

use super::{StoreError, StoreResult};
use crate::config::RECORD_SIZE;
use crate::model::record::{Record, RecordId};
use log::{debug, info, warn};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

const TEMP_SUFFIX: &str = "tmp";

/// Records recovered from the file, in file order.
#[derive(Debug, Default)]
pub struct LoadedRecords {
    pub records: Vec<Record>,
    /// Blocks dropped because their id was `<= 0`.
    pub skipped: usize,
    /// Bytes after the last whole block.
    pub trailing_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing to persist; any existing file was left untouched.
    Skipped,
    Written { records: usize, bytes: u64 },
}

/// Handle on the record file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFile {
    path: PathBuf,
}

impl RecordFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every valid record in file order.
    ///
    /// A missing file or unavailable volume yields zero records.
    ///
    /// # Errors
    /// - Returns `StoreError::Read` when the file exists but cannot be read.
    pub fn load(&self) -> StoreResult<LoadedRecords> {
        let started_at = Instant::now();
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if is_absent(&err) => {
                debug!(
                    "event=record_file_load module=store status=skip reason=absent path={}",
                    self.path.display()
                );
                return Ok(LoadedRecords::default());
            }
            Err(err) => return Err(StoreError::read(&self.path)(err)),
        };

        let len = file
            .metadata()
            .map_err(StoreError::read(&self.path))?
            .len();
        let block_count = len / RECORD_SIZE as u64;
        let mut loaded = LoadedRecords {
            records: Vec::with_capacity(block_count as usize),
            skipped: 0,
            trailing_bytes: len % RECORD_SIZE as u64,
        };

        let mut reader = BufReader::new(file);
        let mut block = Box::new([0u8; RECORD_SIZE]);
        for _ in 0..block_count {
            reader
                .read_exact(&mut block[..])
                .map_err(StoreError::read(&self.path))?;
            let record = Record::from_bytes(&block);
            if Record::is_valid_id(record.id) {
                loaded.records.push(record);
            } else {
                loaded.skipped += 1;
            }
        }

        if loaded.trailing_bytes > 0 {
            warn!(
                "event=record_file_load module=store status=partial path={} trailing_bytes={}",
                self.path.display(),
                loaded.trailing_bytes
            );
        }
        info!(
            "event=record_file_load module=store status=ok path={} records={} skipped={} duration_ms={}",
            self.path.display(),
            loaded.records.len(),
            loaded.skipped,
            started_at.elapsed().as_millis()
        );
        Ok(loaded)
    }

    /// Rewrites the file with `records`, in the order given.
    ///
    /// An empty slice skips the write and leaves any existing file in place.
    ///
    /// # Errors
    /// - Returns `StoreError::Write` when the temp file cannot be written or
    ///   renamed; the previous file is left intact.
    pub fn save(&self, records: &[Record]) -> StoreResult<SaveOutcome> {
        if records.is_empty() {
            debug!(
                "event=record_file_save module=store status=skip reason=empty path={}",
                self.path.display()
            );
            return Ok(SaveOutcome::Skipped);
        }

        let started_at = Instant::now();
        let temp_path = self.temp_path();
        if let Err(err) = write_blocks(&temp_path, records) {
            let _ = fs::remove_file(&temp_path);
            return Err(err);
        }
        fs::rename(&temp_path, &self.path).map_err(StoreError::write(&self.path))?;

        let bytes = (records.len() * RECORD_SIZE) as u64;
        info!(
            "event=record_file_save module=store status=ok path={} records={} bytes={} duration_ms={}",
            self.path.display(),
            records.len(),
            bytes,
            started_at.elapsed().as_millis()
        );
        Ok(SaveOutcome::Written {
            records: records.len(),
            bytes,
        })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".");
        name.push(TEMP_SUFFIX);
        self.path.with_file_name(name)
    }
}

fn write_blocks(path: &Path, records: &[Record]) -> StoreResult<()> {
    let file = File::create(path).map_err(StoreError::write(path))?;
    file.set_len((records.len() * RECORD_SIZE) as u64)
        .map_err(StoreError::write(path))?;

    let mut writer = BufWriter::new(file);
    for record in records {
        writer
            .write_all(&record.to_bytes())
            .map_err(StoreError::write(path))?;
    }
    let file = writer
        .into_inner()
        .map_err(|err| StoreError::write(path)(err.into_error()))?;
    file.sync_all().map_err(StoreError::write(path))?;
    Ok(())
}

// The SD volume reports an unmounted device as a not-found lookup as well.
fn is_absent(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::NotFound)
}

/// Offline description of a record file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordFileSummary {
    pub path: PathBuf,
    pub exists: bool,
    pub record_count: usize,
    pub skipped: usize,
    pub trailing_bytes: u64,
    pub ids: Vec<RecordId>,
}

/// Loads `path` and reports what a boot-time load would register.
///
/// # Errors
/// - Returns `StoreError::Read` when the file exists but cannot be read.
pub fn summarize(path: impl Into<PathBuf>) -> StoreResult<RecordFileSummary> {
    let file = RecordFile::new(path);
    let exists = file.path().exists();
    let loaded = file.load()?;
    Ok(RecordFileSummary {
        path: file.path().to_path_buf(),
        exists,
        record_count: loaded.records.len(),
        skipped: loaded.skipped,
        trailing_bytes: loaded.trailing_bytes,
        ids: loaded.records.iter().map(|record| record.id).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::RecordFile;
    use std::path::Path;

    #[test]
    fn temp_path_is_sibling_of_target() {
        let file = RecordFile::new("/mnt/sd/DivaModData.dat");
        assert_eq!(file.temp_path(), Path::new("/mnt/sd/DivaModData.dat.tmp"));
    }
}
