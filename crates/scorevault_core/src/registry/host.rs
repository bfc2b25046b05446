//! Host-facing seams the registry calls out through.

use crate::model::record::{RecordId, RecordPtr};

/// The host's own score registration routine.
///
/// Implementations may call straight back into the registry on the same
/// thread; the registry never holds interior borrows across this call.
pub trait HostRegistrar: Send + Sync {
    fn register_record(&self, id: RecordId, record: RecordPtr);
}

/// Registrar that drops every announcement. Used by offline tooling.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedRegistrar;

impl HostRegistrar for DetachedRegistrar {
    fn register_record(&self, _id: RecordId, _record: RecordPtr) {}
}
