//! The pluggable key/value backend consumed by the coordinator.
//!
//! The engine owns tables ("idents"), transactions, and timestamps. The
//! coordinator borrows it for its whole lifetime and never destroys it;
//! `clean_shutdown` flushes engine state but the object stays with the host.

use std::sync::Arc;

use heron_common::error::StorageResult;
use heron_common::metadata::CollectionOptions;
use heron_common::namespace::Namespace;
use heron_common::types::{KvPrefix, RecordId, Timestamp};

use crate::recovery_unit::RecoveryUnit;

/// Manages engine-level point-in-time snapshots. Opaque to this layer.
pub trait SnapshotManager: Send + Sync {}

/// Callback invoked around journal flushes. Opaque to this layer.
pub trait JournalListener: Send + Sync {}

/// A single storage table addressed by record id.
pub trait RecordStore: Send + Sync {
    /// The backend ident this store is opened on.
    fn ident(&self) -> &str;

    fn insert_record(&self, txn: &dyn RecoveryUnit, data: &[u8]) -> StorageResult<RecordId>;
    fn update_record(&self, txn: &dyn RecoveryUnit, id: RecordId, data: &[u8])
        -> StorageResult<()>;
    fn delete_record(&self, txn: &dyn RecoveryUnit, id: RecordId) -> StorageResult<()>;

    /// All records in the store, in record-id order.
    fn scan(&self, txn: &dyn RecoveryUnit) -> StorageResult<Vec<(RecordId, Vec<u8>)>>;
}

/// Opaque object store underneath the catalog coordinator.
///
/// Implementations are thread-safe; one recovery unit serves one operation
/// at a time.
pub trait KvEngine: Send + Sync {
    fn new_recovery_unit(&self) -> Box<dyn RecoveryUnit>;

    fn has_ident(&self, txn: &dyn RecoveryUnit, ident: &str) -> bool;

    /// Every ident the engine knows, user-data and internal alike.
    fn all_idents(&self, txn: &dyn RecoveryUnit) -> Vec<String>;

    fn create_grouped_record_store(
        &self,
        txn: &dyn RecoveryUnit,
        ident: &str,
        ns: &Namespace,
        options: &CollectionOptions,
        prefix: KvPrefix,
    ) -> StorageResult<()>;

    fn get_grouped_record_store(
        &self,
        txn: &dyn RecoveryUnit,
        ident: &str,
        ns: &Namespace,
        options: &CollectionOptions,
        prefix: KvPrefix,
    ) -> StorageResult<Arc<dyn RecordStore>>;

    fn drop_ident(&self, txn: &dyn RecoveryUnit, ident: &str) -> StorageResult<()>;

    /// Salvage as much of the ident's data as possible, in place.
    fn repair_ident(&self, txn: &dyn RecoveryUnit, ident: &str) -> StorageResult<()>;

    fn begin_backup(&self, txn: &dyn RecoveryUnit) -> StorageResult<()>;
    fn end_backup(&self, txn: &dyn RecoveryUnit);

    // ── Capabilities ─────────────────────────────────────────────────

    fn is_durable(&self) -> bool;

    fn is_ephemeral(&self) -> bool {
        false
    }

    fn supports_doc_locking(&self) -> bool {
        false
    }

    fn supports_db_locking(&self) -> bool {
        true
    }

    fn supports_directory_per_db(&self) -> bool {
        false
    }

    // ── Introspection ────────────────────────────────────────────────

    fn snapshot_manager(&self) -> Option<Arc<dyn SnapshotManager>> {
        None
    }

    /// Flush all dirty files. Returns how many files were flushed.
    fn flush_all_files(&self, txn: &dyn RecoveryUnit, sync: bool) -> StorageResult<usize>;

    fn set_journal_listener(&self, _listener: Arc<dyn JournalListener>) {}

    // ── Timestamps ───────────────────────────────────────────────────

    fn set_stable_timestamp(&self, _ts: Timestamp) {}
    fn set_oldest_timestamp(&self, _ts: Timestamp) {}
    fn set_initial_data_timestamp(&self, _ts: Timestamp) {}

    fn recover_to_stable_timestamp(&self) -> StorageResult<()>;

    fn supports_recover_to_stable_timestamp(&self) -> bool {
        false
    }

    fn supports_read_concern_snapshot(&self) -> bool {
        false
    }

    fn replication_batch_is_complete(&self) {}

    /// Flush and close engine resources. The engine object itself outlives
    /// this call; the host owns it.
    fn clean_shutdown(&self);
}
