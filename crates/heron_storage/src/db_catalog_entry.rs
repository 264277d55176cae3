//! Per-database handle produced by the injected factory.

use std::sync::Arc;

use heron_common::error::StorageResult;
use heron_common::namespace::Namespace;

use crate::coordinator::StorageCoordinator;
use crate::recovery_unit::RecoveryUnit;

/// Per-database catalog operations, implemented above this layer.
///
/// The coordinator owns these handles through its directory and observes
/// them; collection-level mutations happen inside the implementation.
pub trait DbCatalogEntry: Send + Sync {
    /// Database name this entry serves.
    fn name(&self) -> &str;

    /// Open the collection's storage objects at startup.
    fn init_collection(
        &self,
        txn: &dyn RecoveryUnit,
        ns: &Namespace,
        for_repair: bool,
    ) -> StorageResult<()>;

    /// Re-open a collection in place after engine repair.
    fn reinit_collection_after_repair(
        &self,
        txn: &dyn RecoveryUnit,
        ns: &Namespace,
    ) -> StorageResult<()>;

    /// Namespaces currently served by this database.
    fn collection_namespaces(&self) -> Vec<Namespace>;

    /// Drop one collection: its catalog record and its idents.
    fn drop_collection(&self, txn: &dyn RecoveryUnit, ns: &Namespace) -> StorageResult<()>;

    /// True when the database has no collections.
    fn is_empty(&self) -> bool;
}

/// Wires a database name to its catalog entry. The coordinator reference is
/// a non-owning borrow; entries must not retain it.
pub type DbCatalogEntryFactory =
    Box<dyn Fn(&str, &StorageCoordinator) -> Arc<dyn DbCatalogEntry> + Send + Sync>;
