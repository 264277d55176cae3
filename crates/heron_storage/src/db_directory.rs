//! In-memory directory of per-database handles.
//!
//! Entries appear implicitly (startup enumeration or first access) and are
//! never rolled back on creation. Removal is transactional: the handle rides
//! the recovery unit as a registered change, so an abort reinstates the very
//! same instance under the same name.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::db_catalog_entry::DbCatalogEntry;
use crate::recovery_unit::{Change, RecoveryUnit};

/// Mutex-guarded map database-name → handle. The mutex covers map mutation
/// only; it is never held across engine calls.
#[derive(Default)]
pub struct DbDirectory {
    dbs: Mutex<HashMap<String, Arc<dyn DbCatalogEntry>>>,
}

impl DbDirectory {
    pub fn new() -> Arc<Self> {
        Arc::new(DbDirectory::default())
    }

    /// Fetch the handle for `db`, creating it through `make` on a miss.
    pub fn get_or_create(
        &self,
        db: &str,
        make: impl FnOnce() -> Arc<dyn DbCatalogEntry>,
    ) -> Arc<dyn DbCatalogEntry> {
        let mut dbs = self.dbs.lock();
        Arc::clone(dbs.entry(db.to_string()).or_insert_with(make))
    }

    pub fn get(&self, db: &str) -> Option<Arc<dyn DbCatalogEntry>> {
        self.dbs.lock().get(db).cloned()
    }

    /// Names of databases whose handle reports at least one collection, in
    /// name order.
    pub fn list_non_empty(&self) -> Vec<String> {
        let dbs = self.dbs.lock();
        let mut names: Vec<String> = dbs
            .iter()
            .filter(|(_, entry)| !entry.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Remove `db` and transfer the handle into a rollback change registered
    /// on `txn`: commit destroys it, rollback reinserts it. The removal and
    /// the registration happen under one acquisition of the mutex.
    pub fn remove_for_drop(
        directory: &Arc<DbDirectory>,
        txn: &dyn RecoveryUnit,
        db: &str,
    ) -> Option<Arc<dyn DbCatalogEntry>> {
        let mut dbs = directory.dbs.lock();
        let entry = dbs.remove(db)?;
        txn.register_change(Box::new(RemoveDbChange {
            directory: Arc::clone(directory),
            db: db.to_string(),
            entry: Arc::clone(&entry),
        }));
        Some(entry)
    }

    fn reinsert(&self, db: String, entry: Arc<dyn DbCatalogEntry>) {
        self.dbs.lock().insert(db, entry);
    }

    /// Drop every handle. Shutdown only.
    pub fn clear(&self) {
        self.dbs.lock().clear();
    }
}

/// Reinstates a removed handle if the wrapping transaction rolls back.
struct RemoveDbChange {
    directory: Arc<DbDirectory>,
    db: String,
    entry: Arc<dyn DbCatalogEntry>,
}

impl Change for RemoveDbChange {
    fn commit(self: Box<Self>) {
        // Dropping the last reference destroys the handle.
    }

    fn rollback(self: Box<Self>) {
        self.directory.reinsert(self.db, self.entry);
    }
}
