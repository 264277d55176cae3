//! Facade wiring the engine, the durable catalog, and the database
//! directory into one storage coordinator.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use heron_common::clock::LogicalClock;
use heron_common::config::StorageConfig;
use heron_common::error::{StorageError, StorageResult};
use heron_common::metadata::CollectionOptions;
use heron_common::namespace::Namespace;
use heron_common::types::{KvPrefix, Timestamp};
use heron_common::{fatal_failed, fatal_invariant};

use crate::catalog::{DurableCatalog, CATALOG_IDENT};
use crate::db_catalog_entry::{DbCatalogEntry, DbCatalogEntryFactory};
use crate::db_directory::DbDirectory;
use crate::drop_database::DropDatabasePlan;
use crate::kv_engine::{JournalListener, KvEngine, SnapshotManager};
use crate::reconcile::{CollectionIndexName, Reconciler};
use crate::recovery_unit::{RecoveryUnit, WriteUnitOfWork};

/// The catalog-coordination layer of the storage subsystem.
///
/// Owns the durable catalog and the directory of per-database handles;
/// borrows the engine for its lifetime. Construction brings the catalog and
/// directory fully in line with what is on disk before returning.
pub struct StorageCoordinator {
    engine: Arc<dyn KvEngine>,
    options: StorageConfig,
    factory: DbCatalogEntryFactory,
    clock: Arc<dyn LogicalClock>,
    /// `None` after `clean_shutdown`.
    catalog: RwLock<Option<Arc<DurableCatalog>>>,
    directory: Arc<DbDirectory>,
    supports_doc_locking: bool,
    supports_db_locking: bool,
    in_backup_mode: AtomicBool,
    /// Cached for the untimestamped-drop safety assertion.
    initial_data_timestamp: AtomicU64,
    shut_down: AtomicBool,
}

impl StorageCoordinator {
    /// Open (or create) the reserved catalog ident, load the catalog, and
    /// open every collection it lists. Initialization failures are fatal:
    /// there is no server to run without a catalog.
    pub fn new(
        engine: Arc<dyn KvEngine>,
        options: StorageConfig,
        factory: DbCatalogEntryFactory,
        clock: Arc<dyn LogicalClock>,
    ) -> Self {
        fatal_invariant!(
            71001,
            !(options.directory_per_db && !engine.supports_directory_per_db()),
            "Storage engine does not support directory-per-db"
        );

        let supports_doc_locking = engine.supports_doc_locking();
        let supports_db_locking = engine.supports_db_locking();

        let coordinator = StorageCoordinator {
            engine,
            options,
            factory,
            clock,
            catalog: RwLock::new(None),
            directory: DbDirectory::new(),
            supports_doc_locking,
            supports_db_locking,
            in_backup_mode: AtomicBool::new(false),
            initial_data_timestamp: AtomicU64::new(Timestamp::NULL.0),
            shut_down: AtomicBool::new(false),
        };

        let txn = coordinator.engine.new_recovery_unit();
        if let Err(err) = coordinator.load_catalog(txn.as_ref()) {
            fatal_failed!(71005, "Unable to load the durable catalog: {}", err);
        }
        txn.abandon_snapshot();

        coordinator
    }

    fn load_catalog(&self, txn: &dyn RecoveryUnit) -> StorageResult<()> {
        let catalog_exists = self.engine.has_ident(txn, CATALOG_IDENT);

        if self.options.for_repair && catalog_exists {
            tracing::info!("Repairing catalog metadata");
            if let Err(err) = self.engine.repair_ident(txn, CATALOG_IDENT) {
                tracing::warn!("Catalog repair reported: {}", err);
            }
        }

        if !catalog_exists {
            let wuow = WriteUnitOfWork::new(txn);
            match self.engine.create_grouped_record_store(
                txn,
                CATALOG_IDENT,
                &Namespace::new(CATALOG_IDENT),
                &CollectionOptions::default(),
                KvPrefix::NOT_PREFIXED,
            ) {
                // BadValue is usually an invalid engine configuration
                // string; report it without implicating the data.
                Err(StorageError::BadValue(msg)) => {
                    fatal_failed!(71003, "Invalid configuration creating the catalog: {}", msg)
                }
                Err(err) => fatal_failed!(71004, "Failed to create the catalog: {}", err),
                Ok(()) => {}
            }
            wuow.commit();
        }

        let record_store = match self.engine.get_grouped_record_store(
            txn,
            CATALOG_IDENT,
            &Namespace::new(CATALOG_IDENT),
            &CollectionOptions::default(),
            KvPrefix::NOT_PREFIXED,
        ) {
            Ok(store) => store,
            Err(err) => fatal_failed!(71006, "Failed to open the catalog: {}", err),
        };

        let catalog = Arc::new(DurableCatalog::new(
            record_store,
            self.options.directory_per_db,
            self.options.directory_for_indexes,
        ));
        catalog.init(txn)?;
        *self.catalog.write() = Some(Arc::clone(&catalog));

        let mut max_seen_prefix = KvPrefix::NOT_PREFIXED;
        for ns in catalog.all_collections() {
            let db = ns.db().to_string();
            // Committed databases only; creation here is implicit and never
            // rolled back.
            let entry = self
                .directory
                .get_or_create(&db, || (self.factory)(&db, self));
            if let Err(err) = entry.init_collection(txn, &ns, self.options.for_repair) {
                fatal_failed!(71010, "Failed to open collection {}: {}", ns, err);
            }
            max_seen_prefix = max_seen_prefix.max(catalog.metadata(&ns)?.max_prefix);
        }

        KvPrefix::set_largest(max_seen_prefix);
        Ok(())
    }

    /// The durable catalog. Factory-created database handles reach their
    /// records through this.
    pub fn catalog(&self) -> Arc<DurableCatalog> {
        match self.catalog.read().as_ref() {
            Some(catalog) => Arc::clone(catalog),
            None => fatal_failed!(71002, "catalog accessed after clean shutdown"),
        }
    }

    pub fn engine(&self) -> &Arc<dyn KvEngine> {
        &self.engine
    }

    /// Reconcile the engine's ident set with the catalog's; returns the
    /// indexes the caller must rebuild. Runs once after startup, before
    /// accepting traffic.
    pub fn reconcile_catalog_and_idents(
        &self,
        txn: &dyn RecoveryUnit,
    ) -> StorageResult<Vec<CollectionIndexName>> {
        let catalog = self.catalog();
        Reconciler::new(self.engine.as_ref(), catalog.as_ref()).reconcile(txn)
    }

    /// A fresh transaction, or `None` once shut down.
    pub fn new_recovery_unit(&self) -> Option<Box<dyn RecoveryUnit>> {
        if self.shut_down.load(Ordering::Acquire) {
            return None;
        }
        Some(self.engine.new_recovery_unit())
    }

    /// Non-empty databases only.
    pub fn list_databases(&self) -> Vec<String> {
        self.directory.list_non_empty()
    }

    /// The per-database handle, created on first access.
    pub fn db_entry(&self, _txn: &dyn RecoveryUnit, db: &str) -> Arc<dyn DbCatalogEntry> {
        self.directory
            .get_or_create(db, || (self.factory)(db, self))
    }

    /// No-op: there is no database layer to close above the key/value
    /// store.
    pub fn close_database(&self, _txn: &dyn RecoveryUnit, _db: &str) -> StorageResult<()> {
        Ok(())
    }

    /// Drop every collection of `db` and remove its handle. Returns the
    /// first per-collection error, after attempting them all.
    pub fn drop_database(&self, txn: &dyn RecoveryUnit, db: &str) -> StorageResult<()> {
        let entry = match self.directory.get(db) {
            Some(entry) => entry,
            None => {
                return Err(StorageError::NamespaceNotFound(format!(
                    "db not found to drop: {}",
                    db
                )))
            }
        };

        DropDatabasePlan::new(
            &self.directory,
            self.clock.as_ref(),
            self.initial_data_timestamp(),
        )
        .execute(txn, &entry)
    }

    /// Run engine repair on a collection's table, then reopen it in place.
    pub fn repair_record_store(&self, txn: &dyn RecoveryUnit, ns: &Namespace) -> StorageResult<()> {
        let ident = self.catalog().collection_ident(ns)?;
        self.engine.repair_ident(txn, &ident)?;
        self.db_entry(txn, ns.db())
            .reinit_collection_after_repair(txn, ns)
    }

    // ── Backup mode ──────────────────────────────────────────────────

    pub fn begin_backup(&self, txn: &dyn RecoveryUnit) -> StorageResult<()> {
        if self.in_backup_mode.load(Ordering::Acquire) {
            return Err(StorageError::BadValue("Already in Backup Mode".into()));
        }
        self.engine.begin_backup(txn)?;
        self.in_backup_mode.store(true, Ordering::Release);
        Ok(())
    }

    pub fn end_backup(&self, txn: &dyn RecoveryUnit) {
        fatal_invariant!(
            71011,
            self.in_backup_mode.swap(false, Ordering::AcqRel),
            "endBackup without an active backup"
        );
        self.engine.end_backup(txn);
    }

    // ── Timestamp forwarding ─────────────────────────────────────────

    pub fn set_stable_timestamp(&self, ts: Timestamp) {
        self.engine.set_stable_timestamp(ts);
    }

    pub fn set_oldest_timestamp(&self, ts: Timestamp) {
        self.engine.set_oldest_timestamp(ts);
    }

    pub fn set_initial_data_timestamp(&self, ts: Timestamp) {
        self.initial_data_timestamp.store(ts.0, Ordering::Release);
        self.engine.set_initial_data_timestamp(ts);
    }

    pub fn initial_data_timestamp(&self) -> Timestamp {
        Timestamp(self.initial_data_timestamp.load(Ordering::Acquire))
    }

    pub fn recover_to_stable_timestamp(&self) -> StorageResult<()> {
        self.engine.recover_to_stable_timestamp()
    }

    pub fn supports_recover_to_stable_timestamp(&self) -> bool {
        self.engine.supports_recover_to_stable_timestamp()
    }

    pub fn supports_read_concern_snapshot(&self) -> bool {
        self.engine.supports_read_concern_snapshot()
    }

    pub fn replication_batch_is_complete(&self) {
        self.engine.replication_batch_is_complete()
    }

    // ── Introspection ────────────────────────────────────────────────

    pub fn is_durable(&self) -> bool {
        self.engine.is_durable()
    }

    pub fn is_ephemeral(&self) -> bool {
        self.engine.is_ephemeral()
    }

    pub fn supports_doc_locking(&self) -> bool {
        self.supports_doc_locking
    }

    pub fn supports_db_locking(&self) -> bool {
        self.supports_db_locking
    }

    pub fn snapshot_manager(&self) -> Option<Arc<dyn SnapshotManager>> {
        self.engine.snapshot_manager()
    }

    pub fn flush_all_files(&self, txn: &dyn RecoveryUnit, sync: bool) -> StorageResult<usize> {
        self.engine.flush_all_files(txn, sync)
    }

    pub fn set_journal_listener(&self, listener: Arc<dyn JournalListener>) {
        self.engine.set_journal_listener(listener);
    }

    /// Release every handle and the catalog, then shut the engine down.
    /// The engine object itself stays with the host. Idempotent.
    pub fn clean_shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        self.directory.clear();
        *self.catalog.write() = None;
        self.engine.clean_shutdown();
    }
}
