//! Post-startup reconciliation of engine idents against the durable catalog.
//!
//! Collection and index creation touch the engine table and the catalog
//! record in two separate steps, and the engine is not asked to make them
//! atomic; a crash or a replication rollback can strand either side. This
//! one-shot pass runs before the server accepts traffic:
//!
//! 1. an engine ident the catalog doesn't reference is dropped, if it is a
//!    user-data ident (anything else is managed elsewhere);
//! 2. a cataloged collection whose table is gone is unrecoverable;
//! 3. a cataloged index whose table is gone is returned for rebuild.

use std::collections::BTreeSet;

use heron_common::error::{StorageError, StorageResult};
use heron_common::fatal_failed;
use heron_common::namespace::Namespace;

use crate::catalog::{DurableCatalog, CATALOG_IDENT};
use crate::kv_engine::KvEngine;
use crate::recovery_unit::{RecoveryUnit, WriteUnitOfWork};

/// An index the caller must rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionIndexName {
    pub ns: Namespace,
    pub index_name: String,
}

/// One-shot comparison of the engine's ident set with the catalog's.
pub struct Reconciler<'a> {
    engine: &'a dyn KvEngine,
    catalog: &'a DurableCatalog,
}

impl<'a> Reconciler<'a> {
    pub fn new(engine: &'a dyn KvEngine, catalog: &'a DurableCatalog) -> Self {
        Reconciler { engine, catalog }
    }

    pub fn reconcile(&self, txn: &dyn RecoveryUnit) -> StorageResult<Vec<CollectionIndexName>> {
        let mut engine_idents: BTreeSet<String> =
            self.engine.all_idents(txn).into_iter().collect();
        engine_idents.remove(CATALOG_IDENT);

        let catalog_idents: BTreeSet<String> = self.catalog.all_idents().into_iter().collect();

        // A user-data ident the catalog doesn't know is a creation that
        // replication rolled back after the table was made but before the
        // catalog record was durable. Each drop commits on its own so the
        // engine's state stays monotone across the scan.
        for ident in &engine_idents {
            if catalog_idents.contains(ident) {
                continue;
            }
            if !DurableCatalog::is_user_data_ident(ident) {
                continue;
            }

            tracing::info!("Dropping unknown ident: {}", ident);
            let wuow = WriteUnitOfWork::new(txn);
            if let Err(err) = self.engine.drop_ident(txn, ident) {
                fatal_failed!(71007, "failed to drop unknown ident {}: {}", ident, err);
            }
            wuow.commit();
        }

        // Startup already opened every collection; a table missing here was
        // lost in some other context, e.g. recover-to-stable-timestamp.
        for ns in self.catalog.all_collections() {
            let ident = self.catalog.collection_ident(&ns)?;
            if !engine_idents.contains(&ident) {
                return Err(StorageError::UnrecoverableRollback {
                    ns: ns.to_string(),
                    ident,
                });
            }
        }

        let mut rebuild = Vec::new();
        for ns in self.catalog.all_collections() {
            let metadata = self.catalog.metadata(&ns)?;
            for index in &metadata.indexes {
                if engine_idents.contains(&index.ident) {
                    continue;
                }
                tracing::info!(
                    "Expected index data is missing, rebuilding. NS: {} Index: {} Ident: {}",
                    ns,
                    index.name,
                    index.ident
                );
                rebuild.push(CollectionIndexName {
                    ns: ns.clone(),
                    index_name: index.name.clone(),
                });
            }
        }

        Ok(rebuild)
    }
}
