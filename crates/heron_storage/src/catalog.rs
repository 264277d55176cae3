//! Durable mapping of namespaces to their backing idents and metadata.
//!
//! Catalog records are JSON documents stored inside the reserved
//! `_mdb_catalog` ident. The in-memory index is rebuilt by `init` and kept
//! in lock-step with the record store: every write registers a rollback hook
//! so an aborted unit of work restores the map to its previous shape.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use heron_common::error::{StorageError, StorageResult};
use heron_common::metadata::{CollectionMetadata, CollectionOptions};
use heron_common::namespace::Namespace;
use heron_common::types::{KvPrefix, RecordId};

use crate::kv_engine::RecordStore;
use crate::recovery_unit::{Change, RecoveryUnit};

/// The reserved ident holding the catalog's own record store. Never a
/// user-data ident.
pub const CATALOG_IDENT: &str = "_mdb_catalog";

#[derive(Debug, Clone)]
struct CatalogEntry {
    record_id: RecordId,
    metadata: CollectionMetadata,
}

type EntryMap = HashMap<Namespace, CatalogEntry>;

/// Restores the in-memory index if the unit of work that mutated it aborts.
struct MapRollback {
    entries: Arc<RwLock<EntryMap>>,
    ns: Namespace,
    /// State to reinstate: `None` undoes an insert, `Some` undoes an update
    /// or removal.
    previous: Option<CatalogEntry>,
}

impl Change for MapRollback {
    fn commit(self: Box<Self>) {}

    fn rollback(self: Box<Self>) {
        let mut entries = self.entries.write();
        match self.previous {
            Some(entry) => {
                entries.insert(self.ns, entry);
            }
            None => {
                entries.remove(&self.ns);
            }
        }
    }
}

/// The durable namespace catalog. One per storage coordinator.
pub struct DurableCatalog {
    record_store: Arc<dyn RecordStore>,
    directory_per_db: bool,
    directory_for_indexes: bool,
    entries: Arc<RwLock<EntryMap>>,
    /// Source of unique ident ordinals; seeded past everything `init` saw.
    next_ordinal: AtomicU64,
}

impl DurableCatalog {
    pub fn new(
        record_store: Arc<dyn RecordStore>,
        directory_per_db: bool,
        directory_for_indexes: bool,
    ) -> Self {
        DurableCatalog {
            record_store,
            directory_per_db,
            directory_for_indexes,
            entries: Arc::new(RwLock::new(HashMap::new())),
            next_ordinal: AtomicU64::new(0),
        }
    }

    /// Load every record from the reserved ident and rebuild the in-memory
    /// index. Duplicate idents or undecodable records mean the catalog
    /// cannot be trusted and surface as `Corruption`.
    pub fn init(&self, txn: &dyn RecoveryUnit) -> StorageResult<()> {
        let records = self.record_store.scan(txn)?;

        let mut entries = EntryMap::with_capacity(records.len());
        let mut seen_idents: HashSet<String> = HashSet::new();
        let mut max_ordinal = 0u64;

        for (record_id, data) in records {
            let metadata: CollectionMetadata = serde_json::from_slice(&data).map_err(|err| {
                StorageError::Corruption(format!("catalog record {}: {}", record_id, err))
            })?;

            let index_idents = metadata.indexes.iter().map(|index| &index.ident);
            for ident in std::iter::once(&metadata.ident).chain(index_idents) {
                if !seen_idents.insert(ident.clone()) {
                    return Err(StorageError::Corruption(format!(
                        "duplicate ident in catalog: {}",
                        ident
                    )));
                }
                if let Some(ordinal) = ident_ordinal(ident) {
                    max_ordinal = max_ordinal.max(ordinal);
                }
            }

            entries.insert(metadata.ns.clone(), CatalogEntry {
                record_id,
                metadata,
            });
        }

        tracing::debug!("Catalog loaded: {} collections", entries.len());
        self.next_ordinal.store(max_ordinal + 1, Ordering::SeqCst);
        *self.entries.write() = entries;
        Ok(())
    }

    // ── Read surface ─────────────────────────────────────────────────

    /// Every namespace known to the catalog, in name order.
    pub fn all_collections(&self) -> Vec<Namespace> {
        let mut collections: Vec<Namespace> = self.entries.read().keys().cloned().collect();
        collections.sort();
        collections
    }

    /// Every ident referenced by the catalog: collection idents plus all
    /// index idents. The reserved catalog ident is never included.
    pub fn all_idents(&self) -> Vec<String> {
        let entries = self.entries.read();
        let mut idents = Vec::with_capacity(entries.len());
        for entry in entries.values() {
            idents.push(entry.metadata.ident.clone());
            for index in &entry.metadata.indexes {
                idents.push(index.ident.clone());
            }
        }
        idents
    }

    pub fn collection_ident(&self, ns: &Namespace) -> StorageResult<String> {
        let entries = self.entries.read();
        let entry = entries
            .get(ns)
            .ok_or_else(|| StorageError::NamespaceNotFound(ns.to_string()))?;
        Ok(entry.metadata.ident.clone())
    }

    pub fn index_ident(&self, ns: &Namespace, index_name: &str) -> StorageResult<String> {
        let entries = self.entries.read();
        let entry = entries
            .get(ns)
            .ok_or_else(|| StorageError::NamespaceNotFound(ns.to_string()))?;
        entry
            .metadata
            .index(index_name)
            .map(|index| index.ident.clone())
            .ok_or_else(|| {
                StorageError::NamespaceNotFound(format!("index {} on {}", index_name, ns))
            })
    }

    pub fn metadata(&self, ns: &Namespace) -> StorageResult<CollectionMetadata> {
        let entries = self.entries.read();
        entries
            .get(ns)
            .map(|entry| entry.metadata.clone())
            .ok_or_else(|| StorageError::NamespaceNotFound(ns.to_string()))
    }

    /// Name-convention predicate: true iff the ident was created for user
    /// data (a collection or index table).
    pub fn is_user_data_ident(ident: &str) -> bool {
        ident.contains("collection-")
            || ident.contains("collection/")
            || ident.contains("index-")
            || ident.contains("index/")
    }

    // ── Write surface ────────────────────────────────────────────────
    //
    // Callers must be inside a write unit of work; the map mutation rides
    // the recovery unit so an abort restores it.

    /// Record a new collection and choose its ident. The caller creates the
    /// backing table separately; reconciliation covers the gap between the
    /// two steps.
    pub fn new_collection(
        &self,
        txn: &dyn RecoveryUnit,
        ns: &Namespace,
        options: CollectionOptions,
        prefix: KvPrefix,
    ) -> StorageResult<String> {
        if self.entries.read().contains_key(ns) {
            return Err(StorageError::BadValue(format!(
                "collection already exists in catalog: {}",
                ns
            )));
        }

        let ident = self.new_ident(ns.db(), "collection");
        let metadata = CollectionMetadata::new(ns.clone(), ident.clone(), options, prefix);
        let record_id = self
            .record_store
            .insert_record(txn, &serde_json::to_vec(&metadata)?)?;

        self.entries.write().insert(ns.clone(), CatalogEntry {
            record_id,
            metadata,
        });
        txn.register_change(Box::new(MapRollback {
            entries: Arc::clone(&self.entries),
            ns: ns.clone(),
            previous: None,
        }));
        Ok(ident)
    }

    /// Replace a collection's metadata record (index add/drop, option
    /// changes, prefix growth).
    pub fn put_metadata(
        &self,
        txn: &dyn RecoveryUnit,
        ns: &Namespace,
        metadata: CollectionMetadata,
    ) -> StorageResult<()> {
        let previous = {
            let entries = self.entries.read();
            entries
                .get(ns)
                .cloned()
                .ok_or_else(|| StorageError::NamespaceNotFound(ns.to_string()))?
        };

        self.record_store
            .update_record(txn, previous.record_id, &serde_json::to_vec(&metadata)?)?;

        self.entries.write().insert(ns.clone(), CatalogEntry {
            record_id: previous.record_id,
            metadata,
        });
        txn.register_change(Box::new(MapRollback {
            entries: Arc::clone(&self.entries),
            ns: ns.clone(),
            previous: Some(previous),
        }));
        Ok(())
    }

    /// Remove a collection's catalog record.
    pub fn remove_entry(&self, txn: &dyn RecoveryUnit, ns: &Namespace) -> StorageResult<()> {
        let previous = {
            let entries = self.entries.read();
            entries
                .get(ns)
                .cloned()
                .ok_or_else(|| StorageError::NamespaceNotFound(ns.to_string()))?
        };

        self.record_store.delete_record(txn, previous.record_id)?;

        self.entries.write().remove(ns);
        txn.register_change(Box::new(MapRollback {
            entries: Arc::clone(&self.entries),
            ns: ns.clone(),
            previous: Some(previous),
        }));
        Ok(())
    }

    /// Choose an ident for a new index on `ns`. The caller records it via
    /// `put_metadata`.
    pub fn new_index_ident(&self, ns: &Namespace) -> String {
        self.new_ident(ns.db(), "index")
    }

    fn new_ident(&self, db: &str, kind: &str) -> String {
        let ordinal = self.next_ordinal.fetch_add(1, Ordering::SeqCst);
        let mut ident = String::new();
        if self.directory_per_db {
            ident.push_str(db);
            ident.push('/');
        }
        ident.push_str(kind);
        ident.push(if kind == "index" && self.directory_for_indexes {
            '/'
        } else {
            '-'
        });
        ident.push_str(&ordinal.to_string());
        ident
    }
}

/// Trailing ordinal of a generated ident, used to reseed the counter after
/// `init`. Foreign ident shapes simply don't contribute.
fn ident_ordinal(ident: &str) -> Option<u64> {
    let tail = ident.rsplit(['-', '/']).next()?;
    tail.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_data_ident_convention() {
        assert!(DurableCatalog::is_user_data_ident("collection-7"));
        assert!(DurableCatalog::is_user_data_ident("db1/collection/12"));
        assert!(DurableCatalog::is_user_data_ident("index-3"));
        assert!(DurableCatalog::is_user_data_ident("db1/index/4"));
        assert!(!DurableCatalog::is_user_data_ident(CATALOG_IDENT));
        assert!(!DurableCatalog::is_user_data_ident("sizeStorer"));
    }

    #[test]
    fn test_ident_ordinal_parsing() {
        assert_eq!(ident_ordinal("collection-12"), Some(12));
        assert_eq!(ident_ordinal("db/index/4"), Some(4));
        assert_eq!(ident_ordinal("_mdb_catalog"), None);
    }
}
