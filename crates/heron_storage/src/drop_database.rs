//! Two-phase database drop with correct commit-timestamp handling.
//!
//! A database's collections split by the drop-pending predicate:
//!
//! - Phase A, untimestamped: collections that were never renamed by the
//!   reaper. They are either not replicated at all or known special cases,
//!   and their removal must not carry a commit timestamp so replication
//!   never rolls it back.
//! - Phase B, timestamped: drop-pending collections. Their removal must be
//!   timestamped so secondaries replay it consistently. Phase B also removes
//!   the per-database handle from the directory, which requires the handle
//!   to be otherwise quiescent; Phase A therefore commits first.
//!
//! Both phases leave the recovery unit's commit-timestamp state exactly as
//! they found it, on every exit path.

use std::sync::Arc;

use heron_common::clock::LogicalClock;
use heron_common::error::StorageResult;
use heron_common::fatal_invariant;
use heron_common::namespace::Namespace;
use heron_common::types::Timestamp;

use crate::db_catalog_entry::DbCatalogEntry;
use crate::db_directory::DbDirectory;
use crate::recovery_unit::{RecoveryUnit, WriteUnitOfWork};

/// Puts a stashed commit timestamp back when the scope exits.
struct RestoreCommitTimestamp<'a> {
    txn: &'a dyn RecoveryUnit,
    saved: Timestamp,
}

impl Drop for RestoreCommitTimestamp<'_> {
    fn drop(&mut self) {
        if !self.saved.is_null() {
            self.txn.set_commit_timestamp(self.saved);
        }
    }
}

/// Clears the commit timestamp on exit iff this scope set it.
struct ClearCommitTimestamp<'a> {
    txn: &'a dyn RecoveryUnit,
    armed: bool,
}

impl Drop for ClearCommitTimestamp<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.txn.clear_commit_timestamp();
        }
    }
}

/// Executes `drop_database` for one handle.
pub struct DropDatabasePlan<'a> {
    directory: &'a Arc<DbDirectory>,
    clock: &'a dyn LogicalClock,
    initial_data_timestamp: Timestamp,
}

impl<'a> DropDatabasePlan<'a> {
    pub fn new(
        directory: &'a Arc<DbDirectory>,
        clock: &'a dyn LogicalClock,
        initial_data_timestamp: Timestamp,
    ) -> Self {
        DropDatabasePlan {
            directory,
            clock,
            initial_data_timestamp,
        }
    }

    /// Drop every collection of `entry` and remove it from the directory.
    /// Every collection is attempted; the first error seen across both
    /// phases is returned after the work completes.
    pub fn execute(
        &self,
        txn: &dyn RecoveryUnit,
        entry: &Arc<dyn DbCatalogEntry>,
    ) -> StorageResult<()> {
        let (untimestamped, timestamped): (Vec<Namespace>, Vec<Namespace>) = entry
            .collection_namespaces()
            .into_iter()
            .partition(|ns| !ns.is_drop_pending());

        let first = self.drop_untimestamped(txn, entry.as_ref(), &untimestamped);
        let second = self.drop_timestamped(txn, entry, &timestamped);
        first.and(second)
    }

    fn drop_untimestamped(
        &self,
        txn: &dyn RecoveryUnit,
        entry: &dyn DbCatalogEntry,
        namespaces: &[Namespace],
    ) -> StorageResult<()> {
        // A secondary applying the dropDatabase oplog entry arrives inside a
        // timestamped block. Stash that state so these writes go through
        // untimestamped; the guard restores it on every exit path.
        let saved = txn.commit_timestamp();
        if !saved.is_null() {
            txn.clear_commit_timestamp();
        }
        let _restore = RestoreCommitTimestamp { txn, saved };

        let mut first_error: StorageResult<()> = Ok(());
        let wuow = WriteUnitOfWork::new(txn);
        for ns in namespaces {
            // Under steady-state replication everything else was renamed to
            // drop-pending, so surviving here means the namespace is not
            // replicated or is one of the known stragglers.
            if self.initial_data_timestamp != Timestamp::ALLOW_UNSTABLE_CHECKPOINTS {
                fatal_invariant!(
                    71008,
                    !ns.is_replicated()
                        || ns.coll().starts_with("tmp.mr")
                        || ns.is_system_dot_indexes(),
                    "Collection drop is not being timestamped. Namespace: {}",
                    ns
                );
            }

            if let Err(err) = entry.drop_collection(txn, ns) {
                tracing::warn!("Failed to drop {}: {}", ns, err);
                if first_error.is_ok() {
                    first_error = Err(err);
                }
            }
        }

        // Successful drops commit even when some collection failed.
        wuow.commit();
        first_error
    }

    fn drop_timestamped(
        &self,
        txn: &dyn RecoveryUnit,
        entry: &Arc<dyn DbCatalogEntry>,
        namespaces: &[Namespace],
    ) -> StorageResult<()> {
        // Secondaries inherit the timestamp of the dropDatabase oplog entry.
        // Primaries arrive with none set and take the logical clock's value;
        // standalones get a null clock reading and stay untimestamped.
        let existing = txn.commit_timestamp();
        let chosen = self.clock.cluster_time();
        let set_here = existing.is_null() && !chosen.is_null();
        if set_here {
            txn.set_commit_timestamp(chosen);
        }
        let _clear = ClearCommitTimestamp {
            txn,
            armed: set_here,
        };

        let wuow = WriteUnitOfWork::new(txn);

        let mut first_error: StorageResult<()> = Ok(());
        for ns in namespaces {
            if let Err(err) = entry.drop_collection(txn, ns) {
                tracing::warn!("Failed to drop {}: {}", ns, err);
                if first_error.is_ok() {
                    first_error = Err(err);
                }
            }
        }

        fatal_invariant!(
            71009,
            entry.collection_namespaces().is_empty(),
            "database {} still has collections after drop",
            entry.name()
        );

        let _removed = DbDirectory::remove_for_drop(self.directory, txn, entry.name());
        wuow.commit();
        first_error
    }
}
