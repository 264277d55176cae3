//! Transaction primitive consumed by the coordinator.
//!
//! A recovery unit is the engine's per-operation transaction handle. This
//! layer only needs commit/abort bracketing, registered change hooks, and
//! the commit-timestamp state; snapshot and visibility machinery stays
//! inside the engine.

use heron_common::types::Timestamp;

/// Hook registered on a recovery unit, fired exactly once when the enclosing
/// unit of work resolves.
pub trait Change: Send {
    fn commit(self: Box<Self>);
    fn rollback(self: Box<Self>);
}

/// Scoped unit of work with commit/abort and registered change hooks.
///
/// Units of work nest: only the outermost commit resolves the registered
/// changes. Contract: commit hooks fire in registration order, rollback
/// hooks in reverse order. All methods take `&self`; implementations are
/// expected to use interior mutability since a recovery unit serves one
/// operation at a time.
pub trait RecoveryUnit {
    fn begin_unit_of_work(&self);
    fn commit_unit_of_work(&self);
    fn abort_unit_of_work(&self);

    /// Register a hook fired when the outermost unit of work resolves.
    fn register_change(&self, change: Box<dyn Change>);

    /// Commit timestamp assigned to writes in this unit, null if unset.
    fn commit_timestamp(&self) -> Timestamp;
    fn set_commit_timestamp(&self, ts: Timestamp);
    fn clear_commit_timestamp(&self);

    /// Discard the current storage snapshot without ending the operation.
    fn abandon_snapshot(&self);
}

/// RAII bracket for a write transaction: commits explicitly, aborts when
/// dropped without a commit (early return, error propagation, or panic).
pub struct WriteUnitOfWork<'a> {
    txn: &'a dyn RecoveryUnit,
    committed: bool,
}

impl<'a> WriteUnitOfWork<'a> {
    pub fn new(txn: &'a dyn RecoveryUnit) -> Self {
        txn.begin_unit_of_work();
        WriteUnitOfWork {
            txn,
            committed: false,
        }
    }

    pub fn commit(mut self) {
        self.txn.commit_unit_of_work();
        self.committed = true;
    }
}

impl Drop for WriteUnitOfWork<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.txn.abort_unit_of_work();
        }
    }
}
