use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use serde::{Deserialize, Serialize};

/// Logical timestamp assigned to writes so replication can order and roll
/// them back. The zero value means "no timestamp".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// The null timestamp: no timestamp set.
    pub const NULL: Timestamp = Timestamp(0);

    /// Initial-data-timestamp sentinel telling the engine it may take
    /// checkpoints of data that replication could still roll back.
    pub const ALLOW_UNSTABLE_CHECKPOINTS: Timestamp = Timestamp(1);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ts:{}", self.0)
    }
}

/// Identifier of a record within a record store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rec:{}", self.0)
    }
}

/// Key-space partition prefix assigned to a grouped record store.
///
/// Engines that pack several logical tables into one physical table use the
/// prefix to partition the key space. `NOT_PREFIXED` means the store owns its
/// physical table outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KvPrefix(pub i64);

/// Largest prefix handed out so far, process-wide. Seeded at startup from the
/// catalog and only ever moves forward.
static LARGEST_PREFIX: AtomicI64 = AtomicI64::new(-1);

impl KvPrefix {
    /// A store that does not share a physical table.
    pub const NOT_PREFIXED: KvPrefix = KvPrefix(-1);

    pub fn is_prefixed(self) -> bool {
        self.0 >= 0
    }

    /// Publish the largest prefix observed at startup. Monotone: a smaller
    /// value than the current one is a no-op.
    pub fn set_largest(prefix: KvPrefix) {
        LARGEST_PREFIX.fetch_max(prefix.0, Ordering::SeqCst);
    }

    /// The largest prefix published or allocated so far.
    pub fn largest() -> KvPrefix {
        KvPrefix(LARGEST_PREFIX.load(Ordering::SeqCst))
    }

    /// Allocate the next unused prefix.
    pub fn next() -> KvPrefix {
        KvPrefix(LARGEST_PREFIX.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

impl Default for KvPrefix {
    fn default() -> Self {
        KvPrefix::NOT_PREFIXED
    }
}

impl fmt::Display for KvPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "prefix:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_null() {
        assert!(Timestamp::NULL.is_null());
        assert!(Timestamp::default().is_null());
        assert!(!Timestamp(42).is_null());
        assert!(!Timestamp::ALLOW_UNSTABLE_CHECKPOINTS.is_null());
    }

    #[test]
    fn test_prefix_allocation_is_monotone() {
        // Other tests share the process-wide allocator, so assert relative
        // movement rather than absolute values.
        KvPrefix::set_largest(KvPrefix(100));
        assert!(KvPrefix::largest() >= KvPrefix(100));

        let a = KvPrefix::next();
        let b = KvPrefix::next();
        assert!(b > a);
        assert!(KvPrefix::largest() >= b);

        // Publishing something smaller never moves the allocator backwards.
        KvPrefix::set_largest(KvPrefix(1));
        assert!(KvPrefix::largest() >= b);
    }

    #[test]
    fn test_prefix_not_prefixed() {
        assert!(!KvPrefix::NOT_PREFIXED.is_prefixed());
        assert!(KvPrefix(0).is_prefixed());
    }
}
