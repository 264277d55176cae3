use std::fmt;

use serde::{Deserialize, Serialize};

/// Collection-name prefix replication uses when renaming a collection whose
/// reclamation is deferred until its drop optime is majority-committed.
const DROP_PENDING_MARKER: &str = "system.drop.";

/// A `db.collection` namespace string identifying a user-visible collection.
///
/// The database name is everything up to the first `.`; the collection name
/// is the remainder and may itself contain dots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(ns: impl Into<String>) -> Self {
        Namespace(ns.into())
    }

    pub fn from_parts(db: &str, coll: &str) -> Self {
        Namespace(format!("{}.{}", db, coll))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The database part: everything up to the first `.`, or the whole
    /// string if there is no dot.
    pub fn db(&self) -> &str {
        match self.0.find('.') {
            Some(idx) => &self.0[..idx],
            None => &self.0,
        }
    }

    /// The collection part: everything after the first `.`, empty if there
    /// is no dot.
    pub fn coll(&self) -> &str {
        match self.0.find('.') {
            Some(idx) => &self.0[idx + 1..],
            None => "",
        }
    }

    /// True iff replication has renamed this collection to defer its
    /// reclamation until the drop is majority-committed.
    pub fn is_drop_pending(&self) -> bool {
        self.coll().starts_with(DROP_PENDING_MARKER)
    }

    /// `system.indexes` survives as a real collection in some upgraded
    /// deployments and is skipped by the drop-pending rename.
    pub fn is_system_dot_indexes(&self) -> bool {
        self.coll() == "system.indexes"
    }

    /// Whether writes to this namespace are replicated. The `local` database
    /// and profile collections never reach the oplog.
    pub fn is_replicated(&self) -> bool {
        !self.db().is_empty()
            && !self.coll().is_empty()
            && self.db() != "local"
            && !self.coll().starts_with("system.profile")
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Namespace {
    fn from(ns: &str) -> Self {
        Namespace::new(ns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_and_coll_split_on_first_dot() {
        let ns = Namespace::new("mydb.my.coll");
        assert_eq!(ns.db(), "mydb");
        assert_eq!(ns.coll(), "my.coll");

        let bare = Namespace::new("mydb");
        assert_eq!(bare.db(), "mydb");
        assert_eq!(bare.coll(), "");
    }

    #[test]
    fn test_drop_pending_marker() {
        assert!(Namespace::new("db.system.drop.123i4t.c").is_drop_pending());
        assert!(!Namespace::new("db.c").is_drop_pending());
        // The marker only counts at the start of the collection name.
        assert!(!Namespace::new("db.c.system.drop.x").is_drop_pending());
    }

    #[test]
    fn test_replication_predicate() {
        assert!(Namespace::new("db.c").is_replicated());
        assert!(!Namespace::new("local.oplog.rs").is_replicated());
        assert!(!Namespace::new("db.system.profile").is_replicated());
        assert!(!Namespace::new("db").is_replicated());
    }

    #[test]
    fn test_system_dot_indexes() {
        assert!(Namespace::new("db.system.indexes").is_system_dot_indexes());
        assert!(!Namespace::new("db.system.indexes.extra").is_system_dot_indexes());
    }

    #[test]
    fn test_from_parts_round_trip() {
        let ns = Namespace::from_parts("db", "coll");
        assert_eq!(ns.as_str(), "db.coll");
    }
}
