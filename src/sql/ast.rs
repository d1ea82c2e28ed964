//! Typed syntax for the supported statement shapes.

use crate::store::SortOrder;

/// One equality condition: `field = $N` (N is the 1-based parameter index).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub field: String,
    pub param: usize,
}

/// One SET assignment: `field = $N`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub field: String,
    pub param: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select {
        table: String,
        filter: Vec<Condition>,
        order_by: Option<(String, SortOrder)>,
        limit: Option<u64>,
    },
    /// Column lists and VALUES text are ignored; the document to insert is the
    /// first positional parameter.
    Insert { table: String },
    Update {
        table: String,
        assignments: Vec<Assignment>,
        filter: Vec<Condition>,
    },
    Delete {
        table: String,
        filter: Vec<Condition>,
    },
    // Accepted as no-ops; the store's transaction semantics are not engaged.
    Begin,
    Commit,
    Rollback,
}
