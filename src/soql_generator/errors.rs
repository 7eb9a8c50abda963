use thiserror::Error;

use crate::field_rewriter::RewriteError;
use crate::topology::TopologyError;
use crate::where_compiler::WhereCompileError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SoqlGeneratorError {
    #[error("Only queries with one top child model are supported. Use a subquery. ({0})")]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    #[error(transparent)]
    Where(#[from] WhereCompileError),

    #[error("{0} is not implemented.")]
    UnsupportedCombination(String),

    #[error("select_for_update cannot be used outside of a transaction.")]
    TransactionState,

    #[error("{0} is not supported on this database backend.")]
    DialectCapability(String),

    #[error("Query has no table to select from (empty alias map and no model)")]
    MissingFromTable,

    /// Raised by [`Cursor`](super::Cursor) and [`Connection`](super::Connection)
    /// implementations; the compiler passes it through unchanged.
    #[error("Database error: {0}")]
    Database(String),
}
