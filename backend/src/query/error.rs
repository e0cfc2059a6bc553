//! Query engine errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// No direct join edge between two adjacent hops of a join path.
    #[error("no join edge from {from} to {to}")]
    MissingJoin { from: String, to: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
