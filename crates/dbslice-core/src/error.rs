//! # Error Types
//!
//! Defines `DbSliceError`, the unified error enum for every failure mode in
//! a sampling run. Every variant carries enough context (table name, column
//! name, SQL snippet) to debug immediately without digging through logs.
//!
//! Absent rows are never an error: an orphaned foreign-key value or an
//! anchor filter that matches nothing yields an empty result set and the
//! run continues.

use thiserror::Error;

/// All errors that can occur in dbslice operations.
#[derive(Error, Debug)]
pub enum DbSliceError {
    #[error("Database connection failed: {message}\n  Connection string: {connection_hint}\n  Cause: {source}")]
    Connection {
        message: String,
        connection_hint: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Metadata catalog query '{query}' failed: {source}")]
    Metadata {
        query: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Schema replication failed at '{statement}': {source}")]
    Replication {
        statement: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Schema replication failed: relation '{table}' has unknown type '{kind}'")]
    UnknownTableType { table: String, kind: String },

    #[error("Transactional batch failed on {table}: {source}\n  SQL: {statement}")]
    Transaction {
        table: String,
        statement: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Row fetch failed: {source}\n  SQL: {statement}")]
    Query {
        statement: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to decode column '{column}': {source}")]
    RowDecode {
        column: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Unsupported driver '{driver}'. Supported: mysql")]
    UnsupportedDriver { driver: String },

    #[error("Bad anchor spec '{input}'. Expected 'table' or 'table#column=v1,v2,...'")]
    AnchorSpec { input: String },

    #[error("'{name}' is not a valid SQL identifier")]
    InvalidIdentifier { name: String },

    #[error("Sampling run cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, DbSliceError>;
