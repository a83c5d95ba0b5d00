//! Error types for sequin

use thiserror::Error;

/// Result type alias for sequin operations
pub type SequinResult<T> = Result<T, SequinError>;

/// Error types for SQL generation and execution
#[derive(Debug, Error)]
pub enum SequinError {
    /// Malformed condition or expression tree, detected at build time
    #[error("Expression error: {0}")]
    Expression(String),

    /// Dialect-unsupported construct or invalid combination, detected before execution
    #[error("Query error: {0}")]
    Query(String),

    /// Connection acquisition or pool error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Type-cast or schema-parse failure at execution time
    #[error("Database error: {0}")]
    Database(String),

    /// Opaque driver error, surfaced unchanged
    #[error("Driver error: {0}")]
    Driver(String),

    /// Caller-requested clean transaction abort.
    ///
    /// Raising this inside a transaction body rolls back the enclosing scope
    /// and the scope resolves as `Ok(None)` instead of an error. Never
    /// surfaced outside the transaction engine.
    #[error("transaction rolled back by request")]
    Rollback,
}

impl SequinError {
    /// Create an expression error
    pub fn expression(message: impl Into<String>) -> Self {
        Self::Expression(message.into())
    }

    /// Create a query error
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    /// Create a driver passthrough error
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver(message.into())
    }

    /// The typed rollback signal: aborts the enclosing transaction scope cleanly.
    pub fn rollback() -> Self {
        Self::Rollback
    }

    /// Check if this is the rollback signal
    pub fn is_rollback(&self) -> bool {
        matches!(self, Self::Rollback)
    }

    /// Check if this is a build-time error (expression or query)
    pub fn is_build_error(&self) -> bool {
        matches!(self, Self::Expression(_) | Self::Query(_))
    }

    /// Check if this is a connection error
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}
