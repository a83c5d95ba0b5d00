//! Driver seam: connection and pool traits.
//!
//! The crate never talks to a wire protocol itself. A driver supplies a
//! [`ConnectionPool`] whose connections run finished SQL strings and hand
//! back raw column/row data; everything above (rendering, transactions,
//! schema caching) is driver-agnostic.

use async_trait::async_trait;

use crate::error::SequinResult;
use crate::value::Value;

/// Raw result of running one statement on a connection.
#[derive(Debug, Clone, Default)]
pub struct QueryOutcome {
    /// Result-set column names as reported by the driver.
    pub columns: Vec<String>,
    /// Result-set rows, one `Value` per column.
    pub rows: Vec<Vec<Value>>,
    /// Rows affected by a write statement.
    pub rows_affected: u64,
}

impl QueryOutcome {
    /// An outcome with no result set, only an affected-row count.
    pub fn affected(n: u64) -> Self {
        QueryOutcome {
            rows_affected: n,
            ..QueryOutcome::default()
        }
    }
}

/// One live database connection.
///
/// Statements arrive fully rendered; drivers must not re-escape or rewrite
/// them. Errors from the wire should be wrapped as `SequinError::Driver`.
#[async_trait]
pub trait Connection: Send {
    /// Run one statement and return its outcome.
    async fn query(&mut self, sql: &str) -> SequinResult<QueryOutcome>;

    /// Close the underlying connection.
    async fn close(&mut self) -> SequinResult<()>;
}

/// A source of connections.
#[async_trait]
pub trait ConnectionPool: Send + Sync {
    /// Check one connection out. Callers must pass it back through
    /// [`release`](ConnectionPool::release) when done.
    async fn acquire(&self) -> SequinResult<Box<dyn Connection>>;

    /// Return a connection to the pool.
    async fn release(&self, conn: Box<dyn Connection>);

    /// Close all pooled connections.
    async fn drain(&self) -> SequinResult<()>;
}
