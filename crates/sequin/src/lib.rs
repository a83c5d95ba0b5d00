//! # sequin
//!
//! A database-agnostic SQL generation and transaction core.
//!
//! ## Features
//!
//! - **Immutable datasets**: every builder call returns a new [`Dataset`];
//!   one value can be shared across concurrent callers
//! - **Dialect descriptors**: identifier quoting, literal escaping, operator
//!   tokens and statement pipelines all resolve through a [`Dialect`] value,
//!   never through global state
//! - **Clause pipelines**: statements render by walking an ordered list of
//!   named clause renderers; a dialect overrides single clauses or the order
//! - **Transactions**: nested scopes map to `autopoint_<n>` savepoints,
//!   dialects without savepoints queue whole transactions FIFO, and a typed
//!   rollback signal unwinds without being an error
//! - **Two-phase commit**: `PREPARE TRANSACTION` / XA flavors behind one
//!   option, finalized with `commit_prepared_transaction`
//! - **Safe defaults**: DELETE requires WHERE, UPDATE requires SET
//!
//! ## Building queries
//!
//! ```ignore
//! use sequin::{dialect, Database, Expr, LockMode};
//!
//! let db = Database::new(pool, dialect::postgres());
//!
//! let sql = db.from("items")
//!     .filter(("kind", "book"))?
//!     .exclude(("qty", 0))?
//!     .order(vec![Expr::column("name").asc()])
//!     .limit(10)
//!     .sql()?;
//!
//! let rows = db.from("items").filter(("id", ids))?.fetch_all(&db).await?;
//! ```
//!
//! ## Transactions
//!
//! ```ignore
//! db.transaction(TransactionOptions::new(), |txn| Box::pin(async move {
//!     db.from("items").insert_row(txn, [("name", "a")]).await?;
//!     txn.transaction(TransactionOptions::new(), |inner| Box::pin(async move {
//!         // SAVEPOINT autopoint_1
//!         db.from("audit").insert_row(inner, [("note", "n")]).await
//!     })).await?;
//!     Ok(())
//! })).await?;
//! ```

pub mod database;
pub mod dataset;
pub mod dialect;
pub mod error;
pub mod expr;
pub mod pool;
pub mod row;
pub mod schema;
pub mod transaction;
pub mod value;

pub use database::{Database, DatabaseConfig, Executor};
pub use dataset::{
    CompoundKind, Dataset, FilterArg, JoinKind, LockMode, Operand, StatementKind,
};
pub use dialect::{Capabilities, Dialect, DialectRegistry, DialectSpec};
pub use error::{SequinError, SequinResult};
pub use expr::{BoolOp, ComplexOp, Expr, NullsOrder};
pub use pool::{Connection, ConnectionPool, QueryOutcome};
pub use row::Row;
pub use schema::{column, ColumnMeta, SchemaCache};
pub use transaction::{Isolation, TransactionOptions, TxnScope};
pub use value::Value;
