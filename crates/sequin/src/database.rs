//! The database handle: pool + dialect + schema cache + transaction state.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::Mutex as TokioMutex;
use tracing::{debug, error};

use crate::dataset::Dataset;
use crate::dialect::Dialect;
use crate::error::SequinResult;
use crate::expr::Expr;
use crate::pool::{Connection, ConnectionPool, QueryOutcome};
use crate::row::Row;
use crate::schema::{self, ColumnMeta, SchemaCache};
use crate::value::Value;

/// Tunables that do not come from the dialect.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// SQL statements longer than this are truncated in log output.
    pub sql_log_max_len: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            sql_log_max_len: 200,
        }
    }
}

/// Anything that can run finished SQL: a [`Database`] (ad hoc, one pooled
/// connection per call) or a transaction scope (pinned connection).
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run a write statement; returns the affected-row count.
    async fn execute(&self, sql: &str) -> SequinResult<u64>;

    /// Run a query statement; returns the result rows.
    async fn fetch(&self, sql: &str) -> SequinResult<Vec<Row>>;
}

pub(crate) struct DbCore {
    pub(crate) pool: Box<dyn ConnectionPool>,
    pub(crate) dialect: Dialect,
    pub(crate) config: DatabaseConfig,
    pub(crate) schema: StdMutex<SchemaCache>,
    /// Serializes whole transactions on dialects without savepoints. The
    /// tokio mutex wakes waiters in FIFO order, so queued transactions run
    /// in arrival order without interleaving.
    pub(crate) txn_gate: TokioMutex<()>,
    pub(crate) depth: AtomicU32,
}

/// A cloneable handle to one logical database.
#[derive(Clone)]
pub struct Database {
    pub(crate) core: Arc<DbCore>,
}

impl Database {
    pub fn new(pool: Box<dyn ConnectionPool>, dialect: Dialect) -> Self {
        Self::with_config(pool, dialect, DatabaseConfig::default())
    }

    pub fn with_config(
        pool: Box<dyn ConnectionPool>,
        dialect: Dialect,
        config: DatabaseConfig,
    ) -> Self {
        Database {
            core: Arc::new(DbCore {
                pool,
                dialect,
                config,
                schema: StdMutex::new(SchemaCache::default()),
                txn_gate: TokioMutex::new(()),
                depth: AtomicU32::new(0),
            }),
        }
    }

    pub fn dialect(&self) -> &Dialect {
        &self.core.dialect
    }

    /// A dataset over one table, bound to this database's dialect.
    pub fn from(&self, table: impl Into<String>) -> Dataset {
        Dataset::new(self.core.dialect.clone(), table)
    }

    /// Current transaction nesting depth across this handle.
    pub fn transaction_depth(&self) -> u32 {
        self.core.depth.load(Ordering::SeqCst)
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction_depth() > 0
    }

    /// Record column metadata for a table.
    pub fn register_columns(&self, table: impl Into<String>, columns: Vec<ColumnMeta>) {
        lock_schema(&self.core).insert(table, columns);
    }

    /// Cached column metadata, if known.
    pub fn column_metadata(&self, table: &str) -> Option<Vec<ColumnMeta>> {
        lock_schema(&self.core).get(table).cloned()
    }

    /// Run an ad hoc query with positional `?` placeholders.
    ///
    /// Every value is literalized through the dialect before the statement
    /// goes out; a `?` inside a single-quoted literal is plain text. Fails
    /// fast when the placeholder and value counts disagree.
    pub async fn fetch(&self, sql: &str, params: Vec<Value>) -> SequinResult<Vec<Row>> {
        let sql = self.bind_params(sql, params)?;
        let outcome = self.run_ad_hoc(&sql).await?;
        Ok(outcome_rows(&self.core.dialect, outcome))
    }

    /// Run an ad hoc write statement with positional `?` placeholders;
    /// returns the affected-row count.
    pub async fn execute(&self, sql: &str, params: Vec<Value>) -> SequinResult<u64> {
        let sql = self.bind_params(sql, params)?;
        Ok(self.run_ad_hoc(&sql).await?.rows_affected)
    }

    fn bind_params(&self, sql: &str, params: Vec<Value>) -> SequinResult<String> {
        if params.is_empty() {
            return Ok(sql.to_string());
        }
        let expr = Expr::raw(sql, params)?;
        self.core.dialect.expr_sql(&expr)
    }

    /// Close all pooled connections.
    pub async fn disconnect(&self) -> SequinResult<()> {
        self.core.pool.drain().await
    }

    async fn run_ad_hoc(&self, sql: &str) -> SequinResult<QueryOutcome> {
        let mut conn = self.core.pool.acquire().await?;
        let result = run_statement(&self.core, conn.as_mut(), sql).await;
        self.core.pool.release(conn).await;
        result
    }
}

#[async_trait]
impl Executor for Database {
    async fn execute(&self, sql: &str) -> SequinResult<u64> {
        Ok(self.run_ad_hoc(sql).await?.rows_affected)
    }

    async fn fetch(&self, sql: &str) -> SequinResult<Vec<Row>> {
        let outcome = self.run_ad_hoc(sql).await?;
        Ok(outcome_rows(&self.core.dialect, outcome))
    }
}

pub(crate) fn lock_schema(core: &DbCore) -> std::sync::MutexGuard<'_, SchemaCache> {
    core.schema.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Build rows from a raw outcome, folding result-set column names through
/// the dialect's output rule.
pub(crate) fn outcome_rows(dialect: &Dialect, outcome: QueryOutcome) -> Vec<Row> {
    let columns: Arc<[String]> = outcome
        .columns
        .iter()
        .map(|c| dialect.output_identifier(c))
        .collect::<Vec<_>>()
        .into();
    outcome
        .rows
        .into_iter()
        .map(|values| Row::new(columns.clone(), values))
        .collect()
}

/// Run one statement on a connection: timing, logging, schema invalidation.
pub(crate) async fn run_statement(
    core: &DbCore,
    conn: &mut dyn Connection,
    sql: &str,
) -> SequinResult<QueryOutcome> {
    let started = Instant::now();
    match conn.query(sql).await {
        Ok(outcome) => {
            debug!(
                target: "sequin::sql",
                elapsed_ms = started.elapsed().as_millis() as u64,
                rows = outcome.rows.len(),
                affected = outcome.rows_affected,
                sql = %truncate_sql(sql, core.config.sql_log_max_len),
                "statement ok"
            );
            if schema::is_ddl(sql) {
                lock_schema(core).clear();
            }
            Ok(outcome)
        }
        Err(e) => {
            error!(
                target: "sequin::sql",
                elapsed_ms = started.elapsed().as_millis() as u64,
                sql = %truncate_sql(sql, core.config.sql_log_max_len),
                error = %e,
                "statement failed"
            );
            Err(e)
        }
    }
}

/// Char-boundary-safe truncation for log output.
fn truncate_sql(sql: &str, max_len: usize) -> String {
    if sql.len() <= max_len {
        return sql.to_string();
    }
    let mut end = max_len;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &sql[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_sql("SELECT 1", 100), "SELECT 1");
        assert_eq!(truncate_sql("SELECT abcdef", 8), "SELECT a...");
        // 'é' is two bytes; cutting inside it must back off
        let s = "SELECT 'ééé'";
        let t = truncate_sql(s, 9);
        assert!(t.ends_with("..."));
        assert!(s.starts_with(t.trim_end_matches("...")));
    }
}
