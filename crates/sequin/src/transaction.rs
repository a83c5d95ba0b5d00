//! Transactions and savepoints.
//!
//! `Database::transaction` checks a connection out of the pool, opens a
//! transaction on it, and hands the body a [`TxnScope`] pinned to that
//! connection. Nested calls on the scope become savepoints named
//! `autopoint_<depth>` on dialects that support them; on dialects that do
//! not, nested calls re-enter the open transaction and whole transactions
//! queue FIFO behind a gate so their statements never interleave.
//!
//! A body signals "roll back, but this is not a failure" by returning
//! `Err(SequinError::Rollback)`; the owning scope rolls back and resolves
//! to `Ok(None)`. Every other error rolls back and propagates.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio::sync::Mutex as TokioMutex;
use tracing::warn;

use crate::database::{outcome_rows, run_statement, Database, DbCore, Executor};
use crate::dialect::TwoPhaseStyle;
use crate::error::{SequinError, SequinResult};
use crate::pool::{Connection, QueryOutcome};
use crate::row::Row;

/// ANSI isolation levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Isolation {
    Uncommitted,
    Committed,
    Repeatable,
    Serializable,
}

impl Isolation {
    pub fn sql_keywords(self) -> &'static str {
        match self {
            Isolation::Uncommitted => "READ UNCOMMITTED",
            Isolation::Committed => "READ COMMITTED",
            Isolation::Repeatable => "REPEATABLE READ",
            Isolation::Serializable => "SERIALIZABLE",
        }
    }
}

/// Per-transaction options. Only honored on the outermost scope.
#[derive(Debug, Clone, Default)]
pub struct TransactionOptions {
    /// Isolation level, set right after BEGIN.
    pub isolation: Option<Isolation>,
    /// Two-phase commit tag: commit becomes a PREPARE under this tag, to be
    /// finalized later with `commit_prepared_transaction`.
    pub prepare: Option<String>,
}

impl TransactionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn isolation(mut self, level: Isolation) -> Self {
        self.isolation = Some(level);
        self
    }

    pub fn prepare(mut self, tag: impl Into<String>) -> Self {
        self.prepare = Some(tag.into());
        self
    }
}

type ScopedConn = Arc<TokioMutex<Box<dyn Connection>>>;

/// A handle to an open transaction, pinned to one connection.
///
/// All statements run through the scope share that connection; the scope is
/// also an [`Executor`], so datasets execute against it directly.
pub struct TxnScope {
    core: Arc<DbCore>,
    conn: ScopedConn,
    depth: u32,
}

impl Database {
    /// Run `body` inside a transaction.
    ///
    /// Returns `Ok(Some(value))` on commit, `Ok(None)` when the body asked
    /// for a rollback via [`SequinError::Rollback`], and `Err` when the body
    /// failed or a transaction statement did.
    ///
    /// On dialects without savepoints, whole transactions queue behind a
    /// fair gate. Calling this method again from inside an active body on
    /// such a dialect waits on that gate forever; nest through
    /// [`TxnScope::transaction`] on the scope the body receives instead.
    pub async fn transaction<T, F>(
        &self,
        opts: TransactionOptions,
        body: F,
    ) -> SequinResult<Option<T>>
    where
        T: Send,
        F: for<'a> FnOnce(&'a TxnScope) -> BoxFuture<'a, SequinResult<T>> + Send,
    {
        let core = &self.core;
        let caps = core.dialect.capabilities();
        if opts.isolation.is_some() && !caps.isolation {
            return Err(SequinError::query(format!(
                "{} does not support isolation levels",
                core.dialect.name()
            )));
        }
        if opts.prepare.is_some() && caps.two_phase == TwoPhaseStyle::Unsupported {
            return Err(SequinError::query(format!(
                "{} does not support prepared transactions",
                core.dialect.name()
            )));
        }

        // Without savepoints there is no way to nest, so whole transactions
        // queue here in arrival order.
        let _gate = if !caps.savepoints {
            Some(core.txn_gate.lock().await)
        } else {
            None
        };

        let conn: ScopedConn = Arc::new(TokioMutex::new(core.pool.acquire().await?));
        if let Err(e) = run_all(core, &conn, core.dialect.begin_sql(&opts)).await {
            // A later begin statement (isolation setup) can fail after BEGIN
            // already opened the transaction; the connection must go back to
            // the pool with nothing open on it.
            rollback_quietly(core, &conn, &opts).await;
            release_connection(core, conn).await;
            return Err(e);
        }

        core.depth.fetch_add(1, Ordering::SeqCst);
        let scope = TxnScope {
            core: core.clone(),
            conn: conn.clone(),
            depth: 1,
        };
        let outcome = body(&scope).await;
        drop(scope);
        core.depth.fetch_sub(1, Ordering::SeqCst);

        let result = match outcome {
            Ok(value) => match run_all(core, &conn, core.dialect.commit_sql(&opts)).await {
                Ok(()) => Ok(Some(value)),
                Err(commit_err) => {
                    rollback_quietly(core, &conn, &opts).await;
                    Err(commit_err)
                }
            },
            Err(e) if e.is_rollback() => run_all(core, &conn, core.dialect.rollback_sql(&opts))
                .await
                .map(|_| None),
            Err(e) => {
                rollback_quietly(core, &conn, &opts).await;
                Err(e)
            }
        };
        release_connection(core, conn).await;
        result
    }

    /// Finalize a transaction previously prepared under `tag`.
    pub async fn commit_prepared_transaction(&self, tag: &str) -> SequinResult<()> {
        let sql = self
            .core
            .dialect
            .commit_prepared_sql(tag)
            .ok_or_else(|| {
                SequinError::query(format!(
                    "{} does not support prepared transactions",
                    self.core.dialect.name()
                ))
            })?;
        self.execute(&sql, Vec::new()).await.map(|_| ())
    }

    /// Abort a transaction previously prepared under `tag`.
    pub async fn rollback_prepared_transaction(&self, tag: &str) -> SequinResult<()> {
        let sql = self
            .core
            .dialect
            .rollback_prepared_sql(tag)
            .ok_or_else(|| {
                SequinError::query(format!(
                    "{} does not support prepared transactions",
                    self.core.dialect.name()
                ))
            })?;
        self.execute(&sql, Vec::new()).await.map(|_| ())
    }
}

impl TxnScope {
    /// Nesting depth of this scope, starting at 1 for the outermost.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Run `body` in a nested scope.
    ///
    /// On dialects with savepoints this opens `SAVEPOINT autopoint_<depth>`;
    /// the body's rollback signal then unwinds only to that savepoint and
    /// the call resolves `Ok(None)`. Without savepoints the body re-enters
    /// this scope and a rollback signal propagates to the scope that opened
    /// the real transaction.
    pub async fn transaction<T, F>(
        &self,
        opts: TransactionOptions,
        body: F,
    ) -> SequinResult<Option<T>>
    where
        T: Send,
        F: for<'a> FnOnce(&'a TxnScope) -> BoxFuture<'a, SequinResult<T>> + Send,
    {
        if opts.prepare.is_some() {
            return Err(SequinError::query(
                "prepared transactions cannot be nested",
            ));
        }
        if opts.isolation.is_some() {
            return Err(SequinError::query(
                "isolation level can only be set on the outermost transaction",
            ));
        }
        let dialect = &self.core.dialect;
        if !dialect.capabilities().savepoints {
            return body(self).await.map(Some);
        }

        let name = format!("autopoint_{}", self.depth);
        self.run(&dialect.savepoint_sql(&name)).await?;
        self.core.depth.fetch_add(1, Ordering::SeqCst);
        let child = TxnScope {
            core: self.core.clone(),
            conn: self.conn.clone(),
            depth: self.depth + 1,
        };
        let outcome = body(&child).await;
        drop(child);
        self.core.depth.fetch_sub(1, Ordering::SeqCst);

        match outcome {
            Ok(value) => {
                self.run(&dialect.release_savepoint_sql(&name)).await?;
                Ok(Some(value))
            }
            Err(e) if e.is_rollback() => {
                self.run(&dialect.rollback_savepoint_sql(&name)).await?;
                Ok(None)
            }
            Err(e) => {
                if let Err(rollback_err) = self.run(&dialect.rollback_savepoint_sql(&name)).await {
                    warn!(error = %rollback_err, "savepoint rollback after failed body also failed");
                }
                Err(e)
            }
        }
    }

    async fn run(&self, sql: &str) -> SequinResult<QueryOutcome> {
        let mut conn = self.conn.lock().await;
        run_statement(&self.core, conn.as_mut(), sql).await
    }
}

#[async_trait::async_trait]
impl Executor for TxnScope {
    async fn execute(&self, sql: &str) -> SequinResult<u64> {
        Ok(self.run(sql).await?.rows_affected)
    }

    async fn fetch(&self, sql: &str) -> SequinResult<Vec<Row>> {
        let outcome = self.run(sql).await?;
        Ok(outcome_rows(&self.core.dialect, outcome))
    }
}

/// Best-effort ROLLBACK so a failed transaction never hands an open
/// transaction back to the pool. A failure here is logged, not raised;
/// the original error is the one the caller sees.
async fn rollback_quietly(core: &Arc<DbCore>, conn: &ScopedConn, opts: &TransactionOptions) {
    if let Err(e) = run_all(core, conn, core.dialect.rollback_sql(opts)).await {
        warn!(error = %e, "rollback after transaction failure also failed");
    }
}

async fn run_all(core: &Arc<DbCore>, conn: &ScopedConn, stmts: Vec<String>) -> SequinResult<()> {
    let mut guard = conn.lock().await;
    for sql in stmts {
        run_statement(core, guard.as_mut(), &sql).await?;
    }
    Ok(())
}

/// Hand the pinned connection back to the pool. The scope has been dropped
/// by the time this runs, so the Arc is expected to be unique.
async fn release_connection(core: &Arc<DbCore>, conn: ScopedConn) {
    match Arc::try_unwrap(conn) {
        Ok(mutex) => core.pool.release(mutex.into_inner()).await,
        Err(_) => warn!("transaction connection still borrowed at scope exit; dropping it"),
    }
}
