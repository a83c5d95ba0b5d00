//! Immutable query builder.
//!
//! A [`Dataset`] is an immutable snapshot of query options plus the dialect
//! that renders it. Every mutator clones the options and returns a new
//! `Dataset`; the receiver is never touched, so one dataset value can be
//! shared across concurrently-running callers.
//!
//! Rendering happens through an ordered pipeline of named clause renderers
//! per statement kind (see [`render`]); a dialect may override any single
//! clause without touching the others.

mod filter;
mod render;

#[cfg(test)]
mod tests;

pub use filter::{FilterArg, Operand};
pub use render::{default_clause_order, StatementKind};

pub(crate) use render::select_sql;

use crate::database::Executor;
use crate::dialect::Dialect;
use crate::error::{SequinError, SequinResult};
use crate::expr::Expr;
use crate::row::Row;
use crate::value::Value;

/// Join flavors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// INNER JOIN
    Inner,
    /// LEFT JOIN
    Left,
    /// RIGHT JOIN
    Right,
    /// FULL OUTER JOIN (dialect capability)
    FullOuter,
    /// CROSS JOIN (no condition)
    Cross,
}

impl JoinKind {
    fn sql_keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::FullOuter => "FULL OUTER JOIN",
            JoinKind::Cross => "CROSS JOIN",
        }
    }
}

/// Row-lock modes for SELECT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// `FOR UPDATE`
    Update,
    /// `FOR SHARE` (MySQL renders `LOCK IN SHARE MODE`)
    Share,
}

/// Compound (set-operation) kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompoundKind {
    /// `UNION`
    Union,
    /// `UNION ALL`
    UnionAll,
    /// `INTERSECT`
    Intersect,
    /// `EXCEPT`
    Except,
}

impl CompoundKind {
    fn sql_keyword(self) -> &'static str {
        match self {
            CompoundKind::Union => "UNION",
            CompoundKind::UnionAll => "UNION ALL",
            CompoundKind::Intersect => "INTERSECT",
            CompoundKind::Except => "EXCEPT",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct JoinSpec {
    kind: JoinKind,
    table: String,
    alias: String,
    on: Option<Expr>,
}

/// The option snapshot. Cloned wholesale by every mutator.
#[derive(Debug, Clone, PartialEq, Default)]
struct DatasetOpts {
    from: Vec<String>,
    select: Vec<Expr>,
    distinct: bool,
    where_clause: Option<Expr>,
    having: Option<Expr>,
    joins: Vec<JoinSpec>,
    group: Vec<Expr>,
    order: Vec<Expr>,
    limit: Option<u64>,
    offset: Option<u64>,
    lock: Option<LockMode>,
    compounds: Vec<(CompoundKind, Box<Dataset>)>,
    assignments: Vec<(String, Expr)>,
    insert_columns: Vec<String>,
    insert_rows: Vec<Vec<Value>>,
    insert_ignore: bool,
    replace: bool,
    on_duplicate: Vec<String>,
    allow_delete_all: bool,
}

/// An immutable query-option snapshot plus its SQL renderer.
///
/// Datasets hold no external resources; execution goes through an explicit
/// [`Executor`] (a `Database` or a transaction scope).
#[derive(Debug, Clone)]
pub struct Dataset {
    dialect: Dialect,
    opts: DatasetOpts,
}

/// Option state only; the dialect handle is not part of the compared state.
impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        self.opts == other.opts
    }
}

impl Dataset {
    /// A dataset over one table.
    pub fn new(dialect: Dialect, table: impl Into<String>) -> Self {
        Dataset {
            dialect,
            opts: DatasetOpts {
                from: vec![table.into()],
                ..DatasetOpts::default()
            },
        }
    }

    /// The dialect this dataset renders with.
    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    fn with_opts(&self, opts: DatasetOpts) -> Self {
        Dataset {
            dialect: self.dialect.clone(),
            opts,
        }
    }

    // ==================== projection ====================

    /// Replace the SELECT column list (empty = `*`).
    pub fn select(&self, columns: &[&str]) -> Self {
        let mut opts = self.opts.clone();
        opts.select = columns.iter().map(|c| Expr::column(*c)).collect();
        self.with_opts(opts)
    }

    /// Replace the SELECT list with arbitrary expressions.
    pub fn select_exprs(&self, exprs: Vec<Expr>) -> Self {
        let mut opts = self.opts.clone();
        opts.select = exprs;
        self.with_opts(opts)
    }

    /// Append one expression to the SELECT list.
    pub fn select_append(&self, expr: Expr) -> Self {
        let mut opts = self.opts.clone();
        opts.select.push(expr);
        self.with_opts(opts)
    }

    /// `SELECT DISTINCT`
    pub fn distinct(&self) -> Self {
        let mut opts = self.opts.clone();
        opts.distinct = true;
        self.with_opts(opts)
    }

    // ==================== filtering ====================

    /// AND a condition onto the WHERE clause.
    ///
    /// Accepts an [`Expr`], a `(column, operand)` pair, or an ordered list of
    /// pairs (repeated columns allowed). Array operands render `IN (...)`,
    /// `Value::Null` renders `IS NULL`, pattern operands render per-dialect
    /// LIKE/regexp matches.
    pub fn filter(&self, arg: impl Into<FilterArg>) -> SequinResult<Self> {
        let expr = arg.into().into_expr()?;
        Ok(self.and_where(expr))
    }

    /// AND the negation of a condition onto the WHERE clause.
    pub fn exclude(&self, arg: impl Into<FilterArg>) -> SequinResult<Self> {
        let expr = arg.into().into_expr()?;
        Ok(self.and_where(expr.negate()))
    }

    /// AND a raw SQL fragment with positional `?` placeholders.
    ///
    /// Values are literalized through the dialect, never spliced unescaped.
    pub fn filter_sql(&self, fragment: &str, args: Vec<Value>) -> SequinResult<Self> {
        let expr = Expr::raw(fragment, args)?;
        Ok(self.and_where(expr))
    }

    /// AND a raw SQL fragment with named `{token}` placeholders.
    pub fn filter_named(&self, fragment: &str, args: &[(&str, Value)]) -> SequinResult<Self> {
        let expr = filter::named_fragment(fragment, args)?;
        Ok(self.and_where(expr))
    }

    /// Negate the whole accumulated WHERE condition in one step.
    pub fn invert(&self) -> SequinResult<Self> {
        let mut opts = self.opts.clone();
        match opts.where_clause.take() {
            Some(existing) => {
                opts.where_clause = Some(existing.negate());
                Ok(self.with_opts(opts))
            }
            None => Err(SequinError::expression("no WHERE clause to invert")),
        }
    }

    /// AND a condition onto the HAVING clause.
    pub fn having(&self, arg: impl Into<FilterArg>) -> SequinResult<Self> {
        let expr = arg.into().into_expr()?;
        let mut opts = self.opts.clone();
        opts.having = Some(match opts.having.take() {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        Ok(self.with_opts(opts))
    }

    fn and_where(&self, expr: Expr) -> Self {
        let mut opts = self.opts.clone();
        opts.where_clause = Some(match opts.where_clause.take() {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self.with_opts(opts)
    }

    // ==================== joins ====================

    /// Join another table on `(joined_column, prior_column)` pairs.
    ///
    /// The joined table gets an auto-assigned alias `t1, t2, ...` in join
    /// order. Left-side columns qualify against the new alias; right-side
    /// columns qualify against the most recent prior source unless already
    /// qualified.
    pub fn join(
        &self,
        kind: JoinKind,
        table: impl Into<String>,
        on: &[(&str, &str)],
    ) -> SequinResult<Self> {
        let alias = format!("t{}", self.opts.joins.len() + 1);
        self.join_with_alias(kind, table, alias, on)
    }

    /// Join with an explicit alias instead of the auto-assigned one.
    pub fn join_with_alias(
        &self,
        kind: JoinKind,
        table: impl Into<String>,
        alias: impl Into<String>,
        on: &[(&str, &str)],
    ) -> SequinResult<Self> {
        if kind == JoinKind::FullOuter && !self.dialect.capabilities().full_join {
            return Err(SequinError::query(format!(
                "{} does not support FULL OUTER JOIN",
                self.dialect.name()
            )));
        }
        let alias = alias.into();
        let on_expr = if kind == JoinKind::Cross {
            None
        } else {
            Some(self.resolve_join_condition(&alias, on)?)
        };
        let mut opts = self.opts.clone();
        opts.joins.push(JoinSpec {
            kind,
            table: table.into(),
            alias,
            on: on_expr,
        });
        Ok(self.with_opts(opts))
    }

    /// Join on an arbitrary expression (no column resolution).
    pub fn join_on(
        &self,
        kind: JoinKind,
        table: impl Into<String>,
        on: Expr,
    ) -> SequinResult<Self> {
        if kind == JoinKind::FullOuter && !self.dialect.capabilities().full_join {
            return Err(SequinError::query(format!(
                "{} does not support FULL OUTER JOIN",
                self.dialect.name()
            )));
        }
        let mut opts = self.opts.clone();
        let alias = format!("t{}", opts.joins.len() + 1);
        opts.joins.push(JoinSpec {
            kind,
            table: table.into(),
            alias,
            on: Some(on),
        });
        Ok(self.with_opts(opts))
    }

    /// Qualify unqualified join-condition columns: left side against the new
    /// alias, right side against the most recent prior source.
    fn resolve_join_condition(&self, alias: &str, on: &[(&str, &str)]) -> SequinResult<Expr> {
        let prior = self
            .opts
            .joins
            .last()
            .map(|j| j.alias.as_str())
            .or_else(|| self.opts.from.first().map(String::as_str))
            .ok_or_else(|| {
                SequinError::query("cannot resolve join condition: dataset has no source")
            })?;
        let pair = |(left, right): &(&str, &str)| {
            let lhs = Expr::qualified(alias, *left);
            let rhs = if right.contains('.') {
                Expr::column(*right)
            } else {
                Expr::qualified(prior, *right)
            };
            Expr::Boolean {
                op: crate::expr::BoolOp::Eq,
                args: vec![lhs, rhs],
            }
        };
        let mut on_pairs = on.iter();
        let first = on_pairs
            .next()
            .ok_or_else(|| SequinError::query("join requires at least one column pair"))?;
        let mut condition = pair(first);
        for p in on_pairs {
            condition = condition.and(pair(p));
        }
        Ok(condition)
    }

    // ==================== grouping & ordering ====================

    /// GROUP BY the given columns.
    pub fn group(&self, columns: &[&str]) -> Self {
        let mut opts = self.opts.clone();
        opts.group = columns.iter().map(|c| Expr::column(*c)).collect();
        self.with_opts(opts)
    }

    /// Replace the ORDER BY list.
    pub fn order(&self, exprs: Vec<Expr>) -> Self {
        let mut opts = self.opts.clone();
        opts.order = exprs;
        self.with_opts(opts)
    }

    /// Append one ORDER BY expression.
    pub fn order_append(&self, expr: Expr) -> Self {
        let mut opts = self.opts.clone();
        opts.order.push(expr);
        self.with_opts(opts)
    }

    /// LIMIT.
    pub fn limit(&self, n: u64) -> Self {
        let mut opts = self.opts.clone();
        opts.limit = Some(n);
        self.with_opts(opts)
    }

    /// OFFSET.
    pub fn offset(&self, n: u64) -> Self {
        let mut opts = self.opts.clone();
        opts.offset = Some(n);
        self.with_opts(opts)
    }

    /// Row-lock mode.
    pub fn lock(&self, mode: LockMode) -> Self {
        let mut opts = self.opts.clone();
        opts.lock = Some(mode);
        self.with_opts(opts)
    }

    // ==================== compounds ====================

    /// `UNION` with another dataset.
    pub fn union(&self, other: Dataset) -> Self {
        self.compound(CompoundKind::Union, other)
    }

    /// `UNION ALL` with another dataset.
    pub fn union_all(&self, other: Dataset) -> Self {
        self.compound(CompoundKind::UnionAll, other)
    }

    /// `INTERSECT` with another dataset.
    pub fn intersect(&self, other: Dataset) -> Self {
        self.compound(CompoundKind::Intersect, other)
    }

    /// `EXCEPT` with another dataset.
    pub fn except(&self, other: Dataset) -> Self {
        self.compound(CompoundKind::Except, other)
    }

    fn compound(&self, kind: CompoundKind, other: Dataset) -> Self {
        let mut opts = self.opts.clone();
        opts.compounds.push((kind, Box::new(other)));
        self.with_opts(opts)
    }

    // ==================== insert / update state ====================

    /// Set column assignments for INSERT or UPDATE.
    pub fn set<S: Into<String>, V: Into<Value>>(
        &self,
        pairs: impl IntoIterator<Item = (S, V)>,
    ) -> Self {
        let mut opts = self.opts.clone();
        for (col, val) in pairs {
            opts.assignments
                .push((col.into(), Expr::Literal(val.into())));
        }
        self.with_opts(opts)
    }

    /// Set one column to an arbitrary expression (UPDATE).
    pub fn set_expr(&self, column: impl Into<String>, expr: Expr) -> Self {
        let mut opts = self.opts.clone();
        opts.assignments.push((column.into(), expr));
        self.with_opts(opts)
    }

    /// Multi-row VALUES for INSERT. Every row must match the column count.
    pub fn values(&self, columns: &[&str], rows: Vec<Vec<Value>>) -> SequinResult<Self> {
        for row in &rows {
            if row.len() != columns.len() {
                return Err(SequinError::query(format!(
                    "VALUES row has {} entries for {} columns",
                    row.len(),
                    columns.len()
                )));
            }
        }
        let mut opts = self.opts.clone();
        opts.insert_columns = columns.iter().map(|c| c.to_string()).collect();
        opts.insert_rows = rows;
        Ok(self.with_opts(opts))
    }

    /// MySQL `INSERT IGNORE`. Fails on dialects without it.
    pub fn insert_ignore(&self) -> SequinResult<Self> {
        if !self.dialect.capabilities().insert_ignore {
            return Err(SequinError::query(format!(
                "{} does not support INSERT IGNORE",
                self.dialect.name()
            )));
        }
        let mut opts = self.opts.clone();
        opts.insert_ignore = true;
        Ok(self.with_opts(opts))
    }

    /// MySQL `REPLACE INTO`. Fails on dialects without it.
    pub fn replace(&self) -> SequinResult<Self> {
        if !self.dialect.capabilities().replace_into {
            return Err(SequinError::query(format!(
                "{} does not support REPLACE INTO",
                self.dialect.name()
            )));
        }
        let mut opts = self.opts.clone();
        opts.replace = true;
        Ok(self.with_opts(opts))
    }

    /// MySQL `ON DUPLICATE KEY UPDATE` over the named columns.
    pub fn on_duplicate_key_update(&self, columns: &[&str]) -> SequinResult<Self> {
        if !self.dialect.capabilities().on_duplicate_key {
            return Err(SequinError::query(format!(
                "{} does not support ON DUPLICATE KEY UPDATE",
                self.dialect.name()
            )));
        }
        let mut opts = self.opts.clone();
        opts.on_duplicate = columns.iter().map(|c| c.to_string()).collect();
        Ok(self.with_opts(opts))
    }

    /// Permit DELETE without a WHERE clause.
    pub fn allow_delete_all(&self) -> Self {
        let mut opts = self.opts.clone();
        opts.allow_delete_all = true;
        self.with_opts(opts)
    }

    // ==================== rendering ====================

    /// The rendered SELECT statement.
    pub fn sql(&self) -> SequinResult<String> {
        render::select_sql(self)
    }

    /// The rendered INSERT statement.
    pub fn insert_sql(&self) -> SequinResult<String> {
        render::statement_sql(self, StatementKind::Insert)
    }

    /// The rendered UPDATE statement.
    pub fn update_sql(&self) -> SequinResult<String> {
        render::statement_sql(self, StatementKind::Update)
    }

    /// The rendered DELETE statement.
    pub fn delete_sql(&self) -> SequinResult<String> {
        render::statement_sql(self, StatementKind::Delete)
    }

    // ==================== execution ====================

    /// Fetch all rows through the given executor.
    pub async fn fetch_all<E: Executor>(&self, exec: &E) -> SequinResult<Vec<Row>> {
        exec.fetch(&self.sql()?).await
    }

    /// Fetch the first row, if any.
    pub async fn fetch_one<E: Executor>(&self, exec: &E) -> SequinResult<Option<Row>> {
        let sql = self.limit(1).sql()?;
        Ok(exec.fetch(&sql).await?.into_iter().next())
    }

    /// Execute the accumulated INSERT; returns the affected-row count.
    pub async fn insert<E: Executor>(&self, exec: &E) -> SequinResult<u64> {
        exec.execute(&self.insert_sql()?).await
    }

    /// Convenience: `set(pairs)` then insert.
    pub async fn insert_row<E, S, V>(
        &self,
        exec: &E,
        pairs: impl IntoIterator<Item = (S, V)>,
    ) -> SequinResult<u64>
    where
        E: Executor,
        S: Into<String>,
        V: Into<Value>,
    {
        self.set(pairs).insert(exec).await
    }

    /// Execute the accumulated UPDATE; returns the affected-row count.
    pub async fn update<E: Executor>(&self, exec: &E) -> SequinResult<u64> {
        exec.execute(&self.update_sql()?).await
    }

    /// Execute a DELETE; returns the affected-row count.
    pub async fn delete<E: Executor>(&self, exec: &E) -> SequinResult<u64> {
        exec.execute(&self.delete_sql()?).await
    }

    // ==================== crate-internal accessors ====================

    pub(crate) fn lock_mode(&self) -> Option<LockMode> {
        self.opts.lock
    }
}
