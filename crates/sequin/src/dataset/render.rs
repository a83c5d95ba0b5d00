//! The clause pipeline.
//!
//! Statements render by walking an ordered list of clause names and invoking
//! one renderer per name. Dialects override individual clauses (or the whole
//! order) through their descriptor; everything else falls through to the defaults
//! here.

use super::{CompoundKind, Dataset, LockMode};
use crate::dialect::ClauseFn;
use crate::error::{SequinError, SequinResult};

/// Which statement a pipeline renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

/// The baseline clause order per statement kind.
pub fn default_clause_order(kind: StatementKind) -> &'static [&'static str] {
    match kind {
        StatementKind::Select => &[
            "distinct",
            "columns",
            "from",
            "join",
            "where",
            "group",
            "having",
            "compounds",
            "order",
            "limit",
            "lock",
        ],
        StatementKind::Insert => &["insert", "columns", "values", "on_duplicate"],
        StatementKind::Update => &["update", "set", "where"],
        StatementKind::Delete => &["delete", "where"],
    }
}

/// Render a complete statement by walking the clause order, preferring the
/// dialect's override for each name.
pub(crate) fn statement_sql(ds: &Dataset, kind: StatementKind) -> SequinResult<String> {
    let dialect = ds.dialect();
    let mut sql = String::new();
    for &name in dialect.clause_order(kind) {
        let clause = match dialect.clause_override(kind, name) {
            Some(f) => f,
            None => default_clause(kind, name)?,
        };
        clause(ds, &mut sql)?;
    }
    Ok(sql)
}

pub(crate) fn select_sql(ds: &Dataset) -> SequinResult<String> {
    statement_sql(ds, StatementKind::Select)
}

fn default_clause(kind: StatementKind, name: &str) -> SequinResult<ClauseFn> {
    use StatementKind::*;
    let f: ClauseFn = match (kind, name) {
        (Select, "distinct") => select_intro_clause,
        (Select, "columns") => select_columns_clause,
        (Select, "from") => from_clause,
        (Select, "join") => join_clause,
        (Select, "group") => group_clause,
        (Select, "having") => having_clause,
        (Select, "compounds") => compounds_clause,
        (Select, "order") => order_clause,
        (Select, "limit") => limit_clause,
        (Select, "lock") => lock_clause,
        (Select, "where") | (Update, "where") | (Delete, "where") => where_clause,
        (Insert, "insert") => insert_intro_clause,
        (Insert, "columns") => insert_columns_clause,
        (Insert, "values") => insert_values_clause,
        (Insert, "on_duplicate") => on_duplicate_clause,
        (Update, "update") => update_intro_clause,
        (Update, "set") => update_set_clause,
        (Delete, "delete") => delete_intro_clause,
        _ => {
            return Err(SequinError::query(format!(
                "unknown clause {name:?} in {kind:?} pipeline"
            )))
        }
    };
    Ok(f)
}

fn primary_table(ds: &Dataset) -> SequinResult<&str> {
    ds.opts
        .from
        .first()
        .map(String::as_str)
        .ok_or_else(|| SequinError::query("statement requires a table"))
}

// ==================== SELECT clauses ====================

fn select_intro_clause(ds: &Dataset, sql: &mut String) -> SequinResult<()> {
    sql.push_str("SELECT");
    if ds.opts.distinct {
        sql.push_str(" DISTINCT");
    }
    Ok(())
}

fn select_columns_clause(ds: &Dataset, sql: &mut String) -> SequinResult<()> {
    sql.push(' ');
    if ds.opts.select.is_empty() {
        sql.push('*');
        return Ok(());
    }
    for (i, expr) in ds.opts.select.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push_str(&ds.dialect().expr_sql(expr)?);
    }
    Ok(())
}

fn from_clause(ds: &Dataset, sql: &mut String) -> SequinResult<()> {
    if ds.opts.from.is_empty() {
        return Ok(());
    }
    sql.push_str(" FROM ");
    for (i, table) in ds.opts.from.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push_str(&ds.dialect().quote_identifier(table));
    }
    Ok(())
}

fn join_clause(ds: &Dataset, sql: &mut String) -> SequinResult<()> {
    let dialect = ds.dialect();
    for join in &ds.opts.joins {
        sql.push(' ');
        sql.push_str(join.kind.sql_keyword());
        sql.push(' ');
        sql.push_str(&dialect.quote_identifier(&join.table));
        sql.push_str(" AS ");
        sql.push_str(&dialect.quote_identifier(&join.alias));
        if let Some(on) = &join.on {
            sql.push_str(" ON ");
            sql.push_str(&dialect.expr_sql(on)?);
        }
    }
    Ok(())
}

fn where_clause(ds: &Dataset, sql: &mut String) -> SequinResult<()> {
    if let Some(cond) = &ds.opts.where_clause {
        sql.push_str(" WHERE ");
        sql.push_str(&ds.dialect().expr_sql(cond)?);
    }
    Ok(())
}

fn group_clause(ds: &Dataset, sql: &mut String) -> SequinResult<()> {
    if ds.opts.group.is_empty() {
        return Ok(());
    }
    sql.push_str(" GROUP BY ");
    for (i, expr) in ds.opts.group.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push_str(&ds.dialect().expr_sql(expr)?);
    }
    Ok(())
}

fn having_clause(ds: &Dataset, sql: &mut String) -> SequinResult<()> {
    if let Some(cond) = &ds.opts.having {
        sql.push_str(" HAVING ");
        sql.push_str(&ds.dialect().expr_sql(cond)?);
    }
    Ok(())
}

fn compounds_clause(ds: &Dataset, sql: &mut String) -> SequinResult<()> {
    for (kind, other) in &ds.opts.compounds {
        sql.push(' ');
        sql.push_str(CompoundKind::sql_keyword(*kind));
        sql.push(' ');
        sql.push_str(&select_sql(other)?);
    }
    Ok(())
}

fn order_clause(ds: &Dataset, sql: &mut String) -> SequinResult<()> {
    if ds.opts.order.is_empty() {
        return Ok(());
    }
    sql.push_str(" ORDER BY ");
    for (i, expr) in ds.opts.order.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push_str(&ds.dialect().expr_sql(expr)?);
    }
    Ok(())
}

fn limit_clause(ds: &Dataset, sql: &mut String) -> SequinResult<()> {
    if let Some(n) = ds.opts.limit {
        sql.push_str(&format!(" LIMIT {n}"));
    }
    if let Some(n) = ds.opts.offset {
        sql.push_str(&format!(" OFFSET {n}"));
    }
    Ok(())
}

fn lock_clause(ds: &Dataset, sql: &mut String) -> SequinResult<()> {
    let Some(mode) = ds.opts.lock else {
        return Ok(());
    };
    if !ds.dialect().capabilities().lock_modes {
        return Err(SequinError::query(format!(
            "{} does not support row locking",
            ds.dialect().name()
        )));
    }
    match mode {
        LockMode::Update => sql.push_str(" FOR UPDATE"),
        LockMode::Share => sql.push_str(" FOR SHARE"),
    }
    Ok(())
}

// ==================== INSERT clauses ====================

fn insert_intro_clause(ds: &Dataset, sql: &mut String) -> SequinResult<()> {
    let table = primary_table(ds)?;
    if ds.opts.replace {
        sql.push_str("REPLACE INTO ");
    } else if ds.opts.insert_ignore {
        sql.push_str("INSERT IGNORE INTO ");
    } else {
        sql.push_str("INSERT INTO ");
    }
    sql.push_str(&ds.dialect().quote_identifier(table));
    Ok(())
}

fn insert_column_names(ds: &Dataset) -> Vec<&str> {
    if !ds.opts.insert_rows.is_empty() {
        ds.opts.insert_columns.iter().map(String::as_str).collect()
    } else {
        ds.opts.assignments.iter().map(|(c, _)| c.as_str()).collect()
    }
}

fn insert_columns_clause(ds: &Dataset, sql: &mut String) -> SequinResult<()> {
    let columns = insert_column_names(ds);
    if columns.is_empty() {
        return Ok(());
    }
    sql.push_str(" (");
    for (i, col) in columns.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push_str(&ds.dialect().quote_identifier(col));
    }
    sql.push(')');
    Ok(())
}

fn insert_values_clause(ds: &Dataset, sql: &mut String) -> SequinResult<()> {
    let dialect = ds.dialect();
    if !ds.opts.insert_rows.is_empty() {
        sql.push_str(" VALUES ");
        for (i, row) in ds.opts.insert_rows.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('(');
            for (j, value) in row.iter().enumerate() {
                if j > 0 {
                    sql.push_str(", ");
                }
                sql.push_str(&dialect.literal(value)?);
            }
            sql.push(')');
        }
    } else if !ds.opts.assignments.is_empty() {
        sql.push_str(" VALUES (");
        for (i, (_, expr)) in ds.opts.assignments.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&dialect.expr_sql(expr)?);
        }
        sql.push(')');
    } else {
        sql.push_str(" DEFAULT VALUES");
    }
    Ok(())
}

fn on_duplicate_clause(ds: &Dataset, sql: &mut String) -> SequinResult<()> {
    if ds.opts.on_duplicate.is_empty() {
        return Ok(());
    }
    sql.push_str(" ON DUPLICATE KEY UPDATE ");
    for (i, col) in ds.opts.on_duplicate.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        let quoted = ds.dialect().quote_identifier(col);
        sql.push_str(&format!("{quoted} = VALUES({quoted})"));
    }
    Ok(())
}

// ==================== UPDATE clauses ====================

fn update_intro_clause(ds: &Dataset, sql: &mut String) -> SequinResult<()> {
    let table = primary_table(ds)?;
    sql.push_str("UPDATE ");
    sql.push_str(&ds.dialect().quote_identifier(table));
    Ok(())
}

fn update_set_clause(ds: &Dataset, sql: &mut String) -> SequinResult<()> {
    if ds.opts.assignments.is_empty() {
        return Err(SequinError::query("UPDATE requires SET assignments"));
    }
    sql.push_str(" SET ");
    for (i, (col, expr)) in ds.opts.assignments.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push_str(&ds.dialect().quote_identifier(col));
        sql.push_str(" = ");
        sql.push_str(&ds.dialect().expr_sql(expr)?);
    }
    Ok(())
}

// ==================== DELETE clauses ====================

fn delete_intro_clause(ds: &Dataset, sql: &mut String) -> SequinResult<()> {
    let table = primary_table(ds)?;
    if ds.opts.where_clause.is_none() && !ds.opts.allow_delete_all {
        return Err(SequinError::query(
            "DELETE without WHERE requires allow_delete_all",
        ));
    }
    sql.push_str("DELETE FROM ");
    sql.push_str(&ds.dialect().quote_identifier(table));
    Ok(())
}
