//! Built-in dialect descriptors.
//!
//! Each is a plain [`DialectSpec`] value; anything not overridden falls back
//! to the ANSI baseline from `DialectSpec::default()`.

use super::{
    BlobStyle, Capabilities, ConcatStyle, Dialect, DialectSpec, Fold, IlikeStyle, StringEscape,
    TwoPhaseStyle,
};
use crate::dataset::{Dataset, LockMode, StatementKind};
use crate::error::{SequinError, SequinResult};

/// The ANSI baseline dialect: upcase-in/downcase-out identifier folding,
/// quote-doubled strings, `~` regexp, `||` concatenation. Carries no
/// savepoint or two-phase support, which makes it the dialect that exercises
/// the transaction engine's FIFO queueing path.
pub fn ansi() -> Dialect {
    Dialect::new(DialectSpec::default())
}

/// PostgreSQL: pass-through identifiers, native ILIKE, `~` regexp,
/// savepoints, and `PREPARE TRANSACTION` two-phase commit.
pub fn postgres() -> Dialect {
    Dialect::new(DialectSpec {
        name: "postgres",
        fold_input: Fold::None,
        fold_output: Fold::None,
        blob_style: BlobStyle::PostgresHex,
        regexp_ops: Some(("~", "!~")),
        ilike: IlikeStyle::Native,
        temporal_keywords: false,
        capabilities: Capabilities {
            savepoints: true,
            isolation: true,
            two_phase: TwoPhaseStyle::PreparedTransaction,
            full_join: true,
            insert_ignore: false,
            on_duplicate_key: false,
            replace_into: false,
            lock_modes: true,
        },
        ..DialectSpec::default()
    })
}

/// MySQL: backtick quoting, backslash escapes, `REGEXP`, `CONCAT(...)`,
/// XA two-phase commit, INSERT IGNORE / ON DUPLICATE KEY UPDATE / REPLACE,
/// and `LOCK IN SHARE MODE` in place of `FOR SHARE`.
pub fn mysql() -> Dialect {
    let mut spec = DialectSpec {
        name: "mysql",
        quote_char: '`',
        fold_input: Fold::None,
        fold_output: Fold::None,
        boolean_tokens: ("1", "0"),
        string_escape: StringEscape::Backslash,
        temporal_keywords: false,
        blob_style: BlobStyle::HexString,
        regexp_ops: Some(("REGEXP", "NOT REGEXP")),
        concat: ConcatStyle::Function("CONCAT"),
        ilike: IlikeStyle::CaseInsensitiveLike,
        capabilities: Capabilities {
            savepoints: true,
            isolation: true,
            two_phase: TwoPhaseStyle::Xa,
            full_join: false,
            insert_ignore: true,
            on_duplicate_key: true,
            replace_into: true,
            lock_modes: true,
        },
        ..DialectSpec::default()
    };
    spec.clause_overrides
        .insert((StatementKind::Select, "lock"), mysql_lock_clause);
    Dialect::new(spec)
}

/// SQLite: pass-through identifiers, `1`/`0` booleans, savepoints but no
/// isolation levels, no row locks and no two-phase commit.
pub fn sqlite() -> Dialect {
    let mut spec = DialectSpec {
        name: "sqlite",
        fold_input: Fold::None,
        fold_output: Fold::None,
        boolean_tokens: ("1", "0"),
        temporal_keywords: false,
        regexp_ops: Some(("REGEXP", "NOT REGEXP")),
        capabilities: Capabilities {
            savepoints: true,
            isolation: false,
            two_phase: TwoPhaseStyle::Unsupported,
            full_join: false,
            insert_ignore: false,
            on_duplicate_key: false,
            replace_into: true,
            lock_modes: false,
        },
        ..DialectSpec::default()
    };
    spec.clause_overrides
        .insert((StatementKind::Select, "lock"), sqlite_lock_clause);
    Dialect::new(spec)
}

fn mysql_lock_clause(ds: &Dataset, sql: &mut String) -> SequinResult<()> {
    match ds.lock_mode() {
        Some(LockMode::Update) => sql.push_str(" FOR UPDATE"),
        Some(LockMode::Share) => sql.push_str(" LOCK IN SHARE MODE"),
        None => {}
    }
    Ok(())
}

fn sqlite_lock_clause(ds: &Dataset, _sql: &mut String) -> SequinResult<()> {
    if ds.lock_mode().is_some() {
        return Err(SequinError::query("sqlite does not support row locking"));
    }
    Ok(())
}
