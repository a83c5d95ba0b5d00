//! Per-database dialect descriptors.
//!
//! A [`Dialect`] is a value describing everything that differs between
//! target databases: identifier quote style and case folding, boolean and
//! temporal literal tokens, string escaping, operator tokens for the
//! LIKE/REGEXP/concat families, transaction capabilities and SQL, and an
//! override table for individual clause renderers in the statement pipeline.
//!
//! Dialects are plain descriptors selected through a [`DialectRegistry`] —
//! no inheritance chains and no global mutable state. The built-in
//! descriptors live in [`builtin`].

mod builtin;
mod literal;

pub use builtin::{ansi, mysql, postgres, sqlite};

use crate::dataset::{Dataset, StatementKind};
use crate::error::SequinResult;
use crate::transaction::{Isolation, TransactionOptions};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A clause renderer in the statement pipeline.
///
/// Appends one clause's SQL fragment (including its leading space) to `sql`.
pub type ClauseFn = fn(&Dataset, &mut String) -> SequinResult<()>;

/// How string literals are escaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringEscape {
    /// ANSI: double embedded single quotes (`''`)
    QuoteDoubling,
    /// MySQL: backslash-escape quotes, backslashes and control characters
    Backslash,
}

/// Identifier case folding applied on the way in or out of the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fold {
    /// Fold to uppercase (ANSI default going in)
    Upper,
    /// Fold to lowercase (ANSI default coming out)
    Lower,
    /// Pass through unchanged
    None,
}

impl Fold {
    fn apply(self, s: &str) -> String {
        match self {
            Fold::Upper => s.to_uppercase(),
            Fold::Lower => s.to_lowercase(),
            Fold::None => s.to_string(),
        }
    }
}

/// How string concatenation renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcatStyle {
    /// Infix operator, e.g. `a || b`
    Infix(&'static str),
    /// Function call, e.g. `CONCAT(a, b)`
    Function(&'static str),
}

/// How case-insensitive LIKE renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IlikeStyle {
    /// Native operator (Postgres `ILIKE`)
    Native,
    /// Plain LIKE is already case-insensitive (MySQL default collations)
    CaseInsensitiveLike,
    /// Wrap both sides in `UPPER()`
    UpperFallback,
}

/// How binary blobs render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobStyle {
    /// `X'DEADBEEF'`
    HexString,
    /// Postgres `'\xDEADBEEF'`
    PostgresHex,
}

/// Two-phase-commit flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwoPhaseStyle {
    /// Prepared transactions are not available
    Unsupported,
    /// `PREPARE TRANSACTION` / `COMMIT PREPARED` (Postgres)
    PreparedTransaction,
    /// `XA START` / `XA END` / `XA PREPARE` (MySQL)
    Xa,
}

/// Transactional and syntactic capability flags.
#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    /// SAVEPOINT / RELEASE SAVEPOINT / ROLLBACK TO SAVEPOINT
    pub savepoints: bool,
    /// SET TRANSACTION ISOLATION LEVEL
    pub isolation: bool,
    /// Prepared (two-phase) transactions
    pub two_phase: TwoPhaseStyle,
    /// FULL OUTER JOIN
    pub full_join: bool,
    /// INSERT IGNORE
    pub insert_ignore: bool,
    /// ON DUPLICATE KEY UPDATE
    pub on_duplicate_key: bool,
    /// REPLACE INTO
    pub replace_into: bool,
    /// FOR UPDATE / FOR SHARE row locks
    pub lock_modes: bool,
}

/// The full dialect description. Construct one of these (usually starting
/// from [`DialectSpec::default`], which is the ANSI baseline) and wrap it
/// in a [`Dialect`].
#[derive(Clone)]
pub struct DialectSpec {
    /// Registry key and log label
    pub name: &'static str,
    /// Identifier quote character
    pub quote_char: char,
    /// Case folding for identifiers entering the database
    pub fold_input: Fold,
    /// Case folding for identifiers coming back out
    pub fold_output: Fold,
    /// Boolean literal tokens (true, false)
    pub boolean_tokens: (&'static str, &'static str),
    /// String literal escaping rule
    pub string_escape: StringEscape,
    /// Prefix temporal literals with DATE/TIME/TIMESTAMP keywords
    pub temporal_keywords: bool,
    /// Blob literal style
    pub blob_style: BlobStyle,
    /// Regexp operator tokens (positive, negated)
    pub regexp_ops: Option<(&'static str, &'static str)>,
    /// Concatenation style
    pub concat: ConcatStyle,
    /// Case-insensitive LIKE style
    pub ilike: IlikeStyle,
    /// Capability flags
    pub capabilities: Capabilities,
    /// Per-statement clause renderer overrides
    pub clause_overrides: HashMap<(StatementKind, &'static str), ClauseFn>,
    /// Per-statement clause order overrides
    pub clause_orders: HashMap<StatementKind, Vec<&'static str>>,
}

impl fmt::Debug for DialectSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialectSpec")
            .field("name", &self.name)
            .field("quote_char", &self.quote_char)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

impl Default for DialectSpec {
    /// The ANSI baseline: double-quoted identifiers folded to uppercase on
    /// input and lowercase on output, quote-doubled strings, `~` regexp,
    /// `||` concatenation, no savepoints and no two-phase commit.
    fn default() -> Self {
        Self {
            name: "ansi",
            quote_char: '"',
            fold_input: Fold::Upper,
            fold_output: Fold::Lower,
            boolean_tokens: ("TRUE", "FALSE"),
            string_escape: StringEscape::QuoteDoubling,
            temporal_keywords: true,
            blob_style: BlobStyle::HexString,
            regexp_ops: Some(("~", "!~")),
            concat: ConcatStyle::Infix("||"),
            ilike: IlikeStyle::UpperFallback,
            capabilities: Capabilities {
                savepoints: false,
                isolation: true,
                two_phase: TwoPhaseStyle::Unsupported,
                full_join: true,
                insert_ignore: false,
                on_duplicate_key: false,
                replace_into: false,
                lock_modes: true,
            },
            clause_overrides: HashMap::new(),
            clause_orders: HashMap::new(),
        }
    }
}

/// A shared, immutable dialect handle.
#[derive(Debug, Clone)]
pub struct Dialect(Arc<DialectSpec>);

impl Dialect {
    /// Wrap a spec in a shareable handle.
    pub fn new(spec: DialectSpec) -> Self {
        Dialect(Arc::new(spec))
    }

    /// Registry key / log label.
    pub fn name(&self) -> &'static str {
        self.0.name
    }

    /// Capability flags.
    pub fn capabilities(&self) -> &Capabilities {
        &self.0.capabilities
    }

    pub(crate) fn spec(&self) -> &DialectSpec {
        &self.0
    }

    /// Quote an identifier, applying input case folding first.
    ///
    /// Names containing a dot are treated as `table.column` pairs.
    pub fn quote_identifier(&self, name: &str) -> String {
        if let Some((table, column)) = name.split_once('.') {
            return self.quote_qualified(table, column);
        }
        let q = self.0.quote_char;
        let folded = self.0.fold_input.apply(name);
        let escaped = folded.replace(q, &format!("{q}{q}"));
        format!("{q}{escaped}{q}")
    }

    /// Quote a `table.column` pair.
    pub fn quote_qualified(&self, table: &str, column: &str) -> String {
        if column == "*" {
            return format!("{}.*", self.quote_identifier(table));
        }
        format!(
            "{}.{}",
            self.quote_identifier(table),
            self.quote_identifier(column)
        )
    }

    /// Fold an identifier coming back from the database (result-set column names).
    pub fn output_identifier(&self, name: &str) -> String {
        self.0.fold_output.apply(name)
    }

    /// Clause renderer override for a statement kind, if any.
    pub fn clause_override(&self, kind: StatementKind, clause: &'static str) -> Option<ClauseFn> {
        self.0.clause_overrides.get(&(kind, clause)).copied()
    }

    /// Clause order for a statement kind (dialect override or the fixed default).
    pub fn clause_order(&self, kind: StatementKind) -> &[&'static str] {
        match self.0.clause_orders.get(&kind) {
            Some(order) => order,
            None => crate::dataset::default_clause_order(kind),
        }
    }

    // ==================== transaction SQL ====================

    /// Statements that open a top-level transaction.
    pub fn begin_sql(&self, opts: &TransactionOptions) -> Vec<String> {
        let mut stmts = Vec::new();
        match (&opts.prepare, self.0.capabilities.two_phase) {
            (Some(tag), TwoPhaseStyle::Xa) => {
                stmts.push(format!("XA START '{}'", escape_tag(tag)));
            }
            _ => stmts.push("BEGIN".to_string()),
        }
        if let Some(level) = opts.isolation {
            stmts.push(self.isolation_sql(level));
        }
        stmts
    }

    /// Statements that commit a top-level transaction (or prepare it, when a
    /// two-phase tag was given).
    pub fn commit_sql(&self, opts: &TransactionOptions) -> Vec<String> {
        match (&opts.prepare, self.0.capabilities.two_phase) {
            (Some(tag), TwoPhaseStyle::PreparedTransaction) => {
                vec![format!("PREPARE TRANSACTION '{}'", escape_tag(tag))]
            }
            (Some(tag), TwoPhaseStyle::Xa) => {
                let tag = escape_tag(tag);
                vec![format!("XA END '{tag}'"), format!("XA PREPARE '{tag}'")]
            }
            _ => vec!["COMMIT".to_string()],
        }
    }

    /// Statements that roll back a top-level transaction, including the XA
    /// unwind sequence for an aborted prepared scope.
    pub fn rollback_sql(&self, opts: &TransactionOptions) -> Vec<String> {
        match (&opts.prepare, self.0.capabilities.two_phase) {
            (Some(tag), TwoPhaseStyle::Xa) => {
                let tag = escape_tag(tag);
                vec![
                    format!("XA END '{tag}'"),
                    format!("XA PREPARE '{tag}'"),
                    format!("XA ROLLBACK '{tag}'"),
                ]
            }
            _ => vec!["ROLLBACK".to_string()],
        }
    }

    /// `SAVEPOINT name`
    pub fn savepoint_sql(&self, name: &str) -> String {
        format!("SAVEPOINT {name}")
    }

    /// `RELEASE SAVEPOINT name`
    pub fn release_savepoint_sql(&self, name: &str) -> String {
        format!("RELEASE SAVEPOINT {name}")
    }

    /// `ROLLBACK TO SAVEPOINT name`
    pub fn rollback_savepoint_sql(&self, name: &str) -> String {
        format!("ROLLBACK TO SAVEPOINT {name}")
    }

    /// Finalize a previously prepared transaction.
    pub fn commit_prepared_sql(&self, tag: &str) -> Option<String> {
        let tag = escape_tag(tag);
        match self.0.capabilities.two_phase {
            TwoPhaseStyle::PreparedTransaction => Some(format!("COMMIT PREPARED '{tag}'")),
            TwoPhaseStyle::Xa => Some(format!("XA COMMIT '{tag}'")),
            TwoPhaseStyle::Unsupported => None,
        }
    }

    /// Abort a previously prepared transaction.
    pub fn rollback_prepared_sql(&self, tag: &str) -> Option<String> {
        let tag = escape_tag(tag);
        match self.0.capabilities.two_phase {
            TwoPhaseStyle::PreparedTransaction => Some(format!("ROLLBACK PREPARED '{tag}'")),
            TwoPhaseStyle::Xa => Some(format!("XA ROLLBACK '{tag}'")),
            TwoPhaseStyle::Unsupported => None,
        }
    }

    /// `SET TRANSACTION ISOLATION LEVEL {level}`
    pub fn isolation_sql(&self, level: Isolation) -> String {
        format!("SET TRANSACTION ISOLATION LEVEL {}", level.sql_keywords())
    }
}

fn escape_tag(tag: &str) -> String {
    tag.replace('\'', "''")
}

/// Explicit dialect lookup table, passed at `Database` construction.
///
/// Replaces a string-keyed global adapter registry: callers build one,
/// register what they need, and hand it (or a dialect pulled from it) to the
/// connection layer.
#[derive(Debug, Default)]
pub struct DialectRegistry {
    dialects: HashMap<&'static str, Dialect>,
}

impl DialectRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the built-in dialects.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for dialect in [ansi(), postgres(), mysql(), sqlite()] {
            registry.register(dialect);
        }
        registry
    }

    /// Register a dialect under its name, replacing any previous entry.
    pub fn register(&mut self, dialect: Dialect) {
        self.dialects.insert(dialect.name(), dialect);
    }

    /// Look up a dialect by registry key.
    pub fn get(&self, name: &str) -> Option<Dialect> {
        self.dialects.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ansi_folds_identifiers_upper_in_lower_out() {
        let d = ansi();
        assert_eq!(d.quote_identifier("items"), "\"ITEMS\"");
        assert_eq!(d.output_identifier("NAME"), "name");
    }

    #[test]
    fn postgres_passes_identifiers_through() {
        let d = postgres();
        assert_eq!(d.quote_identifier("Items"), "\"Items\"");
        assert_eq!(d.output_identifier("Name"), "Name");
    }

    #[test]
    fn mysql_uses_backtick_quotes() {
        let d = mysql();
        assert_eq!(d.quote_identifier("order"), "`order`");
        assert_eq!(d.quote_qualified("t", "c"), "`t`.`c`");
    }

    #[test]
    fn dotted_name_becomes_qualified() {
        let d = postgres();
        assert_eq!(d.quote_identifier("users.id"), "\"users\".\"id\"");
    }

    #[test]
    fn embedded_quote_is_doubled() {
        let d = postgres();
        assert_eq!(d.quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn registry_lookup() {
        let registry = DialectRegistry::with_builtins();
        assert!(registry.get("mysql").is_some());
        assert!(registry.get("oracle").is_none());
    }

    #[test]
    fn xa_rollback_unwind_sequence() {
        let opts = TransactionOptions::new().prepare("xid1");
        let stmts = mysql().rollback_sql(&opts);
        assert_eq!(
            stmts,
            vec!["XA END 'xid1'", "XA PREPARE 'xid1'", "XA ROLLBACK 'xid1'"]
        );
    }

    #[test]
    fn postgres_prepare_replaces_commit() {
        let opts = TransactionOptions::new().prepare("xid1");
        assert_eq!(
            postgres().commit_sql(&opts),
            vec!["PREPARE TRANSACTION 'xid1'"]
        );
    }
}
