//! Immutable expression trees for conditions and projections.
//!
//! [`Expr`] is the dialect-free AST: identifiers, literals, boolean and
//! comparison trees, LIKE/REGEXP/concat families, function calls, aliases,
//! ordering and CASE expressions. Trees are built by composition and never
//! mutated in place, so a node can be shared between datasets freely.
//!
//! Rendering to SQL text is a dialect concern; see [`crate::dialect::Dialect::expr_sql`].

use crate::dataset::Dataset;
use crate::error::{SequinError, SequinResult};
use crate::value::Value;

/// Boolean and comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoolOp {
    /// n-ary conjunction
    And,
    /// n-ary disjunction
    Or,
    /// unary negation
    Not,
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `IS` (NULL-safe)
    Is,
    /// `IS NOT`
    IsNot,
    /// `IN (list or subquery)`
    In,
    /// `NOT IN`
    NotIn,
    /// `BETWEEN a AND b` (three args)
    Between,
    /// `NOT BETWEEN a AND b`
    NotBetween,
}

/// Operators whose SQL token or shape varies per dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComplexOp {
    /// Pattern match
    Like,
    /// Negated pattern match
    NotLike,
    /// Case-insensitive pattern match
    ILike,
    /// Negated case-insensitive pattern match
    NotILike,
    /// Regular-expression match
    Regexp,
    /// Negated regular-expression match
    NotRegexp,
    /// String concatenation (n-ary)
    Concat,
}

/// NULL ordering policy for ORDER BY expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    /// `NULLS FIRST`
    First,
    /// `NULLS LAST`
    Last,
}

/// A dialect-free expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Unqualified identifier (column or table name)
    Identifier(String),
    /// `table.column`
    Qualified { table: String, column: String },
    /// Literal value
    Literal(Value),
    /// Boolean/comparison tree
    Boolean { op: BoolOp, args: Vec<Expr> },
    /// Dialect-resolved operator family (LIKE/REGEXP/concat)
    Complex { op: ComplexOp, args: Vec<Expr> },
    /// Function call
    Function { name: String, args: Vec<Expr> },
    /// `inner AS alias`
    Aliased { inner: Box<Expr>, alias: String },
    /// Ordering wrapper for ORDER BY
    Ordered {
        inner: Box<Expr>,
        descending: bool,
        nulls: Option<NullsOrder>,
    },
    /// `CASE WHEN ... THEN ... ELSE ... END`
    Case {
        branches: Vec<(Expr, Expr)>,
        else_value: Option<Box<Expr>>,
    },
    /// Parenthesized subquery
    Subquery(Box<Dataset>),
    /// Raw SQL fragment with positional `?` placeholders.
    ///
    /// Placeholder count is validated against `args` at construction; values
    /// are literalized at render time, never spliced unescaped.
    Raw { sql: String, args: Vec<Value> },
}

impl Expr {
    /// Unqualified column reference.
    pub fn column(name: impl Into<String>) -> Self {
        Expr::Identifier(name.into())
    }

    /// Qualified `table.column` reference.
    pub fn qualified(table: impl Into<String>, column: impl Into<String>) -> Self {
        Expr::Qualified {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Literal value.
    pub fn val(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    /// Function call: `name(args...)`.
    pub fn function(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Function {
            name: name.into(),
            args,
        }
    }

    /// Raw SQL fragment with positional `?` placeholders.
    ///
    /// A `?` inside a single-quoted string literal is plain text, not a
    /// placeholder. Fails fast with [`SequinError::Expression`] if the
    /// placeholder count does not match the argument count.
    pub fn raw(sql: impl Into<String>, args: Vec<Value>) -> SequinResult<Self> {
        let sql = sql.into();
        let holes = count_placeholders(&sql);
        if holes != args.len() {
            return Err(SequinError::expression(format!(
                "placeholder mismatch: {} `?` markers but {} values",
                holes,
                args.len()
            )));
        }
        Ok(Expr::Raw { sql, args })
    }

    // ==================== comparisons ====================

    /// `column = value`
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::binary(BoolOp::Eq, column, value)
    }

    /// `column != value`
    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::binary(BoolOp::Ne, column, value)
    }

    /// `column > value`
    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::binary(BoolOp::Gt, column, value)
    }

    /// `column >= value`
    pub fn ge(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::binary(BoolOp::Ge, column, value)
    }

    /// `column < value`
    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::binary(BoolOp::Lt, column, value)
    }

    /// `column <= value`
    pub fn le(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::binary(BoolOp::Le, column, value)
    }

    /// `column IS NULL`
    pub fn is_null(column: impl Into<String>) -> Self {
        Expr::Boolean {
            op: BoolOp::Is,
            args: vec![Expr::column(column), Expr::Literal(Value::Null)],
        }
    }

    /// `column IS NOT NULL`
    pub fn is_not_null(column: impl Into<String>) -> Self {
        Expr::Boolean {
            op: BoolOp::IsNot,
            args: vec![Expr::column(column), Expr::Literal(Value::Null)],
        }
    }

    /// `column IN (values...)`
    pub fn in_list<T: Into<Value>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        Expr::Boolean {
            op: BoolOp::In,
            args: vec![
                Expr::column(column),
                Expr::Literal(Value::array(values)),
            ],
        }
    }

    /// `column NOT IN (values...)`
    pub fn not_in<T: Into<Value>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        Expr::Boolean {
            op: BoolOp::NotIn,
            args: vec![
                Expr::column(column),
                Expr::Literal(Value::array(values)),
            ],
        }
    }

    /// `column IN (subquery)`
    pub fn in_dataset(column: impl Into<String>, ds: Dataset) -> Self {
        Expr::Boolean {
            op: BoolOp::In,
            args: vec![Expr::column(column), Expr::Subquery(Box::new(ds))],
        }
    }

    /// `column BETWEEN from AND to`
    pub fn between(
        column: impl Into<String>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Self {
        Expr::Boolean {
            op: BoolOp::Between,
            args: vec![
                Expr::column(column),
                Expr::Literal(from.into()),
                Expr::Literal(to.into()),
            ],
        }
    }

    /// `column NOT BETWEEN from AND to`
    pub fn not_between(
        column: impl Into<String>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Self {
        Expr::Boolean {
            op: BoolOp::NotBetween,
            args: vec![
                Expr::column(column),
                Expr::Literal(from.into()),
                Expr::Literal(to.into()),
            ],
        }
    }

    // ==================== dialect-resolved families ====================

    /// `column LIKE pattern`
    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::pattern(ComplexOp::Like, column, pattern)
    }

    /// `column NOT LIKE pattern`
    pub fn not_like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::pattern(ComplexOp::NotLike, column, pattern)
    }

    /// Case-insensitive LIKE; native where supported, `UPPER()` fallback elsewhere.
    pub fn ilike(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::pattern(ComplexOp::ILike, column, pattern)
    }

    /// Regular-expression match; token resolves per dialect (`~` vs `REGEXP`).
    pub fn regexp(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::pattern(ComplexOp::Regexp, column, pattern)
    }

    /// String concatenation of the given expressions.
    pub fn concat(args: Vec<Expr>) -> Self {
        Expr::Complex {
            op: ComplexOp::Concat,
            args,
        }
    }

    // ==================== combinators ====================

    /// Conjunction with another expression.
    pub fn and(self, other: Expr) -> Self {
        match self {
            // Flatten chained ANDs into one n-ary node
            Expr::Boolean {
                op: BoolOp::And,
                mut args,
            } => {
                args.push(other);
                Expr::Boolean {
                    op: BoolOp::And,
                    args,
                }
            }
            first => Expr::Boolean {
                op: BoolOp::And,
                args: vec![first, other],
            },
        }
    }

    /// Disjunction with another expression.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Boolean {
                op: BoolOp::Or,
                mut args,
            } => {
                args.push(other);
                Expr::Boolean {
                    op: BoolOp::Or,
                    args,
                }
            }
            first => Expr::Boolean {
                op: BoolOp::Or,
                args: vec![first, other],
            },
        }
    }

    /// Negation of this expression.
    pub fn negate(self) -> Self {
        Expr::Boolean {
            op: BoolOp::Not,
            args: vec![self],
        }
    }

    /// `self AS alias`
    pub fn alias(self, alias: impl Into<String>) -> Self {
        Expr::Aliased {
            inner: Box::new(self),
            alias: alias.into(),
        }
    }

    /// Ascending ordering wrapper.
    pub fn asc(self) -> Self {
        Expr::Ordered {
            inner: Box::new(self),
            descending: false,
            nulls: None,
        }
    }

    /// Descending ordering wrapper.
    pub fn desc(self) -> Self {
        Expr::Ordered {
            inner: Box::new(self),
            descending: true,
            nulls: None,
        }
    }

    /// Attach a NULLS FIRST/LAST policy to an ordering wrapper.
    pub fn nulls(self, policy: NullsOrder) -> Self {
        match self {
            Expr::Ordered {
                inner, descending, ..
            } => Expr::Ordered {
                inner,
                descending,
                nulls: Some(policy),
            },
            other => Expr::Ordered {
                inner: Box::new(other),
                descending: false,
                nulls: Some(policy),
            },
        }
    }

    /// CASE expression. Fails fast if no branches are given.
    pub fn case(branches: Vec<(Expr, Expr)>, else_value: Option<Expr>) -> SequinResult<Self> {
        if branches.is_empty() {
            return Err(SequinError::expression("CASE requires at least one WHEN branch"));
        }
        Ok(Expr::Case {
            branches,
            else_value: else_value.map(Box::new),
        })
    }

    fn binary(op: BoolOp, column: impl Into<String>, value: impl Into<Value>) -> Self {
        Expr::Boolean {
            op,
            args: vec![Expr::column(column), Expr::Literal(value.into())],
        }
    }

    fn pattern(op: ComplexOp, column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Expr::Complex {
            op,
            args: vec![
                Expr::column(column),
                Expr::Literal(Value::Text(pattern.into())),
            ],
        }
    }
}

/// Count `?` markers outside single-quoted string literals. A doubled quote
/// (`''`) inside a literal toggles the state twice and stays in-string.
fn count_placeholders(sql: &str) -> usize {
    let mut holes = 0;
    let mut in_string = false;
    for c in sql.chars() {
        match c {
            '\'' => in_string = !in_string,
            '?' if !in_string => holes += 1,
            _ => {}
        }
    }
    holes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_flattens() {
        let e = Expr::eq("a", 1).and(Expr::eq("b", 2)).and(Expr::eq("c", 3));
        match e {
            Expr::Boolean { op: BoolOp::And, args } => assert_eq!(args.len(), 3),
            other => panic!("expected AND node, got {other:?}"),
        }
    }

    #[test]
    fn raw_placeholder_mismatch_fails_fast() {
        let err = Expr::raw("a = ? AND b = ?", vec![Value::Int(1)]).unwrap_err();
        assert!(err.is_build_error());
    }

    #[test]
    fn raw_ignores_question_marks_inside_string_literals() {
        // only the bare `?` is a placeholder
        assert!(Expr::raw("a = '?' AND b = ?", vec![Value::Int(1)]).is_ok());
        // a doubled quote does not end the literal
        assert!(Expr::raw("a = 'it''s ?' AND b = ?", vec![Value::Int(1)]).is_ok());
        assert!(Expr::raw("a = '?'", vec![Value::Int(1)]).unwrap_err().is_build_error());
    }

    #[test]
    fn empty_case_fails_fast() {
        let err = Expr::case(vec![], Some(Expr::val(0))).unwrap_err();
        assert!(matches!(err, SequinError::Expression(_)));
    }

    #[test]
    fn composition_does_not_mutate_source() {
        let base = Expr::eq("a", 1);
        let _combined = base.clone().and(Expr::eq("b", 2));
        assert_eq!(base, Expr::eq("a", 1));
    }
}
