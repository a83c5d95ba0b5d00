//! Filter-argument conversion for `Dataset::filter` and friends.

use crate::error::{SequinError, SequinResult};
use crate::expr::{BoolOp, Expr};
use crate::value::Value;

/// The right-hand side of a `(column, operand)` filter pair.
///
/// A plain [`Operand::Value`] is interpreted by shape: arrays render as
/// `IN (...)`, `Value::Null` renders as `IS NULL`, everything else as
/// equality. The explicit variants pick the comparison outright.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Value(Value),
    Ne(Value),
    Gt(Value),
    Ge(Value),
    Lt(Value),
    Le(Value),
    In(Vec<Value>),
    NotIn(Vec<Value>),
    Like(String),
    NotLike(String),
    ILike(String),
    Regexp(String),
    Between(Value, Value),
    NotBetween(Value, Value),
    IsNull,
    IsNotNull,
}

impl Operand {
    /// Wrap any value-convertible type as a shape-interpreted operand.
    pub fn val(v: impl Into<Value>) -> Self {
        Operand::Value(v.into())
    }
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Value(v)
    }
}

macro_rules! operand_from_value {
    ($($ty:ty),+ $(,)?) => {
        $(impl From<$ty> for Operand {
            fn from(v: $ty) -> Self {
                Operand::Value(v.into())
            }
        })+
    };
}

operand_from_value!(bool, i32, i64, u32, f64, &str, String);

impl<T: Into<Value>> From<Vec<T>> for Operand {
    fn from(items: Vec<T>) -> Self {
        Operand::Value(Value::array(items))
    }
}

impl<T> From<Option<T>> for Operand
where
    T: Into<Value>,
{
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => Operand::Value(v.into()),
            None => Operand::Value(Value::Null),
        }
    }
}

/// Anything `filter`/`exclude`/`having` accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterArg {
    Expr(Expr),
    Pairs(Vec<(String, Operand)>),
}

impl From<Expr> for FilterArg {
    fn from(e: Expr) -> Self {
        FilterArg::Expr(e)
    }
}

impl<S, V> From<(S, V)> for FilterArg
where
    S: Into<String>,
    V: Into<Operand>,
{
    fn from((col, op): (S, V)) -> Self {
        FilterArg::Pairs(vec![(col.into(), op.into())])
    }
}

impl<S, V> From<Vec<(S, V)>> for FilterArg
where
    S: Into<String>,
    V: Into<Operand>,
{
    fn from(pairs: Vec<(S, V)>) -> Self {
        FilterArg::Pairs(
            pairs
                .into_iter()
                .map(|(col, op)| (col.into(), op.into()))
                .collect(),
        )
    }
}

impl FilterArg {
    /// Lower the argument into a boolean expression. Pair lists AND-fold in
    /// order; repeated columns each contribute their own condition.
    pub(crate) fn into_expr(self) -> SequinResult<Expr> {
        match self {
            FilterArg::Expr(e) => Ok(e),
            FilterArg::Pairs(pairs) => {
                let mut pairs = pairs.into_iter();
                let (col, op) = pairs
                    .next()
                    .ok_or_else(|| SequinError::expression("empty filter condition"))?;
                let mut combined = pair_expr(col, op);
                for (col, op) in pairs {
                    combined = combined.and(pair_expr(col, op));
                }
                Ok(combined)
            }
        }
    }
}

fn pair_expr(column: String, op: Operand) -> Expr {
    match op {
        Operand::Value(Value::Array(items)) => Expr::Boolean {
            op: BoolOp::In,
            args: vec![
                Expr::column(column),
                Expr::Literal(Value::Array(items)),
            ],
        },
        Operand::Value(Value::Null) => Expr::is_null(column),
        Operand::Value(v) => Expr::eq(column, v),
        Operand::Ne(v) => Expr::ne(column, v),
        Operand::Gt(v) => Expr::gt(column, v),
        Operand::Ge(v) => Expr::ge(column, v),
        Operand::Lt(v) => Expr::lt(column, v),
        Operand::Le(v) => Expr::le(column, v),
        Operand::In(items) => Expr::in_list(column, items),
        Operand::NotIn(items) => Expr::not_in(column, items),
        Operand::Like(pat) => Expr::like(column, pat),
        Operand::NotLike(pat) => Expr::not_like(column, pat),
        Operand::ILike(pat) => Expr::ilike(column, pat),
        Operand::Regexp(pat) => Expr::regexp(column, pat),
        Operand::Between(lo, hi) => Expr::between(column, lo, hi),
        Operand::NotBetween(lo, hi) => Expr::not_between(column, lo, hi),
        Operand::IsNull => Expr::is_null(column),
        Operand::IsNotNull => Expr::is_not_null(column),
    }
}

/// Turn a `{token}`-placeholder fragment into a positional raw expression.
///
/// Every token must appear in `args`; a token may be reused. Unterminated
/// braces are rejected.
pub(super) fn named_fragment(fragment: &str, args: &[(&str, Value)]) -> SequinResult<Expr> {
    let mut sql = String::with_capacity(fragment.len());
    let mut positional = Vec::new();
    let mut chars = fragment.chars();
    while let Some(ch) = chars.next() {
        if ch != '{' {
            sql.push(ch);
            continue;
        }
        let mut name = String::new();
        loop {
            match chars.next() {
                Some('}') => break,
                Some(c) => name.push(c),
                None => {
                    return Err(SequinError::expression(format!(
                        "unterminated placeholder in fragment: {fragment}"
                    )))
                }
            }
        }
        let value = args
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| {
                SequinError::expression(format!("missing value for placeholder {{{name}}}"))
            })?;
        sql.push('?');
        positional.push(value);
    }
    Expr::raw(&sql, positional)
}
