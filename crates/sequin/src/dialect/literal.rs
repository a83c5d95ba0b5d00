//! Literalization: dialect-correct SQL text for values and expression trees.
//!
//! Everything funnels through [`Dialect::literal`] and [`Dialect::expr_sql`];
//! no value ever reaches a statement string without passing its dialect's
//! escaping rule.

use super::{BlobStyle, ConcatStyle, Dialect, IlikeStyle, StringEscape};
use crate::dataset;
use crate::error::{SequinError, SequinResult};
use crate::expr::{BoolOp, ComplexOp, Expr, NullsOrder};
use crate::value::Value;

impl Dialect {
    /// Render a value as a dialect-correct SQL literal.
    pub fn literal(&self, value: &Value) -> SequinResult<String> {
        match value {
            Value::Null => Ok("NULL".to_string()),
            Value::Bool(b) => {
                let (t, f) = self.spec().boolean_tokens;
                Ok(if *b { t } else { f }.to_string())
            }
            Value::Int(n) => Ok(n.to_string()),
            Value::Float(x) => {
                if !x.is_finite() {
                    return Err(SequinError::expression(format!(
                        "non-finite float {x} has no SQL literal"
                    )));
                }
                Ok(x.to_string())
            }
            Value::Decimal(d) => Ok(d.to_string()),
            Value::Text(s) => Ok(self.quote_string(s)),
            Value::Bytes(b) => Ok(self.blob_literal(b)),
            Value::Date(d) => Ok(self.temporal(&d.format("%Y-%m-%d").to_string(), "DATE")),
            Value::Time(t) => Ok(self.temporal(&t.format("%H:%M:%S%.f").to_string(), "TIME")),
            Value::DateTime(dt) => Ok(self.temporal(
                &dt.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
                "TIMESTAMP",
            )),
            Value::Timestamp(ts) => Ok(self.temporal(
                &ts.naive_utc().format("%Y-%m-%d %H:%M:%S%.f").to_string(),
                "TIMESTAMP",
            )),
            Value::Uuid(u) => Ok(self.quote_string(&u.to_string())),
            Value::Json(j) => {
                let text = serde_json::to_string(j)
                    .map_err(|e| SequinError::expression(format!("unserializable JSON: {e}")))?;
                Ok(self.quote_string(&text))
            }
            Value::Array(items) => {
                if items.is_empty() {
                    return Err(SequinError::expression("empty array has no SQL literal"));
                }
                let parts = items
                    .iter()
                    .map(|v| self.literal(v))
                    .collect::<SequinResult<Vec<_>>>()?;
                Ok(format!("({})", parts.join(", ")))
            }
        }
    }

    /// Render an expression tree as dialect-correct SQL.
    ///
    /// All boolean connectives emit explicit grouping, so AND/OR mixing never
    /// depends on operator precedence.
    pub fn expr_sql(&self, expr: &Expr) -> SequinResult<String> {
        match expr {
            Expr::Identifier(name) => Ok(self.quote_identifier(name)),
            Expr::Qualified { table, column } => Ok(self.quote_qualified(table, column)),
            Expr::Literal(value) => self.literal(value),
            Expr::Boolean { op, args } => self.boolean_sql(*op, args),
            Expr::Complex { op, args } => self.complex_sql(*op, args),
            Expr::Function { name, args } => {
                let parts = args
                    .iter()
                    .map(|a| self.expr_sql(a))
                    .collect::<SequinResult<Vec<_>>>()?;
                Ok(format!("{}({})", name, parts.join(", ")))
            }
            Expr::Aliased { inner, alias } => Ok(format!(
                "{} AS {}",
                self.expr_sql(inner)?,
                self.quote_identifier(alias)
            )),
            Expr::Ordered {
                inner,
                descending,
                nulls,
            } => {
                let mut sql = self.expr_sql(inner)?;
                sql.push_str(if *descending { " DESC" } else { " ASC" });
                match nulls {
                    Some(NullsOrder::First) => sql.push_str(" NULLS FIRST"),
                    Some(NullsOrder::Last) => sql.push_str(" NULLS LAST"),
                    None => {}
                }
                Ok(sql)
            }
            Expr::Case {
                branches,
                else_value,
            } => {
                if branches.is_empty() {
                    return Err(SequinError::expression("CASE requires at least one WHEN branch"));
                }
                let mut sql = String::from("(CASE");
                for (cond, result) in branches {
                    sql.push_str(" WHEN ");
                    sql.push_str(&self.expr_sql(cond)?);
                    sql.push_str(" THEN ");
                    sql.push_str(&self.expr_sql(result)?);
                }
                if let Some(e) = else_value {
                    sql.push_str(" ELSE ");
                    sql.push_str(&self.expr_sql(e)?);
                }
                sql.push_str(" END)");
                Ok(sql)
            }
            Expr::Subquery(ds) => Ok(format!("({})", dataset::select_sql(ds)?)),
            Expr::Raw { sql, args } => self.raw_sql(sql, args),
        }
    }

    // ==================== strings & blobs ====================

    fn quote_string(&self, s: &str) -> String {
        match self.spec().string_escape {
            StringEscape::QuoteDoubling => format!("'{}'", s.replace('\'', "''")),
            StringEscape::Backslash => {
                let mut out = String::with_capacity(s.len() + 2);
                out.push('\'');
                for c in s.chars() {
                    match c {
                        '\\' => out.push_str("\\\\"),
                        '\'' => out.push_str("\\'"),
                        '"' => out.push_str("\\\""),
                        '\n' => out.push_str("\\n"),
                        '\r' => out.push_str("\\r"),
                        '\0' => out.push_str("\\0"),
                        '\x1a' => out.push_str("\\Z"),
                        _ => out.push(c),
                    }
                }
                out.push('\'');
                out
            }
        }
    }

    fn blob_literal(&self, bytes: &[u8]) -> String {
        let hex: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
        match self.spec().blob_style {
            BlobStyle::HexString => format!("X'{hex}'"),
            BlobStyle::PostgresHex => format!("'\\x{hex}'"),
        }
    }

    fn temporal(&self, formatted: &str, keyword: &str) -> String {
        if self.spec().temporal_keywords {
            format!("{keyword} '{formatted}'")
        } else {
            format!("'{formatted}'")
        }
    }

    // ==================== boolean trees ====================

    fn boolean_sql(&self, op: BoolOp, args: &[Expr]) -> SequinResult<String> {
        match op {
            BoolOp::And | BoolOp::Or => {
                if args.is_empty() {
                    return Err(SequinError::expression("empty boolean connective"));
                }
                let joiner = if op == BoolOp::And { " AND " } else { " OR " };
                let parts = args
                    .iter()
                    .map(|a| self.grouped(a))
                    .collect::<SequinResult<Vec<_>>>()?;
                Ok(parts.join(joiner))
            }
            BoolOp::Not => {
                let inner = self.exactly_one(op, args)?;
                Ok(format!("NOT ({})", self.expr_sql(inner)?))
            }
            BoolOp::Eq | BoolOp::Ne => {
                let (lhs, rhs) = self.exactly_two(op, args)?;
                // NULL-safe: `= NULL` is never what the caller meant
                if matches!(rhs, Expr::Literal(Value::Null)) {
                    let token = if op == BoolOp::Eq { "IS" } else { "IS NOT" };
                    return Ok(format!("{} {} NULL", self.expr_sql(lhs)?, token));
                }
                let token = if op == BoolOp::Eq { "=" } else { "!=" };
                Ok(format!(
                    "{} {} {}",
                    self.expr_sql(lhs)?,
                    token,
                    self.expr_sql(rhs)?
                ))
            }
            BoolOp::Gt | BoolOp::Ge | BoolOp::Lt | BoolOp::Le => {
                let (lhs, rhs) = self.exactly_two(op, args)?;
                let token = match op {
                    BoolOp::Gt => ">",
                    BoolOp::Ge => ">=",
                    BoolOp::Lt => "<",
                    _ => "<=",
                };
                Ok(format!(
                    "{} {} {}",
                    self.expr_sql(lhs)?,
                    token,
                    self.expr_sql(rhs)?
                ))
            }
            BoolOp::Is | BoolOp::IsNot => {
                let (lhs, rhs) = self.exactly_two(op, args)?;
                let token = if op == BoolOp::Is { "IS" } else { "IS NOT" };
                Ok(format!(
                    "{} {} {}",
                    self.expr_sql(lhs)?,
                    token,
                    self.expr_sql(rhs)?
                ))
            }
            BoolOp::In | BoolOp::NotIn => {
                let (lhs, rhs) = self.exactly_two(op, args)?;
                let negated = op == BoolOp::NotIn;
                match rhs {
                    // Empty IN-lists fold to a constant truth value
                    Expr::Literal(Value::Array(items)) if items.is_empty() => {
                        Ok(if negated { "1 = 1" } else { "1 = 0" }.to_string())
                    }
                    Expr::Literal(Value::Array(_)) | Expr::Subquery(_) => {
                        let token = if negated { "NOT IN" } else { "IN" };
                        Ok(format!(
                            "{} {} {}",
                            self.expr_sql(lhs)?,
                            token,
                            self.expr_sql(rhs)?
                        ))
                    }
                    other => Err(SequinError::expression(format!(
                        "IN requires an array or subquery, got {other:?}"
                    ))),
                }
            }
            BoolOp::Between | BoolOp::NotBetween => {
                if args.len() != 3 {
                    return Err(SequinError::expression(format!(
                        "{op:?} takes 3 arguments, got {}",
                        args.len()
                    )));
                }
                let token = if op == BoolOp::Between {
                    "BETWEEN"
                } else {
                    "NOT BETWEEN"
                };
                Ok(format!(
                    "{} {} {} AND {}",
                    self.expr_sql(&args[0])?,
                    token,
                    self.expr_sql(&args[1])?,
                    self.expr_sql(&args[2])?
                ))
            }
        }
    }

    fn complex_sql(&self, op: ComplexOp, args: &[Expr]) -> SequinResult<String> {
        match op {
            ComplexOp::Like | ComplexOp::NotLike => {
                let (lhs, rhs) = self.exactly_two_complex(op, args)?;
                let token = if op == ComplexOp::Like {
                    "LIKE"
                } else {
                    "NOT LIKE"
                };
                Ok(format!(
                    "{} {} {}",
                    self.expr_sql(lhs)?,
                    token,
                    self.expr_sql(rhs)?
                ))
            }
            ComplexOp::ILike | ComplexOp::NotILike => {
                let (lhs, rhs) = self.exactly_two_complex(op, args)?;
                let negated = op == ComplexOp::NotILike;
                match self.spec().ilike {
                    IlikeStyle::Native => {
                        let token = if negated { "NOT ILIKE" } else { "ILIKE" };
                        Ok(format!(
                            "{} {} {}",
                            self.expr_sql(lhs)?,
                            token,
                            self.expr_sql(rhs)?
                        ))
                    }
                    IlikeStyle::CaseInsensitiveLike => {
                        let token = if negated { "NOT LIKE" } else { "LIKE" };
                        Ok(format!(
                            "{} {} {}",
                            self.expr_sql(lhs)?,
                            token,
                            self.expr_sql(rhs)?
                        ))
                    }
                    IlikeStyle::UpperFallback => {
                        let token = if negated { "NOT LIKE" } else { "LIKE" };
                        Ok(format!(
                            "UPPER({}) {} UPPER({})",
                            self.expr_sql(lhs)?,
                            token,
                            self.expr_sql(rhs)?
                        ))
                    }
                }
            }
            ComplexOp::Regexp | ComplexOp::NotRegexp => {
                let (lhs, rhs) = self.exactly_two_complex(op, args)?;
                let Some((pos, neg)) = self.spec().regexp_ops else {
                    return Err(SequinError::query(format!(
                        "{} does not support regexp matching",
                        self.name()
                    )));
                };
                let token = if op == ComplexOp::Regexp { pos } else { neg };
                Ok(format!(
                    "{} {} {}",
                    self.expr_sql(lhs)?,
                    token,
                    self.expr_sql(rhs)?
                ))
            }
            ComplexOp::Concat => {
                if args.len() < 2 {
                    return Err(SequinError::expression(
                        "concat takes at least 2 arguments",
                    ));
                }
                let parts = args
                    .iter()
                    .map(|a| self.expr_sql(a))
                    .collect::<SequinResult<Vec<_>>>()?;
                match self.spec().concat {
                    ConcatStyle::Infix(token) => {
                        Ok(format!("({})", parts.join(&format!(" {token} "))))
                    }
                    ConcatStyle::Function(name) => {
                        Ok(format!("{}({})", name, parts.join(", ")))
                    }
                }
            }
        }
    }

    /// Substitute positional `?` markers with literalized values. A `?`
    /// inside a single-quoted string literal is left as-is.
    fn raw_sql(&self, fragment: &str, args: &[Value]) -> SequinResult<String> {
        let mut out = String::with_capacity(fragment.len());
        let mut remaining = args.iter();
        let mut in_string = false;
        for c in fragment.chars() {
            if c == '\'' {
                in_string = !in_string;
                out.push(c);
            } else if c == '?' && !in_string {
                let value = remaining.next().ok_or_else(|| {
                    SequinError::expression("more `?` markers than values in raw fragment")
                })?;
                out.push_str(&self.literal(value)?);
            } else {
                out.push(c);
            }
        }
        if remaining.next().is_some() {
            return Err(SequinError::expression(
                "more values than `?` markers in raw fragment",
            ));
        }
        Ok(out)
    }

    /// Parenthesize nested connectives so AND/OR mixing is always explicit.
    fn grouped(&self, expr: &Expr) -> SequinResult<String> {
        let sql = self.expr_sql(expr)?;
        match expr {
            Expr::Boolean {
                op: BoolOp::And | BoolOp::Or,
                ..
            }
            | Expr::Raw { .. } => Ok(format!("({sql})")),
            _ => Ok(sql),
        }
    }

    fn exactly_one<'a>(&self, op: BoolOp, args: &'a [Expr]) -> SequinResult<&'a Expr> {
        match args {
            [one] => Ok(one),
            _ => Err(SequinError::expression(format!(
                "{op:?} takes 1 argument, got {}",
                args.len()
            ))),
        }
    }

    fn exactly_two<'a>(&self, op: BoolOp, args: &'a [Expr]) -> SequinResult<(&'a Expr, &'a Expr)> {
        match args {
            [a, b] => Ok((a, b)),
            _ => Err(SequinError::expression(format!(
                "{op:?} takes 2 arguments, got {}",
                args.len()
            ))),
        }
    }

    fn exactly_two_complex<'a>(
        &self,
        op: ComplexOp,
        args: &'a [Expr],
    ) -> SequinResult<(&'a Expr, &'a Expr)> {
        match args {
            [a, b] => Ok((a, b)),
            _ => Err(SequinError::expression(format!(
                "{op:?} takes 2 arguments, got {}",
                args.len()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::{ansi, mysql, postgres, sqlite};
    use crate::error::SequinError;
    use crate::expr::Expr;
    use crate::value::Value;
    use chrono::NaiveDate;

    #[test]
    fn null_renders_null_in_every_dialect() {
        for d in [ansi(), postgres(), mysql(), sqlite()] {
            assert_eq!(d.literal(&Value::Null).unwrap(), "NULL");
        }
    }

    #[test]
    fn apostrophe_escaping_differs_per_dialect() {
        let v = Value::Text("a'b".to_string());
        assert_eq!(postgres().literal(&v).unwrap(), "'a''b'");
        assert_eq!(mysql().literal(&v).unwrap(), "'a\\'b'");
    }

    #[test]
    fn mysql_escapes_control_characters() {
        let v = Value::Text("a\nb\\c".to_string());
        assert_eq!(mysql().literal(&v).unwrap(), "'a\\nb\\\\c'");
    }

    #[test]
    fn booleans_follow_dialect_tokens() {
        assert_eq!(postgres().literal(&Value::Bool(true)).unwrap(), "TRUE");
        assert_eq!(mysql().literal(&Value::Bool(true)).unwrap(), "1");
        assert_eq!(sqlite().literal(&Value::Bool(false)).unwrap(), "0");
    }

    #[test]
    fn dates_use_keyword_prefix_where_ansi() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(ansi().literal(&d.into()).unwrap(), "DATE '2024-03-09'");
        assert_eq!(mysql().literal(&d.into()).unwrap(), "'2024-03-09'");
    }

    #[test]
    fn arrays_render_parenthesized_lists() {
        let v = Value::array([1i64, 2, 3]);
        assert_eq!(postgres().literal(&v).unwrap(), "(1, 2, 3)");
    }

    #[test]
    fn non_finite_float_is_an_expression_error() {
        let err = postgres().literal(&Value::Float(f64::NAN)).unwrap_err();
        assert!(matches!(err, SequinError::Expression(_)));
    }

    #[test]
    fn and_or_mixing_gets_explicit_grouping() {
        let e = Expr::eq("a", 1).and(Expr::eq("b", 2).or(Expr::eq("c", 3)));
        let sql = postgres().expr_sql(&e).unwrap();
        assert_eq!(sql, "\"a\" = 1 AND (\"b\" = 2 OR \"c\" = 3)");
    }

    #[test]
    fn eq_null_becomes_is_null() {
        let e = Expr::eq("a", Value::Null);
        assert_eq!(postgres().expr_sql(&e).unwrap(), "\"a\" IS NULL");
    }

    #[test]
    fn regexp_token_resolves_per_dialect() {
        let e = Expr::regexp("name", "^a");
        assert_eq!(postgres().expr_sql(&e).unwrap(), "\"name\" ~ '^a'");
        assert_eq!(mysql().expr_sql(&e).unwrap(), "`name` REGEXP '^a'");
    }

    #[test]
    fn concat_style_resolves_per_dialect() {
        let e = Expr::concat(vec![Expr::column("a"), Expr::column("b")]);
        assert_eq!(postgres().expr_sql(&e).unwrap(), "(\"a\" || \"b\")");
        assert_eq!(mysql().expr_sql(&e).unwrap(), "CONCAT(`a`, `b`)");
    }

    #[test]
    fn ilike_falls_back_to_upper_on_ansi() {
        let e = Expr::ilike("name", "%a%");
        assert_eq!(
            ansi().expr_sql(&e).unwrap(),
            "UPPER(\"NAME\") LIKE UPPER('%a%')"
        );
        assert_eq!(postgres().expr_sql(&e).unwrap(), "\"name\" ILIKE '%a%'");
    }

    #[test]
    fn empty_in_list_folds_to_constant() {
        let e = Expr::in_list::<i64>("id", []);
        assert_eq!(postgres().expr_sql(&e).unwrap(), "1 = 0");
        let e = Expr::not_in::<i64>("id", []);
        assert_eq!(postgres().expr_sql(&e).unwrap(), "1 = 1");
    }

    #[test]
    fn raw_fragment_literalizes_placeholders() {
        let e = Expr::raw("price > ? AND name = ?", vec![Value::Int(10), "x'y".into()])
            .unwrap();
        assert_eq!(
            postgres().expr_sql(&e).unwrap(),
            "price > 10 AND name = 'x''y'"
        );
    }

    #[test]
    fn raw_fragment_keeps_quoted_question_marks() {
        let e = Expr::raw("name = '?' AND id = ?", vec![Value::Int(5)]).unwrap();
        assert_eq!(
            postgres().expr_sql(&e).unwrap(),
            "name = '?' AND id = 5"
        );
    }

    #[test]
    fn case_renders_branches_and_else() {
        let e = Expr::case(
            vec![(Expr::gt("qty", 10), Expr::val("bulk"))],
            Some(Expr::val("single")),
        )
        .unwrap();
        assert_eq!(
            postgres().expr_sql(&e).unwrap(),
            "(CASE WHEN \"qty\" > 10 THEN 'bulk' ELSE 'single' END)"
        );
    }
}
