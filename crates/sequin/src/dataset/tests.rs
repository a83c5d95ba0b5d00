use super::*;
use crate::dialect::{ansi, mysql, postgres, sqlite, Dialect, DialectSpec};
use crate::value::Value;

fn items(dialect: Dialect) -> Dataset {
    Dataset::new(dialect, "items")
}

#[test]
fn bare_dataset_selects_star() {
    assert_eq!(items(postgres()).sql().unwrap(), "SELECT * FROM \"items\"");
}

#[test]
fn ansi_dialect_folds_identifiers_upcase() {
    assert_eq!(items(ansi()).sql().unwrap(), "SELECT * FROM \"ITEMS\"");
}

#[test]
fn mutators_never_touch_the_receiver() {
    let ds = items(postgres());
    let before = ds.sql().unwrap();
    let _ = ds.filter(("id", 1)).unwrap();
    let _ = ds.select(&["name"]).order(vec![Expr::column("id").desc()]);
    let _ = ds.limit(3).distinct();
    assert_eq!(ds.sql().unwrap(), before);
}

#[test]
fn equality_compares_options_not_dialect() {
    let a = items(postgres()).filter(("id", 1)).unwrap();
    let b = items(mysql()).filter(("id", 1)).unwrap();
    assert_eq!(a, b);
    assert_ne!(a, items(postgres()));
}

#[test]
fn select_list_replaces_and_appends() {
    let ds = items(postgres()).select(&["id", "name"]);
    assert_eq!(ds.sql().unwrap(), "SELECT \"id\", \"name\" FROM \"items\"");
    let ds = ds.select_append(Expr::function("COUNT", vec![Expr::column("id")]).alias("n"));
    assert_eq!(
        ds.sql().unwrap(),
        "SELECT \"id\", \"name\", COUNT(\"id\") AS \"n\" FROM \"items\""
    );
}

#[test]
fn filter_pair_shapes() {
    let ds = items(postgres());
    assert_eq!(
        ds.filter(("id", 1)).unwrap().sql().unwrap(),
        "SELECT * FROM \"items\" WHERE \"id\" = 1"
    );
    assert_eq!(
        ds.filter(("id", vec![1, 2, 3])).unwrap().sql().unwrap(),
        "SELECT * FROM \"items\" WHERE \"id\" IN (1, 2, 3)"
    );
    assert_eq!(
        ds.filter(("deleted_at", Value::Null)).unwrap().sql().unwrap(),
        "SELECT * FROM \"items\" WHERE \"deleted_at\" IS NULL"
    );
}

#[test]
fn explicit_operands_pick_the_comparison() {
    let ds = items(postgres());
    assert_eq!(
        ds.filter(("qty", Operand::Gt(Value::Int(10))))
            .unwrap()
            .sql()
            .unwrap(),
        "SELECT * FROM \"items\" WHERE \"qty\" > 10"
    );
    assert_eq!(
        ds.filter(("name", Operand::Like("a%".into())))
            .unwrap()
            .sql()
            .unwrap(),
        "SELECT * FROM \"items\" WHERE \"name\" LIKE 'a%'"
    );
    assert_eq!(
        ds.filter(("qty", Operand::Between(Value::Int(1), Value::Int(9))))
            .unwrap()
            .sql()
            .unwrap(),
        "SELECT * FROM \"items\" WHERE \"qty\" BETWEEN 1 AND 9"
    );
}

#[test]
fn chained_filters_and_fold_in_order() {
    let ds = items(postgres())
        .filter(("kind", "book"))
        .unwrap()
        .filter(("qty", Operand::Ge(Value::Int(2))))
        .unwrap();
    assert_eq!(
        ds.sql().unwrap(),
        "SELECT * FROM \"items\" WHERE \"kind\" = 'book' AND \"qty\" >= 2"
    );
}

#[test]
fn pair_list_allows_repeated_columns() {
    let ds = items(postgres())
        .filter(vec![
            ("qty", Operand::Ge(Value::Int(2))),
            ("qty", Operand::Le(Value::Int(8))),
        ])
        .unwrap();
    assert_eq!(
        ds.sql().unwrap(),
        "SELECT * FROM \"items\" WHERE \"qty\" >= 2 AND \"qty\" <= 8"
    );
}

#[test]
fn exclude_negates_one_condition() {
    let ds = items(postgres()).exclude(("active", true)).unwrap();
    assert_eq!(
        ds.sql().unwrap(),
        "SELECT * FROM \"items\" WHERE NOT (\"active\" = TRUE)"
    );
}

#[test]
fn invert_negates_the_accumulated_where() {
    let ds = items(postgres())
        .filter(("a", 1))
        .unwrap()
        .filter(("b", 2))
        .unwrap()
        .invert()
        .unwrap();
    assert_eq!(
        ds.sql().unwrap(),
        "SELECT * FROM \"items\" WHERE NOT (\"a\" = 1 AND \"b\" = 2)"
    );
    assert!(items(postgres()).invert().is_err());
}

#[test]
fn raw_fragments_literalize_positionally() {
    let ds = items(postgres())
        .filter_sql("price > ? AND name != ?", vec![10.into(), "x".into()])
        .unwrap();
    assert_eq!(
        ds.sql().unwrap(),
        "SELECT * FROM \"items\" WHERE price > 10 AND name != 'x'"
    );
    assert!(items(postgres())
        .filter_sql("price > ?", vec![])
        .is_err());
}

#[test]
fn named_fragments_resolve_tokens() {
    let ds = items(postgres())
        .filter_named(
            "price BETWEEN {lo} AND {hi}",
            &[("lo", 1.into()), ("hi", 9.into())],
        )
        .unwrap();
    assert_eq!(
        ds.sql().unwrap(),
        "SELECT * FROM \"items\" WHERE price BETWEEN 1 AND 9"
    );
    assert!(items(postgres())
        .filter_named("price > {missing}", &[])
        .is_err());
}

#[test]
fn joins_get_incrementing_aliases() {
    let ds = Dataset::new(postgres(), "orders")
        .join(JoinKind::Inner, "items", &[("order_id", "id")])
        .unwrap()
        .join(JoinKind::Left, "parts", &[("item_id", "item_id")])
        .unwrap();
    assert_eq!(
        ds.sql().unwrap(),
        "SELECT * FROM \"orders\" \
         INNER JOIN \"items\" AS \"t1\" ON \"t1\".\"order_id\" = \"orders\".\"id\" \
         LEFT JOIN \"parts\" AS \"t2\" ON \"t2\".\"item_id\" = \"t1\".\"item_id\""
    );
}

#[test]
fn qualified_right_side_is_kept_as_given() {
    let ds = Dataset::new(postgres(), "orders")
        .join(JoinKind::Inner, "items", &[("order_id", "orders.id")])
        .unwrap();
    assert_eq!(
        ds.sql().unwrap(),
        "SELECT * FROM \"orders\" INNER JOIN \"items\" AS \"t1\" \
         ON \"t1\".\"order_id\" = \"orders\".\"id\""
    );
}

#[test]
fn full_join_is_capability_gated() {
    let err = items(mysql())
        .join(JoinKind::FullOuter, "other", &[("id", "id")])
        .unwrap_err();
    assert!(matches!(err, SequinError::Query(_)));
    assert!(items(postgres())
        .join(JoinKind::FullOuter, "other", &[("id", "id")])
        .is_ok());
}

#[test]
fn cross_join_has_no_condition() {
    let ds = items(postgres())
        .join(JoinKind::Cross, "tags", &[])
        .unwrap();
    assert_eq!(
        ds.sql().unwrap(),
        "SELECT * FROM \"items\" CROSS JOIN \"tags\" AS \"t1\""
    );
}

#[test]
fn group_having_order_limit_render_in_pipeline_order() {
    let ds = items(postgres())
        .select(&["kind"])
        .group(&["kind"])
        .having(Expr::raw("COUNT(*) > ?", vec![1.into()]).unwrap())
        .unwrap()
        .order(vec![Expr::column("kind").asc()])
        .limit(10)
        .offset(5);
    assert_eq!(
        ds.sql().unwrap(),
        "SELECT \"kind\" FROM \"items\" GROUP BY \"kind\" HAVING COUNT(*) > 1 \
         ORDER BY \"kind\" ASC LIMIT 10 OFFSET 5"
    );
}

#[test]
fn order_supports_direction_and_nulls() {
    use crate::expr::NullsOrder;
    let ds = items(postgres()).order(vec![
        Expr::column("name").desc().nulls(NullsOrder::Last),
        Expr::column("id").asc(),
    ]);
    assert_eq!(
        ds.sql().unwrap(),
        "SELECT * FROM \"items\" ORDER BY \"name\" DESC NULLS LAST, \"id\" ASC"
    );
}

#[test]
fn distinct_renders_after_select() {
    let ds = items(postgres()).distinct().select(&["kind"]);
    assert_eq!(ds.sql().unwrap(), "SELECT DISTINCT \"kind\" FROM \"items\"");
}

#[test]
fn lock_modes_render_per_dialect() {
    assert_eq!(
        items(postgres()).lock(LockMode::Update).sql().unwrap(),
        "SELECT * FROM \"items\" FOR UPDATE"
    );
    assert_eq!(
        items(mysql()).lock(LockMode::Share).sql().unwrap(),
        "SELECT * FROM `items` LOCK IN SHARE MODE"
    );
    let err = items(sqlite()).lock(LockMode::Update).sql().unwrap_err();
    assert!(matches!(err, SequinError::Query(_)));
}

#[test]
fn compounds_append_in_call_order() {
    let ds = Dataset::new(postgres(), "a")
        .union(Dataset::new(postgres(), "b"))
        .union_all(Dataset::new(postgres(), "c"));
    assert_eq!(
        ds.sql().unwrap(),
        "SELECT * FROM \"a\" UNION SELECT * FROM \"b\" UNION ALL SELECT * FROM \"c\""
    );
}

#[test]
fn subquery_filter_renders_nested_select() {
    let inner = Dataset::new(postgres(), "archived").select(&["id"]);
    let ds = items(postgres())
        .filter(Expr::in_dataset("id", inner))
        .unwrap();
    assert_eq!(
        ds.sql().unwrap(),
        "SELECT * FROM \"items\" WHERE \"id\" IN (SELECT \"id\" FROM \"archived\")"
    );
}

#[test]
fn insert_from_assignments() {
    let ds = items(postgres()).set([("name", Value::from("a")), ("qty", Value::from(5))]);
    assert_eq!(
        ds.insert_sql().unwrap(),
        "INSERT INTO \"items\" (\"name\", \"qty\") VALUES ('a', 5)"
    );
}

#[test]
fn insert_multi_row_values() {
    let ds = items(postgres())
        .values(
            &["name", "qty"],
            vec![
                vec!["a".into(), 1.into()],
                vec!["b".into(), 2.into()],
            ],
        )
        .unwrap();
    assert_eq!(
        ds.insert_sql().unwrap(),
        "INSERT INTO \"items\" (\"name\", \"qty\") VALUES ('a', 1), ('b', 2)"
    );
    assert!(items(postgres())
        .values(&["name"], vec![vec!["a".into(), 1.into()]])
        .is_err());
}

#[test]
fn insert_without_values_uses_defaults() {
    assert_eq!(
        items(postgres()).insert_sql().unwrap(),
        "INSERT INTO \"items\" DEFAULT VALUES"
    );
}

#[test]
fn mysql_insert_variants_are_capability_gated() {
    let ds = items(mysql())
        .set([("name", Value::from("a"))])
        .insert_ignore()
        .unwrap();
    assert_eq!(
        ds.insert_sql().unwrap(),
        "INSERT IGNORE INTO `items` (`name`) VALUES ('a')"
    );
    let ds = items(mysql())
        .set([("name", Value::from("a"))])
        .replace()
        .unwrap();
    assert_eq!(
        ds.insert_sql().unwrap(),
        "REPLACE INTO `items` (`name`) VALUES ('a')"
    );
    assert!(items(postgres()).insert_ignore().is_err());
    assert!(items(postgres()).replace().is_err());
}

#[test]
fn on_duplicate_key_update_lists_value_columns() {
    let ds = items(mysql())
        .set([("name", Value::from("a")), ("qty", Value::from(2))])
        .on_duplicate_key_update(&["qty"])
        .unwrap();
    assert_eq!(
        ds.insert_sql().unwrap(),
        "INSERT INTO `items` (`name`, `qty`) VALUES ('a', 2) \
         ON DUPLICATE KEY UPDATE `qty` = VALUES(`qty`)"
    );
    assert!(items(postgres()).on_duplicate_key_update(&["qty"]).is_err());
}

#[test]
fn update_renders_set_and_where() {
    let ds = items(postgres())
        .set([("qty", Value::from(5))])
        .filter(("id", 1))
        .unwrap();
    assert_eq!(
        ds.update_sql().unwrap(),
        "UPDATE \"items\" SET \"qty\" = 5 WHERE \"id\" = 1"
    );
}

#[test]
fn update_supports_expression_assignments() {
    let ds = items(postgres())
        .set_expr("qty", Expr::raw("qty + 1", vec![]).unwrap())
        .filter(("id", 1))
        .unwrap();
    assert_eq!(
        ds.update_sql().unwrap(),
        "UPDATE \"items\" SET \"qty\" = qty + 1 WHERE \"id\" = 1"
    );
}

#[test]
fn update_without_assignments_is_rejected() {
    let err = items(postgres())
        .filter(("id", 1))
        .unwrap()
        .update_sql()
        .unwrap_err();
    assert!(matches!(err, SequinError::Query(_)));
}

#[test]
fn delete_requires_where_unless_allowed() {
    let ds = items(postgres());
    assert!(matches!(
        ds.delete_sql().unwrap_err(),
        SequinError::Query(_)
    ));
    assert_eq!(
        ds.allow_delete_all().delete_sql().unwrap(),
        "DELETE FROM \"items\""
    );
    assert_eq!(
        ds.filter(("id", 1)).unwrap().delete_sql().unwrap(),
        "DELETE FROM \"items\" WHERE \"id\" = 1"
    );
}

#[test]
fn dialect_can_replace_the_clause_order() {
    let mut spec = DialectSpec::default();
    spec.clause_orders.insert(
        StatementKind::Select,
        vec!["distinct", "columns", "from", "where"],
    );
    let trimmed = Dialect::new(spec);
    let ds = Dataset::new(trimmed, "items")
        .order(vec![Expr::column("name").asc()])
        .limit(3);
    // order and limit never render because the pipeline omits them
    assert_eq!(ds.sql().unwrap(), "SELECT * FROM \"ITEMS\"");
}
