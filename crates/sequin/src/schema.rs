//! Column metadata and the per-database schema cache.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Metadata for one table column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    pub column_type: String,
    pub nullable: bool,
    pub default: Option<Value>,
    pub primary_key: bool,
}

/// Start describing a column: `column("id", "integer").primary_key()`.
pub fn column(name: impl Into<String>, column_type: impl Into<String>) -> ColumnMeta {
    ColumnMeta {
        name: name.into(),
        column_type: column_type.into(),
        nullable: true,
        default: None,
        primary_key: false,
    }
}

impl ColumnMeta {
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }
}

/// Cached column metadata, keyed by table name.
///
/// Invalidated wholesale whenever a DDL statement runs through the owning
/// database, so stale shapes never survive a migration.
#[derive(Debug, Default)]
pub struct SchemaCache {
    tables: HashMap<String, Vec<ColumnMeta>>,
}

impl SchemaCache {
    pub fn insert(&mut self, table: impl Into<String>, columns: Vec<ColumnMeta>) {
        self.tables.insert(table.into(), columns);
    }

    pub fn get(&self, table: &str) -> Option<&Vec<ColumnMeta>> {
        self.tables.get(table)
    }

    pub fn invalidate(&mut self, table: &str) {
        self.tables.remove(table);
    }

    pub fn clear(&mut self) {
        self.tables.clear();
    }
}

/// Whether a statement changes schema shape (first keyword is DDL).
pub(crate) fn is_ddl(sql: &str) -> bool {
    let first = sql.trim_start().split_whitespace().next().unwrap_or("");
    ["CREATE", "ALTER", "DROP", "TRUNCATE"]
        .iter()
        .any(|kw| first.eq_ignore_ascii_case(kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_builder_sets_flags() {
        let c = column("id", "integer").primary_key();
        assert!(c.primary_key);
        assert!(!c.nullable);
        let c = column("note", "text").default_value("n/a");
        assert_eq!(c.default, Some(Value::Text("n/a".into())));
        assert!(c.nullable);
    }

    #[test]
    fn ddl_detection_is_keyword_based() {
        assert!(is_ddl("CREATE TABLE t (id integer)"));
        assert!(is_ddl("  alter table t add c text"));
        assert!(is_ddl("DROP TABLE t"));
        assert!(!is_ddl("SELECT * FROM created_things"));
        assert!(!is_ddl("UPDATE t SET a = 1"));
    }

    #[test]
    fn cache_round_trip_and_invalidation() {
        let mut cache = SchemaCache::default();
        cache.insert("items", vec![column("id", "integer")]);
        assert!(cache.get("items").is_some());
        cache.invalidate("items");
        assert!(cache.get("items").is_none());
        cache.insert("a", vec![]);
        cache.insert("b", vec![]);
        cache.clear();
        assert!(cache.get("a").is_none() && cache.get("b").is_none());
    }
}
