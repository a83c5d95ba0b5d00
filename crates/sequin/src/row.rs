//! Result rows.

use std::sync::Arc;

use crate::value::Value;

/// One fetched row. Column names follow the dialect's output-identifier
/// folding and are shared across all rows of a result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Row { columns, values }
    }

    /// Value by column name, `None` for unknown columns.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    /// Value by position.
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name_and_index() {
        let columns: Arc<[String]> = Arc::from(vec!["id".to_string(), "name".to_string()]);
        let row = Row::new(columns, vec![Value::Int(7), Value::Text("a".into())]);
        assert_eq!(row.get("id"), Some(&Value::Int(7)));
        assert_eq!(row.get_index(1), Some(&Value::Text("a".into())));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.len(), 2);
    }
}
