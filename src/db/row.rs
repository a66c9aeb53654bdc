//! Untyped result rows for ad-hoc queries.

use base64::Engine as _;
use rusqlite::types::Value;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// One result row: column names mapped to values, in select-list order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    pub(crate) fn from_sqlite(row: &rusqlite::Row<'_>, columns: &[String]) -> rusqlite::Result<Self> {
        let mut fields = Vec::with_capacity(columns.len());
        for (idx, name) in columns.iter().enumerate() {
            fields.push((name.clone(), row.get::<_, Value>(idx)?));
        }
        Ok(Self { fields })
    }

    /// Value of a column. Duplicate column names resolve to the last one,
    /// matching how an object literal would be built from the row.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .rev()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn get_i64(&self, column: &str) -> Option<i64> {
        match self.get(column)? {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn get_f64(&self, column: &str) -> Option<f64> {
        match self.get(column)? {
            Value::Real(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn get_str(&self, column: &str) -> Option<&str> {
        match self.get(column)? {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_null(&self, column: &str) -> bool {
        matches!(self.get(column), Some(Value::Null))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Serialized as a JSON object in column order; blobs become base64 strings.
impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            match value {
                Value::Null => map.serialize_entry(name, &())?,
                Value::Integer(i) => map.serialize_entry(name, i)?,
                Value::Real(f) => map.serialize_entry(name, f)?,
                Value::Text(s) => map.serialize_entry(name, s)?,
                Value::Blob(b) => map.serialize_entry(
                    name,
                    &base64::engine::general_purpose::STANDARD.encode(b),
                )?,
            }
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn select_row(sql: &str) -> Row {
        let conn = Connection::open_in_memory().unwrap();
        let mut stmt = conn.prepare(sql).unwrap();
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        stmt.query_row([], |row| Row::from_sqlite(row, &columns)).unwrap()
    }

    #[test]
    fn typed_accessors() {
        let row = select_row("SELECT 7 AS count, 1.5 AS ratio, 'active' AS status, NULL AS notes");
        assert_eq!(row.get_i64("count"), Some(7));
        assert_eq!(row.get_f64("ratio"), Some(1.5));
        assert_eq!(row.get_f64("count"), Some(7.0));
        assert_eq!(row.get_str("status"), Some("active"));
        assert!(row.is_null("notes"));
        assert!(row.get("missing").is_none());
        assert_eq!(row.len(), 4);
    }

    #[test]
    fn preserves_column_order() {
        let row = select_row("SELECT 1 AS z, 2 AS a, 3 AS m");
        let columns: Vec<&str> = row.columns().collect();
        assert_eq!(columns, vec!["z", "a", "m"]);
    }

    #[test]
    fn serializes_as_ordered_object() {
        let row = select_row("SELECT 2 AS id, 'x' AS name, NULL AS gone, X'0102' AS raw");
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"id":2,"name":"x","gone":null,"raw":"AQI="}"#);
    }
}
