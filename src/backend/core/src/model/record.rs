//! A single result row, column-order preserving.

use serde_json::Value as JsonValue;

/// An ordered name→value map, preserving SQL column order as the spec
/// requires — a `Vec` of pairs rather than a `HashMap`, so iteration order
/// always matches the `SELECT` column list.
#[derive(Debug, Clone, Default)]
pub struct Record(Vec<(String, JsonValue)>);

impl Record {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, column: impl Into<String>, value: JsonValue) {
        self.0.push((column.into(), value));
    }

    pub fn get(&self, column: &str) -> Option<&JsonValue> {
        self.0.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(c, _)| c.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl serde::Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order() {
        let mut record = Record::new();
        record.push("id", serde_json::json!(1));
        record.push("name", serde_json::json!("alice"));
        let cols: Vec<&str> = record.columns().collect();
        assert_eq!(cols, vec!["id", "name"]);
    }

    #[test]
    fn serializes_as_json_object() {
        let mut record = Record::new();
        record.push("id", serde_json::json!(1));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, serde_json::json!({"id": 1}));
    }
}
