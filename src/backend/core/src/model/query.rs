//! `QueryConfig` — a parameterized SQL statement bound to one database.

use serde::{Deserialize, Serialize};

use super::value::ParamType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(skip_deserializing, default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub sql: String,
    pub database: String,
    #[serde(default)]
    pub parameters: Vec<QueryParameter>,
}

/// A declared, positionally-bound SQL parameter. `position` in the bound
/// form ([`crate::model::value::TypedValue`] carriers built by the
/// Dispatcher) is derived from declaration order, never stored here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default)]
    pub required: bool,
}

impl QueryConfig {
    /// Count `?`-style positional placeholders is not applicable to
    /// Postgres `$n` SQL; instead the number of declared parameters is the
    /// authority and the registry checks it against the SQL's placeholder
    /// count, which this counts by scanning for `$<digits>` markers.
    pub fn placeholder_count(&self) -> usize {
        let mut positions = std::collections::BTreeSet::new();
        let bytes = self.sql.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'$' {
                let start = i + 1;
                let mut j = start;
                while j < bytes.len() && bytes[j].is_ascii_digit() {
                    j += 1;
                }
                if j > start {
                    if let Ok(n) = self.sql[start..j].parse::<usize>() {
                        positions.insert(n);
                    }
                    i = j;
                    continue;
                }
            }
            i += 1;
        }
        positions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_distinct_positional_placeholders() {
        let q = QueryConfig {
            name: "q1".into(),
            description: String::new(),
            sql: "SELECT * FROM t WHERE a = $1 AND b = $2".into(),
            database: "d1".into(),
            parameters: vec![],
        };
        assert_eq!(q.placeholder_count(), 2);
    }
}
