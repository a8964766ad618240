use duckdb::types::Value;
use duckdb::{params_from_iter, Connection};

/// Rows of an introspection query, materialised into memory.
pub struct QueryRows {
    rows: Vec<Vec<Value>>,
}

impl QueryRows {
    /// Execute `sql` with positional text parameters and collect every row.
    pub fn from_query(conn: &Connection, sql: &str, params: &[&str]) -> duckdb::Result<Self> {
        let mut stmt = conn.prepare(sql)?;
        let mut rows_iter = stmt.query(params_from_iter(params.iter().copied()))?;

        // Column info is only available once the statement has executed.
        let column_count = rows_iter.as_ref().map_or(0, |s| s.column_count());

        let mut rows = Vec::new();
        while let Some(row) = rows_iter.next()? {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                let val = row
                    .get_ref(i)
                    .map(|v| v.to_owned())
                    .unwrap_or(Value::Null);
                values.push(val);
            }
            rows.push(values);
        }

        Ok(QueryRows { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Text rendering of a cell; `None` for SQL NULL or out-of-range indexes.
    pub fn text(&self, row: usize, col: usize) -> Option<String> {
        match self.rows.get(row)?.get(col)? {
            Value::Null => None,
            v => Some(value_to_string(v)),
        }
    }
}

fn value_to_string(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::Boolean(b) => b.to_string(),
        Value::TinyInt(i) => i.to_string(),
        Value::SmallInt(i) => i.to_string(),
        Value::Int(i) => i.to_string(),
        Value::BigInt(i) => i.to_string(),
        Value::HugeInt(i) => i.to_string(),
        Value::UTinyInt(i) => i.to_string(),
        Value::USmallInt(i) => i.to_string(),
        Value::UInt(i) => i.to_string(),
        Value::UBigInt(i) => i.to_string(),
        Value::Text(s) => s.clone(),
        other => format!("{other:?}"),
    }
}
