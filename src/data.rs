//! Row and cell model shared by every analysis module.
//!
//! Rows arrive already parsed (from a CSV/Excel decoder or as JSON objects) and
//! are never mutated by the analysis code. A [`Value`] is decided once when the
//! row is built; the normalizer in [`crate::normalize`] interprets it on demand.

use std::fmt;

use anyhow::{Result, anyhow};
use chrono::{NaiveDateTime, NaiveTime};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    filter::FilterSet,
    schema::{self, ColumnMeta, ColumnType, DetectionConfig},
};

static MISSING: Value = Value::Missing;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Missing,
    Number(f64),
    Text(String),
    Date(NaiveDateTime),
}

impl Value {
    /// Null, absent, and the empty string are all treated as missing.
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Missing => true,
            Value::Text(text) => text.is_empty(),
            _ => false,
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::Missing => String::new(),
            Value::Number(n) => format_number_literal(*n),
            Value::Text(s) => s.clone(),
            Value::Date(dt) => {
                if dt.time() == NaiveTime::MIN {
                    dt.format("%Y-%m-%d").to_string()
                } else {
                    dt.format("%Y-%m-%dT%H:%M:%S").to_string()
                }
            }
        }
    }
}

fn format_number_literal(value: f64) -> String {
    if value.is_infinite() {
        if value > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else {
        value.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::Date(value)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Missing,
            serde_json::Value::Bool(b) => Value::Text(b.to_string()),
            serde_json::Value::Number(n) => n.as_f64().map_or(Value::Missing, Value::Number),
            serde_json::Value::String(s) => Value::Text(s),
            other => Value::Text(other.to_string()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Missing => serializer.serialize_none(),
            Value::Number(n) if n.is_finite() => serializer.serialize_f64(*n),
            Value::Number(_) => serializer.serialize_none(),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Date(_) => serializer.serialize_str(&self.as_display()),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(Value::from(raw))
    }
}

/// One parsed record: column name to raw cell value, kept in the order the
/// columns were inserted so serialized rows follow the file's header order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    cells: IndexMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absent columns read as [`Value::Missing`].
    pub fn get(&self, column: &str) -> &Value {
        self.cells.get(column).unwrap_or(&MISSING)
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.cells.insert(column.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.cells.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Keeps only the named columns; names absent from the row project to missing.
    pub fn project(&self, columns: &[String]) -> Row {
        columns
            .iter()
            .map(|name| (name.clone(), self.get(name).clone()))
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Row {
            cells: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

/// Immutable snapshot of a loaded dataset: ordered headers, rows in file
/// order, and the column metadata detected once at load time.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
    pub columns: Vec<ColumnMeta>,
}

impl Dataset {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self::with_config(headers, rows, &DetectionConfig::default())
    }

    pub fn with_config(headers: Vec<String>, rows: Vec<Row>, config: &DetectionConfig) -> Self {
        let columns = schema::detect_column_types_with(&rows, &headers, config);
        Self {
            headers,
            rows,
            columns,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Returns a snapshot whose `column` carries the user override (`None` clears it).
    pub fn with_type_override(mut self, column: &str, ty: Option<ColumnType>) -> Result<Self> {
        let meta = self
            .columns
            .iter_mut()
            .find(|meta| meta.name == column)
            .ok_or_else(|| anyhow!("Column '{column}' not found in dataset"))?;
        meta.overridden_type = ty;
        Ok(self)
    }

    /// Rows passing every active filter; column metadata is carried over
    /// unchanged since detection happens once per load.
    pub fn filtered(&self, filters: &FilterSet) -> Dataset {
        Dataset {
            headers: self.headers.clone(),
            rows: filters.apply(&self.rows),
            columns: self.columns.clone(),
        }
    }

    pub fn column_names_where<F>(&self, predicate: F) -> Vec<String>
    where
        F: Fn(ColumnType) -> bool,
    {
        self.columns
            .iter()
            .filter(|column| predicate(column.effective_type()))
            .map(|column| column.name.clone())
            .collect()
    }
}
