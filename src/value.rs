use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::{ChartError, ChartResult};
use crate::timebucket::{parse_timestamp, Timestamp};

/// A single cell of the source dataset, or a value derived from one.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    /// The mapped column index lies outside the row
    #[default]
    Missing,
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Date(DateTime<FixedOffset>),
}

static MISSING: CellValue = CellValue::Missing;

impl CellValue {
    /// Whether the value is dropped from a group key (`""`, `0`, `NaN`, `false`, null, missing).
    pub fn is_falsy(&self) -> bool {
        match self {
            CellValue::Missing | CellValue::Null => true,
            CellValue::Bool(b) => !b,
            CellValue::Number(n) => *n == 0.0 || n.is_nan(),
            CellValue::Text(s) => s.is_empty(),
            CellValue::Date(_) => false,
        }
    }

    /// No value at all: missing, null or empty text.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Missing | CellValue::Null => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Numeric contribution of this value to a sum. Non-numeric values yield `NaN`.
    pub fn as_number(&self) -> f64 {
        match self {
            CellValue::Number(n) => *n,
            CellValue::Bool(true) => 1.0,
            CellValue::Bool(false) | CellValue::Null => 0.0,
            _ => f64::NAN,
        }
    }

    /// Interpret the value as a point in time.
    pub fn as_timestamp(&self) -> ChartResult<Timestamp> {
        match self {
            CellValue::Date(d) => Ok(*d),
            CellValue::Text(s) => parse_timestamp(s),
            other => Err(ChartError::InvalidTimestamp(other.key_text())),
        }
    }

    /// Text form used when joining values into a group key.
    pub fn key_text(&self) -> String {
        match self {
            CellValue::Missing => "undefined".to_string(),
            CellValue::Null => "null".to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.clone(),
            CellValue::Date(d) => d.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key_text())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Missing | CellValue::Null => serializer.serialize_none(),
            CellValue::Bool(b) => serializer.serialize_bool(*b),
            CellValue::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
                    serializer.serialize_i64(*n as i64)
                } else {
                    serializer.serialize_f64(*n)
                }
            }
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Date(d) => {
                serializer.serialize_str(&d.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCell {
    Bool(bool),
    Number(f64),
    Text(String),
    Null,
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawCell::deserialize(deserializer)? {
            RawCell::Bool(b) => CellValue::Bool(b),
            RawCell::Number(n) => CellValue::Number(n),
            RawCell::Text(s) => CellValue::Text(s),
            RawCell::Null => CellValue::Null,
        })
    }
}

/// One row of the dataset, positionally indexed.
pub type Row = Vec<CellValue>;

/// A row reshaped into named logical fields.
///
/// Field order is insertion order. Reading a name that was never set
/// yields [`CellValue::Missing`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, CellValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> &CellValue {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .unwrap_or(&MISSING)
    }

    /// Set a field, replacing an existing value in place.
    pub fn set(&mut self, name: impl Into<String>, value: CellValue) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.set(name, value.into());
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
