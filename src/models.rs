//! Data models for the record dashboard.
//!
//! This module contains the core data structures used throughout
//! the application for representing records, search queries, and table rows.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Maximum number of records kept from a single response.
pub const RESULT_CAP: usize = 50;

/// Term substituted when the search term is blank.
pub const DEFAULT_TERM: &str = "accounts";

/// Placeholder shown for missing values.
pub const NOT_AVAILABLE: &str = "N/A";

/// Placeholder shown for records without a region.
pub const DEFAULT_REGION: &str = "Global";

/// A display-safe scalar value of a record field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    /// Strings, plus nested arrays/objects flattened to compact JSON.
    Text(String),
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(b),
            Value::Number(n) => FieldValue::Number(n),
            Value::String(s) => FieldValue::Text(s),
            nested @ (Value::Array(_) | Value::Object(_)) => FieldValue::Text(nested.to_string()),
        }
    }
}

impl FieldValue {
    /// Whether the value counts as present for defaulting purposes.
    ///
    /// Null, `false`, zero and the empty string are treated as absent.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Null => false,
            FieldValue::Bool(b) => *b,
            FieldValue::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
            FieldValue::Text(s) => !s.is_empty(),
        }
    }

    /// Returns the value as display text.
    pub fn display(&self) -> String {
        match self {
            FieldValue::Null => "null".to_string(),
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Number(n) => format_number(n),
            FieldValue::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Integral floats print without a fractional part (`5.0` shows as `5`).
fn format_number(n: &serde_json::Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }

    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// One record returned by the backend.
///
/// Fields keep the key order of the source payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self {
            fields: map
                .into_iter()
                .map(|(key, value)| (key, FieldValue::from(value)))
                .collect(),
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl Record {
    /// Builds a record from key/value pairs, in order.
    #[cfg(test)]
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), FieldValue::from(v)))
                .collect(),
        }
    }

    /// Looks up a field by name.
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Returns the display text of a field if it is present and truthy.
    pub fn present(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| v.is_truthy()).map(FieldValue::display)
    }

    pub fn id(&self) -> Option<String> {
        self.present("id")
    }

    pub fn sector(&self) -> Option<String> {
        self.present("sector")
    }

    pub fn topics(&self) -> Option<String> {
        self.present("topics")
    }

    pub fn region(&self) -> Option<String> {
        self.present("region")
    }

    pub fn intensity(&self) -> Option<String> {
        self.present("intensity")
    }

    pub fn pest(&self) -> Option<String> {
        self.present("pest")
    }

    /// Key used for expansion tracking: the identifier, or the position when absent.
    ///
    /// The identifier keeps its JSON type, so `1` and `"1"` are different rows.
    pub fn row_key(&self, index: usize) -> RowKey {
        match self.get("id").filter(|v| v.is_truthy()) {
            Some(id) => RowKey::Id(id.clone()),
            None => RowKey::Index(index),
        }
    }

    /// All fields in payload order, null values rendered as "N/A".
    pub fn details(&self) -> Vec<DetailEntry> {
        self.fields
            .iter()
            .map(|(key, value)| DetailEntry {
                key: key.clone(),
                value: match value {
                    FieldValue::Null => NOT_AVAILABLE.to_string(),
                    other => other.display(),
                },
            })
            .collect()
    }
}

/// Identifies a table row for expansion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum RowKey {
    Id(FieldValue),
    Index(usize),
}

impl RowKey {
    /// Identifier key for a string id.
    pub fn text(id: impl Into<String>) -> Self {
        RowKey::Id(FieldValue::Text(id.into()))
    }

    /// Identifier key parsed from user input: numbers stay numeric.
    pub fn from_input(input: &str) -> Self {
        match input.parse::<serde_json::Number>() {
            Ok(n) => RowKey::Id(FieldValue::Number(n)),
            Err(_) => RowKey::text(input),
        }
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKey::Id(id) => write!(f, "{}", id),
            RowKey::Index(idx) => write!(f, "#{}", idx),
        }
    }
}

/// Field a search is scoped to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SearchField {
    #[default]
    All,
    Id,
    Sector,
    Region,
    Country,
    Topics,
    Pest,
    Source,
}

impl SearchField {
    pub const VARIANTS: [SearchField; 8] = [
        SearchField::All,
        SearchField::Id,
        SearchField::Sector,
        SearchField::Region,
        SearchField::Country,
        SearchField::Topics,
        SearchField::Pest,
        SearchField::Source,
    ];

    /// Path segment sent to the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchField::All => "all",
            SearchField::Id => "id",
            SearchField::Sector => "sector",
            SearchField::Region => "region",
            SearchField::Country => "country",
            SearchField::Topics => "topics",
            SearchField::Pest => "pest",
            SearchField::Source => "source",
        }
    }

    /// Human readable label.
    pub fn label(&self) -> &'static str {
        match self {
            SearchField::All => "All Fields",
            SearchField::Id => "ID",
            SearchField::Sector => "Sector",
            SearchField::Region => "Region",
            SearchField::Country => "Country",
            SearchField::Topics => "Topics",
            SearchField::Pest => "PEST",
            SearchField::Source => "Source",
        }
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SearchField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::VARIANTS
            .into_iter()
            .find(|f| f.as_str() == wanted)
            .ok_or_else(|| {
                let names: Vec<_> = Self::VARIANTS.iter().map(|f| f.as_str()).collect();
                format!("Unknown field '{}'. Expected one of: {}", s, names.join(", "))
            })
    }
}

/// A search request: field selector plus free-text term.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SearchQuery {
    pub field: SearchField,
    pub term: String,
}

impl SearchQuery {
    pub fn new(field: SearchField, term: impl Into<String>) -> Self {
        Self {
            field,
            term: term.into(),
        }
    }

    /// The fixed query issued when the dashboard first loads.
    pub fn mount() -> Self {
        Self::new(SearchField::All, DEFAULT_TERM)
    }

    /// Trimmed term, falling back to the default term when blank.
    pub fn effective_term(&self) -> &str {
        match self.term.trim() {
            "" => DEFAULT_TERM,
            trimmed => trimmed,
        }
    }
}

/// One field of an expanded record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailEntry {
    pub key: String,
    pub value: String,
}

/// A rendered table row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub key: RowKey,
    pub id: String,
    pub sector: String,
    pub topics: String,
    pub region: String,
    pub intensity: String,
    pub pest: String,
    pub expanded: bool,
    /// Present only when the row is expanded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<DetailEntry>>,
}

impl TableRow {
    /// Builds the display cells for a record, applying the column defaults.
    pub fn from_record(record: &Record, index: usize, expanded: bool) -> Self {
        Self {
            key: record.row_key(index),
            id: record.id().unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            sector: record.sector().unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            topics: record.topics().unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            region: record.region().unwrap_or_else(|| DEFAULT_REGION.to_string()),
            intensity: record.intensity().unwrap_or_else(|| "0".to_string()),
            pest: record.pest().unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            expanded,
            details: expanded.then(|| record.details()),
        }
    }
}
