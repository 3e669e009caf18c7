use std::fmt;

use serde_json::{Map, Number, Value as Json};
use tracing::{trace, warn};

/// One source entity as delivered by the data source, nested objects included.
pub type RawRecord = Map<String, Json>;

/// Hoists a nested field to the top level of a row under a new name.
struct FieldMapping {
    path: &'static [&'static str],
    target: &'static str,
}

const LOCATION_SCHEMA: &[FieldMapping] = &[
    FieldMapping {
        path: &["street", "number"],
        target: "number",
    },
    FieldMapping {
        path: &["street", "name"],
        target: "name",
    },
    FieldMapping {
        path: &["coordinates", "latitude"],
        target: "latitude",
    },
    FieldMapping {
        path: &["coordinates", "longitude"],
        target: "longitude",
    },
];

const DROPPED_FIELDS: &[&str] = &["timezone"];

/// A single scalar cell of a flat row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
}

impl Value {
    fn from_json(value: &Json) -> Self {
        match value {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => Value::Number(n.clone()),
            Json::String(s) => Value::Text(s.clone()),
            // Arrays (and objects reaching this point) are kept as their json text
            other => Value::Text(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => match n.as_f64() {
                // Floats print like integers when whole, and zero has no sign
                Some(x) if n.is_f64() && x == 0.0 => write!(f, "0"),
                Some(x) if n.is_f64() => write!(f, "{x}"),
                _ => write!(f, "{n}"),
            },
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

/// A row with one value per header, aligned with `Dataset::headers`.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRow {
    cells: Vec<Value>,
}

impl FlatRow {
    pub fn new(cells: Vec<Value>) -> Self {
        FlatRow { cells }
    }

    fn project(headers: &[String], mut fields: Vec<(String, Value)>) -> Self {
        let cells = headers
            .iter()
            .map(|header| {
                fields
                    .iter_mut()
                    .find(|(key, _)| key == header)
                    .map(|(_, value)| std::mem::replace(value, Value::Null))
                    .unwrap_or(Value::Null)
            })
            .collect();
        FlatRow::new(cells)
    }

    pub fn cells(&self) -> &[Value] {
        &self.cells
    }

    pub fn get(&self, column: usize) -> Option<&Value> {
        self.cells.get(column)
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<FlatRow>,
}

impl Dataset {
    pub fn column_of(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }
}

/// Flattens all records and derives the header sequence from the first one.
///
/// Rows of a different shape than the first record get `Value::Null` for
/// every header they lack. Keys the first record does not have are dropped.
pub fn flatten(records: &[RawRecord]) -> Dataset {
    let mut flattened = records.iter().map(flatten_record);
    let Some(first) = flattened.next() else {
        return Dataset::default();
    };
    let headers = derive_headers(&first);

    let mut rows = Vec::with_capacity(records.len());
    rows.push(FlatRow::project(&headers, first));
    rows.extend(flattened.map(|fields| FlatRow::project(&headers, fields)));

    Dataset { headers, rows }
}

/// Flattens one record into ordered `(name, value)` pairs.
///
/// Remaining top level fields come first in source order, followed by the
/// schema targets. Unknown nested objects are expanded to their leaves.
pub fn flatten_record(record: &RawRecord) -> Vec<(String, Value)> {
    let mut fields = Vec::with_capacity(record.len() + LOCATION_SCHEMA.len());

    for (key, value) in record {
        if DROPPED_FIELDS.contains(&key.as_str()) || is_schema_root(key) {
            continue;
        }
        hoist(&mut fields, key, value);
    }

    for mapping in LOCATION_SCHEMA {
        let value = match lookup(record, mapping.path) {
            Some(value) => Value::from_json(value),
            None => {
                warn!(
                    "Record lacks {}, using null for \"{}\"",
                    mapping.path.join("."),
                    mapping.target
                );
                Value::Null
            }
        };
        insert(&mut fields, mapping.target, value);
    }

    fields
}

pub fn derive_headers(first: &[(String, Value)]) -> Vec<String> {
    first.iter().map(|(key, _)| key.clone()).collect()
}

fn is_schema_root(key: &str) -> bool {
    LOCATION_SCHEMA.iter().any(|m| m.path[0] == key)
}

fn lookup<'a>(record: &'a RawRecord, path: &[&str]) -> Option<&'a Json> {
    let (first, rest) = path.split_first()?;
    rest.iter()
        .try_fold(record.get(*first)?, |value, key| value.get(*key))
}

fn hoist(fields: &mut Vec<(String, Value)>, key: &str, value: &Json) {
    match value {
        Json::Object(nested) => {
            trace!("Expanding unknown nested field \"{key}\"");
            for (k, v) in nested {
                hoist(fields, k, v);
            }
        }
        _ => insert(fields, key, Value::from_json(value)),
    }
}

// Keeps the position of the first occurrence, the latest value wins.
fn insert(fields: &mut Vec<(String, Value)>, key: &str, value: Value) {
    match fields.iter_mut().find(|(k, _)| k == key) {
        Some(slot) => slot.1 = value,
        None => fields.push((key.to_string(), value)),
    }
}
