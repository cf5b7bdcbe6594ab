//! Reshaping of slice and count responses into nested maps
//!
//! Values are returned exactly as the store holds them: strings. A number
//! written through [`crate::ColumnFamily::set`] comes back as its decimal
//! string.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::types::{ColumnOrSuperColumn, CountResponse, SliceResponse};

/// Value of one entry in a row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Value(String),
    Super(BTreeMap<String, String>),
}

impl Cell {
    pub fn as_value(&self) -> Option<&str> {
        match self {
            Cell::Value(value) => Some(value),
            Cell::Super(_) => None,
        }
    }

    pub fn as_super(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Cell::Value(_) => None,
            Cell::Super(columns) => Some(columns),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Value(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Value(value)
    }
}

impl From<BTreeMap<String, String>> for Cell {
    fn from(columns: BTreeMap<String, String>) -> Self {
        Cell::Super(columns)
    }
}

/// Column (or super column) name -> value
pub type Row = BTreeMap<String, Cell>;

/// Result of a `get`
///
/// A request for exactly one key yields that key's row directly; anything
/// else yields the per-key map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SliceResult {
    Row(Row),
    Rows(HashMap<String, Row>),
}

impl SliceResult {
    /// The single-key row, if this was a single-key request
    pub fn into_row(self) -> Option<Row> {
        match self {
            SliceResult::Row(row) => Some(row),
            SliceResult::Rows(_) => None,
        }
    }

    /// The per-key rows, if this was a multi-key request
    pub fn into_rows(self) -> Option<HashMap<String, Row>> {
        match self {
            SliceResult::Row(_) => None,
            SliceResult::Rows(rows) => Some(rows),
        }
    }
}

/// Result of a `count`, unwrapped the same way as [`SliceResult`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CountResult {
    Count(i32),
    Counts(HashMap<String, i32>),
}

impl CountResult {
    pub fn into_count(self) -> Option<i32> {
        match self {
            CountResult::Count(count) => Some(count),
            CountResult::Counts(_) => None,
        }
    }

    pub fn into_counts(self) -> Option<HashMap<String, i32>> {
        match self {
            CountResult::Count(_) => None,
            CountResult::Counts(counts) => Some(counts),
        }
    }
}

/// Fold a row's records into a map. Records for the same super column merge.
pub fn shape_row(records: Vec<ColumnOrSuperColumn>) -> Row {
    let mut row = Row::new();
    for record in records {
        match record {
            ColumnOrSuperColumn::Column(column) => {
                row.insert(column.name, Cell::Value(column.value));
            }
            ColumnOrSuperColumn::SuperColumn(super_column) => {
                let entry = row
                    .entry(super_column.name)
                    .or_insert_with(|| Cell::Super(BTreeMap::new()));
                if let Cell::Value(_) = entry {
                    *entry = Cell::Super(BTreeMap::new());
                }
                if let Cell::Super(columns) = entry {
                    columns.extend(super_column.columns.into_iter().map(|c| (c.name, c.value)));
                }
            }
        }
    }
    row
}

/// Shape a `multiget_slice` response for the requested keys.
///
/// Keys missing from the response, or present with no records, become
/// empty rows.
pub fn shape_slice(keys: &[String], mut response: SliceResponse) -> SliceResult {
    if let [key] = keys {
        let records = response.remove(key).unwrap_or_default();
        return SliceResult::Row(shape_row(records));
    }

    let mut rows: HashMap<String, Row> = response
        .into_iter()
        .map(|(key, records)| (key, shape_row(records)))
        .collect();
    for key in keys {
        rows.entry(key.clone()).or_default();
    }
    SliceResult::Rows(rows)
}

/// Shape a `multiget_count` response for the requested keys.
pub fn shape_counts(keys: &[String], mut response: CountResponse) -> CountResult {
    if let [key] = keys {
        return CountResult::Count(response.remove(key).unwrap_or(0));
    }

    for key in keys {
        response.entry(key.clone()).or_insert(0);
    }
    CountResult::Counts(response)
}
