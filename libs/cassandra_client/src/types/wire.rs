//! Request and response shapes exchanged with the RPC collaborator

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Slice range defaults
pub const DEFAULT_SLICE_COUNT: i32 = 100;

/// A single named value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub value: String,
    pub timestamp: i64,
}

impl Column {
    pub fn new(name: impl Into<String>, value: impl Into<String>, timestamp: i64) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            timestamp,
        }
    }
}

/// A named group of sub-columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperColumn {
    pub name: String,
    pub columns: Vec<Column>,
}

/// Union record returned by slices and carried by inserts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnOrSuperColumn {
    Column(Column),
    SuperColumn(SuperColumn),
}

/// Targeting info: column family plus optional super column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnParent {
    pub column_family: String,
    pub super_column: Option<String>,
}

impl ColumnParent {
    pub fn new(column_family: impl Into<String>) -> Self {
        Self {
            column_family: column_family.into(),
            super_column: None,
        }
    }

    pub fn with_super_column(mut self, super_column: impl Into<String>) -> Self {
        self.super_column = Some(super_column.into());
        self
    }
}

/// Contiguous range of column names
///
/// Empty `start`/`finish` mean unbounded. With `reversed`, iteration starts
/// from the high end and `start` is the upper bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceRange {
    pub start: String,
    pub finish: String,
    pub reversed: bool,
    pub count: i32,
}

impl Default for SliceRange {
    fn default() -> Self {
        Self {
            start: String::new(),
            finish: String::new(),
            reversed: false,
            count: DEFAULT_SLICE_COUNT,
        }
    }
}

/// Column selection: explicit names or a range, never both
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlicePredicate {
    ColumnNames(Vec<String>),
    SliceRange(SliceRange),
}

impl SlicePredicate {
    pub fn column_names(&self) -> Option<&[String]> {
        match self {
            SlicePredicate::ColumnNames(names) => Some(names),
            SlicePredicate::SliceRange(_) => None,
        }
    }
}

impl Default for SlicePredicate {
    fn default() -> Self {
        SlicePredicate::SliceRange(SliceRange::default())
    }
}

/// Removal of a row, a super column, or named columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deletion {
    pub timestamp: i64,
    pub super_column: Option<String>,
    /// Only ever `SlicePredicate::ColumnNames`
    pub predicate: Option<SlicePredicate>,
}

/// One entry of a batch mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutation {
    Insert(ColumnOrSuperColumn),
    Deletion(Deletion),
}

/// row key -> column family -> mutations
pub type MutationMap = HashMap<String, HashMap<String, Vec<Mutation>>>;

/// row key -> records returned by `multiget_slice`
pub type SliceResponse = HashMap<String, Vec<ColumnOrSuperColumn>>;

/// row key -> column count returned by `multiget_count`
pub type CountResponse = HashMap<String, i32>;
