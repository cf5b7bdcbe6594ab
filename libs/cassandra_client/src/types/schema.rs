use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumString};

/// Whether rows hold plain columns or super columns
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
pub enum ColumnFamilyKind {
    #[default]
    Standard,
    Super,
}

/// Column family definition as returned by `describe_keyspace`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnFamilyDefinition {
    pub keyspace: String,
    pub name: String,
    pub column_type: ColumnFamilyKind,
    pub comparator_type: Option<String>,
    pub subcomparator_type: Option<String>,
    pub comment: Option<String>,
    pub default_validation_class: Option<String>,
    pub gc_grace_seconds: Option<i32>,
}

impl ColumnFamilyDefinition {
    pub fn new(keyspace: impl Into<String>, name: impl Into<String>, kind: ColumnFamilyKind) -> Self {
        Self {
            keyspace: keyspace.into(),
            name: name.into(),
            column_type: kind,
            comparator_type: None,
            subcomparator_type: None,
            comment: None,
            default_validation_class: None,
            gc_grace_seconds: None,
        }
    }

    pub fn is_super(&self) -> bool {
        self.column_type == ColumnFamilyKind::Super
    }
}

/// Keyspace definition as returned by `describe_keyspace`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyspaceDefinition {
    pub name: String,
    pub strategy_class: String,
    pub strategy_options: BTreeMap<String, String>,
    pub replication_factor: Option<i32>,
    pub cf_defs: Vec<ColumnFamilyDefinition>,
}

impl KeyspaceDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            strategy_class: "org.apache.cassandra.locator.SimpleStrategy".to_string(),
            strategy_options: BTreeMap::new(),
            replication_factor: Some(1),
            cf_defs: Vec::new(),
        }
    }

    /// Add a column family definition (builder style)
    pub fn with_column_family(mut self, name: impl Into<String>, kind: ColumnFamilyKind) -> Self {
        let def = ColumnFamilyDefinition::new(self.name.clone(), name, kind);
        self.cf_defs.push(def);
        self
    }

    /// Index the column family definitions by name
    pub fn column_families(&self) -> BTreeMap<String, ColumnFamilyDefinition> {
        self.cf_defs
            .iter()
            .map(|cf| (cf.name.clone(), cf.clone()))
            .collect()
    }
}
