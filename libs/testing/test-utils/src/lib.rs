//! Shared test utilities for the Cassandra client
//!
//! This crate provides reusable test infrastructure:
//! - `MemoryStore`: in-memory node implementing the client's RPC seam
//! - `MemoryTransport`: transport handing out a `MemoryStore`, optionally
//!   refusing or holding connections
//! - `init_tracing`: test-friendly tracing subscriber
//! - `TestDataBuilder`: Deterministic test data generation
//! - `assertions`: Custom assertion helpers
//!
//! # Usage
//!
//! ```rust,ignore
//! use cassandra_client::Connection;
//! use test_utils::{MemoryStore, MemoryTransport, TEST_KEYSPACE};
//!
//! #[tokio::test]
//! async fn my_client_test() {
//!     let store = MemoryStore::with_test_keyspace();
//!     let conn = Connection::new("localhost:9160", MemoryTransport::new(store.clone())).unwrap();
//!     conn.connect(Some(TEST_KEYSPACE), None).await.unwrap();
//!
//!     let users = conn.column_family("Standard");
//!     users.set("todd", &serde_json::json!({"age": 24})).await.unwrap();
//!     assert_eq!(store.call_names().last().unwrap(), "batch_mutate");
//! }
//! ```

use cassandra_client::types::{ColumnFamilyKind, KeyspaceDefinition};

mod memory;
pub mod tracing;

pub use memory::{API_VERSION, CLUSTER_NAME, MemoryStore, MemoryTransport, RecordedCall};
pub use crate::tracing::init_tracing;

/// Keyspace created by [`MemoryStore::with_test_keyspace`]
pub const TEST_KEYSPACE: &str = "node_cassandra_test";

/// `node_cassandra_test` with a `Standard` and a `Super` column family
pub fn test_keyspace() -> KeyspaceDefinition {
    KeyspaceDefinition::new(TEST_KEYSPACE)
        .with_column_family("Standard", ColumnFamilyKind::Standard)
        .with_column_family("Super", ColumnFamilyKind::Super)
}

/// Builder for test data with deterministic randomization
///
/// This ensures tests are reproducible by using seeded random data.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    /// Create a new builder with a seed (for deterministic tests)
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_multiget");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Generate a row key unique to this builder
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::new(7);
    /// assert_eq!(builder.row_key("user"), "user-7");
    /// ```
    pub fn row_key(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.seed)
    }

    /// `count` column names with values, in column order
    ///
    /// Names are zero-padded so byte order matches numeric order.
    pub fn columns(&self, count: usize) -> Vec<(String, String)> {
        (0..count)
            .map(|i| {
                (
                    format!("col{:03}", i),
                    format!("{}", self.seed.wrapping_add(i as u64)),
                )
            })
            .collect()
    }
}

/// Test assertion helpers
pub mod assertions {
    use cassandra_client::{Cell, Row};

    /// Assert that a row holds exactly `expected` plain columns
    pub fn assert_row_eq(row: &Row, expected: &[(&str, &str)], context: &str) {
        let actual: Vec<(&str, &str)> = row
            .iter()
            .map(|(name, cell)| (name.as_str(), cell.as_value().unwrap_or("<super column>")))
            .collect();
        let mut expected = expected.to_vec();
        expected.sort();
        assert_eq!(actual, expected, "{}: row mismatch", context);
    }

    /// Assert that a row holds a super column with exactly `expected` sub-columns
    pub fn assert_super_column_eq(
        row: &Row,
        super_column: &str,
        expected: &[(&str, &str)],
        context: &str,
    ) {
        let Some(Cell::Super(columns)) = row.get(super_column) else {
            panic!("{}: expected super column '{}' in {:?}", context, super_column, row);
        };
        let actual: Vec<(&str, &str)> = columns
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect();
        let mut expected = expected.to_vec();
        expected.sort();
        assert_eq!(actual, expected, "{}: super column mismatch", context);
    }

    /// Assert that an optional value is Some
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }
}
