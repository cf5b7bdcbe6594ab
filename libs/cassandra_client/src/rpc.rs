//! Seam to the external RPC client
//!
//! Framing, serialization and socket handling live behind these traits. The
//! client only builds request values and interprets the replies.

use async_trait::async_trait;
use std::sync::Arc;

use crate::common::RpcError;
use crate::config::{Credentials, ServerAddress};
use crate::types::{
    ColumnParent, ConsistencyLevel, CountResponse, KeyspaceDefinition, MutationMap,
    SlicePredicate, SliceResponse,
};

/// Result type alias for RPC calls
pub type RpcResult<T> = Result<T, RpcError>;

/// Generated-stub style interface of a Cassandra node
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CassandraRpc: Send + Sync {
    /// Authenticate the session
    async fn login(&self, credentials: &Credentials) -> RpcResult<()>;

    /// Fetch keyspace metadata, including column family definitions
    async fn describe_keyspace(&self, keyspace: &str) -> RpcResult<KeyspaceDefinition>;

    /// Bind the session to a keyspace
    async fn set_keyspace(&self, keyspace: &str) -> RpcResult<()>;

    async fn describe_cluster_name(&self) -> RpcResult<String>;

    async fn describe_version(&self) -> RpcResult<String>;

    /// Read a slice of columns for each key
    async fn multiget_slice(
        &self,
        keys: &[String],
        column_parent: &ColumnParent,
        predicate: &SlicePredicate,
        consistency_level: ConsistencyLevel,
    ) -> RpcResult<SliceResponse>;

    /// Count the columns a slice would return for each key
    async fn multiget_count(
        &self,
        keys: &[String],
        column_parent: &ColumnParent,
        predicate: &SlicePredicate,
        consistency_level: ConsistencyLevel,
    ) -> RpcResult<CountResponse>;

    /// Apply inserts and deletions atomically per row
    async fn batch_mutate(
        &self,
        mutation_map: MutationMap,
        consistency_level: ConsistencyLevel,
    ) -> RpcResult<()>;

    /// Remove every row of a column family
    async fn truncate(&self, column_family: &str) -> RpcResult<()>;

    /// End the session
    async fn close(&self);
}

/// Opens sessions to a node
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, address: &ServerAddress) -> RpcResult<Arc<dyn CassandraRpc>>;
}
