//! Client-side data access for Cassandra column families
//!
//! This library turns loosely-shaped call arguments into slice queries and
//! batch mutations, queues calls until the connection and keyspace metadata
//! are ready, and reshapes the replies into nested maps.
//!
//! The wire transport itself is an external collaborator, reached through
//! the [`Transport`] and [`CassandraRpc`] traits.
//!
//! # Examples
//!
//! ## Reads and writes
//!
//! ```ignore
//! use cassandra_client::{Connection, QueryOptions};
//! use serde_json::json;
//!
//! let conn = Connection::new("127.0.0.1:9160", transport)?;
//! let users = conn.column_family("Standard1");
//!
//! // Queued until connect() finishes, then replayed in order
//! let pending = users.set("todd", &json!({"id": "1", "age": 24}));
//! conn.connect(Some("node_cassandra_test"), None).await?;
//! pending.await?;
//!
//! let row = users.get("todd", ()).await?.into_row();
//! let first = users.get("todd", QueryOptions::new().count(1)).await?;
//! ```
//!
//! ## Super column families
//!
//! ```ignore
//! let people = conn.column_family("Super1");
//! people
//!     .set("edgar", &json!({"address": {"city": "Madison", "state": "WI"}}))
//!     .await?;
//! let city = people.get("edgar", ("address", ["city"])).await?;
//! ```
//!
//! ## Configuration
//!
//! ```ignore
//! use cassandra_client::{ClientConfig, Connection, FromEnv};
//!
//! let config = ClientConfig::from_env()?;
//! let conn = Connection::with_config(config, transport);
//! ```

pub mod column_family;
pub mod common;
pub mod config;
pub mod connection;
pub mod events;
mod gate;
pub mod health;
pub mod mutation;
pub mod query;
pub mod rpc;
pub mod shaper;
pub mod types;

// Re-exports for convenience
pub use column_family::{ColumnFamily, RowKeys};
pub use common::{ClientError, ClientFuture, ClientResult, RpcError};
pub use config::{ClientConfig, ConfigError, Credentials, FromEnv, ServerAddress};
pub use connection::Connection;
pub use events::ClientEvent;
pub use health::{HealthStatus, ServerInfo, check_health, check_health_detailed};
pub use query::{IntoQueryArgs, QueryArg, QueryOptions, WriteOptions};
pub use rpc::{CassandraRpc, RpcResult, Transport};
pub use shaper::{Cell, CountResult, Row, SliceResult};
pub use types::{
    ColumnFamilyDefinition, ColumnFamilyKind, ConsistencyLevel, ConsistencyLevels,
    ConsistencyUpdate, KeyspaceDefinition,
};
