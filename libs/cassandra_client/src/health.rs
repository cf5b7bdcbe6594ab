use std::time::Instant;
use tracing::warn;

use crate::connection::Connection;
use crate::rpc::CassandraRpc;

/// Health check status for a Cassandra node
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Whether the node answered
    pub healthy: bool,
    /// Optional message (e.g., error details)
    pub message: Option<String>,
    /// Response time in milliseconds
    pub response_time_ms: u64,
    /// Release version reported by the node
    pub version: Option<String>,
}

/// Cluster information gathered right after connect
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerInfo {
    pub cluster_name: Option<String>,
    pub release_version: Option<String>,
}

pub(crate) async fn fetch_server_info(rpc: &dyn CassandraRpc) -> ServerInfo {
    let cluster_name = match rpc.describe_cluster_name().await {
        Ok(name) => Some(name),
        Err(e) => {
            warn!("Failed to describe cluster name: {}", e);
            None
        }
    };
    let release_version = match rpc.describe_version().await {
        Ok(version) => Some(version),
        Err(e) => {
            warn!("Failed to describe version: {}", e);
            None
        }
    };

    ServerInfo {
        cluster_name,
        release_version,
    }
}

/// Check node health with a `describe_version` round trip
///
/// # Example
/// ```ignore
/// use cassandra_client::health::check_health;
///
/// let healthy = check_health(&connection).await;
/// ```
pub async fn check_health(connection: &Connection) -> bool {
    match connection.rpc() {
        Ok(rpc) => rpc.describe_version().await.is_ok(),
        Err(_) => false,
    }
}

/// Check node health with detailed status
///
/// Returns timing information, version, and any error messages.
///
/// # Example
/// ```ignore
/// use cassandra_client::health::check_health_detailed;
///
/// let status = check_health_detailed(&connection).await;
/// if status.healthy {
///     println!("Cassandra healthy, version: {:?}, latency: {}ms",
///         status.version, status.response_time_ms);
/// } else {
///     println!("Cassandra unhealthy: {:?}", status.message);
/// }
/// ```
pub async fn check_health_detailed(connection: &Connection) -> HealthStatus {
    let start = Instant::now();

    let result = match connection.rpc() {
        Ok(rpc) => rpc.describe_version().await.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };
    let response_time_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(version) => HealthStatus {
            healthy: true,
            message: None,
            response_time_ms,
            version: Some(version),
        },
        Err(message) => HealthStatus {
            healthy: false,
            message: Some(message),
            response_time_ms,
            version: None,
        },
    }
}
