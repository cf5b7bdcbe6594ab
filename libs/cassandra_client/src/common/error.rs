/// Failures reported by the RPC collaborator.
///
/// These mirror the exceptions a Thrift-era Cassandra node raises. Only
/// `Transport` describes the socket itself; everything else is a rejected
/// request on a healthy connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RpcError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not enough replicas available for the requested consistency level")]
    Unavailable,

    #[error("Request timed out")]
    TimedOut,

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),
}

impl RpcError {
    /// Whether the failure came from the transport rather than the server.
    pub fn is_transport(&self) -> bool {
        matches!(self, RpcError::Transport(_))
    }
}

/// Unified client error type
///
/// Setup-phase failures (`Connection`, `Authentication`, `KeyspaceNotFound`,
/// `SchemaFetch`, `ColumnFamilyNotFound`) are broadcast to every subscriber of
/// the connection. Per-call failures are only returned to the caller that
/// issued the call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Login rejected by the server
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The requested keyspace does not exist
    #[error("Keyspace not found: {0}")]
    KeyspaceNotFound(String),

    /// Keyspace metadata could not be fetched or applied
    #[error("Failed to fetch schema for keyspace '{keyspace}': {reason}")]
    SchemaFetch { keyspace: String, reason: String },

    /// The column family is absent from the active keyspace
    #[error("Column Family {0} does not exist.")]
    ColumnFamilyNotFound(String),

    /// A single operation failed at the RPC layer
    #[error("Operation failed: {0}")]
    Operation(#[from] RpcError),

    /// The "host:port" address could not be parsed
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Call arguments did not match any accepted shape
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The connection has no live RPC client
    #[error("Not connected")]
    NotConnected,

    /// `connect` was called while connecting or after a successful connect
    #[error("Already connected or connecting")]
    AlreadyConnected,

    /// The owner was closed before the call could run
    #[error("Connection closed")]
    Closed,
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Future returned by gated operations; owns everything it needs
pub type ClientFuture<T> = futures::future::BoxFuture<'static, ClientResult<T>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_error_converts_to_operation_error() {
        let err: ClientError = RpcError::TimedOut.into();
        assert_eq!(err, ClientError::Operation(RpcError::TimedOut));
        assert_eq!(err.to_string(), "Operation failed: Request timed out");
    }

    #[test]
    fn test_column_family_not_found_message() {
        let err = ClientError::ColumnFamilyNotFound("Missing".to_string());
        assert_eq!(err.to_string(), "Column Family Missing does not exist.");
    }

    #[test]
    fn test_transport_classification() {
        assert!(RpcError::Transport("reset".to_string()).is_transport());
        assert!(!RpcError::Unavailable.is_transport());
    }
}
