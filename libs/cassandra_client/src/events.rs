use crate::common::ClientError;

/// Notifications broadcast to every subscriber of a [`crate::Connection`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Transport connected and, if credentials were given, logged in
    Connected { address: String },

    /// Keyspace metadata fetched and the session bound to it
    KeyspaceSet {
        keyspace: String,
        column_families: Vec<String>,
    },

    /// A setup failure, or a transport failure seen by any call
    Error(ClientError),

    Closed,
}
