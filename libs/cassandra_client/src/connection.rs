//! Connection to a Cassandra node
//!
//! A `Connection` owns one session, the default consistency levels, the
//! write clock, and the set of column family handles created from it.
//!
//! # Readiness
//!
//! The connection is ready once the transport is connected, the login (if
//! any) succeeded and the initial keyspace (if any) was resolved. Handles are
//! ready once the keyspace metadata has been fetched and their family found in
//! it. Until then calls on them are queued and replayed in order.
//!
//! If setup fails the owner never becomes ready and queued calls stay queued.
//! Subscribers receive the failure as [`ClientEvent::Error`]; [`Connection::close`]
//! releases every waiting caller with [`ClientError::Closed`]. A failed
//! `connect` may be retried; a second `connect` while one is running or after
//! one succeeded is rejected with [`ClientError::AlreadyConnected`].
//!
//! Queued calls hold neither their handle nor the connection gate. Dropping
//! every clone of a handle (or of the connection) drops the calls still queued
//! on it, and their futures resolve to [`ClientError::Closed`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use tokio::sync::broadcast;
use tracing::{Instrument, Span, debug, info, instrument, warn};

use crate::column_family::{ColumnFamily, HandleShared};
use crate::common::{ClientError, ClientFuture, ClientResult, RpcError};
use crate::config::{ClientConfig, Credentials};
use crate::events::ClientEvent;
use crate::gate::ReadinessGate;
use crate::health::{ServerInfo, fetch_server_info};
use crate::mutation::WriteClock;
use crate::rpc::{CassandraRpc, Transport};
use crate::types::{ColumnFamilyDefinition, ConsistencyLevels, ConsistencyUpdate};

const EVENT_CAPACITY: usize = 64;

/// Metadata of the active keyspace
#[derive(Debug, Clone)]
pub(crate) struct KeyspaceState {
    pub(crate) name: String,
    pub(crate) column_families: BTreeMap<String, ColumnFamilyDefinition>,
}

pub(crate) struct ConnectionInner {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    rpc: RwLock<Option<Arc<dyn CassandraRpc>>>,
    gate: Arc<ReadinessGate>,
    levels: RwLock<ConsistencyLevels>,
    pub(crate) clock: WriteClock,
    events: broadcast::Sender<ClientEvent>,
    keyspace: RwLock<Option<KeyspaceState>>,
    handles: Mutex<Vec<Weak<HandleShared>>>,
    server_info: RwLock<Option<ServerInfo>>,
    connecting: AtomicBool,
    closed: AtomicBool,
}

/// Cheaply cloneable handle to one logical session
///
/// # Example
///
/// ```ignore
/// use cassandra_client::Connection;
/// use serde_json::json;
///
/// let connection = Connection::new("localhost:9160", transport)?;
/// let users = connection.column_family("Standard");
///
/// // Issued before connect: queued, then replayed in order.
/// let write = users.set("todd", &json!({"first_name": "Todd", "age": 24}));
///
/// connection.connect(Some("node_cassandra_test"), None).await?;
/// write.await?;
///
/// let row = users.get("todd", ()).await?.into_row();
/// ```
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("address", &self.inner.config.address.to_string())
            .field("keyspace", &self.keyspace())
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl Connection {
    /// Create a connection for a `"host:port"` address. Nothing is sent
    /// until [`Connection::connect`].
    pub fn new(address: &str, transport: Arc<dyn Transport>) -> ClientResult<Self> {
        Ok(Self::with_config(ClientConfig::from_address(address)?, transport))
    }

    pub fn with_config(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let gate = ReadinessGate::new(format!("connection {}", config.address));
        let levels = config.consistency;

        Self {
            inner: Arc::new(ConnectionInner {
                config,
                transport,
                rpc: RwLock::new(None),
                gate,
                levels: RwLock::new(levels),
                clock: WriteClock::new(),
                events,
                keyspace: RwLock::new(None),
                handles: Mutex::new(Vec::new()),
                server_info: RwLock::new(None),
                connecting: AtomicBool::new(false),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Connect, log in and resolve the keyspace.
    ///
    /// `keyspace` and `credentials` fall back to the values in the config.
    /// Failures are returned and also broadcast as [`ClientEvent::Error`]; the
    /// connection can then be connected again. Calling `connect` while another
    /// call is in flight, or after one succeeded, returns
    /// [`ClientError::AlreadyConnected`] and changes nothing.
    #[instrument(skip(self, credentials), fields(address = %self.inner.config.address))]
    pub async fn connect(
        &self,
        keyspace: Option<&str>,
        credentials: Option<Credentials>,
    ) -> ClientResult<()> {
        let inner = &self.inner;
        if inner.closed.load(Ordering::Acquire) {
            return Err(ClientError::Closed);
        }
        if inner.connecting.swap(true, Ordering::AcqRel) {
            warn!("connect called while already connecting or connected");
            return Err(ClientError::AlreadyConnected);
        }

        let result = self.establish(keyspace, credentials).await;
        if result.is_err() {
            inner.connecting.store(false, Ordering::Release);
        }
        result
    }

    async fn establish(
        &self,
        keyspace: Option<&str>,
        credentials: Option<Credentials>,
    ) -> ClientResult<()> {
        let inner = &self.inner;
        let keyspace = keyspace
            .map(str::to_string)
            .or_else(|| inner.config.keyspace.clone());
        let credentials = credentials.or_else(|| inner.config.credentials.clone());

        info!("Attempting to connect to Cassandra at {}", inner.config.address);
        let rpc = match inner.transport.connect(&inner.config.address).await {
            Ok(rpc) => rpc,
            Err(e) => return Err(inner.setup_failed(ClientError::Connection(e.to_string()))),
        };
        *write_lock(&inner.rpc) = Some(Arc::clone(&rpc));

        if let Some(credentials) = credentials {
            debug!(username = %credentials.username, "logging in");
            if let Err(e) = rpc.login(&credentials).await {
                let err = match e {
                    RpcError::Transport(msg) => ClientError::Connection(msg),
                    RpcError::Authentication(msg) | RpcError::Authorization(msg) => {
                        ClientError::Authentication(msg)
                    }
                    other => ClientError::Authentication(other.to_string()),
                };
                return Err(inner.setup_failed(err));
            }
        }

        let server_info = fetch_server_info(rpc.as_ref()).await;
        debug!(?server_info, "server info");
        *write_lock(&inner.server_info) = Some(server_info);

        inner.emit(ClientEvent::Connected {
            address: inner.config.address.to_string(),
        });

        if let Some(keyspace) = keyspace {
            inner.resolve_keyspace(&keyspace).await?;
        }

        inner.gate.open();
        info!("Successfully connected to Cassandra");
        Ok(())
    }

    /// Switch to another keyspace.
    ///
    /// Queued until the connection is ready. Handles are re-validated against
    /// the new keyspace; a family missing from it stops accepting calls. While
    /// the switch runs, and after it failed, there is no active keyspace and
    /// no handle is ready.
    #[instrument(skip(self))]
    pub fn use_keyspace(&self, keyspace: &str) -> ClientFuture<()> {
        let inner = Arc::downgrade(&self.inner);
        let keyspace = keyspace.to_string();
        let span = Span::current();
        self.inner.gate.run(move || {
            async move {
                let inner = inner.upgrade().ok_or(ClientError::Closed)?;
                inner.leave_keyspace();
                inner.resolve_keyspace(&keyspace).await
            }
            .instrument(span)
        })
    }

    /// Get or set the default consistency levels.
    ///
    /// With `Some(update)` the defaults are replaced first (unset fields reset
    /// to QUORUM). Returns the defaults now in effect. Calls already issued keep
    /// the levels they captured.
    pub fn consistency_level(&self, update: Option<ConsistencyUpdate>) -> ConsistencyLevels {
        let mut levels = write_lock(&self.inner.levels);
        if let Some(update) = update {
            *levels = update.apply();
            debug!(read = %levels.read, write = %levels.write, "default consistency levels updated");
        }
        *levels
    }

    /// Current default consistency levels
    pub fn consistency_levels(&self) -> ConsistencyLevels {
        self.inner.levels()
    }

    /// Get a handle to a column family of the active keyspace.
    ///
    /// If the keyspace is already resolved the name is checked right away;
    /// an unknown family broadcasts [`ClientError::ColumnFamilyNotFound`] and
    /// the handle never becomes ready.
    pub fn column_family(&self, name: &str) -> ColumnFamily {
        let shared = HandleShared::new(name);
        lock(&self.inner.handles).push(Arc::downgrade(&shared));

        if read_lock(&self.inner.keyspace).is_some() {
            self.inner.validate_handle(&shared);
        }

        ColumnFamily::new(shared, Arc::clone(&self.inner))
    }

    /// Subscribe to connection events
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.inner.events.subscribe()
    }

    /// Close the session. Calls still queued on the connection or on any of
    /// its handles resolve to [`ClientError::Closed`].
    #[instrument(skip(self), fields(address = %self.inner.config.address))]
    pub async fn close(&self) {
        let inner = &self.inner;
        if inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        inner.gate.close();
        for handle in inner.live_handles() {
            handle.gate.close();
        }

        let rpc = write_lock(&inner.rpc).take();
        if let Some(rpc) = rpc {
            rpc.close().await;
        }

        info!("Connection closed");
        inner.emit(ClientEvent::Closed);
    }

    pub fn is_ready(&self) -> bool {
        self.inner.gate.is_ready()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Name of the active keyspace
    pub fn keyspace(&self) -> Option<String> {
        read_lock(&self.inner.keyspace)
            .as_ref()
            .map(|state| state.name.clone())
    }

    /// Cluster name and release version reported after connect
    pub fn server_info(&self) -> Option<ServerInfo> {
        read_lock(&self.inner.server_info).clone()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub(crate) fn rpc(&self) -> ClientResult<Arc<dyn CassandraRpc>> {
        self.inner.rpc()
    }
}

impl ConnectionInner {
    pub(crate) fn levels(&self) -> ConsistencyLevels {
        *read_lock(&self.levels)
    }

    pub(crate) fn rpc(&self) -> ClientResult<Arc<dyn CassandraRpc>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ClientError::Closed);
        }
        read_lock(&self.rpc).clone().ok_or(ClientError::NotConnected)
    }

    pub(crate) fn emit(&self, event: ClientEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    /// Turn a per-call RPC failure into the caller's error, broadcasting
    /// transport failures.
    pub(crate) fn call_failed(&self, err: RpcError) -> ClientError {
        if err.is_transport() {
            self.emit(ClientEvent::Error(ClientError::Connection(err.to_string())));
        }
        ClientError::Operation(err)
    }

    fn setup_failed(&self, err: ClientError) -> ClientError {
        warn!(error = %err, "connection setup failed");
        self.emit(ClientEvent::Error(err.clone()));
        err
    }

    async fn resolve_keyspace(&self, keyspace: &str) -> ClientResult<()> {
        let rpc = self.rpc()?;

        let definition = match rpc.describe_keyspace(keyspace).await {
            Ok(definition) => definition,
            Err(RpcError::NotFound(_)) => {
                return Err(self.setup_failed(ClientError::KeyspaceNotFound(keyspace.to_string())));
            }
            Err(e) => {
                return Err(self.setup_failed(ClientError::SchemaFetch {
                    keyspace: keyspace.to_string(),
                    reason: e.to_string(),
                }));
            }
        };

        if let Err(e) = rpc.set_keyspace(keyspace).await {
            let err = match e {
                RpcError::NotFound(_) => ClientError::KeyspaceNotFound(keyspace.to_string()),
                other => ClientError::SchemaFetch {
                    keyspace: keyspace.to_string(),
                    reason: other.to_string(),
                },
            };
            return Err(self.setup_failed(err));
        }

        let column_families = definition.column_families();
        let names: Vec<String> = column_families.keys().cloned().collect();
        *write_lock(&self.keyspace) = Some(KeyspaceState {
            name: keyspace.to_string(),
            column_families,
        });

        info!(keyspace = %keyspace, column_families = names.len(), "Using keyspace '{}'", keyspace);
        self.emit(ClientEvent::KeyspaceSet {
            keyspace: keyspace.to_string(),
            column_families: names,
        });

        for handle in self.live_handles() {
            self.validate_handle(&handle);
        }
        Ok(())
    }

    fn validate_handle(&self, handle: &Arc<HandleShared>) {
        let definition = read_lock(&self.keyspace)
            .as_ref()
            .and_then(|state| state.column_families.get(handle.name()).cloned());

        match definition {
            Some(definition) => {
                debug!(column_family = %handle.name(), kind = %definition.column_type, "column family ready");
                handle.set_definition(definition);
                handle.gate.open();
            }
            None => {
                handle.gate.shut();
                let err = ClientError::ColumnFamilyNotFound(handle.name().to_string());
                warn!(error = %err, "column family lookup failed");
                self.emit(ClientEvent::Error(err));
            }
        }
    }

    /// Forget the active keyspace and stop every handle until the next one
    /// is resolved.
    fn leave_keyspace(&self) {
        if let Some(previous) = write_lock(&self.keyspace).take() {
            debug!(keyspace = %previous.name, "leaving keyspace");
        }
        for handle in self.live_handles() {
            handle.gate.shut();
        }
    }

    fn live_handles(&self) -> Vec<Arc<HandleShared>> {
        let mut handles = lock(&self.handles);
        handles.retain(|weak| weak.strong_count() > 0);
        handles.iter().filter_map(Weak::upgrade).collect()
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::{MockCassandraRpc, MockTransport};
    use crate::types::{ColumnFamilyKind, ConsistencyLevel, KeyspaceDefinition};

    fn keyspace() -> KeyspaceDefinition {
        KeyspaceDefinition::new("node_cassandra_test")
            .with_column_family("Standard1", ColumnFamilyKind::Standard)
            .with_column_family("Super1", ColumnFamilyKind::Super)
    }

    fn healthy_rpc() -> MockCassandraRpc {
        let mut rpc = MockCassandraRpc::new();
        rpc.expect_describe_cluster_name()
            .returning(|| Ok("Test Cluster".to_string()));
        rpc.expect_describe_version()
            .returning(|| Ok("19.4.0".to_string()));
        rpc.expect_describe_keyspace().returning(|name| {
            if name == "node_cassandra_test" {
                Ok(keyspace())
            } else {
                Err(RpcError::NotFound(name.to_string()))
            }
        });
        rpc.expect_set_keyspace().returning(|_| Ok(()));
        rpc.expect_close().returning(|| ());
        rpc
    }

    fn transport_for(rpc: MockCassandraRpc) -> Arc<dyn Transport> {
        let rpc: Arc<dyn CassandraRpc> = Arc::new(rpc);
        let mut transport = MockTransport::new();
        transport
            .expect_connect()
            .returning(move |_| Ok(Arc::clone(&rpc)));
        Arc::new(transport)
    }

    fn connection(rpc: MockCassandraRpc) -> Connection {
        Connection::new("localhost:9160", transport_for(rpc)).unwrap()
    }

    #[test]
    fn test_new_rejects_bad_address() {
        let transport: Arc<dyn Transport> = Arc::new(MockTransport::new());
        let result = Connection::new("localhost:not-a-port", transport);
        assert!(matches!(result, Err(ClientError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn test_connect_resolves_keyspace() {
        let conn = connection(healthy_rpc());
        let mut events = conn.subscribe();
        assert!(!conn.is_ready());

        conn.connect(Some("node_cassandra_test"), None).await.unwrap();

        assert!(conn.is_ready());
        assert_eq!(conn.keyspace().as_deref(), Some("node_cassandra_test"));
        let info = conn.server_info().unwrap();
        assert_eq!(info.cluster_name.as_deref(), Some("Test Cluster"));

        assert_eq!(
            events.recv().await.unwrap(),
            ClientEvent::Connected {
                address: "localhost:9160".to_string()
            }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            ClientEvent::KeyspaceSet {
                keyspace: "node_cassandra_test".to_string(),
                column_families: vec!["Standard1".to_string(), "Super1".to_string()],
            }
        );
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let mut transport = MockTransport::new();
        transport
            .expect_connect()
            .returning(|_| Err(RpcError::Transport("connection refused".to_string())));
        let conn = Connection::new("localhost:9160", Arc::new(transport)).unwrap();
        let mut events = conn.subscribe();

        let result = conn.connect(None, None).await;

        assert!(matches!(result, Err(ClientError::Connection(_))));
        assert!(matches!(
            events.recv().await.unwrap(),
            ClientEvent::Error(ClientError::Connection(_))
        ));
        assert!(!conn.is_ready());
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let mut rpc = healthy_rpc();
        rpc.expect_login()
            .returning(|_| Err(RpcError::Authentication("bad credentials".to_string())));
        let conn = connection(rpc);

        let result = conn
            .connect(None, Some(Credentials::new("todd", "wrong")))
            .await;

        assert_eq!(
            result,
            Err(ClientError::Authentication("bad credentials".to_string()))
        );
        assert!(!conn.is_ready());
    }

    #[tokio::test]
    async fn test_login_uses_configured_credentials() {
        let mut rpc = healthy_rpc();
        rpc.expect_login()
            .withf(|credentials| credentials.username == "todd")
            .times(1)
            .returning(|_| Ok(()));
        let config = ClientConfig::from_address("localhost:9160")
            .unwrap()
            .with_credentials(Credentials::new("todd", "secret"));
        let conn = Connection::with_config(config, transport_for(rpc));

        conn.connect(None, None).await.unwrap();
        assert!(conn.is_ready());
    }

    #[tokio::test]
    async fn test_unknown_keyspace_leaves_connection_not_ready() {
        let conn = connection(healthy_rpc());
        let mut events = conn.subscribe();

        let result = conn.connect(Some("missing"), None).await;

        assert_eq!(
            result,
            Err(ClientError::KeyspaceNotFound("missing".to_string()))
        );
        assert!(!conn.is_ready());
        assert!(matches!(events.recv().await.unwrap(), ClientEvent::Connected { .. }));
        assert_eq!(
            events.recv().await.unwrap(),
            ClientEvent::Error(ClientError::KeyspaceNotFound("missing".to_string()))
        );
    }

    #[tokio::test]
    async fn test_schema_fetch_failure() {
        let mut rpc = MockCassandraRpc::new();
        rpc.expect_describe_cluster_name()
            .returning(|| Ok("Test Cluster".to_string()));
        rpc.expect_describe_version()
            .returning(|| Ok("19.4.0".to_string()));
        rpc.expect_describe_keyspace()
            .returning(|_| Err(RpcError::TimedOut));
        let conn = connection(rpc);

        let result = conn.connect(Some("node_cassandra_test"), None).await;

        assert!(matches!(result, Err(ClientError::SchemaFetch { .. })));
        assert!(!conn.is_ready());
    }

    #[test]
    fn test_consistency_levels_get_and_set() {
        let conn = connection(MockCassandraRpc::new());

        assert_eq!(conn.consistency_level(None), ConsistencyLevels::default());

        let levels = conn.consistency_level(Some(
            ConsistencyUpdate::default()
                .read(ConsistencyLevel::One)
                .write(ConsistencyLevel::One),
        ));
        assert_eq!(
            levels,
            ConsistencyLevels::new(ConsistencyLevel::One, ConsistencyLevel::One)
        );
        assert_eq!(conn.consistency_levels(), levels);

        // An unset field falls back to QUORUM.
        let levels =
            conn.consistency_level(Some(ConsistencyUpdate::default().read(ConsistencyLevel::All)));
        assert_eq!(
            levels,
            ConsistencyLevels::new(ConsistencyLevel::All, ConsistencyLevel::Quorum)
        );
    }

    #[tokio::test]
    async fn test_column_family_validation() {
        let conn = connection(healthy_rpc());
        let early = conn.column_family("Standard1");
        assert!(!early.is_ready());

        conn.connect(Some("node_cassandra_test"), None).await.unwrap();
        assert!(early.is_ready());
        assert_eq!(early.kind(), ColumnFamilyKind::Standard);

        let late = conn.column_family("Super1");
        assert!(late.is_ready());
        assert!(late.is_super());

        let mut events = conn.subscribe();
        let missing = conn.column_family("Nope");
        assert!(!missing.is_ready());
        assert_eq!(
            events.recv().await.unwrap(),
            ClientEvent::Error(ClientError::ColumnFamilyNotFound("Nope".to_string()))
        );
    }

    #[tokio::test]
    async fn test_use_keyspace_revalidates_handles() {
        let mut rpc = MockCassandraRpc::new();
        rpc.expect_describe_cluster_name()
            .returning(|| Ok("Test Cluster".to_string()));
        rpc.expect_describe_version()
            .returning(|| Ok("19.4.0".to_string()));
        rpc.expect_describe_keyspace().returning(|name| {
            if name == "node_cassandra_test" {
                Ok(keyspace())
            } else {
                Ok(KeyspaceDefinition::new(name)
                    .with_column_family("Standard1", ColumnFamilyKind::Standard))
            }
        });
        rpc.expect_set_keyspace().returning(|_| Ok(()));
        let conn = connection(rpc);
        let standard = conn.column_family("Standard1");
        let sup = conn.column_family("Super1");

        conn.connect(Some("node_cassandra_test"), None).await.unwrap();
        assert!(sup.is_ready());

        conn.use_keyspace("other").await.unwrap();

        assert_eq!(conn.keyspace().as_deref(), Some("other"));
        assert!(standard.is_ready());
        assert!(!sup.is_ready());
    }

    #[tokio::test]
    async fn test_failed_keyspace_switch_leaves_no_active_keyspace() {
        let conn = connection(healthy_rpc());
        let early = conn.column_family("Standard1");
        conn.connect(Some("node_cassandra_test"), None).await.unwrap();
        assert!(early.is_ready());

        let result = conn.use_keyspace("missing").await;

        assert_eq!(
            result,
            Err(ClientError::KeyspaceNotFound("missing".to_string()))
        );
        assert_eq!(conn.keyspace(), None);
        assert!(!early.is_ready());
        let late = conn.column_family("Standard1");
        assert!(!late.is_ready());

        conn.use_keyspace("node_cassandra_test").await.unwrap();
        assert!(early.is_ready());
        assert!(late.is_ready());
    }

    #[tokio::test]
    async fn test_second_connect_is_rejected() {
        let rpc: Arc<dyn CassandraRpc> = Arc::new(healthy_rpc());
        let mut transport = MockTransport::new();
        transport
            .expect_connect()
            .times(1)
            .returning(move |_| Ok(Arc::clone(&rpc)));
        let conn = Connection::new("localhost:9160", Arc::new(transport)).unwrap();

        conn.connect(Some("node_cassandra_test"), None).await.unwrap();
        let again = conn.connect(Some("other"), None).await;

        assert_eq!(again, Err(ClientError::AlreadyConnected));
        assert!(conn.is_ready());
        assert_eq!(conn.keyspace().as_deref(), Some("node_cassandra_test"));
    }

    #[tokio::test]
    async fn test_connect_can_be_retried_after_failure() {
        let conn = connection(healthy_rpc());

        let first = conn.connect(Some("missing"), None).await;
        assert_eq!(
            first,
            Err(ClientError::KeyspaceNotFound("missing".to_string()))
        );

        conn.connect(Some("node_cassandra_test"), None).await.unwrap();
        assert!(conn.is_ready());
    }

    #[tokio::test]
    async fn test_close_releases_queued_calls() {
        let conn = connection(healthy_rpc());
        let mut events = conn.subscribe();
        let users = conn.column_family("Standard1");

        let queued = users.get("todd", ());
        let switch = conn.use_keyspace("node_cassandra_test");
        assert_eq!(users.pending(), 1);

        conn.close().await;

        assert_eq!(queued.await, Err(ClientError::Closed));
        assert_eq!(switch.await, Err(ClientError::Closed));
        assert!(conn.is_closed());
        assert_eq!(events.recv().await.unwrap(), ClientEvent::Closed);
        assert_eq!(
            conn.connect(None, None).await,
            Err(ClientError::Closed)
        );
    }
}
