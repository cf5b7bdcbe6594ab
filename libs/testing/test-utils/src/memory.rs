//! In-memory Cassandra node
//!
//! `MemoryStore` answers the same RPCs a Thrift-era node does, with the same
//! ordering and slicing rules, so client behaviour can be tested end to end
//! without a cluster. One store models one session: the keyspace set by
//! `set_keyspace` and the login state are shared by every caller.

use async_trait::async_trait;
use cassandra_client::rpc::{CassandraRpc, RpcResult, Transport};
use cassandra_client::types::{
    Column, ColumnFamilyKind, ColumnOrSuperColumn, ColumnParent, ConsistencyLevel,
    CountResponse, Deletion, KeyspaceDefinition, Mutation, MutationMap, SlicePredicate,
    SliceRange, SliceResponse, SuperColumn,
};
use cassandra_client::{Credentials, RpcError, ServerAddress};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tracing::debug;

pub const CLUSTER_NAME: &str = "Test Cluster";
pub const API_VERSION: &str = "19.4.0";

/// One RPC as the store saw it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub method: String,
    pub consistency_level: Option<ConsistencyLevel>,
}

#[derive(Debug, Clone)]
struct Stored {
    value: String,
    timestamp: i64,
}

type Columns = BTreeMap<String, Stored>;

enum FamilyRows {
    Standard(BTreeMap<String, Columns>),
    Super(BTreeMap<String, BTreeMap<String, Columns>>),
}

impl FamilyRows {
    fn new(kind: ColumnFamilyKind) -> Self {
        match kind {
            ColumnFamilyKind::Standard => FamilyRows::Standard(BTreeMap::new()),
            ColumnFamilyKind::Super => FamilyRows::Super(BTreeMap::new()),
        }
    }
}

struct KeyspaceData {
    definition: KeyspaceDefinition,
    families: HashMap<String, FamilyRows>,
}

#[derive(Default)]
struct StoreState {
    keyspaces: HashMap<String, KeyspaceData>,
    required_credentials: Option<Credentials>,
    logged_in: bool,
    keyspace: Option<String>,
    calls: Vec<RecordedCall>,
    failures: HashMap<String, RpcError>,
}

/// In-memory implementation of [`CassandraRpc`]
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Store holding [`crate::test_keyspace`]
    pub fn with_test_keyspace() -> Arc<Self> {
        let store = Self::new();
        store.add_keyspace(crate::test_keyspace());
        store
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create (or replace) a keyspace with empty column families
    pub fn add_keyspace(&self, definition: KeyspaceDefinition) {
        let families = definition
            .cf_defs
            .iter()
            .map(|def| (def.name.clone(), FamilyRows::new(def.column_type)))
            .collect();
        self.state().keyspaces.insert(
            definition.name.clone(),
            KeyspaceData {
                definition,
                families,
            },
        );
    }

    /// Reject every keyspace access until `login` succeeds with `credentials`
    pub fn require_credentials(&self, credentials: Credentials) {
        let mut state = self.state();
        state.required_credentials = Some(credentials);
        state.logged_in = false;
    }

    /// Make the next call to `method` fail with `error`
    pub fn fail_next(&self, method: &str, error: RpcError) {
        self.state().failures.insert(method.to_string(), error);
    }

    /// Every call received so far, oldest first
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    /// Method names of every call received so far, oldest first
    pub fn call_names(&self) -> Vec<String> {
        self.state()
            .calls
            .iter()
            .map(|call| call.method.clone())
            .collect()
    }

    /// Timestamp stored for a column, `super_column` selecting the nesting
    pub fn column_timestamp(
        &self,
        column_family: &str,
        key: &str,
        super_column: Option<&str>,
        column: &str,
    ) -> Option<i64> {
        let state = self.state();
        let keyspace = state.keyspace.as_ref()?;
        let rows = state.keyspaces.get(keyspace)?.families.get(column_family)?;
        let stored = match (rows, super_column) {
            (FamilyRows::Standard(rows), None) => rows.get(key)?.get(column)?,
            (FamilyRows::Super(rows), Some(sc)) => rows.get(key)?.get(sc)?.get(column)?,
            _ => return None,
        };
        Some(stored.timestamp)
    }
}

/// Record `method`, then apply any failure queued for it.
fn enter(
    state: &mut StoreState,
    method: &str,
    consistency_level: Option<ConsistencyLevel>,
) -> RpcResult<()> {
    debug!(method, ?consistency_level, "memory store call");
    state.calls.push(RecordedCall {
        method: method.to_string(),
        consistency_level,
    });
    match state.failures.remove(method) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn check_login(state: &StoreState) -> RpcResult<()> {
    if state.required_credentials.is_some() && !state.logged_in {
        return Err(RpcError::Authorization(
            "you have not logged in".to_string(),
        ));
    }
    Ok(())
}

fn current_keyspace(state: &mut StoreState) -> RpcResult<&mut KeyspaceData> {
    check_login(state)?;
    let name = state.keyspace.clone().ok_or_else(|| {
        RpcError::InvalidRequest("You have not set a keyspace for this session".to_string())
    })?;
    state
        .keyspaces
        .get_mut(&name)
        .ok_or_else(|| RpcError::InvalidRequest(format!("Keyspace {} does not exist", name)))
}

fn family<'a>(keyspace: &'a mut KeyspaceData, name: &str) -> RpcResult<&'a mut FamilyRows> {
    keyspace
        .families
        .get_mut(name)
        .ok_or_else(|| RpcError::InvalidRequest(format!("unconfigured columnfamily {}", name)))
}

/// Entries of `map` selected by `predicate`, in traversal order
fn select<'a, V>(
    map: &'a BTreeMap<String, V>,
    predicate: &SlicePredicate,
) -> RpcResult<Vec<(&'a String, &'a V)>> {
    match predicate {
        SlicePredicate::ColumnNames(names) => Ok(map
            .iter()
            .filter(|(name, _)| names.contains(name))
            .collect()),
        SlicePredicate::SliceRange(range) => select_range(map, range),
    }
}

fn select_range<'a, V>(
    map: &'a BTreeMap<String, V>,
    range: &SliceRange,
) -> RpcResult<Vec<(&'a String, &'a V)>> {
    if range.count < 0 {
        return Err(RpcError::InvalidRequest(
            "get_slice requires non-negative count".to_string(),
        ));
    }
    // A reversed slice walks from `start` down to `finish`.
    let (low, high) = if range.reversed {
        (range.finish.as_str(), range.start.as_str())
    } else {
        (range.start.as_str(), range.finish.as_str())
    };
    if !low.is_empty() && !high.is_empty() && low > high {
        return Err(RpcError::InvalidRequest(
            "range finish must come after start in the order of traversal".to_string(),
        ));
    }

    let entries = map.range::<str, _>((bound(low), bound(high)));
    let count = range.count as usize;
    Ok(if range.reversed {
        entries.rev().take(count).collect()
    } else {
        entries.take(count).collect()
    })
}

fn bound(name: &str) -> Bound<&str> {
    if name.is_empty() {
        Bound::Unbounded
    } else {
        Bound::Included(name)
    }
}

fn to_column(name: &str, stored: &Stored) -> Column {
    Column::new(name, stored.value.clone(), stored.timestamp)
}

fn slice_row(
    rows: &FamilyRows,
    key: &str,
    parent: &ColumnParent,
    predicate: &SlicePredicate,
) -> RpcResult<Vec<ColumnOrSuperColumn>> {
    match (rows, parent.super_column.as_deref()) {
        (FamilyRows::Standard(_), Some(_)) => Err(RpcError::InvalidRequest(format!(
            "{} is not a super column family",
            parent.column_family
        ))),
        (FamilyRows::Standard(rows), None) => {
            let Some(columns) = rows.get(key) else {
                return Ok(Vec::new());
            };
            Ok(select(columns, predicate)?
                .into_iter()
                .map(|(name, stored)| ColumnOrSuperColumn::Column(to_column(name, stored)))
                .collect())
        }
        (FamilyRows::Super(rows), None) => {
            let Some(supers) = rows.get(key) else {
                return Ok(Vec::new());
            };
            Ok(select(supers, predicate)?
                .into_iter()
                .map(|(name, columns)| {
                    ColumnOrSuperColumn::SuperColumn(SuperColumn {
                        name: name.clone(),
                        columns: columns
                            .iter()
                            .map(|(name, stored)| to_column(name, stored))
                            .collect(),
                    })
                })
                .collect())
        }
        (FamilyRows::Super(rows), Some(super_column)) => {
            let Some(columns) = rows.get(key).and_then(|supers| supers.get(super_column))
            else {
                return Ok(Vec::new());
            };
            Ok(select(columns, predicate)?
                .into_iter()
                .map(|(name, stored)| ColumnOrSuperColumn::Column(to_column(name, stored)))
                .collect())
        }
    }
}

/// Last write wins; equal timestamps let the newer write through.
fn write_column(columns: &mut Columns, column: &Column) {
    let newer = columns
        .get(&column.name)
        .is_none_or(|existing| existing.timestamp <= column.timestamp);
    if newer {
        columns.insert(
            column.name.clone(),
            Stored {
                value: column.value.clone(),
                timestamp: column.timestamp,
            },
        );
    }
}

/// Drop columns not written after `timestamp`, restricted to `names` if given.
fn delete_columns(columns: &mut Columns, names: Option<&[String]>, timestamp: i64) {
    columns.retain(|name, stored| {
        let targeted = names.is_none_or(|names| names.contains(name));
        !(targeted && stored.timestamp <= timestamp)
    });
}

fn validate_mutation(rows: &FamilyRows, mutation: &Mutation) -> RpcResult<()> {
    let invalid = |msg: &str| -> RpcResult<()> { Err(RpcError::InvalidRequest(msg.to_string())) };
    match (rows, mutation) {
        (FamilyRows::Standard(_), Mutation::Insert(ColumnOrSuperColumn::SuperColumn(_))) => {
            invalid("super column insert into a standard column family")
        }
        (FamilyRows::Super(_), Mutation::Insert(ColumnOrSuperColumn::Column(_))) => {
            invalid("column insert into a super column family needs a super column")
        }
        (_, Mutation::Deletion(Deletion { predicate: Some(SlicePredicate::SliceRange(_)), .. })) => {
            invalid("Deletion does not yet support SliceRange predicates")
        }
        (
            FamilyRows::Standard(_),
            Mutation::Deletion(Deletion {
                super_column: Some(_),
                ..
            }),
        ) => invalid("super column deletion from a standard column family"),
        _ => Ok(()),
    }
}

fn apply_mutation(rows: &mut FamilyRows, key: &str, mutation: &Mutation) {
    match (rows, mutation) {
        (FamilyRows::Standard(rows), Mutation::Insert(ColumnOrSuperColumn::Column(column))) => {
            write_column(rows.entry(key.to_string()).or_default(), column);
        }
        (FamilyRows::Super(rows), Mutation::Insert(ColumnOrSuperColumn::SuperColumn(sc))) => {
            let columns = rows
                .entry(key.to_string())
                .or_default()
                .entry(sc.name.clone())
                .or_default();
            for column in &sc.columns {
                write_column(columns, column);
            }
        }
        (FamilyRows::Standard(rows), Mutation::Deletion(deletion)) => {
            if let Some(columns) = rows.get_mut(key) {
                let names = deletion.predicate.as_ref().and_then(|p| p.column_names());
                delete_columns(columns, names, deletion.timestamp);
            }
            rows.retain(|_, columns| !columns.is_empty());
        }
        (FamilyRows::Super(rows), Mutation::Deletion(deletion)) => {
            if let Some(supers) = rows.get_mut(key) {
                let names = deletion.predicate.as_ref().and_then(|p| p.column_names());
                match &deletion.super_column {
                    Some(super_column) => {
                        if let Some(columns) = supers.get_mut(super_column) {
                            delete_columns(columns, names, deletion.timestamp);
                        }
                    }
                    None => {
                        for (name, columns) in supers.iter_mut() {
                            if names.is_none_or(|names| names.contains(name)) {
                                delete_columns(columns, None, deletion.timestamp);
                            }
                        }
                    }
                }
                supers.retain(|_, columns| !columns.is_empty());
            }
            rows.retain(|_, supers| !supers.is_empty());
        }
        // Rejected by validate_mutation.
        _ => {}
    }
}

#[async_trait]
impl CassandraRpc for MemoryStore {
    async fn login(&self, credentials: &Credentials) -> RpcResult<()> {
        let mut state = self.state();
        enter(&mut state, "login", None)?;
        let rejected = state.required_credentials.as_ref().is_some_and(|required| {
            required.username != credentials.username || required.password != credentials.password
        });
        if rejected {
            return Err(RpcError::Authentication(format!(
                "invalid username or password for {}",
                credentials.username
            )));
        }
        state.logged_in = true;
        Ok(())
    }

    async fn describe_keyspace(&self, keyspace: &str) -> RpcResult<KeyspaceDefinition> {
        let mut state = self.state();
        enter(&mut state, "describe_keyspace", None)?;
        check_login(&state)?;
        state
            .keyspaces
            .get(keyspace)
            .map(|data| data.definition.clone())
            .ok_or_else(|| RpcError::NotFound(format!("keyspace {}", keyspace)))
    }

    async fn set_keyspace(&self, keyspace: &str) -> RpcResult<()> {
        let mut state = self.state();
        enter(&mut state, "set_keyspace", None)?;
        check_login(&state)?;
        if !state.keyspaces.contains_key(keyspace) {
            return Err(RpcError::InvalidRequest(format!(
                "Keyspace {} does not exist",
                keyspace
            )));
        }
        state.keyspace = Some(keyspace.to_string());
        Ok(())
    }

    async fn describe_cluster_name(&self) -> RpcResult<String> {
        enter(&mut self.state(), "describe_cluster_name", None)?;
        Ok(CLUSTER_NAME.to_string())
    }

    async fn describe_version(&self) -> RpcResult<String> {
        enter(&mut self.state(), "describe_version", None)?;
        Ok(API_VERSION.to_string())
    }

    async fn multiget_slice(
        &self,
        keys: &[String],
        column_parent: &ColumnParent,
        predicate: &SlicePredicate,
        consistency_level: ConsistencyLevel,
    ) -> RpcResult<SliceResponse> {
        let mut state = self.state();
        enter(&mut state, "multiget_slice", Some(consistency_level))?;
        let keyspace = current_keyspace(&mut state)?;
        let rows: &FamilyRows = family(keyspace, &column_parent.column_family)?;

        keys.iter()
            .map(|key| Ok((key.clone(), slice_row(rows, key, column_parent, predicate)?)))
            .collect()
    }

    async fn multiget_count(
        &self,
        keys: &[String],
        column_parent: &ColumnParent,
        predicate: &SlicePredicate,
        consistency_level: ConsistencyLevel,
    ) -> RpcResult<CountResponse> {
        let mut state = self.state();
        enter(&mut state, "multiget_count", Some(consistency_level))?;
        let keyspace = current_keyspace(&mut state)?;
        let rows: &FamilyRows = family(keyspace, &column_parent.column_family)?;

        keys.iter()
            .map(|key| {
                let records = slice_row(rows, key, column_parent, predicate)?;
                Ok((key.clone(), records.len() as i32))
            })
            .collect()
    }

    async fn batch_mutate(
        &self,
        mutation_map: MutationMap,
        consistency_level: ConsistencyLevel,
    ) -> RpcResult<()> {
        let mut state = self.state();
        enter(&mut state, "batch_mutate", Some(consistency_level))?;
        let keyspace = current_keyspace(&mut state)?;

        // Validate everything first so a bad mutation leaves no partial write.
        for families in mutation_map.values() {
            for (name, mutations) in families {
                let rows = family(keyspace, name)?;
                for mutation in mutations {
                    validate_mutation(rows, mutation)?;
                }
            }
        }

        for (key, families) in &mutation_map {
            for (name, mutations) in families {
                let rows = family(keyspace, name)?;
                for mutation in mutations {
                    apply_mutation(rows, key, mutation);
                }
            }
        }
        Ok(())
    }

    async fn truncate(&self, column_family: &str) -> RpcResult<()> {
        let mut state = self.state();
        enter(&mut state, "truncate", None)?;
        let keyspace = current_keyspace(&mut state)?;
        let rows = family(keyspace, column_family)?;
        *rows = match rows {
            FamilyRows::Standard(_) => FamilyRows::new(ColumnFamilyKind::Standard),
            FamilyRows::Super(_) => FamilyRows::new(ColumnFamilyKind::Super),
        };
        Ok(())
    }

    async fn close(&self) {
        let mut state = self.state();
        let _ = enter(&mut state, "close", None);
        state.keyspace = None;
        state.logged_in = false;
    }
}

/// [`Transport`] handing out a shared [`MemoryStore`]
pub struct MemoryTransport {
    store: Arc<MemoryStore>,
    refuse: Mutex<Option<String>>,
    hold: Option<Arc<Notify>>,
    connects: Mutex<Vec<ServerAddress>>,
}

impl MemoryTransport {
    pub fn new(store: Arc<MemoryStore>) -> Arc<Self> {
        Arc::new(Self {
            store,
            refuse: Mutex::new(None),
            hold: None,
            connects: Mutex::new(Vec::new()),
        })
    }

    /// Transport whose `connect` waits until `release` is notified
    pub fn held(store: Arc<MemoryStore>, release: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            store,
            refuse: Mutex::new(None),
            hold: Some(release),
            connects: Mutex::new(Vec::new()),
        })
    }

    /// Fail every later `connect` with a transport error
    pub fn refuse_connections(&self, reason: &str) {
        *self.refuse.lock().unwrap_or_else(PoisonError::into_inner) = Some(reason.to_string());
    }

    /// Addresses passed to `connect`, oldest first
    pub fn connects(&self) -> Vec<ServerAddress> {
        self.connects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&self, address: &ServerAddress) -> RpcResult<Arc<dyn CassandraRpc>> {
        self.connects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(address.clone());

        if let Some(release) = &self.hold {
            release.notified().await;
        }

        let refused = self
            .refuse
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(reason) = refused {
            return Err(RpcError::Transport(format!("{}: {}", address, reason)));
        }

        let rpc: Arc<dyn CassandraRpc> = self.store.clone();
        Ok(rpc)
    }
}
