//! Column family handles
//!
//! Every operation captures its arguments, the default consistency level
//! and (for writes) the timestamp at the moment it is issued, then runs
//! through the handle's readiness gate.

use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{Instrument, Span, debug, instrument};

use crate::common::{ClientError, ClientFuture, ClientResult};
use crate::connection::ConnectionInner;
use crate::gate::ReadinessGate;
use crate::mutation::{build_deletion, build_insert};
use crate::query::{IntoQueryArgs, QueryArg, WriteOptions, resolve};
use crate::shaper::{CountResult, SliceResult, shape_counts, shape_slice};
use crate::types::{ColumnFamilyDefinition, ColumnFamilyKind, ConsistencyLevel};

/// Row keys of a read
///
/// Built from a single key or from a list; a list with exactly one key is
/// treated like a single key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowKeys(Vec<String>);

impl RowKeys {
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<&str> for RowKeys {
    fn from(key: &str) -> Self {
        RowKeys(vec![key.to_string()])
    }
}

impl From<String> for RowKeys {
    fn from(key: String) -> Self {
        RowKeys(vec![key])
    }
}

impl From<Vec<String>> for RowKeys {
    fn from(keys: Vec<String>) -> Self {
        RowKeys(keys)
    }
}

impl From<Vec<&str>> for RowKeys {
    fn from(keys: Vec<&str>) -> Self {
        RowKeys(keys.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for RowKeys {
    fn from(keys: [&str; N]) -> Self {
        RowKeys(keys.iter().map(|k| k.to_string()).collect())
    }
}

/// Name and schema of a family
///
/// Queued calls hold this rather than the handle, so the queue never keeps
/// its own gate alive.
pub(crate) struct FamilySchema {
    name: String,
    definition: RwLock<Option<ColumnFamilyDefinition>>,
}

impl FamilySchema {
    fn definition(&self) -> Option<ColumnFamilyDefinition> {
        self.definition
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn kind(&self) -> ColumnFamilyKind {
        self.definition()
            .map(|def| def.column_type)
            .unwrap_or_default()
    }
}

/// State shared between a handle's clones and its connection
pub(crate) struct HandleShared {
    schema: Arc<FamilySchema>,
    pub(crate) gate: Arc<ReadinessGate>,
}

impl HandleShared {
    pub(crate) fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            schema: Arc::new(FamilySchema {
                name: name.to_string(),
                definition: RwLock::new(None),
            }),
            gate: ReadinessGate::new(format!("column family {}", name)),
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.schema.name
    }

    pub(crate) fn set_definition(&self, definition: ColumnFamilyDefinition) {
        *self
            .schema
            .definition
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(definition);
    }
}

/// A column family (standard or super) of the active keyspace
///
/// Obtained from [`crate::Connection::column_family`]. Clones share the same
/// queue and readiness state. Dropping the last clone drops calls still
/// waiting for readiness; their futures resolve to [`ClientError::Closed`].
#[derive(Clone)]
pub struct ColumnFamily {
    shared: Arc<HandleShared>,
    connection: Arc<ConnectionInner>,
}

impl std::fmt::Debug for ColumnFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnFamily")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl ColumnFamily {
    pub(crate) fn new(shared: Arc<HandleShared>, connection: Arc<ConnectionInner>) -> Self {
        Self { shared, connection }
    }

    pub fn name(&self) -> &str {
        self.shared.name()
    }

    /// Ready once the family was found in the active keyspace
    pub fn is_ready(&self) -> bool {
        self.shared.gate.is_ready()
    }

    /// Schema of the family, once known
    pub fn definition(&self) -> Option<ColumnFamilyDefinition> {
        self.shared.schema.definition()
    }

    /// Kind of the family; `Standard` until the schema is known
    pub fn kind(&self) -> ColumnFamilyKind {
        self.shared.schema.kind()
    }

    pub fn is_super(&self) -> bool {
        self.kind() == ColumnFamilyKind::Super
    }

    /// Number of issued calls that have not started yet
    pub fn pending(&self) -> usize {
        self.shared.gate.pending()
    }

    fn call(&self) -> FamilyCall {
        FamilyCall {
            schema: Arc::clone(&self.shared.schema),
            connection: Arc::clone(&self.connection),
        }
    }

    /// Read columns of one or more rows.
    ///
    /// `args` follows `[super_column?, names_or_options?, options?]`, see
    /// [`crate::query::resolve`]. One key yields [`SliceResult::Row`], several
    /// yield [`SliceResult::Rows`].
    #[instrument(skip_all, fields(column_family = %self.name()))]
    pub fn get(
        &self,
        keys: impl Into<RowKeys>,
        args: impl IntoQueryArgs,
    ) -> ClientFuture<SliceResult> {
        let keys = keys.into().into_vec();
        let args = args.into_query_args();
        let default_level = self.connection.levels().read;

        let call = self.call();
        let span = Span::current();
        self.shared.gate.run(move || {
            async move { call.get(keys, args, default_level).await }.instrument(span)
        })
    }

    /// Count the columns a `get` with the same arguments would return.
    #[instrument(skip_all, fields(column_family = %self.name()))]
    pub fn count(
        &self,
        keys: impl Into<RowKeys>,
        args: impl IntoQueryArgs,
    ) -> ClientFuture<CountResult> {
        let keys = keys.into().into_vec();
        let args = args.into_query_args();
        let default_level = self.connection.levels().read;

        let call = self.call();
        let span = Span::current();
        self.shared.gate.run(move || {
            async move { call.count(keys, args, default_level).await }.instrument(span)
        })
    }

    /// Insert columns into a row.
    ///
    /// `values` is `{column: value}` for a standard family and
    /// `{super_column: {sub_column: value}}` for a super family.
    pub fn set<V: Serialize + ?Sized>(&self, key: &str, values: &V) -> ClientFuture<()> {
        self.set_with_options(key, values, WriteOptions::default())
    }

    /// [`ColumnFamily::set`] with a per-call consistency override.
    #[instrument(skip_all, fields(column_family = %self.name(), key = %key))]
    pub fn set_with_options<V: Serialize + ?Sized>(
        &self,
        key: &str,
        values: &V,
        options: WriteOptions,
    ) -> ClientFuture<()> {
        let values = match serde_json::to_value(values) {
            Ok(values) => values,
            Err(e) => {
                let err = ClientError::InvalidArguments(format!(
                    "values could not be serialized: {}",
                    e
                ));
                return Box::pin(async move { Err(err) });
            }
        };
        let level = options
            .consistency_level
            .unwrap_or(self.connection.levels().write);
        let timestamp = self.connection.clock.next();
        let key = key.to_string();

        let call = self.call();
        let span = Span::current();
        self.shared.gate.run(move || {
            async move { call.insert(key, values, level, timestamp).await }.instrument(span)
        })
    }

    /// Delete a row, a super column, or named columns.
    ///
    /// Takes the same trailing arguments as [`ColumnFamily::get`]. Only
    /// explicit column names narrow the deletion; range options are ignored
    /// apart from their consistency level.
    #[instrument(skip_all, fields(column_family = %self.name(), key = %key))]
    pub fn remove(&self, key: &str, args: impl IntoQueryArgs) -> ClientFuture<()> {
        let args = args.into_query_args();
        let default_level = self.connection.levels().write;
        let timestamp = self.connection.clock.next();
        let key = key.to_string();

        let call = self.call();
        let span = Span::current();
        self.shared.gate.run(move || {
            async move { call.remove(key, args, default_level, timestamp).await }
                .instrument(span)
        })
    }

    /// Remove every row of the family.
    #[instrument(skip_all, fields(column_family = %self.name()))]
    pub fn truncate(&self) -> ClientFuture<()> {
        let call = self.call();
        let span = Span::current();
        self.shared
            .gate
            .run(move || async move { call.truncate().await }.instrument(span))
    }
}

/// Everything a gated call needs once it gets to run
struct FamilyCall {
    schema: Arc<FamilySchema>,
    connection: Arc<ConnectionInner>,
}

impl FamilyCall {
    async fn get(
        &self,
        keys: Vec<String>,
        args: Vec<QueryArg>,
        default_level: ConsistencyLevel,
    ) -> ClientResult<SliceResult> {
        let query = resolve(&self.schema.name, self.schema.kind(), args)?;
        let level = query.consistency_level.unwrap_or(default_level);
        let rpc = self.connection.rpc()?;

        debug!(keys = keys.len(), %level, "multiget_slice");
        let response = rpc
            .multiget_slice(&keys, &query.column_parent, &query.predicate, level)
            .await
            .map_err(|e| self.connection.call_failed(e))?;

        Ok(shape_slice(&keys, response))
    }

    async fn count(
        &self,
        keys: Vec<String>,
        args: Vec<QueryArg>,
        default_level: ConsistencyLevel,
    ) -> ClientResult<CountResult> {
        let query = resolve(&self.schema.name, self.schema.kind(), args)?;
        let level = query.consistency_level.unwrap_or(default_level);
        let rpc = self.connection.rpc()?;

        debug!(keys = keys.len(), %level, "multiget_count");
        let response = rpc
            .multiget_count(&keys, &query.column_parent, &query.predicate, level)
            .await
            .map_err(|e| self.connection.call_failed(e))?;

        Ok(shape_counts(&keys, response))
    }

    async fn insert(
        &self,
        key: String,
        values: Value,
        level: ConsistencyLevel,
        timestamp: i64,
    ) -> ClientResult<()> {
        let mutation_map =
            build_insert(&self.schema.name, self.schema.kind(), &key, &values, timestamp)?;
        let empty = mutation_map
            .values()
            .flat_map(|families| families.values())
            .all(|mutations| mutations.is_empty());
        if empty {
            debug!("no columns to insert");
            return Ok(());
        }

        let rpc = self.connection.rpc()?;
        debug!(%level, timestamp, "batch_mutate insert");
        rpc.batch_mutate(mutation_map, level)
            .await
            .map_err(|e| self.connection.call_failed(e))
    }

    async fn remove(
        &self,
        key: String,
        args: Vec<QueryArg>,
        default_level: ConsistencyLevel,
        timestamp: i64,
    ) -> ClientResult<()> {
        let query = resolve(&self.schema.name, self.schema.kind(), args)?;
        let level = query.consistency_level.unwrap_or(default_level);
        let mutation_map = build_deletion(&key, &query, timestamp);

        let rpc = self.connection.rpc()?;
        debug!(%level, timestamp, "batch_mutate deletion");
        rpc.batch_mutate(mutation_map, level)
            .await
            .map_err(|e| self.connection.call_failed(e))
    }

    async fn truncate(&self) -> ClientResult<()> {
        let rpc = self.connection.rpc()?;
        rpc.truncate(&self.schema.name)
            .await
            .map_err(|e| self.connection.call_failed(e))
    }
}
