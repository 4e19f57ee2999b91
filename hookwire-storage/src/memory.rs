//! In-process storage.
//!
//! Every transaction works on a private snapshot of the committed tables and
//! writes it back on commit, so uncommitted writes are invisible to other
//! transactions and rollback simply drops the snapshot. Concurrent commits
//! are last-writer-wins.

use crate::error::{StorageError, StorageResult};
use crate::query::{
    DbOptions, Filter, IsolationLevel, LockPolicy, Paginator, ResourceState, SortKey, TxOptions,
    matches_filter,
};
use crate::transaction::{Database, Transaction};
use hookwire_model::Schema;
use hookwire_types::{AttributeMap, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct Tables {
    // schema id -> rows in insertion order
    rows: HashMap<String, Vec<AttributeMap>>,
    // (schema id, resource id) -> state columns
    states: HashMap<(String, String), ResourceState>,
}

impl Tables {
    fn table(&self, schema_id: &str) -> &[AttributeMap] {
        self.rows.get(schema_id).map(Vec::as_slice).unwrap_or_default()
    }

    fn position(&self, schema_id: &str, id: &str) -> Option<usize> {
        self.table(schema_id).iter().position(|row| row_id(row) == Some(id))
    }
}

fn row_id(row: &AttributeMap) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Thread-safe in-memory database. Clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    tables: Arc<Mutex<Tables>>,
    options: DbOptions,
}

impl fmt::Debug for MemoryDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDatabase")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: DbOptions) -> Self {
        self.options = options;
        self
    }

    /// Inserts committed rows directly, bypassing schema defaults.
    pub fn seed(&self, schema_id: &str, rows: impl IntoIterator<Item = AttributeMap>) {
        lock(&self.tables)
            .rows
            .entry(schema_id.to_string())
            .or_default()
            .extend(rows);
    }

    /// Snapshot of the committed rows of `schema_id`.
    pub fn rows(&self, schema_id: &str) -> Vec<AttributeMap> {
        lock(&self.tables).table(schema_id).to_vec()
    }

    /// Starts a transaction and returns the concrete handle.
    pub fn begin_memory(&self, options: &TxOptions) -> Arc<MemoryTransaction> {
        let snapshot = lock(&self.tables).clone();
        debug!(isolation = ?options.isolation_level, "begin memory transaction");
        Arc::new(MemoryTransaction {
            committed: Arc::clone(&self.tables),
            working: Mutex::new(Some(snapshot)),
            isolation_level: options.isolation_level,
            locks: Mutex::new(Vec::new()),
        })
    }
}

impl Database for MemoryDatabase {
    fn begin(&self) -> StorageResult<Arc<dyn Transaction>> {
        self.begin_tx(&TxOptions::default())
    }

    fn begin_tx(&self, options: &TxOptions) -> StorageResult<Arc<dyn Transaction>> {
        Ok(self.begin_memory(options))
    }

    fn options(&self) -> DbOptions {
        self.options
    }
}

/// Transaction over a [`MemoryDatabase`].
pub struct MemoryTransaction {
    committed: Arc<Mutex<Tables>>,
    // None once committed or rolled back
    working: Mutex<Option<Tables>>,
    isolation_level: IsolationLevel,
    locks: Mutex<Vec<(String, LockPolicy)>>,
}

impl fmt::Debug for MemoryTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryTransaction")
            .field("isolation_level", &self.isolation_level)
            .field("closed", &self.closed())
            .finish_non_exhaustive()
    }
}

impl MemoryTransaction {
    pub fn isolation_level(&self) -> IsolationLevel {
        self.isolation_level
    }

    /// Lock requests seen so far, as `(schema id, policy)`.
    pub fn locks(&self) -> Vec<(String, LockPolicy)> {
        lock(&self.locks).clone()
    }

    fn with_tables<T>(&self, f: impl FnOnce(&mut Tables) -> StorageResult<T>) -> StorageResult<T> {
        let mut working = lock(&self.working);
        match working.as_mut() {
            Some(tables) => f(tables),
            None => Err(StorageError::Closed),
        }
    }

    fn record_lock(&self, schema: &Schema, policy: LockPolicy) {
        lock(&self.locks).push((schema.id.clone(), policy));
    }

    fn close(&self) -> StorageResult<Tables> {
        lock(&self.working).take().ok_or(StorageError::Closed)
    }
}

fn select(
    tables: &Tables,
    schema: &Schema,
    filter: &Filter,
    sort: &[SortKey],
    paginator: Option<&Paginator>,
) -> (Vec<AttributeMap>, u64) {
    let mut matched: Vec<AttributeMap> = tables
        .table(&schema.id)
        .iter()
        .filter(|row| matches_filter(row, filter))
        .cloned()
        .collect();
    let total = matched.len() as u64;

    if !sort.is_empty() {
        // stable, so ties keep insertion order
        matched.sort_by(|a, b| {
            sort.iter()
                .map(|key| key.compare(a, b))
                .find(|ordering| ordering.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    if let Some(paginator) = paginator {
        let offset = usize::try_from(paginator.offset).unwrap_or(usize::MAX);
        let limit = paginator
            .limit
            .map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));
        matched = matched.into_iter().skip(offset).take(limit).collect();
    }

    (matched, total)
}

fn first_match(tables: &Tables, schema: &Schema, filter: &Filter) -> StorageResult<AttributeMap> {
    tables
        .table(&schema.id)
        .iter()
        .find(|row| matches_filter(row, filter))
        .cloned()
        .ok_or_else(|| StorageError::NotFound(schema.id.clone()))
}

// Builds a full row from the schema: given value, else default, else null.
fn build_row(schema: &Schema, data: &AttributeMap) -> AttributeMap {
    let mut row = AttributeMap::new();
    for property in &schema.properties {
        let value = data
            .get(&property.id)
            .filter(|value| !value.is_null())
            .or(property.default.as_ref())
            .cloned()
            .unwrap_or(Value::Null);
        row.insert(property.id.clone(), value);
    }
    let missing_id = row_id(&row).is_none_or(str::is_empty);
    if missing_id {
        row.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
    }
    row
}

fn merge_row(schema: &Schema, row: &mut AttributeMap, data: &AttributeMap) {
    for (key, value) in data {
        if key != "id" && schema.property(key).is_some() {
            row.insert(key.clone(), value.clone());
        }
    }
}

fn require_id(data: &AttributeMap) -> StorageResult<&str> {
    row_id(data).ok_or_else(|| StorageError::InvalidData("resource has no string id".into()))
}

impl Transaction for MemoryTransaction {
    fn list(
        &self,
        schema: &Schema,
        filter: &Filter,
        sort: &[SortKey],
        paginator: Option<&Paginator>,
    ) -> StorageResult<(Vec<AttributeMap>, u64)> {
        self.with_tables(|tables| Ok(select(tables, schema, filter, sort, paginator)))
    }

    fn lock_list(
        &self,
        schema: &Schema,
        filter: &Filter,
        sort: &[SortKey],
        paginator: Option<&Paginator>,
        policy: LockPolicy,
    ) -> StorageResult<(Vec<AttributeMap>, u64)> {
        let result = self.list(schema, filter, sort, paginator)?;
        self.record_lock(schema, policy);
        Ok(result)
    }

    fn fetch(&self, schema: &Schema, filter: &Filter) -> StorageResult<AttributeMap> {
        self.with_tables(|tables| first_match(tables, schema, filter))
    }

    fn lock_fetch(
        &self,
        schema: &Schema,
        filter: &Filter,
        policy: LockPolicy,
    ) -> StorageResult<AttributeMap> {
        let row = self.fetch(schema, filter)?;
        self.record_lock(schema, policy);
        Ok(row)
    }

    fn state_fetch(&self, schema: &Schema, filter: &Filter) -> StorageResult<ResourceState> {
        self.with_tables(|tables| {
            let row = first_match(tables, schema, filter)?;
            let id = require_id(&row)?;
            Ok(tables
                .states
                .get(&(schema.id.clone(), id.to_string()))
                .cloned()
                .unwrap_or_default())
        })
    }

    fn create(&self, schema: &Schema, data: &AttributeMap) -> StorageResult<AttributeMap> {
        self.with_tables(|tables| {
            let row = build_row(schema, data);
            let id = require_id(&row)?;
            if tables.position(&schema.id, id).is_some() {
                return Err(StorageError::Conflict(format!(
                    "{} with id {} already exists",
                    schema.id, id
                )));
            }
            debug!(schema_id = %schema.id, id, "create row");
            tables
                .rows
                .entry(schema.id.clone())
                .or_default()
                .push(row.clone());
            Ok(row)
        })
    }

    fn update(&self, schema: &Schema, data: &AttributeMap) -> StorageResult<AttributeMap> {
        self.with_tables(|tables| {
            let id = require_id(data)?;
            let index = tables
                .position(&schema.id, id)
                .ok_or_else(|| StorageError::NotFound(format!("{} {}", schema.id, id)))?;
            let table = tables.rows.entry(schema.id.clone()).or_default();
            merge_row(schema, &mut table[index], data);
            debug!(schema_id = %schema.id, id, "update row");
            Ok(table[index].clone())
        })
    }

    fn state_update(
        &self,
        schema: &Schema,
        data: &AttributeMap,
        state: Option<&ResourceState>,
    ) -> StorageResult<()> {
        self.with_tables(|tables| {
            let id = require_id(data)?;
            let index = tables
                .position(&schema.id, id)
                .ok_or_else(|| StorageError::NotFound(format!("{} {}", schema.id, id)))?;
            let table = tables.rows.entry(schema.id.clone()).or_default();
            merge_row(schema, &mut table[index], data);
            if let Some(state) = state {
                tables
                    .states
                    .insert((schema.id.clone(), id.to_string()), state.clone());
            }
            Ok(())
        })
    }

    fn delete(&self, schema: &Schema, id: &str) -> StorageResult<AttributeMap> {
        self.with_tables(|tables| {
            let index = tables
                .position(&schema.id, id)
                .ok_or_else(|| StorageError::NotFound(format!("{} {}", schema.id, id)))?;
            let row = tables.rows.entry(schema.id.clone()).or_default().remove(index);
            tables.states.remove(&(schema.id.clone(), id.to_string()));
            debug!(schema_id = %schema.id, id, "delete row");
            Ok(row)
        })
    }

    fn count(&self, schema: &Schema, filter: &Filter) -> StorageResult<u64> {
        self.with_tables(|tables| {
            Ok(tables
                .table(&schema.id)
                .iter()
                .filter(|row| matches_filter(row, filter))
                .count() as u64)
        })
    }

    fn commit(&self) -> StorageResult<()> {
        let tables = self.close()?;
        *lock(&self.committed) = tables;
        debug!("commit memory transaction");
        Ok(())
    }

    fn rollback(&self) -> StorageResult<()> {
        self.close()?;
        debug!("rollback memory transaction");
        Ok(())
    }

    fn closed(&self) -> bool {
        lock(&self.working).is_none()
    }
}
