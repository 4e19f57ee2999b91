//! The storage collaborator traits.

use crate::error::StorageResult;
use crate::query::{DbOptions, Filter, LockPolicy, Paginator, ResourceState, SortKey, TxOptions};
use hookwire_model::Schema;
use hookwire_types::AttributeMap;
use std::sync::Arc;

/// A request-scoped storage transaction.
///
/// Methods take `&self` so one handle can be shared by a request context and
/// the contexts cloned from it during dispatch. Implementations are expected
/// to report [`StorageError::Closed`](crate::StorageError::Closed) once
/// [`commit`](Transaction::commit) or [`rollback`](Transaction::rollback) ran.
pub trait Transaction: Send + Sync {
    /// Rows of `schema` matching `filter`, plus the total match count before
    /// pagination.
    fn list(
        &self,
        schema: &Schema,
        filter: &Filter,
        sort: &[SortKey],
        paginator: Option<&Paginator>,
    ) -> StorageResult<(Vec<AttributeMap>, u64)>;

    /// [`list`](Transaction::list) holding row locks until the transaction ends.
    fn lock_list(
        &self,
        schema: &Schema,
        filter: &Filter,
        sort: &[SortKey],
        paginator: Option<&Paginator>,
        policy: LockPolicy,
    ) -> StorageResult<(Vec<AttributeMap>, u64)>;

    /// The first row matching `filter`, or `NotFound`.
    fn fetch(&self, schema: &Schema, filter: &Filter) -> StorageResult<AttributeMap>;

    fn lock_fetch(
        &self,
        schema: &Schema,
        filter: &Filter,
        policy: LockPolicy,
    ) -> StorageResult<AttributeMap>;

    /// State columns of the row matching `filter`.
    fn state_fetch(&self, schema: &Schema, filter: &Filter) -> StorageResult<ResourceState>;

    /// Inserts a row and returns it as stored.
    fn create(&self, schema: &Schema, data: &AttributeMap) -> StorageResult<AttributeMap>;

    /// Merges `data` into the row with the same id and returns the result.
    fn update(&self, schema: &Schema, data: &AttributeMap) -> StorageResult<AttributeMap>;

    /// Writes `data` and, when given, the state columns of the same row.
    fn state_update(
        &self,
        schema: &Schema,
        data: &AttributeMap,
        state: Option<&ResourceState>,
    ) -> StorageResult<()>;

    /// Removes the row with `id` and returns it.
    fn delete(&self, schema: &Schema, id: &str) -> StorageResult<AttributeMap>;

    fn count(&self, schema: &Schema, filter: &Filter) -> StorageResult<u64>;

    fn commit(&self) -> StorageResult<()>;

    fn rollback(&self) -> StorageResult<()>;

    fn closed(&self) -> bool;
}

/// Source of transactions.
pub trait Database: Send + Sync {
    fn begin(&self) -> StorageResult<Arc<dyn Transaction>>;

    fn begin_tx(&self, options: &TxOptions) -> StorageResult<Arc<dyn Transaction>>;

    fn options(&self) -> DbOptions;
}
