//! Query parameters threaded from the runtime to storage.

use hookwire_types::{AttributeMap, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::Duration;

/// Row filter: property id to required value.
///
/// An array value matches any of its elements.
pub type Filter = AttributeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// One sort criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub key: String,
    #[serde(default)]
    pub order: SortOrder,
}

impl SortKey {
    pub fn asc(key: &str) -> Self {
        Self {
            key: key.into(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(key: &str) -> Self {
        Self {
            key: key.into(),
            order: SortOrder::Desc,
        }
    }

    /// Compares two rows on this key.
    pub fn compare(&self, a: &AttributeMap, b: &AttributeMap) -> Ordering {
        let ordering = compare_values(
            a.get(&self.key).unwrap_or(&Value::Null),
            b.get(&self.key).unwrap_or(&Value::Null),
        );
        match self.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

// null < bool < number < string < everything else
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) | Value::Object(_) => 4,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or_default();
            let y = y.as_f64().unwrap_or_default();
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(_) | Value::Object(_), Value::Array(_) | Value::Object(_)) => {
            a.to_string().cmp(&b.to_string())
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Whether `row` satisfies every entry of `filter`.
pub(crate) fn matches_filter(row: &AttributeMap, filter: &Filter) -> bool {
    filter.iter().all(|(key, wanted)| {
        let actual = row.get(key).unwrap_or(&Value::Null);
        match wanted {
            Value::Array(candidates) => candidates.contains(actual),
            wanted => wanted == actual,
        }
    })
}

/// Limit/offset window over a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Paginator {
    /// Maximum rows returned; `None` means unbounded.
    pub limit: Option<u64>,
    pub offset: u64,
}

impl Paginator {
    pub fn new(limit: u64, offset: u64) -> Self {
        Self {
            limit: Some(limit),
            offset,
        }
    }
}

/// Row-lock request passed through Lock-prefixed reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockPolicy {
    /// Lock the matched rows and the rows they relate to.
    LockRelatedResources,
    /// Lock only the matched rows.
    SkipRelatedResources,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

/// Options for [`Database::begin_tx`](crate::Database::begin_tx).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TxOptions {
    pub isolation_level: IsolationLevel,
}

impl TxOptions {
    pub fn with_isolation(isolation_level: IsolationLevel) -> Self {
        Self { isolation_level }
    }
}

/// Retry settings the storage collaborator applies to failing transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DbOptions {
    pub retry_tx_count: u32,
    pub retry_tx_interval: Duration,
}

/// State-machine columns kept alongside a resource.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceState {
    pub config_version: i64,
    pub state_version: i64,
    pub error: String,
    pub state: String,
    pub monitoring: String,
}
