//! Database capability.

use crate::error::ExtensionResult;
use hookwire_storage::{Database, DbOptions, Transaction, TxOptions};
use std::fmt;
use std::sync::Arc;

/// Starts transactions on the environment's database.
#[derive(Clone)]
pub struct DatabaseHandle {
    database: Arc<dyn Database>,
    options: DbOptions,
}

impl fmt::Debug for DatabaseHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseHandle")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl DatabaseHandle {
    pub(crate) fn new(database: Arc<dyn Database>, options: DbOptions) -> Self {
        Self { database, options }
    }

    pub fn begin(&self) -> ExtensionResult<Arc<dyn Transaction>> {
        Ok(self.database.begin()?)
    }

    pub fn begin_tx(&self, options: &TxOptions) -> ExtensionResult<Arc<dyn Transaction>> {
        Ok(self.database.begin_tx(options)?)
    }

    /// Transaction retry settings.
    pub fn options(&self) -> DbOptions {
        self.options
    }
}
