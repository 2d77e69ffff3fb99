use super::InMemoryLedger;
use crate::errors::{ErrorKind, MigrateError, MigrateResult};
use crate::ledger::{LedgerSource, VersionLedger};
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// In-memory document database handle holding named ledger collections.
///
/// # Purpose
/// Serves as the database handle for tests and for embedded use where the
/// ledger does not need to outlive the process. Opening the same collection
/// twice returns handles onto the same records.
///
/// # Usage
/// ```rust
/// use docmigrate::ledger::memory::InMemoryDatabase;
/// use docmigrate::ledger::LedgerSource;
///
/// let db = InMemoryDatabase::new();
/// let ledger = db.version_ledger("migrations").unwrap();
/// assert!(db.has_collection("migrations"));
/// # drop(ledger);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryDatabase {
    inner: Arc<InMemoryDatabaseInner>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        InMemoryDatabase {
            inner: Arc::new(InMemoryDatabaseInner::new()),
        }
    }

    /// Opens the named collection as a ledger, creating it if needed.
    pub fn open_ledger(&self, name: &str) -> MigrateResult<InMemoryLedger> {
        self.inner.open_ledger(name)
    }

    pub fn has_collection(&self, name: &str) -> bool {
        self.inner.collections.contains_key(name)
    }

    /// Names of all open collections, sorted.
    pub fn collection_names(&self) -> BTreeSet<String> {
        self.inner
            .collections
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Closes and removes the named collection. Missing names are ignored.
    pub fn drop_collection(&self, name: &str) -> MigrateResult<()> {
        self.inner.check_opened()?;
        if let Some((_, ledger)) = self.inner.collections.remove(name) {
            ledger.close();
            log::debug!("Dropped collection {}", name);
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Relaxed)
    }

    /// Closes every collection. Handles opened earlier start failing.
    pub fn close(&self) {
        self.inner.close()
    }
}

impl LedgerSource for InMemoryDatabase {
    fn version_ledger(&self, collection_name: &str) -> MigrateResult<VersionLedger> {
        let ledger = self.open_ledger(collection_name)?;
        Ok(VersionLedger::new(ledger))
    }
}

#[derive(Default)]
struct InMemoryDatabaseInner {
    collections: DashMap<String, InMemoryLedger>,
    closed: AtomicBool,
}

impl InMemoryDatabaseInner {
    fn new() -> Self {
        InMemoryDatabaseInner {
            collections: DashMap::new(),
            closed: AtomicBool::from(false),
        }
    }

    fn check_opened(&self) -> MigrateResult<()> {
        if self.closed.load(Ordering::Relaxed) {
            log::error!("Database is closed");
            return Err(MigrateError::new(
                "Database is closed",
                ErrorKind::StoreAccessError,
            ));
        }
        Ok(())
    }

    fn open_ledger(&self, name: &str) -> MigrateResult<InMemoryLedger> {
        self.check_opened()?;
        let ledger = self
            .collections
            .entry(name.to_string())
            .or_insert_with(|| {
                log::debug!("Created collection {}", name);
                InMemoryLedger::new(name)
            })
            .clone();
        Ok(ledger)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
        for entry in self.collections.iter() {
            entry.value().close();
        }
        self.collections.clear();
    }
}
