use crate::context::MigrationContext;
use crate::errors::{ErrorKind, MigrateError, MigrateResult};
use crate::version::Version;
use std::ops::Deref;
use std::sync::Arc;

/// Storage contract for the applied-version ledger.
///
/// # Purpose
/// A ledger holds the history of version records written by the migrator.
/// The most recently written record is the current version of the database.
///
/// # Requirements
/// - Append-only: `set` adds a record and never overwrites an existing one
/// - Ordered: `current` returns the latest written record, `history` returns
///   records oldest first
/// - No retries: backing store failures surface as
///   [`ErrorKind::StoreAccessError`] straight away
/// - Every operation checks the [`MigrationContext`] before touching the store
///
/// # Implementations
/// - `InMemoryLedger`: collection of an [`InMemoryDatabase`](crate::ledger::memory::InMemoryDatabase)
///
/// # Thread Safety
/// Implementers must be `Send + Sync`.
pub trait VersionLedgerProvider: Send + Sync {
    /// Returns the latest written record, or `None` if the ledger is empty.
    fn current(&self, ctx: &MigrationContext) -> MigrateResult<Option<Version>>;

    /// Returns the latest record written for `id`, or `None` if there is none.
    fn get(&self, ctx: &MigrationContext, id: u64) -> MigrateResult<Option<Version>>;

    /// Appends a record. It becomes visible to `current` immediately.
    fn set(&self, ctx: &MigrationContext, version: &Version) -> MigrateResult<()>;

    /// Removes every record written for `id`. Administrative only.
    fn delete(&self, ctx: &MigrationContext, id: u64) -> MigrateResult<()>;

    /// Returns every record, oldest first.
    fn history(&self, ctx: &MigrationContext) -> MigrateResult<Vec<Version>>;

    /// Name of the collection holding the records.
    fn collection_name(&self) -> String;
}

/// Cloneable handle to a [`VersionLedgerProvider`].
///
/// All clones share the same backing ledger. Use [`VersionLedger::find`] for
/// an optional lookup and [`VersionLedger::get`] when a missing record is an
/// error.
#[derive(Clone)]
pub struct VersionLedger {
    inner: Arc<dyn VersionLedgerProvider>,
}

impl VersionLedger {
    pub fn new<T: VersionLedgerProvider + 'static>(inner: T) -> Self {
        VersionLedger {
            inner: Arc::new(inner),
        }
    }

    /// Returns the record for `id`, failing with [`ErrorKind::NotFound`] if absent.
    pub fn get(&self, ctx: &MigrationContext, id: u64) -> MigrateResult<Version> {
        match self.inner.get(ctx, id)? {
            Some(version) => Ok(version),
            None => {
                log::error!(
                    "Version {} not found in ledger {}",
                    id,
                    self.inner.collection_name()
                );
                Err(MigrateError::new(
                    &format!(
                        "Version {} not found in ledger {}",
                        id,
                        self.inner.collection_name()
                    ),
                    ErrorKind::NotFound,
                ))
            }
        }
    }

    /// Returns the record for `id` if it exists.
    pub fn find(&self, ctx: &MigrationContext, id: u64) -> MigrateResult<Option<Version>> {
        self.inner.get(ctx, id)
    }

    /// Returns the id of the latest record, or `0` for an empty ledger.
    pub fn current_id(&self, ctx: &MigrationContext) -> MigrateResult<u64> {
        let current = self.inner.current(ctx)?;
        Ok(current.map_or(crate::common::INITIAL_VERSION, |v| v.id()))
    }
}

impl Deref for VersionLedger {
    type Target = Arc<dyn VersionLedgerProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// A database handle that can open the ledger collection.
///
/// The migrator calls this once at construction with the configured
/// collection name.
pub trait LedgerSource {
    fn version_ledger(&self, collection_name: &str) -> MigrateResult<VersionLedger>;
}

impl<T: LedgerSource + ?Sized> LedgerSource for Arc<T> {
    fn version_ledger(&self, collection_name: &str) -> MigrateResult<VersionLedger> {
        (**self).version_ledger(collection_name)
    }
}

impl<T: LedgerSource + ?Sized> LedgerSource for &T {
    fn version_ledger(&self, collection_name: &str) -> MigrateResult<VersionLedger> {
        (**self).version_ledger(collection_name)
    }
}
