use crate::context::MigrationContext;
use crate::errors::{ErrorKind, MigrateError, MigrateResult};
use crate::ledger::VersionLedgerProvider;
use crate::version::Version;
use crossbeam_skiplist::SkipMap;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Version ledger kept in memory, one per collection of an
/// [`InMemoryDatabase`](super::InMemoryDatabase).
///
/// # Characteristics
/// - **Append-only**: records are keyed by a monotonic write sequence, so a
///   record written again for an existing id never replaces the earlier one
/// - **Thread-Safe**: backed by a concurrent skip list, clones share state
/// - **Lifecycle**: once closed every operation fails with
///   [`ErrorKind::StoreAccessError`]
#[derive(Clone)]
pub struct InMemoryLedger {
    inner: Arc<InMemoryLedgerInner>,
}

impl InMemoryLedger {
    /// Creates an empty, open ledger.
    ///
    /// # Arguments
    /// * `name` - Name of the collection holding the records
    ///
    /// # Returns
    /// A new `InMemoryLedger` with no records
    pub fn new(name: &str) -> Self {
        InMemoryLedger {
            inner: Arc::new(InMemoryLedgerInner::new(name)),
        }
    }

    /// Drops every record and marks the ledger closed. Clones are closed too.
    pub fn close(&self) {
        self.inner.close()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Relaxed)
    }

    /// Number of records held, including superseded ones.
    pub fn size(&self) -> MigrateResult<u64> {
        self.inner.check_opened()?;
        Ok(self.inner.records.len() as u64)
    }
}

impl Debug for InMemoryLedger {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryLedger")
            .field("name", &self.inner.name)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl VersionLedgerProvider for InMemoryLedger {
    fn current(&self, ctx: &MigrationContext) -> MigrateResult<Option<Version>> {
        self.inner.current(ctx)
    }

    fn get(&self, ctx: &MigrationContext, id: u64) -> MigrateResult<Option<Version>> {
        self.inner.get(ctx, id)
    }

    fn set(&self, ctx: &MigrationContext, version: &Version) -> MigrateResult<()> {
        self.inner.set(ctx, version)
    }

    fn delete(&self, ctx: &MigrationContext, id: u64) -> MigrateResult<()> {
        self.inner.delete(ctx, id)
    }

    fn history(&self, ctx: &MigrationContext) -> MigrateResult<Vec<Version>> {
        self.inner.history(ctx)
    }

    fn collection_name(&self) -> String {
        self.inner.name.clone()
    }
}

struct InMemoryLedgerInner {
    records: SkipMap<u64, Version>,
    sequence: AtomicU64,
    closed: AtomicBool,
    name: String,
}

impl InMemoryLedgerInner {
    fn new(name: &str) -> InMemoryLedgerInner {
        InMemoryLedgerInner {
            records: SkipMap::new(),
            sequence: AtomicU64::new(0),
            closed: AtomicBool::from(false),
            name: name.to_string(),
        }
    }

    fn check_opened(&self) -> MigrateResult<()> {
        if self.closed.load(Ordering::Relaxed) {
            log::error!("Ledger collection {} is closed", self.name);
            return Err(MigrateError::new(
                &format!("Ledger collection {} is closed", self.name),
                ErrorKind::StoreAccessError,
            ));
        }
        Ok(())
    }

    fn check_access(&self, ctx: &MigrationContext) -> MigrateResult<()> {
        ctx.check()?;
        self.check_opened()
    }

    fn current(&self, ctx: &MigrationContext) -> MigrateResult<Option<Version>> {
        self.check_access(ctx)?;
        Ok(self.records.back().map(|entry| entry.value().clone()))
    }

    fn get(&self, ctx: &MigrationContext, id: u64) -> MigrateResult<Option<Version>> {
        self.check_access(ctx)?;
        Ok(self
            .records
            .iter()
            .rev()
            .find(|entry| entry.value().id() == id)
            .map(|entry| entry.value().clone()))
    }

    fn set(&self, ctx: &MigrationContext, version: &Version) -> MigrateResult<()> {
        self.check_access(ctx)?;
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        self.records.insert(sequence, version.clone());
        log::debug!(
            "Recorded version {} in ledger {} at sequence {}",
            version.id(),
            self.name,
            sequence
        );
        Ok(())
    }

    fn delete(&self, ctx: &MigrationContext, id: u64) -> MigrateResult<()> {
        self.check_access(ctx)?;
        let sequences: Vec<u64> = self
            .records
            .iter()
            .filter(|entry| entry.value().id() == id)
            .map(|entry| *entry.key())
            .collect();

        for sequence in &sequences {
            self.records.remove(sequence);
        }
        log::debug!(
            "Deleted {} record(s) of version {} from ledger {}",
            sequences.len(),
            id,
            self.name
        );
        Ok(())
    }

    fn history(&self, ctx: &MigrationContext) -> MigrateResult<Vec<Version>> {
        self.check_access(ctx)?;
        Ok(self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    fn close(&self) {
        self.records.clear();
        self.closed.store(true, Ordering::Relaxed);
    }
}
