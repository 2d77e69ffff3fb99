//! Orchestration of forward and backward migrations.

use crate::common::SortOrder;
use crate::context::MigrationContext;
use crate::errors::{ErrorKind, MigrateError, MigrateResult};
use crate::ledger::{LedgerSource, VersionLedger};
use crate::migration::{Migration, Migrations};
use crate::migrator_builder::MigratorBuilder;
use crate::migrator_config::MigratorConfig;
use crate::version::Version;

/// Applies and reverts migrations against a database handle, recording each
/// step in a version ledger.
///
/// The current version is read from the ledger at the start of every
/// [`up`](Self::up) and [`down`](Self::down) call. Each successful step
/// appends one record, so a call that stops half way leaves the ledger at the
/// last completed step and the next call resumes from there.
///
/// A single migrator instance is assumed to drive a ledger at a time. No lock
/// is taken against other instances.
///
/// # Examples
///
/// ```rust
/// use docmigrate::ledger::memory::InMemoryDatabase;
/// use docmigrate::{Migration, MigrationContext, Migrator, ALL_AVAILABLE};
///
/// let db = InMemoryDatabase::new();
/// let migrator = Migrator::builder(db)
///     .add_migration(
///         Migration::<InMemoryDatabase>::new(1, "create users")
///             .up(|db| db.open_ledger("users").map(|_| ()))
///             .down(|db| db.drop_collection("users")),
///     )
///     .add_migration(Migration::new(3, "index users").up(|_| Ok(())).down(|_| Ok(())))
///     .build()?;
///
/// let ctx = MigrationContext::new();
/// migrator.up(&ctx, ALL_AVAILABLE)?;
/// assert_eq!(migrator.current_version_id(&ctx)?, 3);
///
/// migrator.down(&ctx, 1)?;
/// assert_eq!(migrator.current_version_id(&ctx)?, 1);
/// # Ok::<(), docmigrate::errors::MigrateError>(())
/// ```
pub struct Migrator<D> {
    db: D,
    migrations: Migrations<D>,
    ledger: VersionLedger,
    config: MigratorConfig,
}

impl<D: LedgerSource> Migrator<D> {
    /// Creates a migrator over `db`, opening the configured ledger collection.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::ValidationError`] for an invalid configuration or a
    ///   migration using the reserved id `0`
    /// - [`ErrorKind::DuplicateVersion`] if two migrations share an id
    /// - any error the database reports while opening the ledger
    pub fn new(
        db: D,
        migrations: Vec<Migration<D>>,
        config: MigratorConfig,
    ) -> MigrateResult<Self> {
        config.validate()?;
        let migrations = Migrations::new(migrations)?;
        let ledger = db.version_ledger(config.collection_name())?;

        log::info!(
            "Migrator created with {} migration(s) on ledger {}",
            migrations.len(),
            config.collection_name()
        );

        Ok(Migrator {
            db,
            migrations,
            ledger,
            config,
        })
    }

    /// Starts a builder for a migrator over `db`.
    pub fn builder(db: D) -> MigratorBuilder<D> {
        MigratorBuilder::new(db)
    }
}

impl<D> Migrator<D> {
    /// Returns the latest ledger record, or `None` if nothing was ever recorded.
    pub fn version(&self, ctx: &MigrationContext) -> MigrateResult<Option<Version>> {
        self.ledger.current(ctx)
    }

    /// Returns the current version id, `0` when nothing was ever recorded.
    pub fn current_version_id(&self, ctx: &MigrationContext) -> MigrateResult<u64> {
        self.ledger.current_id(ctx)
    }

    /// Appends a ledger record for `id` stamped with the current instant.
    ///
    /// This does not run any action. Besides recording progress it serves as
    /// the administrative override for forcing the database to a version.
    pub fn set_version(&self, ctx: &MigrationContext, id: u64, description: &str) -> MigrateResult<()> {
        let version = Version::new(id, description);
        self.ledger.set(ctx, &version)
    }

    /// Applies up to `n` pending migrations in ascending id order.
    ///
    /// `n == 0` ([`ALL_AVAILABLE`](crate::ALL_AVAILABLE)) or an `n` larger than
    /// the set applies every pending migration. A migration is pending when its
    /// id is greater than the version read at the start of the call. Migrations
    /// without a forward action are skipped and do not count towards `n`.
    ///
    /// # Errors
    ///
    /// Stops at the first failure:
    /// - [`ErrorKind::ActionError`] if a forward action fails. The ledger is
    ///   not written for that step.
    /// - [`ErrorKind::StoreAccessError`] if recording a step fails. The action
    ///   has already taken effect, so actions must be safe to run again.
    pub fn up(&self, ctx: &MigrationContext, n: usize) -> MigrateResult<()> {
        let current = self.current_version_id(ctx)?;
        let mut remaining = self.step_budget(n);
        let mut from = current;

        for migration in self.migrations.sorted(SortOrder::Ascending) {
            if remaining == 0 {
                break;
            }

            let action = match migration.up_action() {
                Some(action) if migration.id() > current => action,
                _ => {
                    log::debug!("Skipping up migration {}", migration.id());
                    continue;
                }
            };

            if let Err(err) = action.call(&self.db) {
                log::error!(
                    "Failed to migrate from version {} to {}: {}",
                    from,
                    migration.id(),
                    err
                );
                return Err(MigrateError::new_with_cause(
                    &format!(
                        "Failed to migrate from version {} to {}",
                        from,
                        migration.id()
                    ),
                    ErrorKind::ActionError,
                    err,
                ));
            }

            let target = Version::new(migration.id(), migration.description());
            self.record_step(ctx, from, &target)?;
            log::info!("Migrated up from version {} to {}", from, migration.id());

            from = migration.id();
            remaining -= 1;
        }

        Ok(())
    }

    /// Reverts up to `n` applied migrations in descending id order.
    ///
    /// `n` is read as in [`up`](Self::up). A migration is applied when its id
    /// is at most the version read at the start of the call. After each
    /// backward action the ledger records the nearest lower registered
    /// migration, or `0` once the lowest one is reverted, so sparse ids never
    /// produce a version that was not registered.
    ///
    /// # Errors
    ///
    /// Same as [`up`](Self::up).
    pub fn down(&self, ctx: &MigrationContext, n: usize) -> MigrateResult<()> {
        let current = self.current_version_id(ctx)?;
        let mut remaining = self.step_budget(n);
        let mut from = current;
        let ascending = self.migrations.sorted(SortOrder::Ascending);

        for (position, migration) in ascending.iter().enumerate().rev() {
            if remaining == 0 {
                break;
            }

            let action = match migration.down_action() {
                Some(action) if migration.id() <= current => action,
                _ => {
                    log::debug!("Skipping down migration {}", migration.id());
                    continue;
                }
            };

            if let Err(err) = action.call(&self.db) {
                log::error!(
                    "Failed to revert version {} from version {}: {}",
                    migration.id(),
                    from,
                    err
                );
                return Err(MigrateError::new_with_cause(
                    &format!(
                        "Failed to revert version {} from version {}",
                        migration.id(),
                        from
                    ),
                    ErrorKind::ActionError,
                    err,
                ));
            }

            let target = match position {
                0 => Version::initial(),
                _ => {
                    let previous = ascending[position - 1];
                    Version::new(previous.id(), previous.description())
                }
            };

            self.record_step(ctx, from, &target)?;
            log::info!(
                "Migrated down from version {} to {}",
                migration.id(),
                target.id()
            );

            from = target.id();
            remaining -= 1;
        }

        Ok(())
    }

    /// Ids that `up(ctx, ALL_AVAILABLE)` would apply, ascending.
    pub fn pending(&self, ctx: &MigrationContext) -> MigrateResult<Vec<u64>> {
        let current = self.current_version_id(ctx)?;
        Ok(self
            .migrations
            .sorted(SortOrder::Ascending)
            .into_iter()
            .filter(|m| m.id() > current && m.has_up())
            .map(|m| m.id())
            .collect())
    }

    /// The registered migrations, in the order they were given.
    pub fn migrations(&self) -> &Migrations<D> {
        &self.migrations
    }

    /// Handle to the ledger collection this migrator records into.
    pub fn ledger(&self) -> &VersionLedger {
        &self.ledger
    }

    /// Configuration the migrator was built with.
    pub fn config(&self) -> &MigratorConfig {
        &self.config
    }

    /// The database handle passed to every action.
    pub fn database(&self) -> &D {
        &self.db
    }

    fn step_budget(&self, n: usize) -> usize {
        if n == 0 || n > self.migrations.len() {
            self.migrations.len()
        } else {
            n
        }
    }

    fn record_step(&self, ctx: &MigrationContext, from: u64, target: &Version) -> MigrateResult<()> {
        let id = target.id();
        self.set_version(ctx, id, target.description()).map_err(|err| {
            log::error!(
                "Failed to record version {} after migrating from version {}: {}",
                id,
                from,
                err
            );
            MigrateError::new_with_cause(
                &format!(
                    "Failed to record version {} after migrating from version {}",
                    id, from
                ),
                ErrorKind::StoreAccessError,
                err,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::memory::InMemoryDatabase;
    use crate::ALL_AVAILABLE;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct RecordingDb {
        inner: InMemoryDatabase,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingDb {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    impl LedgerSource for RecordingDb {
        fn version_ledger(&self, collection_name: &str) -> MigrateResult<VersionLedger> {
            self.inner.version_ledger(collection_name)
        }
    }

    fn recorded(id: u64) -> Migration<RecordingDb> {
        Migration::new(id, &format!("v{}", id))
            .up(move |db: &RecordingDb| {
                db.calls.lock().push(format!("up{}", id));
                Ok(())
            })
            .down(move |db: &RecordingDb| {
                db.calls.lock().push(format!("down{}", id));
                Ok(())
            })
    }

    fn migrator(ids: &[u64]) -> Migrator<RecordingDb> {
        let migrations = ids.iter().map(|id| recorded(*id)).collect();
        Migrator::new(RecordingDb::default(), migrations, MigratorConfig::new()).unwrap()
    }

    #[test]
    fn test_empty_ledger_has_no_version() {
        let migrator = migrator(&[1, 3, 5]);
        let ctx = MigrationContext::new();
        assert!(migrator.version(&ctx).unwrap().is_none());
        assert_eq!(migrator.current_version_id(&ctx).unwrap(), 0);
    }

    #[test]
    fn test_up_one_at_a_time() {
        let migrator = migrator(&[5, 1, 3]);
        let ctx = MigrationContext::new();

        migrator.up(&ctx, 1).unwrap();
        assert_eq!(migrator.current_version_id(&ctx).unwrap(), 1);
        migrator.up(&ctx, 1).unwrap();
        assert_eq!(migrator.current_version_id(&ctx).unwrap(), 3);
        assert_eq!(migrator.database().calls(), vec!["up1", "up3"]);
    }

    #[test]
    fn test_up_all_then_down_all() {
        let migrator = migrator(&[1, 3, 5]);
        let ctx = MigrationContext::new();

        migrator.up(&ctx, ALL_AVAILABLE).unwrap();
        assert_eq!(migrator.current_version_id(&ctx).unwrap(), 5);
        migrator.down(&ctx, ALL_AVAILABLE).unwrap();
        assert_eq!(migrator.current_version_id(&ctx).unwrap(), 0);
        assert_eq!(
            migrator.database().calls(),
            vec!["up1", "up3", "up5", "down5", "down3", "down1"]
        );
    }

    #[test]
    fn test_down_records_predecessor() {
        let migrator = migrator(&[1, 3, 5]);
        let ctx = MigrationContext::new();
        migrator.up(&ctx, ALL_AVAILABLE).unwrap();

        migrator.down(&ctx, 1).unwrap();
        let version = migrator.version(&ctx).unwrap().unwrap();
        assert_eq!(version.id(), 3);
        assert_eq!(version.description(), "v3");
    }

    #[test]
    fn test_down_past_lowest_records_initial() {
        let migrator = migrator(&[2, 4]);
        let ctx = MigrationContext::new();
        migrator.up(&ctx, ALL_AVAILABLE).unwrap();
        migrator.down(&ctx, ALL_AVAILABLE).unwrap();

        let version = migrator.version(&ctx).unwrap().unwrap();
        assert!(version.is_initial());
        assert!(version.description().is_empty());
        assert_eq!(migrator.ledger().history(&ctx).unwrap().len(), 4);
    }

    #[test]
    fn test_down_skips_unapplied() {
        let migrator = migrator(&[1, 3, 5]);
        let ctx = MigrationContext::new();
        migrator.up(&ctx, 2).unwrap();

        migrator.down(&ctx, 1).unwrap();
        assert_eq!(migrator.current_version_id(&ctx).unwrap(), 1);
        assert!(!migrator.database().calls().contains(&"down5".to_string()));
    }

    #[test]
    fn test_up_budget_larger_than_set() {
        let migrator = migrator(&[1, 2]);
        let ctx = MigrationContext::new();
        migrator.up(&ctx, 10).unwrap();
        assert_eq!(migrator.current_version_id(&ctx).unwrap(), 2);
    }

    #[test]
    fn test_up_action_failure_keeps_version() {
        let db = RecordingDb::default();
        let migrations = vec![
            recorded(1),
            Migration::new(3, "broken")
                .up(|_: &RecordingDb| Err(MigrateError::new("boom", ErrorKind::BackendError))),
            recorded(5),
        ];
        let migrator = Migrator::new(db, migrations, MigratorConfig::new()).unwrap();
        let ctx = MigrationContext::new();

        let err = migrator.up(&ctx, ALL_AVAILABLE).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ActionError);
        assert!(err.message().contains("from version 1"));
        assert_eq!(err.cause().unwrap().kind(), &ErrorKind::BackendError);
        assert_eq!(migrator.current_version_id(&ctx).unwrap(), 1);
        assert_eq!(migrator.database().calls(), vec!["up1"]);
    }

    #[test]
    fn test_down_action_failure_keeps_version() {
        let migrations = vec![
            recorded(1),
            Migration::new(2, "one way")
                .up(|_: &RecordingDb| Ok(()))
                .down(|_: &RecordingDb| Err(MigrateError::new("irreversible", ErrorKind::BackendError))),
        ];
        let migrator = Migrator::new(RecordingDb::default(), migrations, MigratorConfig::new()).unwrap();
        let ctx = MigrationContext::new();
        migrator.up(&ctx, ALL_AVAILABLE).unwrap();

        let err = migrator.down(&ctx, ALL_AVAILABLE).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ActionError);
        assert_eq!(migrator.current_version_id(&ctx).unwrap(), 2);
    }

    #[test]
    fn test_migrations_without_actions_are_skipped() {
        let migrations = vec![
            recorded(1),
            Migration::new(2, "down only").down(|_: &RecordingDb| Ok(())),
            recorded(3),
        ];
        let migrator = Migrator::new(RecordingDb::default(), migrations, MigratorConfig::new()).unwrap();
        let ctx = MigrationContext::new();

        migrator.up(&ctx, 2).unwrap();
        assert_eq!(migrator.current_version_id(&ctx).unwrap(), 3);
        assert_eq!(migrator.pending(&ctx).unwrap(), Vec::<u64>::new());
    }

    #[test]
    fn test_set_version_overrides() {
        let migrator = migrator(&[1, 3, 5]);
        let ctx = MigrationContext::new();
        migrator.set_version(&ctx, 3, "forced").unwrap();
        assert_eq!(migrator.current_version_id(&ctx).unwrap(), 3);

        migrator.up(&ctx, ALL_AVAILABLE).unwrap();
        assert_eq!(migrator.database().calls(), vec!["up5"]);
    }

    #[test]
    fn test_pending() {
        let migrator = migrator(&[4, 2, 8]);
        let ctx = MigrationContext::new();
        assert_eq!(migrator.pending(&ctx).unwrap(), vec![2, 4, 8]);
        migrator.up(&ctx, 1).unwrap();
        assert_eq!(migrator.pending(&ctx).unwrap(), vec![4, 8]);
    }

    #[test]
    fn test_custom_collection_name() {
        let db = RecordingDb::default();
        let config = MigratorConfig::new().with_collection_name("schema_versions").unwrap();
        let migrator = Migrator::new(db.clone(), vec![recorded(1)], config).unwrap();
        let ctx = MigrationContext::new();
        migrator.up(&ctx, ALL_AVAILABLE).unwrap();

        assert!(db.inner.has_collection("schema_versions"));
        assert!(!db.inner.has_collection("migrations"));
        assert_eq!(migrator.ledger().collection_name(), "schema_versions");
    }

    #[test]
    fn test_cancelled_context_runs_nothing() {
        let migrator = migrator(&[1]);
        let ctx = MigrationContext::new();
        ctx.cancel();
        let err = migrator.up(&ctx, ALL_AVAILABLE).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::Cancelled);
        assert!(migrator.database().calls().is_empty());
    }

    #[test]
    fn test_duplicate_versions_rejected() {
        let result = Migrator::new(
            RecordingDb::default(),
            vec![recorded(1), recorded(1)],
            MigratorConfig::new(),
        );
        assert_eq!(result.err().unwrap().kind(), &ErrorKind::DuplicateVersion);
    }
}
