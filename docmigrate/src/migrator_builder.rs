use crate::errors::{MigrateError, MigrateResult};
use crate::ledger::LedgerSource;
use crate::migration::Migration;
use crate::migrator::Migrator;
use crate::migrator_config::MigratorConfig;

/// Builder for creating and configuring a [`Migrator`].
///
/// The first configuration error is kept and returned from
/// [`build`](Self::build), so the fluent chain never has to be interrupted.
///
/// # Examples
///
/// ```rust
/// use docmigrate::ledger::memory::InMemoryDatabase;
/// use docmigrate::{Migration, Migrator};
///
/// let migrator = Migrator::builder(InMemoryDatabase::new())
///     .collection_name("schema_versions")
///     .add_migrations(vec![
///         Migration::<InMemoryDatabase>::new(1, "first"),
///         Migration::new(2, "second"),
///     ])
///     .build()?;
/// assert_eq!(migrator.config().collection_name(), "schema_versions");
/// assert_eq!(migrator.migrations().len(), 2);
/// # Ok::<(), docmigrate::errors::MigrateError>(())
/// ```
pub struct MigratorBuilder<D> {
    error: Option<MigrateError>,
    db: D,
    config: MigratorConfig,
    migrations: Vec<Migration<D>>,
}

impl<D: LedgerSource> MigratorBuilder<D> {
    /// Creates a builder over `db` with the default configuration and no migrations.
    pub fn new(db: D) -> Self {
        MigratorBuilder {
            error: None,
            db,
            config: MigratorConfig::new(),
            migrations: Vec::new(),
        }
    }

    /// Sets the collection holding version records. Defaults to `"migrations"`.
    pub fn collection_name(mut self, name: &str) -> Self {
        if self.error.is_none() {
            match self.config.with_collection_name(name) {
                Ok(config) => self.config = config,
                Err(e) => self.error = Some(e),
            }
        }
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: MigratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers a migration. Order does not matter; ids must be unique.
    pub fn add_migration(mut self, migration: Migration<D>) -> Self {
        self.migrations.push(migration);
        self
    }

    pub fn add_migrations(mut self, migrations: Vec<Migration<D>>) -> Self {
        self.migrations.extend(migrations);
        self
    }

    /// Validates the collected options and migrations and opens the ledger.
    ///
    /// # Errors
    ///
    /// Returns the first captured configuration error, or any error from
    /// [`Migrator::new`].
    pub fn build(self) -> MigrateResult<Migrator<D>> {
        if let Some(error) = self.error {
            return Err(error);
        }
        Migrator::new(self.db, self.migrations, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::ledger::memory::InMemoryDatabase;

    #[test]
    fn test_default_build() {
        let migrator = MigratorBuilder::new(InMemoryDatabase::new()).build().unwrap();
        assert_eq!(migrator.config().collection_name(), "migrations");
        assert!(migrator.migrations().is_empty());
    }

    #[test]
    fn test_collection_name_error_propagation() {
        let result = MigratorBuilder::new(InMemoryDatabase::new())
            .collection_name("")
            .build();
        let err = result.err().unwrap();
        assert_eq!(err.kind(), &ErrorKind::ValidationError);
        assert!(err.to_string().contains("collection name"));
    }

    #[test]
    fn test_first_error_is_kept() {
        let result = MigratorBuilder::new(InMemoryDatabase::new())
            .collection_name("$bad")
            .collection_name("good")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_migration_error() {
        let result = MigratorBuilder::new(InMemoryDatabase::new())
            .add_migration(Migration::new(1, "a"))
            .add_migration(Migration::new(1, "b"))
            .build();
        assert_eq!(result.err().unwrap().kind(), &ErrorKind::DuplicateVersion);
    }

    #[test]
    fn test_config_replaces_defaults() {
        let db = InMemoryDatabase::new();
        let config = MigratorConfig::new().with_collection_name("versions").unwrap();
        let migrator = MigratorBuilder::new(db.clone()).config(config).build().unwrap();
        assert_eq!(migrator.config().collection_name(), "versions");
        assert!(db.has_collection("versions"));
    }

    #[test]
    fn test_closed_database_fails_build() {
        let db = InMemoryDatabase::new();
        db.close();
        let result = MigratorBuilder::new(db).build();
        assert_eq!(result.err().unwrap().kind(), &ErrorKind::StoreAccessError);
    }
}
