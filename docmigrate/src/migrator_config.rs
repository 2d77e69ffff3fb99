//! Configuration for a migrator.

use crate::common::{DEFAULT_MIGRATIONS_COLLECTION, SYSTEM_COLLECTION_PREFIX};
use crate::errors::{ErrorKind, MigrateError, MigrateResult};
use std::sync::Arc;

/// Options recognised when constructing a [`Migrator`](crate::Migrator).
///
/// # Examples
///
/// ```rust
/// use docmigrate::MigratorConfig;
///
/// let config = MigratorConfig::new().with_collection_name("schema_versions")?;
/// assert_eq!(config.collection_name(), "schema_versions");
/// assert_eq!(MigratorConfig::default().collection_name(), "migrations");
/// # Ok::<(), docmigrate::errors::MigrateError>(())
/// ```
#[derive(Clone, Debug)]
pub struct MigratorConfig {
    inner: Arc<MigratorConfigInner>,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl MigratorConfig {
    /// Creates a configuration using the default `"migrations"` ledger collection.
    pub fn new() -> Self {
        MigratorConfig {
            inner: Arc::new(MigratorConfigInner::new()),
        }
    }

    /// Name of the collection holding version records.
    pub fn collection_name(&self) -> &str {
        &self.inner.collection_name
    }

    /// Returns a copy of this configuration with another ledger collection.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ValidationError`] if the name is empty, contains a
    /// NUL character, or starts with the reserved `$` prefix.
    pub fn with_collection_name(&self, name: &str) -> MigrateResult<Self> {
        validate_collection_name(name)?;
        let mut inner = (*self.inner).clone();
        inner.collection_name = name.to_string();
        Ok(MigratorConfig {
            inner: Arc::new(inner),
        })
    }

    /// Re-checks every option. Called by the migrator at construction.
    pub fn validate(&self) -> MigrateResult<()> {
        validate_collection_name(&self.inner.collection_name)
    }
}

#[derive(Clone, Debug)]
struct MigratorConfigInner {
    collection_name: String,
}

impl MigratorConfigInner {
    fn new() -> Self {
        MigratorConfigInner {
            collection_name: DEFAULT_MIGRATIONS_COLLECTION.to_string(),
        }
    }
}

fn validate_collection_name(name: &str) -> MigrateResult<()> {
    if name.trim().is_empty() {
        log::error!("Migrations collection name cannot be empty");
        return Err(MigrateError::new(
            "Migrations collection name cannot be empty",
            ErrorKind::ValidationError,
        ));
    }

    if name.contains('\0') {
        log::error!("Migrations collection name cannot contain NUL characters");
        return Err(MigrateError::new(
            "Migrations collection name cannot contain NUL characters",
            ErrorKind::ValidationError,
        ));
    }

    if name.starts_with(SYSTEM_COLLECTION_PREFIX) {
        log::error!("Migrations collection name {} uses a reserved prefix", name);
        return Err(MigrateError::new(
            &format!(
                "Migrations collection name {} uses the reserved prefix {}",
                name, SYSTEM_COLLECTION_PREFIX
            ),
            ErrorKind::ValidationError,
        ));
    }

    Ok(())
}
