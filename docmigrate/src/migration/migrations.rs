use super::Migration;
use crate::common::{SortOrder, INITIAL_VERSION};
use crate::errors::{ErrorKind, MigrateError, MigrateResult};
use std::collections::HashSet;

/// Ordered set of migrations with unique version ids.
///
/// The set is validated when it is built: ids must be unique and must not be
/// the reserved initial version `0`. Reads go through [`sorted`](Self::sorted),
/// which returns a view and leaves the stored order untouched.
pub struct Migrations<D> {
    migrations: Vec<Migration<D>>,
}

impl<D> Migrations<D> {
    /// Builds a set from `migrations`, keeping their given order.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::DuplicateVersion`] if two migrations share an id
    /// - [`ErrorKind::ValidationError`] if a migration uses id `0`
    pub fn new(migrations: Vec<Migration<D>>) -> MigrateResult<Self> {
        let mut seen = HashSet::with_capacity(migrations.len());
        for migration in &migrations {
            if migration.id() == INITIAL_VERSION {
                log::error!("Version {} is reserved for the initial state", INITIAL_VERSION);
                return Err(MigrateError::new(
                    &format!(
                        "Version {} is reserved for the initial state",
                        INITIAL_VERSION
                    ),
                    ErrorKind::ValidationError,
                ));
            }

            if !seen.insert(migration.id()) {
                log::error!("Duplicate migration version {}", migration.id());
                return Err(MigrateError::new(
                    &format!("Duplicate migration version {}", migration.id()),
                    ErrorKind::DuplicateVersion,
                ));
            }
        }
        Ok(Migrations { migrations })
    }

    /// Reorders the set in place by id.
    pub fn sort(&mut self, order: SortOrder) {
        match order {
            SortOrder::Ascending => self.migrations.sort_by_key(|m| m.id()),
            SortOrder::Descending => self
                .migrations
                .sort_by(|a, b| b.id().cmp(&a.id())),
        }
    }

    /// Returns the migrations ordered by id without reordering the set.
    pub fn sorted(&self, order: SortOrder) -> Vec<&Migration<D>> {
        let mut view: Vec<&Migration<D>> = self.migrations.iter().collect();
        match order {
            SortOrder::Ascending => view.sort_by_key(|m| m.id()),
            SortOrder::Descending => view.sort_by(|a, b| b.id().cmp(&a.id())),
        }
        view
    }

    pub fn contains_version(&self, id: u64) -> bool {
        self.migrations.iter().any(|m| m.id() == id)
    }

    pub fn get(&self, id: u64) -> Option<&Migration<D>> {
        self.migrations.iter().find(|m| m.id() == id)
    }

    /// Highest registered id, or `None` for an empty set.
    pub fn latest_version(&self) -> Option<u64> {
        self.migrations.iter().map(|m| m.id()).max()
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Iterates in stored order.
    pub fn iter(&self) -> impl Iterator<Item = &Migration<D>> {
        self.migrations.iter()
    }
}

impl<D> Clone for Migrations<D> {
    fn clone(&self) -> Self {
        Migrations {
            migrations: self.migrations.clone(),
        }
    }
}

impl<D> std::fmt::Debug for Migrations<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.migrations.iter()).finish()
    }
}
