use crate::errors::MigrateResult;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Forward or backward action run against the database handle `D`.
///
/// The wrapped closure is shared through an `Arc`, so cloning a migration
/// does not clone the closure. Actions should be idempotent: if an action
/// succeeds but the ledger write after it fails, running the migrator again
/// will run the action again.
pub struct MigrationFn<D> {
    action: Arc<dyn Fn(&D) -> MigrateResult<()> + Send + Sync>,
}

impl<D> MigrationFn<D> {
    pub fn new<F>(action: F) -> Self
    where
        F: Fn(&D) -> MigrateResult<()> + Send + Sync + 'static,
    {
        MigrationFn {
            action: Arc::new(action),
        }
    }

    pub fn call(&self, db: &D) -> MigrateResult<()> {
        (self.action)(db)
    }
}

impl<D> Clone for MigrationFn<D> {
    fn clone(&self) -> Self {
        MigrationFn {
            action: self.action.clone(),
        }
    }
}

impl<D> Debug for MigrationFn<D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MigrationFn(<closure>)")
    }
}

/// A single reversible migration identified by a unique version id.
///
/// # Examples
///
/// ```rust
/// use docmigrate::ledger::memory::InMemoryDatabase;
/// use docmigrate::migration::Migration;
///
/// let migration = Migration::<InMemoryDatabase>::new(3, "create users index")
///     .up(|_db| Ok(()))
///     .down(|_db| Ok(()));
/// assert_eq!(migration.id(), 3);
/// assert!(migration.has_up() && migration.has_down());
/// ```
pub struct Migration<D> {
    id: u64,
    description: String,
    up: Option<MigrationFn<D>>,
    down: Option<MigrationFn<D>>,
}

impl<D> Migration<D> {
    /// Creates a migration with no actions. Attach them with [`up`](Self::up) and [`down`](Self::down).
    pub fn new(id: u64, description: &str) -> Self {
        Migration {
            id,
            description: description.to_string(),
            up: None,
            down: None,
        }
    }

    pub fn up<F>(mut self, action: F) -> Self
    where
        F: Fn(&D) -> MigrateResult<()> + Send + Sync + 'static,
    {
        self.up = Some(MigrationFn::new(action));
        self
    }

    pub fn down<F>(mut self, action: F) -> Self
    where
        F: Fn(&D) -> MigrateResult<()> + Send + Sync + 'static,
    {
        self.down = Some(MigrationFn::new(action));
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn has_up(&self) -> bool {
        self.up.is_some()
    }

    pub fn has_down(&self) -> bool {
        self.down.is_some()
    }

    pub(crate) fn up_action(&self) -> Option<&MigrationFn<D>> {
        self.up.as_ref()
    }

    pub(crate) fn down_action(&self) -> Option<&MigrationFn<D>> {
        self.down.as_ref()
    }
}

impl<D> Clone for Migration<D> {
    fn clone(&self) -> Self {
        Migration {
            id: self.id,
            description: self.description.clone(),
            up: self.up.clone(),
            down: self.down.clone(),
        }
    }
}

impl<D> Debug for Migration<D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migration")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("up", &self.up.is_some())
            .field("down", &self.down.is_some())
            .finish()
    }
}
