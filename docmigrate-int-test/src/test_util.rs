use docmigrate::common::{atomic, Atomic};
use docmigrate::errors::{ErrorKind, MigrateError, MigrateResult};
use docmigrate::ledger::memory::InMemoryDatabase;
use docmigrate::ledger::{LedgerSource, VersionLedger, VersionLedgerProvider};
use docmigrate::version::Version;
use docmigrate::{Migration, MigrationContext, Migrator, MigratorConfig};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};

pub const USERS: &str = "users";

/// Document database double used by the integration tests.
///
/// Migrations add and remove field names on collections. Every action that
/// runs is appended to a shared log, and failures can be armed for single
/// actions or for ledger writes. Clones share all state.
#[derive(Clone, Default)]
pub struct TestDatabase {
    store: InMemoryDatabase,
    fields: Atomic<BTreeMap<String, BTreeSet<String>>>,
    actions: Atomic<Vec<String>>,
    failing_actions: Atomic<BTreeSet<String>>,
    ledger_write_budget: Atomic<Option<usize>>,
}

impl TestDatabase {
    pub fn new() -> Self {
        TestDatabase {
            store: InMemoryDatabase::new(),
            fields: atomic(BTreeMap::new()),
            actions: atomic(Vec::new()),
            failing_actions: atomic(BTreeSet::new()),
            ledger_write_budget: atomic(None),
        }
    }

    pub fn store(&self) -> &InMemoryDatabase {
        &self.store
    }

    pub fn add_field(&self, action: &str, collection: &str, field: &str) -> MigrateResult<()> {
        self.run(action, |fields| {
            fields
                .entry(collection.to_string())
                .or_default()
                .insert(field.to_string());
        })
    }

    pub fn remove_field(&self, action: &str, collection: &str, field: &str) -> MigrateResult<()> {
        self.run(action, |fields| {
            if let Some(set) = fields.get_mut(collection) {
                set.remove(field);
            }
        })
    }

    pub fn fields(&self, collection: &str) -> Vec<String> {
        self.fields
            .read()
            .get(collection)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Labels of every action that ran, in order.
    pub fn actions(&self) -> Vec<String> {
        self.actions.read().clone()
    }

    pub fn clear_actions(&self) {
        self.actions.write().clear();
    }

    /// Makes the action with this label fail until [`heal_action`](Self::heal_action).
    pub fn fail_action(&self, action: &str) {
        self.failing_actions.write().insert(action.to_string());
    }

    pub fn heal_action(&self, action: &str) {
        self.failing_actions.write().remove(action);
    }

    /// Lets `writes` more ledger records through, then refuses every write.
    pub fn fail_ledger_writes_after(&self, writes: usize) {
        *self.ledger_write_budget.write() = Some(writes);
    }

    pub fn allow_ledger_writes(&self) {
        *self.ledger_write_budget.write() = None;
    }

    fn run(
        &self,
        action: &str,
        f: impl FnOnce(&mut BTreeMap<String, BTreeSet<String>>),
    ) -> MigrateResult<()> {
        if self.failing_actions.read().contains(action) {
            log::error!("Action {} failed", action);
            return Err(MigrateError::new(
                &format!("Action {} failed", action),
                ErrorKind::BackendError,
            ));
        }

        f(&mut self.fields.write());
        self.actions.write().push(action.to_string());
        Ok(())
    }
}

impl LedgerSource for TestDatabase {
    fn version_ledger(&self, collection_name: &str) -> MigrateResult<VersionLedger> {
        let inner = self.store.version_ledger(collection_name)?;
        Ok(VersionLedger::new(GuardedLedger {
            inner,
            write_budget: self.ledger_write_budget.clone(),
        }))
    }
}

/// Ledger that refuses writes once the shared budget runs out.
struct GuardedLedger {
    inner: VersionLedger,
    write_budget: Atomic<Option<usize>>,
}

impl VersionLedgerProvider for GuardedLedger {
    fn current(&self, ctx: &MigrationContext) -> MigrateResult<Option<Version>> {
        self.inner.current(ctx)
    }

    fn get(&self, ctx: &MigrationContext, id: u64) -> MigrateResult<Option<Version>> {
        self.inner.find(ctx, id)
    }

    fn set(&self, ctx: &MigrationContext, version: &Version) -> MigrateResult<()> {
        let allowed = match &mut *self.write_budget.write() {
            Some(0) => false,
            Some(remaining) => {
                *remaining -= 1;
                true
            }
            None => true,
        };

        if !allowed {
            log::error!("Ledger write refused for version {}", version.id());
            return Err(MigrateError::new(
                &format!("Ledger write refused for version {}", version.id()),
                ErrorKind::BackendError,
            ));
        }
        self.inner.set(ctx, version)
    }

    fn delete(&self, ctx: &MigrationContext, id: u64) -> MigrateResult<()> {
        self.inner.delete(ctx, id)
    }

    fn history(&self, ctx: &MigrationContext) -> MigrateResult<Vec<Version>> {
        self.inner.history(ctx)
    }

    fn collection_name(&self) -> String {
        self.inner.collection_name()
    }
}

/// Migration `id` adds field `f{id}` to the users collection on the way up
/// and removes it on the way down. Actions are logged as `up{id}`/`down{id}`.
pub fn field_migration(id: u64) -> Migration<TestDatabase> {
    let field = field_name(id);
    let down_field = field.clone();
    Migration::new(id, &format!("add {}", field))
        .up(move |db: &TestDatabase| db.add_field(&up_label(id), USERS, &field))
        .down(move |db: &TestDatabase| db.remove_field(&down_label(id), USERS, &down_field))
}

pub fn field_name(id: u64) -> String {
    format!("f{}", id)
}

pub fn up_label(id: u64) -> String {
    format!("up{}", id)
}

pub fn down_label(id: u64) -> String {
    format!("down{}", id)
}

/// `count` distinct ids in `1..=max`, shuffled.
pub fn sparse_ids<R: Rng>(rng: &mut R, count: usize, max: u64) -> Vec<u64> {
    let mut ids = BTreeSet::new();
    while ids.len() < count {
        ids.insert(rng.random_range(1..=max));
    }
    let mut ids: Vec<u64> = ids.into_iter().collect();
    ids.shuffle(rng);
    ids
}

#[derive(Clone)]
pub struct TestContext {
    db: TestDatabase,
    ctx: MigrationContext,
    ids: Vec<u64>,
}

impl TestContext {
    pub fn db(&self) -> &TestDatabase {
        &self.db
    }

    pub fn ctx(&self) -> &MigrationContext {
        &self.ctx
    }

    /// Registered ids, ascending.
    pub fn ids(&self) -> Vec<u64> {
        let mut ids = self.ids.clone();
        ids.sort_unstable();
        ids
    }

    /// Migrator over the shared database with one field migration per id.
    pub fn migrator(&self) -> MigrateResult<Migrator<TestDatabase>> {
        self.migrator_with(MigratorConfig::new())
    }

    pub fn migrator_with(&self, config: MigratorConfig) -> MigrateResult<Migrator<TestDatabase>> {
        let migrations = self.ids.iter().map(|id| field_migration(*id)).collect();
        Migrator::new(self.db.clone(), migrations, config)
    }

    pub fn version(&self) -> MigrateResult<u64> {
        self.migrator()?.current_version_id(&self.ctx)
    }
}

pub fn create_test_context(ids: &[u64]) -> MigrateResult<TestContext> {
    Ok(TestContext {
        db: TestDatabase::new(),
        ctx: MigrationContext::new(),
        ids: ids.to_vec(),
    })
}

pub fn cleanup(ctx: TestContext) -> MigrateResult<()> {
    ctx.db.store().close();
    Ok(())
}

/// Runs `test` against a fresh context from `before`, then `after`.
/// Panics with the failing stage and error.
pub fn run_test<B, T, A>(before: B, test: T, after: A)
where
    B: Fn() -> MigrateResult<TestContext>,
    T: Fn(TestContext) -> MigrateResult<()>,
    A: Fn(TestContext) -> MigrateResult<()>,
{
    let ctx = match before() {
        Ok(ctx) => ctx,
        Err(e) => panic!("Before run failed: {:?}", e),
    };

    let result = test(ctx.clone());
    let after_result = after(ctx);

    if let Err(e) = result {
        panic!("Test failed: {:?}", e);
    }
    if let Err(e) = after_result {
        panic!("After run failed: {:?}", e);
    }
}
