//! # docmigrate - Versioned migrations for document databases
//!
//! docmigrate applies an ordered set of reversible migrations to a document
//! database and records every completed step in a version ledger kept in
//! one of the database's collections. Running it again is idempotent, and a
//! run that stopped half way resumes from the last recorded step.
//!
//! ## Key Features
//!
//! - **Forward and backward**: `up(n)` applies pending migrations, `down(n)`
//!   reverts applied ones, `0` meaning all of them
//! - **Sparse ids**: reverting records the nearest lower registered
//!   migration, never `id - 1`
//! - **Append-only ledger**: records are never overwritten
//! - **Injected handle**: actions receive the database handle explicitly
//! - **Cancellation**: a [`MigrationContext`] stops ledger access once
//!   cancelled or past its deadline
//!
//! ## Quick Start
//!
//! ```rust
//! use docmigrate::ledger::memory::InMemoryDatabase;
//! use docmigrate::{Migration, MigrationContext, Migrator, ALL_AVAILABLE};
//!
//! # fn main() -> Result<(), docmigrate::errors::MigrateError> {
//! let db = InMemoryDatabase::new();
//! let migrator = Migrator::builder(db)
//!     .add_migration(
//!         Migration::<InMemoryDatabase>::new(1, "create sessions")
//!             .up(|db| db.open_ledger("sessions").map(|_| ()))
//!             .down(|db| db.drop_collection("sessions")),
//!     )
//!     .build()?;
//!
//! let ctx = MigrationContext::new();
//! migrator.up(&ctx, ALL_AVAILABLE)?;
//! assert_eq!(migrator.current_version_id(&ctx)?, 1);
//! assert!(migrator.database().has_collection("sessions"));
//!
//! migrator.down(&ctx, ALL_AVAILABLE)?;
//! assert_eq!(migrator.current_version_id(&ctx)?, 0);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`common`] - Constants, sort order and lock helpers
//! - [`context`] - Cancellation and deadline context
//! - [`errors`] - Error types and result definitions
//! - [`ledger`] - Version ledger contract and the in-memory backend
//! - [`migration`] - Migration definitions and the migration set
//! - [`migrator`] - Up/down orchestration
//! - [`migrator_builder`] - Fluent construction
//! - [`migrator_config`] - Migrator configuration
//! - [`version`] - Version records

pub mod common;
pub mod context;
pub mod errors;
pub mod ledger;
pub mod migration;
pub mod migrator;
pub mod migrator_builder;
pub mod migrator_config;
pub mod version;

pub use common::{SortOrder, ALL_AVAILABLE, DEFAULT_MIGRATIONS_COLLECTION};
pub use context::MigrationContext;
pub use migration::{Migration, MigrationFn, Migrations};
pub use migrator::Migrator;
pub use migrator_builder::MigratorBuilder;
pub use migrator_config::MigratorConfig;
pub use version::Version;
