//! Migration definitions.
//!
//! A [`Migration`] pairs a forward and a backward action under a unique
//! version id. Actions are closures over the database handle type `D`:
//!
//! ```rust
//! use docmigrate::ledger::memory::InMemoryDatabase;
//! use docmigrate::migration::{Migration, Migrations};
//!
//! let migrations = Migrations::new(vec![
//!     Migration::<InMemoryDatabase>::new(1, "create sessions")
//!         .up(|db| db.open_ledger("sessions").map(|_| ()))
//!         .down(|db| db.drop_collection("sessions")),
//!     Migration::new(2, "noop"),
//! ])?;
//! assert!(migrations.contains_version(2));
//! # Ok::<(), docmigrate::errors::MigrateError>(())
//! ```
//!
//! A [`Migrations`] set rejects duplicate ids and the reserved id `0`.

mod migration;
mod migrations;

pub use migration::{Migration, MigrationFn};
pub use migrations::Migrations;
