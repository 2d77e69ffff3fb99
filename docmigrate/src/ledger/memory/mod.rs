mod database;
mod ledger;

pub use database::InMemoryDatabase;
pub use ledger::InMemoryLedger;
