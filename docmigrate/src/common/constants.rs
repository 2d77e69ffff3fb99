// ledger constants
pub const DEFAULT_MIGRATIONS_COLLECTION: &str = "migrations";
pub const SYSTEM_COLLECTION_PREFIX: &str = "$";

// version constants
pub const INITIAL_VERSION: u64 = 0;

/// Step count accepted by `up`/`down` meaning "every eligible migration".
pub const ALL_AVAILABLE: usize = 0;

// record field names
pub const VERSION_ID: &str = "id";
pub const VERSION_DESCRIPTION: &str = "description";
pub const VERSION_TIMESTAMP: &str = "timestamp";
