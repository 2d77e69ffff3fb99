use chrono::{DateTime, Utc};
use std::fmt::{Display, Formatter};

use crate::common::INITIAL_VERSION;

/// One completed application of a migration, forward or backward.
///
/// A record is written by the migrator after every successful step and is
/// never mutated afterwards. The id of the most recently written record is
/// the current version of the database.
///
/// # Persisted shape
///
/// With the `serde` feature the record serializes as
/// `{"id": 3, "description": "add index", "timestamp": "2024-01-01T00:00:00Z"}`.
/// An empty description is omitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Version {
    id: u64,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "String::is_empty")
    )]
    description: String,
    timestamp: DateTime<Utc>,
}

impl Version {
    /// Creates a record stamped with the current instant.
    pub fn new(id: u64, description: &str) -> Self {
        Version::with_timestamp(id, description, Utc::now())
    }

    pub fn with_timestamp(id: u64, description: &str, timestamp: DateTime<Utc>) -> Self {
        Version {
            id,
            description: description.to_string(),
            timestamp,
        }
    }

    /// The record written when every migration has been reverted.
    pub fn initial() -> Self {
        Version::new(INITIAL_VERSION, "")
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn is_initial(&self) -> bool {
        self.id == INITIAL_VERSION
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.description.is_empty() {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{} ({})", self.id, self.description)
        }
    }
}
