use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

use crate::common::{atomic, Atomic};

/// Error kinds for migration operations.
///
/// Each kind names one category of failure so callers can tell an action
/// that failed apart from a ledger that could not be reached.
///
/// # Examples
///
/// ```rust
/// use docmigrate::errors::{ErrorKind, MigrateError, MigrateResult};
///
/// fn example() -> MigrateResult<()> {
///     Err(MigrateError::new("ledger unreachable", ErrorKind::StoreAccessError))
/// }
/// assert_eq!(example().unwrap_err().kind(), &ErrorKind::StoreAccessError);
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Ledger Errors
    /// The ledger could not read or write a version record
    StoreAccessError,
    /// The requested version record does not exist
    NotFound,

    // Migration Errors
    /// A forward or backward action reported failure
    ActionError,
    /// Two migrations were registered with the same version id
    DuplicateVersion,

    // Validation Errors
    /// Configuration or migration definition is invalid
    ValidationError,

    // Context Errors
    /// The migration context was cancelled
    Cancelled,
    /// The migration context deadline passed
    DeadlineExceeded,

    // Data Encoding Errors
    /// A version record could not be encoded or decoded
    EncodingError,

    /// Error raised by the database driver behind an action
    BackendError,

    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::StoreAccessError => write!(f, "Store access error"),
            ErrorKind::NotFound => write!(f, "Not found"),
            ErrorKind::ActionError => write!(f, "Action error"),
            ErrorKind::DuplicateVersion => write!(f, "Duplicate version"),
            ErrorKind::ValidationError => write!(f, "Validation error"),
            ErrorKind::Cancelled => write!(f, "Cancelled"),
            ErrorKind::DeadlineExceeded => write!(f, "Deadline exceeded"),
            ErrorKind::EncodingError => write!(f, "Encoding error"),
            ErrorKind::BackendError => write!(f, "Backend error"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Error type returned by every fallible operation in this crate.
///
/// `MigrateError` carries a message, a kind, an optional cause and the
/// backtrace captured where it was created.
///
/// # Examples
///
/// ```rust
/// use docmigrate::errors::{ErrorKind, MigrateError};
///
/// let cause = MigrateError::new("connection reset", ErrorKind::BackendError);
/// let err = MigrateError::new_with_cause(
///     "Failed to migrate from version 1 to 3",
///     ErrorKind::ActionError,
///     cause,
/// );
/// assert_eq!(err.cause().map(|c| c.kind().clone()), Some(ErrorKind::BackendError));
/// ```
#[derive(Clone)]
pub struct MigrateError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<MigrateError>>,
    backtrace: Atomic<Backtrace>,
}

impl MigrateError {
    /// Creates a new `MigrateError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        MigrateError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: atomic(Backtrace::new()),
        }
    }

    /// Creates a new `MigrateError` wrapping the error that caused it.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: MigrateError) -> Self {
        MigrateError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: atomic(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&MigrateError> {
        self.cause.as_deref()
    }

    /// Walks the cause chain and returns the innermost error.
    pub fn root_cause(&self) -> &MigrateError {
        let mut current = self;
        while let Some(cause) = current.cause() {
            current = cause;
        }
        current
    }
}

impl Display for MigrateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for MigrateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // message with the cause chain, or the backtrace at the root
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace.read()),
        }
    }
}

impl Error for MigrateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// Shorthand for `Result<T, MigrateError>`.
pub type MigrateResult<T> = Result<T, MigrateError>;

#[cfg(feature = "serde")]
impl serde::de::Error for MigrateError {
    fn custom<T: Display>(msg: T) -> Self {
        MigrateError::new(&msg.to_string(), ErrorKind::EncodingError)
    }
}

#[cfg(feature = "serde")]
impl serde::ser::Error for MigrateError {
    fn custom<T: Display>(msg: T) -> Self {
        MigrateError::new(&msg.to_string(), ErrorKind::EncodingError)
    }
}

impl From<std::io::Error> for MigrateError {
    fn from(err: std::io::Error) -> Self {
        MigrateError::new(&format!("IO error: {}", err), ErrorKind::StoreAccessError)
    }
}

impl From<anyhow::Error> for MigrateError {
    fn from(err: anyhow::Error) -> Self {
        MigrateError::new(&format!("{:#}", err), ErrorKind::BackendError)
    }
}

impl From<String> for MigrateError {
    fn from(msg: String) -> Self {
        MigrateError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for MigrateError {
    fn from(msg: &str) -> Self {
        MigrateError::new(msg, ErrorKind::InternalError)
    }
}
