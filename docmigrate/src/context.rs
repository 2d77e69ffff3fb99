use crate::errors::{ErrorKind, MigrateError, MigrateResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cancellation and deadline scope for a migration call.
///
/// The context is checked by ledger operations before they touch the store.
/// Cancelling it never undoes an action that already ran; the next ledger
/// access simply fails with [`ErrorKind::Cancelled`] or
/// [`ErrorKind::DeadlineExceeded`].
///
/// Clones share the cancellation flag, so a context handed to another thread
/// can stop a running `up`/`down` at its next ledger access.
///
/// ```rust
/// use docmigrate::MigrationContext;
///
/// let ctx = MigrationContext::new();
/// let handle = ctx.clone();
/// handle.cancel();
/// assert!(ctx.is_cancelled());
/// assert!(ctx.check().is_err());
/// ```
#[derive(Clone, Debug, Default)]
pub struct MigrationContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl MigrationContext {
    /// Creates a context that is never cancelled and has no deadline.
    pub fn new() -> Self {
        MigrationContext {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: None,
        }
    }

    /// Returns a context sharing this one's cancellation flag that expires at `deadline`.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        };
        MigrationContext {
            cancelled: self.cancelled.clone(),
            deadline: Some(deadline),
        }
    }

    /// Returns a context sharing this one's cancellation flag that expires after `timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fails if the context was cancelled or its deadline has passed.
    pub fn check(&self) -> MigrateResult<()> {
        if self.is_cancelled() {
            log::error!("Migration context is cancelled");
            return Err(MigrateError::new(
                "Migration context is cancelled",
                ErrorKind::Cancelled,
            ));
        }

        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                log::error!("Migration context deadline exceeded");
                return Err(MigrateError::new(
                    "Migration context deadline exceeded",
                    ErrorKind::DeadlineExceeded,
                ));
            }
        }

        Ok(())
    }
}
