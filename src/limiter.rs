//! Fixed-capacity limiter for in-flight network operations.
//!
//! Every network operation (directory fetch, metadata fetch, binary fetch)
//! acquires a permit before starting and holds it for the duration of that
//! operation only. Permits are released on drop, so early returns and error
//! paths cannot leak capacity.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Minimum allowed capacity.
const MIN_CAPACITY: usize = 1;

/// Maximum allowed capacity.
const MAX_CAPACITY: usize = 100;

/// Error type for limiter operations.
#[derive(Debug, thiserror::Error)]
pub enum LimiterError {
    /// Invalid capacity value provided.
    #[error("invalid capacity {value}: must be between {MIN_CAPACITY} and {MAX_CAPACITY}")]
    InvalidCapacity {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Semaphore was closed unexpectedly.
    #[error("limiter closed unexpectedly")]
    Closed,
}

/// Counting semaphore bounding simultaneous fetches.
///
/// Cloning is cheap and all clones share the same capacity pool. The
/// permit returned by [`acquire`](Self::acquire) is an RAII guard; the
/// slot returns to the pool when the guard drops, whether the guarded
/// operation succeeded or failed.
#[derive(Debug, Clone)]
pub struct FetchLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl FetchLimiter {
    /// Creates a limiter with the given capacity.
    ///
    /// # Errors
    ///
    /// Returns [`LimiterError::InvalidCapacity`] if the value is outside
    /// the valid range (1-100).
    pub fn new(capacity: usize) -> Result<Self, LimiterError> {
        if !(MIN_CAPACITY..=MAX_CAPACITY).contains(&capacity) {
            return Err(LimiterError::InvalidCapacity { value: capacity });
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        })
    }

    /// Waits until a slot is free and returns its permit.
    ///
    /// # Errors
    ///
    /// Returns [`LimiterError::Closed`] if the underlying semaphore was
    /// closed; this does not happen during normal operation.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, LimiterError> {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| LimiterError::Closed)
    }

    /// Returns the configured capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of currently free slots.
    #[must_use]
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}
