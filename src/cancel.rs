//! Cooperative cancellation.
//! A `CancelToken` is a clonable one-way "stop" flag. The transfer engine
//! checks it before each file and each directory; signal handlers and UI
//! threads call `request()`.
//!
//! Notes:
//! - Relaxed atomics are sufficient for a one-way flag.
//! - `request()` is safe to call from signal handlers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared cancellation handle. Cloning yields another view of the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a cooperative stop (idempotent).
    #[inline]
    pub fn request(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Check whether a stop has been requested.
    #[inline]
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
