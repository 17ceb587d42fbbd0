//! Error types for the Cinder framework.
//!
//! Rules, permissions, preprocessors and handlers are user code and report
//! failures as [`anyhow::Error`]. The dispatcher never lets those failures
//! escape a matcher: errors are logged and panics are captured as
//! [`Panicked`].

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use thiserror::Error;

/// A user callback panicked while the dispatcher was polling it.
#[derive(Debug, Clone, Error)]
#[error("callback panicked: {message}")]
pub struct Panicked {
    /// The panic payload, when it was a string.
    pub message: String,
}

impl Panicked {
    fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        Self { message }
    }
}

/// Awaits a user callback, turning a panic into an error.
pub(crate) async fn catch_fault<T, F>(future: F) -> anyhow::Result<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(Panicked::from_payload(payload).into()),
    }
}
