//! Correlation of WebSocket API calls with their responses.
//!
//! One WebSocket connection carries many concurrent API calls. Each outbound
//! request is tagged with `"echo": {"seq": n}` and the peer copies that echo
//! into its response, so responses can arrive in any order.
//!
//! The flow for one call:
//!
//! 1. [`next_seq`](ResultStore::next_seq) allocates a sequence number.
//! 2. [`register`](ResultStore::register) stores a pending slot and returns a
//!    [`PendingCall`] guard. Register before sending so a fast response is
//!    never missed.
//! 3. The receive path hands every non-event payload to
//!    [`resolve`](ResultStore::resolve).
//! 4. [`PendingCall::wait`] returns the response or times out.
//!
//! The slot is removed when the guard is dropped, so timed out, failed and
//! cancelled calls never leave entries behind.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, trace};

use cinder_core::{ApiError, ApiResult};

/// Pending WebSocket API calls keyed by sequence number.
#[derive(Debug)]
pub struct ResultStore {
    seq: AtomicI64,
    pending: Mutex<HashMap<i64, oneshot::Sender<Value>>>,
}

impl Default for ResultStore {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn starting_at(seq: i64) -> Self {
        Self {
            seq: AtomicI64::new(seq),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the next sequence number.
    ///
    /// Numbers start at 1 and wrap from `i64::MAX` back to 1.
    pub fn next_seq(&self) -> i64 {
        let previous = self
            .seq
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |seq| {
                Some(if seq >= i64::MAX || seq < 1 { 1 } else { seq + 1 })
            });
        // The closure never returns `None`, so both arms carry the old value.
        match previous {
            Ok(seq) | Err(seq) => seq,
        }
    }

    /// Creates the pending slot for `seq`.
    ///
    /// Registering a sequence number twice replaces the earlier slot; the
    /// earlier waiter then fails as disconnected.
    pub fn register(&self, seq: i64) -> PendingCall<'_> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(seq, tx);
        trace!(seq, "Registered pending API call");
        PendingCall {
            store: self,
            seq,
            rx,
        }
    }

    /// Delivers an API response to its waiter.
    ///
    /// The response must carry `echo.seq` as an integer. Returns false for
    /// malformed responses and for sequence numbers nobody is waiting on.
    pub fn resolve(&self, response: &Value) -> bool {
        let Some(seq) = response
            .get("echo")
            .and_then(Value::as_object)
            .and_then(|echo| echo.get("seq"))
            .and_then(Value::as_i64)
        else {
            return false;
        };

        let Some(tx) = self.pending.lock().remove(&seq) else {
            debug!(seq, "Received API response for unknown seq (timed out?)");
            return false;
        };
        tx.send(response.clone()).is_ok()
    }

    /// Number of calls currently waiting.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

/// A registered call waiting for its response.
///
/// Dropping the guard removes the slot from the store.
#[derive(Debug)]
pub struct PendingCall<'a> {
    store: &'a ResultStore,
    seq: i64,
    rx: oneshot::Receiver<Value>,
}

impl PendingCall<'_> {
    pub fn seq(&self) -> i64 {
        self.seq
    }

    /// Waits for the response envelope.
    ///
    /// # Errors
    ///
    /// [`ApiError::Network`] when the timeout elapses or the slot is
    /// discarded.
    pub async fn wait(mut self, timeout: Duration) -> ApiResult<Value> {
        match tokio::time::timeout(timeout, &mut self.rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(ApiError::Network(
                "WebSocket API call was discarded".to_string(),
            )),
            Err(_) => {
                debug!(seq = self.seq, "WebSocket API call timed out");
                Err(ApiError::timeout())
            }
        }
    }
}

impl Drop for PendingCall<'_> {
    fn drop(&mut self) {
        self.store.pending.lock().remove(&self.seq);
    }
}
