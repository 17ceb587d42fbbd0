//! The bot abstraction and API call errors.
//!
//! A [`Bot`] is one logged-in account on a OneBot implementation. Handlers
//! receive a [`BoxedBot`] and use it to call protocol actions or to reply to
//! the event they are handling.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::foundation::{Event, Message};

/// Result type for API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors surfaced to the caller of an API action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Transport failure, closed connection or timeout.
    #[error("network error: {0}")]
    Network(String),

    /// The remote side answered with `status: failed`.
    #[error("action failed (retcode: {retcode:?})")]
    ActionFailed {
        /// The reported return code, when present.
        retcode: Option<i64>,
    },

    /// No usable endpoint is configured for the bot; nothing was sent.
    #[error("API not available")]
    ApiNotAvailable,

    /// The event carries neither a user nor a group to reply to.
    #[error("cannot determine the message target from the event")]
    MissingSession,

    /// A request or response could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ApiError {
    /// The error for a call whose response did not arrive in time.
    pub fn timeout() -> Self {
        Self::Network("timed out waiting for the API response".into())
    }

    /// Returns true for transport-level failures.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// A connected bot account.
///
/// Protocol crates implement this trait and add strongly-typed action
/// wrappers on their concrete type; use [`Bot::as_any`] to reach them.
#[async_trait]
pub trait Bot: Send + Sync + 'static {
    /// The bot's own account id.
    fn self_id(&self) -> &str;

    /// Name of the protocol adapter driving this bot.
    fn adapter_name(&self) -> &str;

    /// Calls a protocol action and returns the unwrapped `data` value.
    async fn call_api(&self, action: &str, params: Value) -> ApiResult<Value>;

    /// Replies to the session an event came from.
    ///
    /// With `at_sender`, group replies are prefixed with a mention of the
    /// event's user.
    async fn send(&self, event: &Event, message: Message, at_sender: bool) -> ApiResult<Value>;

    /// Upcasts for downcasting to the concrete bot type.
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Shared handle to a bot.
pub type BoxedBot = Arc<dyn Bot>;
