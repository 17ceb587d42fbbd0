//! Type-erased matcher handlers.
//!
//! A handler is any async function taking the bot, the event and the
//! matcher's state:
//!
//! ```rust,ignore
//! use cinder_framework::on_message;
//!
//! let echo = on_message().handler(|bot, event, _state| async move {
//!     if let Some(message) = event.message() {
//!         bot.send(&event, message.clone(), false).await?;
//!     }
//!     Ok(())
//! });
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::state::State;
use cinder_core::{BoxedBot, Event};

/// A boxed handler callable.
pub type BoxedHandler =
    Arc<dyn Fn(BoxedBot, Arc<Event>, State) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Erases an async function into a [`BoxedHandler`].
pub fn into_handler<F, Fut>(f: F) -> BoxedHandler
where
    F: Fn(BoxedBot, Arc<Event>, State) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(
        move |bot: BoxedBot, event: Arc<Event>, state: State| -> BoxFuture<'static, anyhow::Result<()>> {
            Box::pin(f(bot, event, state))
        },
    )
}
