//! Event preprocessors.
//!
//! Preprocessors run before any matcher, all at once, sharing one state
//! map. Any of them can veto the event by returning [`Preprocess::Abort`];
//! the dispatcher then skips every tier for that event.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use crate::state::State;
use cinder_core::{BoxedBot, Event};

/// The verdict of a preprocessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preprocess {
    /// Let the event through.
    Proceed,
    /// Ignore the event entirely.
    Abort,
}

/// A hook run before matchers.
///
/// The state is shared between concurrently running preprocessors; hold the
/// lock only for short, synchronous updates.
#[async_trait]
pub trait Preprocessor: Send + Sync {
    async fn process(
        &self,
        bot: &BoxedBot,
        event: &Event,
        state: &Mutex<State>,
    ) -> anyhow::Result<Preprocess>;
}

/// A preprocessor backed by a synchronous closure.
pub struct FnPreprocessor<F>(F);

#[async_trait]
impl<F> Preprocessor for FnPreprocessor<F>
where
    F: Fn(&Event, &Mutex<State>) -> anyhow::Result<Preprocess> + Send + Sync,
{
    async fn process(
        &self,
        _bot: &BoxedBot,
        event: &Event,
        state: &Mutex<State>,
    ) -> anyhow::Result<Preprocess> {
        (self.0)(event, state)
    }
}

/// Wraps a closure as a preprocessor.
pub fn from_fn<F>(f: F) -> FnPreprocessor<F>
where
    F: Fn(&Event, &Mutex<State>) -> anyhow::Result<Preprocess> + Send + Sync,
{
    FnPreprocessor(f)
}

/// The set of registered preprocessors.
#[derive(Default)]
pub struct PreprocessorRegistry {
    processors: RwLock<Vec<Arc<dyn Preprocessor>>>,
}

impl PreprocessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, preprocessor: impl Preprocessor + 'static) {
        self.processors.write().push(Arc::new(preprocessor));
    }

    /// Copies the current list for one dispatch.
    pub fn snapshot(&self) -> Vec<Arc<dyn Preprocessor>> {
        self.processors.read().clone()
    }

    pub fn len(&self) -> usize {
        self.processors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for PreprocessorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreprocessorRegistry")
            .field("count", &self.len())
            .finish()
    }
}
