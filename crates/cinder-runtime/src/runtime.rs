//! Runtime wiring for the Cinder framework.
//!
//! The runtime owns the matcher and preprocessor registries, the command
//! table seeded from `command_start`, and the OneBot adapter that feeds
//! received payloads into the dispatcher.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cinder_runtime::CinderRuntime;
//!
//! // Loads cinder.toml and CINDER_* variables, then installs logging
//! let runtime = CinderRuntime::builder().build()?;
//!
//! runtime.register_matcher(runtime.on_command("ping").handler(|bot, event, _state| async move {
//!     bot.send(&event, "pong".into(), true).await?;
//!     Ok(())
//! }));
//!
//! // Transports call `runtime.adapter().connect_websocket(..)` and
//! // `runtime.adapter().handle_text(..)` as frames arrive.
//! runtime.run().await?;
//! ```

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::signal;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use crate::config::{CinderConfig, ConfigLoader};
use crate::error::RuntimeResult;
use crate::logging;
use cinder_adapter_onebot::{NicknameMatcher, OneBotAdapter};
use cinder_framework::{
    CommandTable, Dispatcher, Matcher, MatcherId, MatcherRegistry, PrefixMatcher, Preprocessor,
    PreprocessorRegistry, on_command,
};

/// The Cinder runtime.
pub struct CinderRuntime {
    config: CinderConfig,
    matchers: Arc<MatcherRegistry>,
    preprocessors: Arc<PreprocessorRegistry>,
    commands: Arc<CommandTable>,
    adapter: Arc<OneBotAdapter>,
    running: AtomicBool,
    /// Flushes file logging on drop.
    _log_guard: Option<WorkerGuard>,
}

impl CinderRuntime {
    /// Creates a runtime builder that loads configuration from files and
    /// the environment.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Builds a runtime from an already loaded configuration.
    ///
    /// Logging is left untouched; see [`RuntimeBuilder`] for a runtime that
    /// installs it.
    pub fn new(config: CinderConfig) -> RuntimeResult<Self> {
        let matchers = Arc::new(MatcherRegistry::new());
        let preprocessors = Arc::new(PreprocessorRegistry::new());
        let commands = Arc::new(CommandTable::new(config.command_start.iter().cloned()));

        let prefix: Arc<dyn PrefixMatcher> = commands.clone();
        let dispatcher = Dispatcher::new(Arc::clone(&matchers), Arc::clone(&preprocessors))
            .with_prefix_matcher(prefix);

        let nickname = NicknameMatcher::new(&config.nickname)?;
        let adapter = Arc::new(
            OneBotAdapter::new(config.onebot.clone(), dispatcher).with_nickname(nickname),
        );

        info!(
            nicknames = config.nickname.len(),
            command_start = ?config.command_start,
            api_timeout_secs = config.onebot.api_timeout_secs,
            "Runtime initialized from configuration"
        );

        Ok(Self {
            config,
            matchers,
            preprocessors,
            commands,
            adapter,
            running: AtomicBool::new(false),
            _log_guard: None,
        })
    }

    pub fn config(&self) -> &CinderConfig {
        &self.config
    }

    pub fn matchers(&self) -> &Arc<MatcherRegistry> {
        &self.matchers
    }

    pub fn preprocessors(&self) -> &Arc<PreprocessorRegistry> {
        &self.preprocessors
    }

    pub fn commands(&self) -> &Arc<CommandTable> {
        &self.commands
    }

    /// The adapter that transports hand received payloads to.
    pub fn adapter(&self) -> &Arc<OneBotAdapter> {
        &self.adapter
    }

    pub fn register_matcher(&self, matcher: Matcher) -> MatcherId {
        self.matchers.register(matcher)
    }

    pub fn register_matchers(&self, matchers: impl IntoIterator<Item = Matcher>) -> Vec<MatcherId> {
        matchers
            .into_iter()
            .map(|matcher| self.register_matcher(matcher))
            .collect()
    }

    pub fn register_preprocessor(&self, preprocessor: impl Preprocessor + 'static) {
        self.preprocessors.register(preprocessor);
    }

    /// Starts a command matcher using this runtime's command table.
    pub fn on_command(&self, command: impl Into<String>) -> Matcher {
        on_command(&self.commands, command)
    }

    pub fn matcher_count(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Runs until Ctrl+C (or SIGTERM on Unix), then disconnects all bots.
    pub async fn run(&self) -> RuntimeResult<()> {
        self.start();
        info!("Cinder runtime is now running. Press Ctrl+C to stop.");

        let result = wait_for_shutdown().await;
        self.stop();
        result
    }

    /// Runs until `shutdown` completes, then disconnects all bots.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        self.start();
        shutdown.await;
        self.stop();
    }

    fn start(&self) {
        if self.running.swap(true, Ordering::AcqRel) {
            warn!("Runtime is already running");
            return;
        }
        info!(
            matchers = self.matchers.len(),
            preprocessors = self.preprocessors.len(),
            "Starting Cinder runtime"
        );
    }

    fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            warn!("Runtime is not running");
            return;
        }

        for self_id in self.adapter.bot_ids() {
            self.adapter.disconnect(&self_id);
            debug!(bot = %self_id, "Bot disconnected on shutdown");
        }

        let pending = self.adapter.result_store().pending_count();
        if pending > 0 {
            warn!(pending, "Shutting down with API calls still awaiting responses");
        }
        info!("Runtime stopped");
    }
}

async fn wait_for_shutdown() -> RuntimeResult<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;

        tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                info!("Received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
        info!("Received Ctrl+C, shutting down");
    }

    Ok(())
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Loads configuration, installs logging and builds a [`CinderRuntime`].
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    init_logging: bool,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
            init_logging: true,
        }
    }

    /// Loads this file instead of searching for one.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Leaves the global subscriber alone.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    pub fn build(self) -> RuntimeResult<CinderRuntime> {
        let config = self.config_loader.load()?;
        let log_guard = if self.init_logging {
            logging::init_from_config(&config.logging)
        } else {
            None
        };

        let mut runtime = CinderRuntime::new(config)?;
        runtime._log_guard = log_guard;
        Ok(runtime)
    }
}

// =============================================================================
// Tests
// =============================================================================
