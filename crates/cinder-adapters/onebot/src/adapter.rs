//! OneBot v11 adapter for the Cinder framework.
//!
//! [`OneBotAdapter`] sits between the connections and the dispatcher. The
//! transport layer, which lives outside this crate, tells it when a bot
//! connects or disconnects and hands it every payload received:
//!
//! ```rust,ignore
//! use cinder_adapter_onebot::OneBotAdapter;
//!
//! let adapter = Arc::new(OneBotAdapter::new(config, dispatcher));
//!
//! // A reverse WebSocket connection from bot 10001
//! let (outbound_tx, mut outbound_rx) = tokio::sync::mpsc::channel(64);
//! adapter.connect_websocket("10001", outbound_tx);
//!
//! // Forward `outbound_rx` to the socket, and every received frame back:
//! adapter.handle_text("10001", &frame).await;
//! ```
//!
//! Payloads without `post_type` are API responses and go to the
//! [`ResultStore`]. Everything else becomes an [`Event`], passes the to-me
//! checks and is dispatched.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{info, trace, warn};

use crate::api_caller::{ApiCaller, HttpApiCaller, WsApiCaller};
use crate::bot::{BotDirectory, OneBotBot};
use crate::config::OneBotConfig;
use crate::detect::{NicknameMatcher, check_at_me};
use crate::result_store::ResultStore;
use cinder_core::{BoxedBot, Event};
use cinder_framework::{DispatchOutcome, Dispatcher};

/// The OneBot v11 adapter.
pub struct OneBotAdapter {
    config: OneBotConfig,
    store: Arc<ResultStore>,
    bots: Arc<BotDirectory>,
    dispatcher: Dispatcher,
    nickname: NicknameMatcher,
    http: reqwest::Client,
}

impl OneBotAdapter {
    /// Creates an adapter with no nicknames and no connected bots.
    pub fn new(config: OneBotConfig, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            store: Arc::new(ResultStore::new()),
            bots: Arc::new(BotDirectory::new(HashMap::new())),
            dispatcher,
            nickname: NicknameMatcher::disabled(),
            http: reqwest::Client::new(),
        }
    }

    /// Sets the nicknames recognised at the start of messages.
    pub fn with_nickname(mut self, nickname: NicknameMatcher) -> Self {
        self.nickname = nickname;
        self
    }

    pub fn config(&self) -> &OneBotConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn result_store(&self) -> &Arc<ResultStore> {
        &self.store
    }

    // -------------------------------------------------------------------------
    // Connections
    // -------------------------------------------------------------------------

    /// Registers a bot connected over WebSocket.
    ///
    /// API requests for the bot are sent as text frames on `outbound`.
    pub fn connect_websocket(
        &self,
        self_id: impl Into<String>,
        outbound: mpsc::Sender<String>,
    ) -> Arc<OneBotBot> {
        let caller = WsApiCaller::new(outbound, Arc::clone(&self.store), self.config.api_timeout());
        self.connect(self_id.into(), Arc::new(caller))
    }

    /// Registers a bot that receives events over HTTP.
    ///
    /// Its API calls go to the `api_root` configured for it; without one,
    /// calls fail with `ApiNotAvailable`.
    pub fn connect_http(&self, self_id: impl Into<String>) -> Arc<OneBotBot> {
        let self_id = self_id.into();
        let caller = HttpApiCaller::new(
            self.http.clone(),
            self.config.api_root_for(&self_id).map(str::to_string),
            self.config.access_token.clone(),
            self.config.api_timeout(),
        );
        self.connect(self_id, Arc::new(caller))
    }

    fn connect(&self, self_id: String, caller: Arc<dyn ApiCaller>) -> Arc<OneBotBot> {
        let transport = caller.transport();
        let bot = Arc::new(OneBotBot::new(
            self_id.clone(),
            caller,
            Arc::downgrade(&self.bots),
        ));
        if self
            .bots
            .write()
            .insert(self_id.clone(), Arc::clone(&bot))
            .is_some()
        {
            warn!(self_id = %self_id, "Bot reconnected, replacing previous connection");
        }
        info!(self_id = %self_id, transport, "Bot connected");
        bot
    }

    /// Removes a bot. Calls it has in flight will time out.
    pub fn disconnect(&self, self_id: &str) -> Option<Arc<OneBotBot>> {
        let removed = self.bots.write().remove(self_id);
        if removed.is_some() {
            info!(self_id = %self_id, "Bot disconnected");
        }
        removed
    }

    pub fn bot(&self, self_id: &str) -> Option<Arc<OneBotBot>> {
        self.bots.read().get(self_id).cloned()
    }

    /// Ids of the connected bots.
    pub fn bot_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.bots.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    // -------------------------------------------------------------------------
    // Receiving
    // -------------------------------------------------------------------------

    /// Handles one text frame received from `self_id`.
    pub async fn handle_text(&self, self_id: &str, text: &str) -> Option<DispatchOutcome> {
        match serde_json::from_str::<Value>(text) {
            Ok(payload) => self.handle_message(self_id, payload).await,
            Err(e) => {
                warn!(self_id = %self_id, error = %e, "Dropping frame that is not JSON");
                None
            }
        }
    }

    /// Handles one payload received from `self_id`.
    ///
    /// Returns the dispatch outcome when the payload was an event.
    pub async fn handle_message(&self, self_id: &str, payload: Value) -> Option<DispatchOutcome> {
        let is_empty = match &payload {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        };
        if is_empty {
            return None;
        }

        if payload.get("post_type").is_none() {
            if !self.store.resolve(&payload) {
                trace!(self_id = %self_id, "Unmatched API response");
            }
            return None;
        }

        let Some(bot) = self.bot(self_id) else {
            warn!(self_id = %self_id, "Event from a bot that is not connected");
            return None;
        };

        let mut event = match Event::from_payload(payload) {
            Ok(event) => event,
            Err(e) => {
                warn!(self_id = %self_id, error = %e, "Failed to build event");
                return None;
            }
        };
        check_at_me(&mut event);
        self.nickname.check(&mut event);

        let bot: BoxedBot = bot;
        Some(self.dispatcher.handle_event(bot, Arc::new(event)).await)
    }
}

impl fmt::Debug for OneBotAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneBotAdapter")
            .field("bots", &self.bot_ids())
            .field("pending_calls", &self.store.pending_count())
            .finish()
    }
}
