//! Shared fixtures for the framework's unit tests.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use cinder_core::{ApiResult, Bot, BoxedBot, Event, Message};

/// A bot that records what handlers send instead of talking to a server.
#[derive(Default)]
pub(crate) struct MockBot {
    pub sent: Mutex<Vec<Message>>,
}

impl MockBot {
    pub fn boxed() -> BoxedBot {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl Bot for MockBot {
    fn self_id(&self) -> &str {
        "10001"
    }

    fn adapter_name(&self) -> &str {
        "mock"
    }

    async fn call_api(&self, _action: &str, _params: Value) -> ApiResult<Value> {
        Ok(Value::Null)
    }

    async fn send(&self, _event: &Event, message: Message, _at_sender: bool) -> ApiResult<Value> {
        self.sent.lock().push(message);
        Ok(json!({"message_id": 1}))
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Builds a message event from user 456 to bot 10001.
pub(crate) fn message_event(detail_type: &str, text: &str) -> Event {
    let mut payload = json!({
        "post_type": "message",
        "message_type": detail_type,
        "sub_type": "normal",
        "message_id": 1,
        "self_id": 10001,
        "time": 1700000000,
        "user_id": 456,
        "message": text,
    });
    if detail_type == "group" {
        payload["group_id"] = json!(123);
    }
    Event::from_payload(payload).expect("fixture payload is valid")
}

/// Builds a notice event.
pub(crate) fn notice_event(notice_type: &str) -> Event {
    Event::from_payload(json!({
        "post_type": "notice",
        "notice_type": notice_type,
        "self_id": 10001,
        "time": 1700000000,
        "group_id": 123,
        "user_id": 456,
    }))
    .expect("fixture payload is valid")
}
