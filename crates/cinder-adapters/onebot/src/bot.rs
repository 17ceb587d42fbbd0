//! OneBot v11 Bot implementation.
//!
//! [`OneBotBot`] implements the [`Bot`] trait and adds strongly-typed methods
//! for the OneBot v11 actions.
//!
//! # Usage
//!
//! ```rust,ignore
//! use cinder_adapter_onebot::OneBotBot;
//!
//! async fn my_handler(bot: BoxedBot, event: Arc<Event>, _state: State) -> anyhow::Result<()> {
//!     // Downcast to OneBotBot for strongly-typed APIs
//!     if let Ok(onebot) = bot.clone().as_any().downcast::<OneBotBot>() {
//!         let info = onebot.get_login_info().await?;
//!         bot.send(&event, format!("I am {}", info.nickname).into(), true).await?;
//!     }
//!     Ok(())
//! }
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::api_caller::{ApiCaller, handle_api_result};
use crate::model::api::{
    Credentials, FriendInfo, GetMsgResponse, GroupInfo, GroupMemberInfo, LoginInfo, Status,
    StrangerInfo, VersionInfo,
};
use cinder_core::{ApiError, ApiResult, Bot, Event, Message, Segment};

/// Connected bots by self id.
pub(crate) type BotDirectory = RwLock<HashMap<String, Arc<OneBotBot>>>;

// =============================================================================
// OneBotBot
// =============================================================================

/// A bot account connected through the OneBot v11 adapter.
pub struct OneBotBot {
    self_id: String,
    caller: Arc<dyn ApiCaller>,
    directory: Weak<BotDirectory>,
}

impl OneBotBot {
    pub(crate) fn new(
        self_id: impl Into<String>,
        caller: Arc<dyn ApiCaller>,
        directory: Weak<BotDirectory>,
    ) -> Self {
        Self {
            self_id: self_id.into(),
            caller,
            directory,
        }
    }

    /// The transport this bot's calls use.
    pub fn transport(&self) -> &'static str {
        self.caller.transport()
    }

    fn sibling(&self, self_id: &str) -> ApiResult<Arc<OneBotBot>> {
        self.directory
            .upgrade()
            .and_then(|bots| bots.read().get(self_id).cloned())
            .ok_or(ApiError::ApiNotAvailable)
    }
}

/// Reads a truthy `self_id` parameter as a string.
fn target_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) if id.as_i64() != Some(0) => Some(id.to_string()),
        _ => None,
    }
}

impl fmt::Debug for OneBotBot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneBotBot")
            .field("self_id", &self.self_id)
            .field("transport", &self.transport())
            .finish()
    }
}

// =============================================================================
// Bot Trait Implementation
// =============================================================================

#[async_trait]
impl Bot for OneBotBot {
    fn self_id(&self) -> &str {
        &self.self_id
    }

    fn adapter_name(&self) -> &str {
        "onebot"
    }

    /// Calls an action and unwraps its `data`.
    ///
    /// A non-empty `self_id` parameter sends the call through the connected
    /// bot with that id instead; the parameter itself is not forwarded.
    async fn call_api(&self, action: &str, params: Value) -> ApiResult<Value> {
        let mut params = match params {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };

        if let Some(target) = params
            .as_object_mut()
            .and_then(|params| params.remove("self_id"))
            .as_ref()
            .and_then(target_id)
        {
            debug!(action = %action, from = %self.self_id, to = %target, "Rerouting API call");
            let bot = self.sibling(&target)?;
            return bot.call_api(action, params).await;
        }

        let envelope = self.caller.call(action, params).await?;
        handle_api_result(envelope)
    }

    async fn send(&self, event: &Event, message: Message, at_sender: bool) -> ApiResult<Value> {
        let user_id = event.user_id();
        let group_id = event.group_id();

        let mut params = Map::new();
        if let Some(user_id) = user_id {
            params.insert("user_id".into(), json!(user_id));
        }
        if let Some(group_id) = group_id {
            params.insert("group_id".into(), json!(group_id));
        }

        let message_type = match (group_id, user_id) {
            (Some(_), _) => "group",
            (None, Some(_)) => "private",
            (None, None) => return Err(ApiError::MissingSession),
        };
        params.insert("message_type".into(), json!(message_type));

        let message = match user_id {
            Some(user_id) if at_sender && message_type != "private" => {
                Segment::at(user_id) + Segment::text(" ") + message
            }
            _ => message,
        };
        params.insert("message".into(), serde_json::to_value(&message)?);

        self.call_api("send_msg", Value::Object(params)).await
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

// =========================================================================
// Message APIs
// =========================================================================

macro_rules! impl_api {
    // No return value
    ($(#[$meta:meta])* $name:ident, ($($arg:ident: $typ:ty),*) $(,)?) => {
        $(#[$meta])*
        pub async fn $name(&self, $($arg: $typ),*) -> ApiResult<()> {
            self.call_api(stringify!($name), json!({ $(stringify!($arg): $arg),* })).await?;
            Ok(())
        }
    };
    // Returns the whole `data` value as T
    ($(#[$meta:meta])* $name:ident, ($($arg:ident: $typ:ty),*) -> $ret:ty $(,)?) => {
        $(#[$meta])*
        pub async fn $name(&self, $($arg: $typ),*) -> ApiResult<$ret> {
            let result = self.call_api(stringify!($name), json!({ $(stringify!($arg): $arg),* })).await?;
            Ok(serde_json::from_value::<$ret>(result)?)
        }
    };
    // Returns one field of `data`
    ($(#[$meta:meta])* $name:ident, ($($arg:ident: $typ:ty),*) -> $ret:ty, $field:expr $(,)?) => {
        $(#[$meta])*
        pub async fn $name(&self, $($arg: $typ),*) -> ApiResult<$ret> {
            let result = self.call_api(stringify!($name), json!({ $(stringify!($arg): $arg),* })).await?;
            result
                .get($field)
                .cloned()
                .and_then(|v| serde_json::from_value::<$ret>(v).ok())
                .ok_or_else(|| ApiError::Serialization(format!("missing {}", $field)))
        }
    };
}

impl OneBotBot {
    impl_api!(
        /// Sends a private message. Returns the message id.
        send_private_msg,
        (user_id: i64, message: Message) -> i64,
        "message_id"
    );

    impl_api!(
        /// Sends a group message. Returns the message id.
        send_group_msg,
        (group_id: i64, message: Message) -> i64,
        "message_id"
    );

    /// Sends a message to a user or a group.
    ///
    /// Without `message_type`, the implementation picks the target from the
    /// ids given.
    pub async fn send_msg(
        &self,
        message_type: Option<&str>,
        user_id: Option<i64>,
        group_id: Option<i64>,
        message: Message,
    ) -> ApiResult<i64> {
        let mut params = json!({ "message": message });
        if let Some(message_type) = message_type {
            params["message_type"] = json!(message_type);
        }
        if let Some(user_id) = user_id {
            params["user_id"] = json!(user_id);
        }
        if let Some(group_id) = group_id {
            params["group_id"] = json!(group_id);
        }

        let result = self.call_api("send_msg", params).await?;
        result
            .get("message_id")
            .and_then(Value::as_i64)
            .ok_or_else(|| ApiError::Serialization("missing message_id".into()))
    }

    impl_api!(
        /// Recalls a message.
        delete_msg,
        (message_id: i64)
    );

    impl_api!(
        get_msg,
        (message_id: i64) -> GetMsgResponse
    );

    impl_api!(
        /// Gets the content of a forwarded message.
        get_forward_msg,
        (id: &str) -> Message,
        "message"
    );

    impl_api!(
        send_like,
        (user_id: i64, times: u8)
    );

    // =========================================================================
    // Group Management APIs
    // =========================================================================

    impl_api!(
        /// Kicks a user from a group.
        set_group_kick,
        (group_id: i64, user_id: i64, reject_add_request: bool)
    );

    impl_api!(
        /// Mutes a user in a group.
        ///
        /// # Arguments
        /// * `duration` - Mute duration in seconds (0 = unmute)
        set_group_ban,
        (group_id: i64, user_id: i64, duration: u32)
    );

    impl_api!(
        set_group_anonymous_ban,
        (group_id: i64, anonymous_flag: &str, duration: u32)
    );

    impl_api!(
        /// Mutes or unmutes the whole group.
        set_group_whole_ban,
        (group_id: i64, enable: bool)
    );

    impl_api!(
        set_group_admin,
        (group_id: i64, user_id: i64, enable: bool)
    );

    impl_api!(
        set_group_anonymous,
        (group_id: i64, enable: bool)
    );

    impl_api!(
        /// Sets a member's group card.
        set_group_card,
        (group_id: i64, user_id: i64, card: &str)
    );

    impl_api!(
        set_group_name,
        (group_id: i64, group_name: &str)
    );

    impl_api!(
        /// Leaves a group, or dismisses it when the bot owns it.
        set_group_leave,
        (group_id: i64, is_dismiss: bool)
    );

    impl_api!(
        set_group_special_title,
        (group_id: i64, user_id: i64, special_title: &str, duration: i64)
    );

    // =========================================================================
    // Friend/Group Request APIs
    // =========================================================================

    impl_api!(
        /// Answers a friend request using the request event's flag.
        set_friend_add_request,
        (flag: &str, approve: bool, remark: &str)
    );

    impl_api!(
        /// Answers a group join request or invitation.
        set_group_add_request,
        (flag: &str, sub_type: &str, approve: bool, reason: &str)
    );

    // =========================================================================
    // Information APIs
    // =========================================================================

    impl_api!(
        get_login_info,
        () -> LoginInfo
    );

    impl_api!(
        get_stranger_info,
        (user_id: i64, no_cache: bool) -> StrangerInfo
    );

    impl_api!(
        get_friend_list,
        () -> Vec<FriendInfo>
    );

    impl_api!(
        get_group_info,
        (group_id: i64, no_cache: bool) -> GroupInfo
    );

    impl_api!(
        get_group_list,
        () -> Vec<GroupInfo>
    );

    impl_api!(
        get_group_member_info,
        (group_id: i64, user_id: i64, no_cache: bool) -> GroupMemberInfo
    );

    impl_api!(
        get_group_member_list,
        (group_id: i64) -> Vec<GroupMemberInfo>
    );

    /// Gets group honor info. `honor_type` is e.g. `talkative` or `all`.
    pub async fn get_group_honor_info(&self, group_id: i64, honor_type: &str) -> ApiResult<Value> {
        self.call_api(
            "get_group_honor_info",
            json!({
                "group_id": group_id,
                "type": honor_type
            }),
        )
        .await
    }

    // =========================================================================
    // Credential APIs
    // =========================================================================

    impl_api!(
        get_cookies,
        (domain: &str) -> String,
        "cookies"
    );

    impl_api!(
        get_csrf_token,
        () -> i64,
        "token"
    );

    impl_api!(
        get_credentials,
        (domain: &str) -> Credentials
    );

    // =========================================================================
    // File APIs
    // =========================================================================

    impl_api!(
        /// Converts a received voice file. Returns the local path.
        get_record,
        (file: &str, out_format: &str) -> String,
        "file"
    );

    impl_api!(
        /// Downloads a received image. Returns the local path.
        get_image,
        (file: &str) -> String,
        "file"
    );

    impl_api!(
        can_send_image,
        () -> bool,
        "yes"
    );

    impl_api!(
        can_send_record,
        () -> bool,
        "yes"
    );

    // =========================================================================
    // System APIs
    // =========================================================================

    impl_api!(
        get_status,
        () -> Status
    );

    impl_api!(
        get_version_info,
        () -> VersionInfo
    );

    impl_api!(
        set_restart,
        (delay: u32)
    );

    impl_api!(
        clean_cache,
        ()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_caller::HttpApiCaller;
    use std::time::Duration;

    fn http_bot(api_root: String) -> (Arc<BotDirectory>, Arc<OneBotBot>) {
        let directory = Arc::new(BotDirectory::default());
        let caller = HttpApiCaller::new(
            reqwest::Client::new(),
            Some(api_root),
            None,
            Duration::from_secs(5),
        );
        let bot = Arc::new(OneBotBot::new(
            "10001",
            Arc::new(caller),
            Arc::downgrade(&directory),
        ));
        directory.write().insert("10001".into(), Arc::clone(&bot));
        (directory, bot)
    }

    fn group_event() -> Event {
        Event::from_payload(json!({
            "post_type": "message",
            "message_type": "group",
            "message_id": 9,
            "self_id": 10001,
            "time": 1700000000,
            "user_id": 456,
            "group_id": 123,
            "message": "hi",
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_send_to_group_with_mention() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/send_msg")
            .match_body(mockito::Matcher::Json(json!({
                "user_id": 456,
                "group_id": 123,
                "message_type": "group",
                "message": [
                    {"type": "at", "data": {"qq": "456"}},
                    {"type": "text", "data": {"text": " "}},
                    {"type": "text", "data": {"text": "pong"}}
                ]
            })))
            .with_body(r#"{"status":"ok","retcode":0,"data":{"message_id":11}}"#)
            .create_async()
            .await;

        let (_directory, bot) = http_bot(server.url());
        let data = bot
            .send(&group_event(), Segment::text("pong").into(), true)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(data["message_id"], 11);
    }

    #[tokio::test]
    async fn test_send_private_ignores_at_sender() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/send_msg")
            .match_body(mockito::Matcher::Json(json!({
                "user_id": 456,
                "message_type": "private",
                "message": [{"type": "text", "data": {"text": "pong"}}]
            })))
            .with_body(r#"{"status":"ok","retcode":0,"data":{"message_id":12}}"#)
            .create_async()
            .await;

        let (_directory, bot) = http_bot(server.url());
        let event = Event::from_payload(json!({
            "post_type": "message",
            "message_type": "private",
            "self_id": 10001,
            "time": 1700000000,
            "user_id": 456,
            "message": "ping",
        }))
        .unwrap();
        bot.send(&event, "pong".into(), true).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_without_session() {
        let (_directory, bot) = http_bot("http://127.0.0.1:9".into());
        let event = Event::from_payload(json!({
            "post_type": "meta_event",
            "meta_event_type": "heartbeat",
            "self_id": 10001,
            "time": 1700000000,
        }))
        .unwrap();
        let err = bot.send(&event, "x".into(), false).await.unwrap_err();
        assert_eq!(err, ApiError::MissingSession);
    }

    #[tokio::test]
    async fn test_action_failed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/delete_msg")
            .with_body(r#"{"status":"failed","retcode":1404,"data":null}"#)
            .create_async()
            .await;

        let (_directory, bot) = http_bot(server.url());
        let err = bot.delete_msg(1).await.unwrap_err();
        assert_eq!(err, ApiError::ActionFailed { retcode: Some(1404) });
    }

    #[tokio::test]
    async fn test_typed_wrapper() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/get_login_info")
            .with_body(r#"{"status":"ok","retcode":0,"data":{"user_id":10001,"nickname":"cinder"}}"#)
            .create_async()
            .await;

        let (_directory, bot) = http_bot(server.url());
        let info = bot.get_login_info().await.unwrap();
        assert_eq!(info.user_id, 10001);
        assert_eq!(info.nickname, "cinder");
    }

    #[tokio::test]
    async fn test_unknown_reroute_target() {
        let (_directory, bot) = http_bot("http://127.0.0.1:9".into());
        let err = bot
            .call_api("get_status", json!({"self_id": 20002}))
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::ApiNotAvailable);
    }

    #[test]
    fn test_target_id() {
        assert_eq!(target_id(&json!(20002)), Some("20002".to_string()));
        assert_eq!(target_id(&json!("20002")), Some("20002".to_string()));
        assert_eq!(target_id(&json!(0)), None);
        assert_eq!(target_id(&json!("")), None);
        assert_eq!(target_id(&Value::Null), None);
    }
}
