//! Typed response data for OneBot v11 actions.
//!
//! Fields that implementations commonly omit default instead of failing the
//! whole response.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use cinder_core::{Message, Sender};

/// Response data for the send actions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MessageId {
    pub message_id: i64,
}

/// Response data for `get_msg`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetMsgResponse {
    pub message_id: i64,
    #[serde(default)]
    pub real_id: Option<i64>,
    #[serde(default)]
    pub message_type: Option<String>,
    #[serde(default)]
    pub sender: Sender,
    pub time: i64,
    /// The message content, in either wire or array form.
    pub message: Message,
}

/// Response data for `get_forward_msg`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardMessage {
    pub message: Message,
}

/// Response for `get_login_info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginInfo {
    pub user_id: i64,
    pub nickname: String,
}

/// Response for `get_stranger_info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrangerInfo {
    pub user_id: i64,
    pub nickname: String,
    #[serde(default)]
    pub sex: String,
    #[serde(default)]
    pub age: i32,
}

/// One entry of `get_friend_list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendInfo {
    pub user_id: i64,
    pub nickname: String,
    #[serde(default)]
    pub remark: String,
}

/// Response for `get_group_info` and entries of `get_group_list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupInfo {
    pub group_id: i64,
    pub group_name: String,
    #[serde(default)]
    pub member_count: i32,
    #[serde(default)]
    pub max_member_count: i32,
}

/// Response for `get_group_member_info` and entries of
/// `get_group_member_list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMemberInfo {
    pub group_id: i64,
    pub user_id: i64,
    pub nickname: String,
    #[serde(default)]
    pub card: String,
    #[serde(default)]
    pub sex: String,
    #[serde(default)]
    pub age: i32,
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub join_time: i64,
    #[serde(default)]
    pub last_sent_time: i64,
    #[serde(default)]
    pub level: String,
    /// `owner`, `admin` or `member`.
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub unfriendly: bool,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub title_expire_time: i64,
    #[serde(default)]
    pub card_changeable: bool,
}

/// Response for `get_credentials`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub cookies: String,
    pub csrf_token: i64,
}

/// Response for `get_status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Status {
    /// `None` when the implementation cannot tell.
    pub online: Option<bool>,
    pub good: bool,
    /// Implementation-specific extra fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Response for `get_version_info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub app_name: String,
    pub app_version: String,
    pub protocol_version: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}
