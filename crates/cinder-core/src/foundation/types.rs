//! Protocol data attached to events.

use serde::{Deserialize, Serialize};

/// The `sender` object of a message event.
///
/// Private messages fill in the personal fields only; group messages also
/// carry card, role and title. Every field is optional since OneBot
/// implementations differ in what they report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    /// `male`, `female` or `unknown`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    /// Group card, i.e. the in-group display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// `owner`, `admin` or `member`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Sender {
    /// Returns the group card if set, otherwise the nickname.
    pub fn display_name(&self) -> Option<&str> {
        self.card
            .as_deref()
            .filter(|card| !card.is_empty())
            .or(self.nickname.as_deref())
    }
}

/// The `anonymous` object of an anonymous group message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anonymous {
    pub id: i64,
    pub name: String,
    /// Token required to mute this anonymous member.
    pub flag: String,
}
