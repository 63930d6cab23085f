// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Identifiers and data types as delivered by the chat service

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! int_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            Serialize,
            Deserialize,
            derive_more::From,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

int_id!(
    /// Identifier of a conversation (the `subjectId` of history responses and push events)
    ThreadId
);
int_id!(
    /// Server-assigned message identifier
    MessageId
);
int_id!(
    /// Identifier of a participant
    UserId
);

impl MessageId {
    /// Whether this id was assigned by the server
    ///
    /// Synthetic and placeholder ids are never positive.
    pub fn is_server_assigned(&self) -> bool {
        self.0 > 0
    }
}

/// Client-generated identifier present on locally created messages before the server assigns an
/// id
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UniqueId(String);

impl UniqueId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UniqueId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Point in time with millisecond resolution
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct TimeStamp(DateTime<Utc>);

impl TimeStamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Milliseconds since the unix epoch; out of range values are clamped to the epoch.
    pub fn from_millis(millis: i64) -> Self {
        Self(DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_default())
    }

    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Calendar day (UTC) this point in time falls into
    pub fn day(&self) -> NaiveDate {
        self.0.date_naive()
    }

    pub fn plus_millis(self, millis: i64) -> Self {
        Self(self.0 + TimeDelta::milliseconds(millis))
    }

    pub fn minus_millis(self, millis: i64) -> Self {
        Self(self.0 - TimeDelta::milliseconds(millis))
    }

    pub fn is_more_recent_than(&self, other: &TimeStamp) -> bool {
        self.0 > other.0
    }
}

impl From<DateTime<Utc>> for TimeStamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

impl AsRef<DateTime<Utc>> for TimeStamp {
    fn as_ref(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl fmt::Display for TimeStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    #[default]
    Text,
    File,
    Image,
    Voice,
    Video,
    Location,
    System,
}

/// Back-reference to the message this one replies to
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReplyInfo {
    pub replied_to: Option<MessageId>,
    pub text: Option<String>,
    /// The replied-to message was deleted; only a stub is left.
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReactionSummary {
    pub counts: BTreeMap<String, u32>,
    pub current_user_reaction: Option<String>,
}

impl ReactionSummary {
    pub fn add(&mut self, reaction: &str, by_current_user: bool) {
        *self.counts.entry(reaction.to_owned()).or_default() += 1;
        if by_current_user {
            self.current_user_reaction = Some(reaction.to_owned());
        }
    }

    pub fn remove(&mut self, reaction: &str, by_current_user: bool) {
        if let Some(count) = self.counts.get_mut(reaction) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.counts.remove(reaction);
            }
        }
        if by_current_user && self.current_user_reaction.as_deref() == Some(reaction) {
            self.current_user_reaction = None;
        }
    }

    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }
}

/// A single message as delivered by the chat service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// `None` until the server assigned an id
    pub id: Option<MessageId>,
    pub unique_id: Option<UniqueId>,
    pub thread_id: ThreadId,
    pub time: TimeStamp,
    pub owner: UserId,
    pub message_type: MessageType,
    pub text: Option<String>,
    pub reply_info: Option<ReplyInfo>,
    pub reactions: Option<ReactionSummary>,
    pub pinned: bool,
    pub edited: bool,
    pub deleted: bool,
    pub seen: bool,
    pub delivered: bool,
}

impl Message {
    /// A message that was already acknowledged by the server
    pub fn new(thread_id: ThreadId, id: MessageId, time: TimeStamp, owner: UserId) -> Self {
        Self {
            id: Some(id),
            unique_id: None,
            thread_id,
            time,
            owner,
            message_type: MessageType::Text,
            text: None,
            reply_info: None,
            reactions: None,
            pinned: false,
            edited: false,
            deleted: false,
            seen: false,
            delivered: false,
        }
    }

    /// A locally created message which is not yet acknowledged by the server
    pub fn local(thread_id: ThreadId, unique_id: UniqueId, time: TimeStamp, owner: UserId) -> Self {
        Self {
            id: None,
            unique_id: Some(unique_id),
            ..Self::new(thread_id, MessageId(0), time, owner)
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_unique_id(mut self, unique_id: UniqueId) -> Self {
        self.unique_id = Some(unique_id);
        self
    }

    pub fn with_reply_to(mut self, replied_to: MessageId) -> Self {
        self.reply_info = Some(ReplyInfo {
            replied_to: Some(replied_to),
            ..Default::default()
        });
        self
    }

    /// Server id if it is a real (positive) one
    pub fn server_id(&self) -> Option<MessageId> {
        self.id.filter(MessageId::is_server_assigned)
    }

    /// Pointer to this message suitable as a conversation's last message
    pub fn as_last_message(&self) -> Option<LastMessage> {
        Some(LastMessage {
            id: self.server_id()?,
            time: self.time,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LastMessage {
    pub id: MessageId,
    pub time: TimeStamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeenPointer {
    pub message_id: MessageId,
    pub time: TimeStamp,
}

/// A conversation as known to the view-model layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ThreadId,
    pub last_message: Option<LastMessage>,
    /// `None` if the conversation was never opened
    pub last_seen: Option<SeenPointer>,
    pub unread_count: u32,
    pub pinned_message: Option<MessageId>,
    pub archived: bool,
    pub pinned: bool,
    pub muted: bool,
}

impl Conversation {
    pub fn new(id: ThreadId) -> Self {
        Self {
            id,
            last_message: None,
            last_seen: None,
            unread_count: 0,
            pinned_message: None,
            archived: false,
            pinned: false,
            muted: false,
        }
    }

    pub fn is_never_opened(&self) -> bool {
        self.last_seen.is_none()
    }

    pub fn last_seen_message_id(&self) -> Option<MessageId> {
        self.last_seen.map(|seen| seen.message_id)
    }
}
