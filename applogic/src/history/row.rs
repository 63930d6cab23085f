// SPDX-FileCopyrightText: 2024 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::cmp::Ordering;

use chatcoreclient::{Message, MessageId, TimeStamp, UniqueId, UserId};

/// Identity of a row in the section store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowKey {
    Id(MessageId),
    /// Locally created message not yet acknowledged by the server
    Unique(UniqueId),
    UnreadBanner,
}

impl RowKey {
    /// Id if present, else unique id
    pub fn of(message: &Message) -> Option<Self> {
        match (&message.id, &message.unique_id) {
            (Some(id), _) => Some(Self::Id(*id)),
            (None, Some(unique_id)) => Some(Self::Unique(unique_id.clone())),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReactionsState {
    /// Reactions are unknown or outdated and must be fetched
    #[default]
    Invalid,
    Loading,
    Valid,
}

/// Upload or download progress in percent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferState {
    #[default]
    Idle,
    Uploading(u8),
    Downloading(u8),
}

/// View-model of a single message row
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRow {
    key: RowKey,
    pub message: Message,
    pub is_me: bool,
    /// First message of a run of consecutive messages by the same sender
    pub is_first_of_run: bool,
    /// Last message of a run of consecutive messages by the same sender
    pub is_last_of_run: bool,
    pub highlighted: bool,
    pub reactions: ReactionsState,
    pub transfer: TransferState,
}

impl MessageRow {
    /// Returns `None` for messages that have neither an id nor a unique id.
    pub fn new(message: Message, user_id: UserId) -> Option<Self> {
        let key = RowKey::of(&message)?;
        Some(Self {
            key,
            is_me: message.owner == user_id,
            message,
            is_first_of_run: true,
            is_last_of_run: true,
            highlighted: false,
            reactions: ReactionsState::Invalid,
            transfer: TransferState::Idle,
        })
    }

    pub fn key(&self) -> &RowKey {
        &self.key
    }

    pub fn id(&self) -> Option<MessageId> {
        self.message.id
    }

    pub fn time(&self) -> TimeStamp {
        self.message.time
    }

    pub fn owner(&self) -> UserId {
        self.message.owner
    }

    /// Once the server assigned an id the row is matched by that id only
    pub fn matches(&self, key: &RowKey) -> bool {
        match key {
            RowKey::Id(id) => self.message.id == Some(*id),
            RowKey::Unique(unique_id) => {
                self.message.id.is_none() && self.message.unique_id.as_ref() == Some(unique_id)
            }
            RowKey::UnreadBanner => false,
        }
    }

    /// Replaces the message, keeping the row's local state
    ///
    /// The unique id of a locally created message is kept if the server's copy lacks it.
    pub(crate) fn replace_message(&mut self, mut message: Message) {
        if message.unique_id.is_none() {
            message.unique_id = self.message.unique_id.take();
        }
        if message.reactions.is_none() {
            message.reactions = self.message.reactions.take();
        }
        self.message = message;
        self.refresh_key();
    }

    /// Assigns the server id and time to a locally created message
    pub(crate) fn mark_sent(&mut self, id: MessageId, time: TimeStamp) {
        self.message.id = Some(id);
        self.message.time = time;
        self.refresh_key();
    }

    fn refresh_key(&mut self) {
        if let Some(key) = RowKey::of(&self.message) {
            self.key = key;
        }
    }
}

/// A row of the history list
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryRow {
    Message(MessageRow),
    /// Divider between seen and unseen messages
    UnreadBanner { time: TimeStamp },
}

impl HistoryRow {
    pub fn key(&self) -> RowKey {
        match self {
            Self::Message(row) => row.key.clone(),
            Self::UnreadBanner { .. } => RowKey::UnreadBanner,
        }
    }

    pub fn time(&self) -> TimeStamp {
        match self {
            Self::Message(row) => row.time(),
            Self::UnreadBanner { time } => *time,
        }
    }

    pub fn matches(&self, key: &RowKey) -> bool {
        match self {
            Self::Message(row) => row.matches(key),
            Self::UnreadBanner { .. } => *key == RowKey::UnreadBanner,
        }
    }

    pub fn is_unread_banner(&self) -> bool {
        matches!(self, Self::UnreadBanner { .. })
    }

    pub fn as_message(&self) -> Option<&MessageRow> {
        match self {
            Self::Message(row) => Some(row),
            Self::UnreadBanner { .. } => None,
        }
    }

    pub fn as_message_mut(&mut self) -> Option<&mut MessageRow> {
        match self {
            Self::Message(row) => Some(row),
            Self::UnreadBanner { .. } => None,
        }
    }

    /// Row order within a section
    ///
    /// Messages are ordered by time; rows with equal time by id, unacknowledged messages last.
    /// The unread banner follows every message up to its own time and precedes the later ones.
    pub(crate) fn cmp_position(&self, other: &Self) -> Ordering {
        let banner_vs = |banner: TimeStamp, row: &MessageRow| {
            if row.time() <= banner {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        };
        match (self, other) {
            (Self::UnreadBanner { .. }, Self::UnreadBanner { .. }) => Ordering::Equal,
            (Self::UnreadBanner { time }, Self::Message(row)) => banner_vs(*time, row),
            (Self::Message(row), Self::UnreadBanner { time }) => banner_vs(*time, row).reverse(),
            (Self::Message(a), Self::Message(b)) => a.time().cmp(&b.time()).then_with(|| {
                let id = |row: &MessageRow| row.id().map_or(i64::MAX, |id| id.value());
                id(a).cmp(&id(b))
            }),
        }
    }
}
