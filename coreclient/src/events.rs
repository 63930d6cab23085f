// SPDX-FileCopyrightText: 2024 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Typed push events and the bus they are published on

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::{
    Stream, StreamExt,
    wrappers::{BroadcastStream, errors::BroadcastStreamRecvError},
};
use tracing::error;
use uuid::Uuid;

use crate::{
    HistoryResponse, Message, MessageId, ReactionSummary, SeenPointer, ThreadId, TimeStamp,
    UniqueId, UserId,
};

// 1024 * size_of::<Arc<ChatEvent>>() = 1024 * 8 = 8 KiB
const EVENT_CHANNEL_SIZE: usize = 1024;

/// Event pushed by the chat service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::From)]
pub enum ChatEvent {
    History(HistoryResponse),
    Message(MessageEvent),
    Reaction(ReactionEvent),
    Thread(ThreadEvent),
    Connection(ConnectionState),
    Error(ErrorEvent),
}

impl ChatEvent {
    /// The conversation this event is scoped to, if any
    pub fn subject_id(&self) -> Option<ThreadId> {
        match self {
            Self::History(response) => Some(response.subject_id),
            Self::Message(event) => Some(event.thread_id()),
            Self::Reaction(event) => Some(event.thread_id()),
            Self::Thread(event) => Some(event.thread_id()),
            Self::Connection(_) | Self::Error(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageEvent {
    New(Message),
    /// A locally created message was acknowledged by the server
    Sent {
        thread_id: ThreadId,
        unique_id: UniqueId,
        message_id: MessageId,
        time: TimeStamp,
    },
    Edited(Message),
    Deleted {
        thread_id: ThreadId,
        message_id: MessageId,
    },
    Forwarded(Message),
    Pinned {
        thread_id: ThreadId,
        message_id: MessageId,
    },
    Unpinned {
        thread_id: ThreadId,
        message_id: MessageId,
    },
    /// Messages up to `message_id` were delivered to the other participants
    Delivered {
        thread_id: ThreadId,
        message_id: MessageId,
    },
    /// Messages up to `message_id` were seen by the other participants
    Seen {
        thread_id: ThreadId,
        message_id: MessageId,
    },
}

impl MessageEvent {
    pub fn thread_id(&self) -> ThreadId {
        match self {
            Self::New(message) | Self::Edited(message) | Self::Forwarded(message) => {
                message.thread_id
            }
            Self::Sent { thread_id, .. }
            | Self::Deleted { thread_id, .. }
            | Self::Pinned { thread_id, .. }
            | Self::Unpinned { thread_id, .. }
            | Self::Delivered { thread_id, .. }
            | Self::Seen { thread_id, .. } => *thread_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReactionEvent {
    /// Answer to a reaction count request
    Counts {
        thread_id: ThreadId,
        counts: Vec<(MessageId, ReactionSummary)>,
    },
    Add {
        thread_id: ThreadId,
        message_id: MessageId,
        user_id: UserId,
        reaction: String,
    },
    Replace {
        thread_id: ThreadId,
        message_id: MessageId,
        user_id: UserId,
        old_reaction: String,
        reaction: String,
    },
    Delete {
        thread_id: ThreadId,
        message_id: MessageId,
        user_id: UserId,
        reaction: String,
    },
}

impl ReactionEvent {
    pub fn thread_id(&self) -> ThreadId {
        match self {
            Self::Counts { thread_id, .. }
            | Self::Add { thread_id, .. }
            | Self::Replace { thread_id, .. }
            | Self::Delete { thread_id, .. } => *thread_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreadEvent {
    UnreadCount {
        thread_id: ThreadId,
        unread_count: u32,
    },
    LastSeenUpdated {
        thread_id: ThreadId,
        last_seen: SeenPointer,
    },
}

impl ThreadEvent {
    pub fn thread_id(&self) -> ThreadId {
        match self {
            Self::UnreadCount { thread_id, .. } | Self::LastSeenUpdated { thread_id, .. } => {
                *thread_id
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

/// Failure reported by the chat service
///
/// Carries the correlation id of the request that failed if there is one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub correlation_id: Option<Uuid>,
    pub code: i32,
    pub message: String,
}

/// Typed publish/subscribe bus for [`ChatEvent`]s
#[derive(Debug, Clone)]
pub struct ChatEventBus {
    tx: broadcast::Sender<Arc<ChatEvent>>,
}

impl ChatEventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self { tx }
    }

    pub fn publish(&self, event: impl Into<ChatEvent>) {
        let _no_receivers = self.tx.send(Arc::new(event.into()));
    }

    /// Subscribes to all events published after this call
    ///
    /// A receiver which falls behind skips the events it missed.
    pub fn subscribe(&self) -> impl Stream<Item = Arc<ChatEvent>> + Send + 'static {
        BroadcastStream::new(self.tx.subscribe()).filter_map(|res| match res {
            Ok(event) => Some(event),
            Err(BroadcastStreamRecvError::Lagged(n)) => {
                error!("chat events lagged by {} events", n);
                None
            }
        })
    }
}

impl Default for ChatEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::pin::pin;

    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = ChatEventBus::new();
        let mut events = pin!(bus.subscribe());

        bus.publish(ConnectionState::Connected);
        bus.publish(MessageEvent::Deleted {
            thread_id: ThreadId(7),
            message_id: MessageId(1),
        });

        let first = events.next().await.unwrap();
        assert_eq!(*first, ChatEvent::Connection(ConnectionState::Connected));
        assert_eq!(first.subject_id(), None);

        let second = events.next().await.unwrap();
        assert_eq!(second.subject_id(), Some(ThreadId(7)));
    }
}
