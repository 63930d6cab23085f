// SPDX-FileCopyrightText: 2024 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! In-memory chat service used in tests

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, MutexGuard};
use tokio_stream::Stream;

use crate::{
    ChatClient, ChatError, ChatEvent, ChatEventBus, ChatResult, HistoryRequest, HistoryResponse,
    Message, MessageEvent, MessageId, Order, ReactionEvent, SeenPointer, ThreadEvent, ThreadId,
    UserId,
};

/// A call issued through the [`ChatClient`] interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundCall {
    History(HistoryRequest),
    ReactionCounts {
        thread_id: ThreadId,
        message_ids: Vec<MessageId>,
    },
    Seen {
        thread_id: ThreadId,
        message_id: MessageId,
    },
    Delete {
        thread_id: ThreadId,
        message_ids: Vec<MessageId>,
    },
    Pin {
        thread_id: ThreadId,
        message_id: MessageId,
    },
    Unpin {
        thread_id: ThreadId,
        message_id: MessageId,
    },
}

/// Chat client backed by an in-memory message table
///
/// Answers history requests synchronously by publishing the response on its event bus and
/// records every outbound call. History responses can be held back to simulate lost responses.
#[derive(Clone)]
pub struct InMemoryChatClient {
    user_id: UserId,
    inner: Arc<Mutex<InMemoryChatClientInner>>,
    events: ChatEventBus,
}

#[derive(Default)]
struct InMemoryChatClientInner {
    messages: HashMap<ThreadId, Vec<Message>>,
    calls: Vec<OutboundCall>,
    hold_history: bool,
    held: Vec<HistoryRequest>,
}

impl InMemoryChatClient {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            inner: Default::default(),
            events: ChatEventBus::new(),
        }
    }

    async fn lock(&self) -> MutexGuard<'_, InMemoryChatClientInner> {
        self.inner.lock().await
    }

    pub async fn insert_messages(&self, messages: impl IntoIterator<Item = Message>) {
        let mut inner = self.lock().await;
        for message in messages {
            inner
                .messages
                .entry(message.thread_id)
                .or_default()
                .push(message);
        }
        for messages in inner.messages.values_mut() {
            messages.sort_by_key(|message| message.time);
        }
    }

    pub async fn messages(&self, thread_id: ThreadId) -> Vec<Message> {
        self.lock()
            .await
            .messages
            .get(&thread_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn calls(&self) -> Vec<OutboundCall> {
        self.lock().await.calls.clone()
    }

    pub async fn clear_calls(&self) {
        self.lock().await.calls.clear();
    }

    pub async fn history_requests(&self) -> Vec<HistoryRequest> {
        self.lock()
            .await
            .calls
            .iter()
            .filter_map(|call| match call {
                OutboundCall::History(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    /// When set, history requests are recorded but not answered until [`Self::release_held`].
    pub async fn set_hold_history(&self, hold: bool) {
        self.lock().await.hold_history = hold;
    }

    /// Answers all held history requests and returns how many there were.
    pub async fn release_held(&self) -> usize {
        let held = std::mem::take(&mut self.lock().await.held);
        let count = held.len();
        for request in held {
            let response = self.answer(&request).await;
            self.events.publish(response);
        }
        count
    }

    /// Injects an event as if it was pushed by the server.
    pub fn publish(&self, event: impl Into<ChatEvent>) {
        self.events.publish(event);
    }

    async fn answer(&self, request: &HistoryRequest) -> HistoryResponse {
        let inner = self.lock().await;
        let mut matching: Vec<&Message> = inner
            .messages
            .get(&request.thread_id)
            .into_iter()
            .flatten()
            .filter(|message| request.contains(message))
            .collect();
        if request.order == Order::Desc {
            matching.reverse();
        }
        let offset = request.offset.unwrap_or(0);
        let available = matching.len().saturating_sub(offset);
        let result: Vec<Message> = matching
            .into_iter()
            .skip(offset)
            .take(request.count)
            .cloned()
            .collect();
        HistoryResponse {
            correlation_id: request.correlation_id,
            subject_id: request.thread_id,
            has_next: available > result.len(),
            result,
            cache: false,
        }
    }
}

impl ChatClient for InMemoryChatClient {
    fn user_id(&self) -> UserId {
        self.user_id
    }

    async fn request_history(&self, request: HistoryRequest) -> ChatResult<()> {
        {
            let mut inner = self.lock().await;
            inner.calls.push(OutboundCall::History(request.clone()));
            if inner.hold_history {
                inner.held.push(request);
                return Ok(());
            }
        }
        let response = self.answer(&request).await;
        self.events.publish(response);
        Ok(())
    }

    async fn request_reaction_counts(
        &self,
        thread_id: ThreadId,
        message_ids: Vec<MessageId>,
    ) -> ChatResult<()> {
        let counts = {
            let mut inner = self.lock().await;
            inner.calls.push(OutboundCall::ReactionCounts {
                thread_id,
                message_ids: message_ids.clone(),
            });
            let messages = inner.messages.get(&thread_id);
            message_ids
                .into_iter()
                .map(|id| {
                    let summary = messages
                        .and_then(|messages| messages.iter().find(|m| m.id == Some(id)))
                        .and_then(|message| message.reactions.clone())
                        .unwrap_or_default();
                    (id, summary)
                })
                .collect()
        };
        self.events
            .publish(ReactionEvent::Counts { thread_id, counts });
        Ok(())
    }

    async fn send_seen(&self, thread_id: ThreadId, message_id: MessageId) -> ChatResult<()> {
        let time = {
            let mut inner = self.lock().await;
            inner.calls.push(OutboundCall::Seen {
                thread_id,
                message_id,
            });
            inner
                .messages
                .get(&thread_id)
                .and_then(|messages| messages.iter().find(|m| m.id == Some(message_id)))
                .map(|message| message.time)
                .ok_or(ChatError::UnknownThread(thread_id))?
        };
        self.events.publish(ThreadEvent::LastSeenUpdated {
            thread_id,
            last_seen: SeenPointer { message_id, time },
        });
        Ok(())
    }

    async fn delete_messages(
        &self,
        thread_id: ThreadId,
        message_ids: Vec<MessageId>,
    ) -> ChatResult<()> {
        {
            let mut inner = self.lock().await;
            inner.calls.push(OutboundCall::Delete {
                thread_id,
                message_ids: message_ids.clone(),
            });
            if let Some(messages) = inner.messages.get_mut(&thread_id) {
                messages.retain(|m| m.id.is_none_or(|id| !message_ids.contains(&id)));
            }
        }
        for message_id in message_ids {
            self.events.publish(MessageEvent::Deleted {
                thread_id,
                message_id,
            });
        }
        Ok(())
    }

    async fn pin_message(&self, thread_id: ThreadId, message_id: MessageId) -> ChatResult<()> {
        self.set_pinned(thread_id, message_id, true).await;
        self.events.publish(MessageEvent::Pinned {
            thread_id,
            message_id,
        });
        Ok(())
    }

    async fn unpin_message(&self, thread_id: ThreadId, message_id: MessageId) -> ChatResult<()> {
        self.set_pinned(thread_id, message_id, false).await;
        self.events.publish(MessageEvent::Unpinned {
            thread_id,
            message_id,
        });
        Ok(())
    }

    fn subscribe(&self) -> impl Stream<Item = Arc<ChatEvent>> + Send + 'static {
        self.events.subscribe()
    }
}

impl InMemoryChatClient {
    async fn set_pinned(&self, thread_id: ThreadId, message_id: MessageId, pinned: bool) {
        let mut inner = self.lock().await;
        inner.calls.push(if pinned {
            OutboundCall::Pin {
                thread_id,
                message_id,
            }
        } else {
            OutboundCall::Unpin {
                thread_id,
                message_id,
            }
        });
        if let Some(message) = inner
            .messages
            .get_mut(&thread_id)
            .and_then(|messages| messages.iter_mut().find(|m| m.id == Some(message_id)))
        {
            message.pinned = pinned;
        }
    }
}
