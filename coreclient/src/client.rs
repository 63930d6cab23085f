// SPDX-FileCopyrightText: 2024 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::sync::Arc;

use tokio_stream::Stream;

use crate::{ChatEvent, ChatResult, HistoryRequest, MessageId, ThreadId, UserId};

/// Outbound access to the chat service
///
/// All calls are fire-and-forget: their effect is only confirmed by the events delivered through
/// [`Self::subscribe`]. In particular, the response to a history request arrives as
/// [`ChatEvent::History`] carrying the request's correlation id.
#[allow(async_fn_in_trait, reason = "trait is only used in the workspace")]
#[trait_variant::make(Send)]
pub trait ChatClient {
    /// The local user
    fn user_id(&self) -> UserId;

    async fn request_history(&self, request: HistoryRequest) -> ChatResult<()>;

    async fn request_reaction_counts(
        &self,
        thread_id: ThreadId,
        message_ids: Vec<MessageId>,
    ) -> ChatResult<()>;

    /// Acknowledges that messages up to `message_id` were seen
    async fn send_seen(&self, thread_id: ThreadId, message_id: MessageId) -> ChatResult<()>;

    async fn delete_messages(
        &self,
        thread_id: ThreadId,
        message_ids: Vec<MessageId>,
    ) -> ChatResult<()>;

    async fn pin_message(&self, thread_id: ThreadId, message_id: MessageId) -> ChatResult<()>;

    async fn unpin_message(&self, thread_id: ThreadId, message_id: MessageId) -> ChatResult<()>;

    // observability

    fn subscribe(&self) -> impl Stream<Item = Arc<ChatEvent>> + Send + 'static;
}
