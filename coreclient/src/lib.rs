// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Chat SDK surface consumed by the view-model layer
//!
//! Contains the identifiers and message types delivered by the chat service, the paginated
//! history request/response shapes, the typed push events and the [`ChatClient`] trait through
//! which outbound calls are issued.

mod client;
mod errors;
pub mod events;
mod history;
pub mod types;

#[cfg(any(test, feature = "test_utils"))]
pub mod memory;

pub use client::ChatClient;
pub use errors::{ChatError, ChatResult};
pub use events::{
    ChatEvent, ChatEventBus, ConnectionState, ErrorEvent, MessageEvent, ReactionEvent, ThreadEvent,
};
pub use history::{HistoryRequest, HistoryResponse, Order};
pub use types::{
    Conversation, LastMessage, Message, MessageId, MessageType, ReactionSummary, ReplyInfo,
    SeenPointer, ThreadId, TimeStamp, UniqueId, UserId,
};
