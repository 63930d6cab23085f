// SPDX-FileCopyrightText: 2024 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Message history of an opened conversation
//!
//! [`HistoryViewModel`] keeps a window of the conversation's messages in memory, fetches more
//! pages as the list is scrolled and applies live updates. Changes are reported to the UI as an
//! ordered stream of [`HistoryUpdate`]s together with a [`HistoryState`] snapshot.

use std::sync::Arc;

use anyhow::Context as _;
use chatcoreclient::{ChatClient, Conversation, MessageId, ThreadId, TimeStamp};
use tokio::sync::{mpsc, watch};
use tokio_stream::{Stream, wrappers::WatchStream};

use crate::{
    app_state::AppContext,
    util::{Cubit, CubitCore},
};

use self::{
    context::{HistoryCommand, HistoryContext},
    scroll::{ScrollCoordinator, ScrollHandle},
    seen::SeenReconciler,
    visible::VisibleTracker,
};

mod batching;
mod context;
mod merge;
mod pending;
mod push;
mod row;
mod scenarios;
mod scroll;
mod sections;
mod seen;
mod state;
mod stitching;
mod update;
mod visible;

#[cfg(test)]
mod tests;

pub use row::{HistoryRow, MessageRow, ReactionsState, RowKey, TransferState};
pub use scroll::{ContentOffset, ScrollState};
pub use sections::{IndexPath, InsertedIndices, MessageSection, SectionStore};
pub use state::HistoryState;
pub use update::{Direction, HistoryUpdate, HistoryUpdates, ScrollPosition};

pub struct HistoryViewModel<C> {
    core: CubitCore<HistoryState>,
    app: AppContext<C>,
    conversation: Arc<watch::Sender<Conversation>>,
    commands: mpsc::UnboundedSender<HistoryCommand>,
    scroll: ScrollCoordinator,
    visible: VisibleTracker,
    seen: SeenReconciler<C>,
    updates: Option<HistoryUpdates>,
}

impl<C> HistoryViewModel<C>
where
    C: ChatClient + Clone + Send + Sync + 'static,
{
    /// Opens the history of `conversation`
    ///
    /// Must be called within a tokio runtime. The opening scenario runs right away; its updates
    /// are buffered until taken with [`Self::take_updates`].
    pub fn new(app: AppContext<C>, conversation: Conversation) -> Self {
        let core = CubitCore::new();
        let cancel = core.cancellation_token().clone();
        let config = app.config().clone();

        let conversation = Arc::new(watch::Sender::new(conversation));
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let (updates_tx, updates) = mpsc::unbounded_channel();

        let handle = ScrollHandle::new(config.programmatic_scroll(), cancel.child_token());
        let load_more = commands.clone();
        let reached_bottom = commands.clone();
        let scroll = ScrollCoordinator::new(
            handle.clone(),
            config.edge_threshold,
            config.offset_debounce(),
            cancel.child_token(),
            move |direction| {
                let _no_receiver = load_more.send(HistoryCommand::LoadMore(direction));
            },
            move || {
                let _no_receiver = reached_bottom.send(HistoryCommand::ReachedBottom);
            },
        );

        let settled = commands.clone();
        let visible = VisibleTracker::spawn(
            config.visible_debounce(),
            cancel.child_token(),
            move |keys| {
                let _no_receiver = settled.send(HistoryCommand::VisibleSettled(keys));
            },
        );

        let seen = SeenReconciler::new(
            app.client().clone(),
            conversation.clone(),
            handle.clone(),
            config.seen_debounce(),
            cancel.child_token(),
        );

        HistoryContext::new(
            app.clone(),
            conversation.clone(),
            core.state_tx().clone(),
            updates_tx,
            commands.clone(),
            handle,
            cancel,
        )
        .spawn(commands_rx);
        let _no_receiver = commands.send(HistoryCommand::Start);

        Self {
            core,
            app,
            conversation,
            commands,
            scroll,
            visible,
            seen,
            updates: Some(updates),
        }
    }

    /// Hands out the update stream; returns `None` after the first call.
    pub fn take_updates(&mut self) -> Option<HistoryUpdates> {
        self.updates.take()
    }

    // Cubit interface

    pub fn is_closed(&self) -> bool {
        self.core.is_closed()
    }

    /// Stops the history task together with all timers and batching pipelines
    pub fn close(&mut self) {
        self.core.close();
    }

    pub fn state(&self) -> HistoryState {
        self.core.state()
    }

    pub fn stream(&self) -> impl Stream<Item = HistoryState> + Send + 'static {
        self.core.stream()
    }

    // Conversation

    pub fn conversation(&self) -> Conversation {
        self.conversation.borrow().clone()
    }

    pub fn conversation_stream(&self) -> impl Stream<Item = Conversation> + Send + 'static {
        WatchStream::from_changes(self.conversation.subscribe())
    }

    // Navigation

    pub fn load_more_top(&self) {
        self.send(HistoryCommand::LoadMore(Direction::Top));
    }

    pub fn load_more_bottom(&self) {
        self.send(HistoryCommand::LoadMore(Direction::Bottom));
    }

    /// Shows and highlights the message at `time`, e.g. a search result or a pinned message
    pub fn move_to_time(&self, time: TimeStamp, message_id: Option<MessageId>) {
        self.send(HistoryCommand::MoveToTime {
            time,
            message_id,
            highlight: true,
        });
    }

    pub fn scroll_to_bottom(&self) {
        self.send(HistoryCommand::ScrollToBottom);
    }

    // Callbacks of the list view

    pub fn did_scroll(&self, offset: ContentOffset) {
        self.scroll.did_scroll(offset);
    }

    pub fn will_begin_dragging(&self) {
        self.scroll.will_begin_dragging();
    }

    pub fn did_end_dragging(&self, will_decelerate: bool) {
        self.scroll.did_end_dragging(will_decelerate);
    }

    pub fn did_end_decelerating(&self) {
        self.scroll.did_end_decelerating();
    }

    pub fn scroll_state(&self) -> ScrollState {
        self.scroll.handle().state()
    }

    pub fn on_appear(&self, row: &HistoryRow) {
        if let HistoryRow::Message(message_row) = row {
            self.visible.append(message_row.key().clone());
        }
        self.seen.on_appear(row);
    }

    pub fn on_disappear(&self, key: &RowKey) {
        self.visible.remove(key.clone());
    }

    pub async fn on_foreground(&self) -> anyhow::Result<()> {
        self.seen.on_foreground().await
    }

    pub fn update_transfer_progress(&self, key: RowKey, transfer: TransferState) {
        self.send(HistoryCommand::UpdateTransfer { key, transfer });
    }

    // Actions; their effects arrive as chat events

    pub async fn delete_messages(&self, message_ids: Vec<MessageId>) -> anyhow::Result<()> {
        let thread_id = self.thread_id();
        self.app
            .client()
            .delete_messages(thread_id, message_ids)
            .await
            .with_context(|| format!("failed to delete messages in {thread_id}"))
    }

    pub async fn pin_message(&self, message_id: MessageId) -> anyhow::Result<()> {
        let thread_id = self.thread_id();
        self.app
            .client()
            .pin_message(thread_id, message_id)
            .await
            .with_context(|| format!("failed to pin message {message_id}"))
    }

    pub async fn unpin_message(&self, message_id: MessageId) -> anyhow::Result<()> {
        let thread_id = self.thread_id();
        self.app
            .client()
            .unpin_message(thread_id, message_id)
            .await
            .with_context(|| format!("failed to unpin message {message_id}"))
    }

    fn thread_id(&self) -> ThreadId {
        self.conversation.borrow().id
    }

    fn send(&self, command: HistoryCommand) {
        let _no_receiver = self.commands.send(command);
    }
}
