// SPDX-FileCopyrightText: 2024 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The history task
//!
//! A single task per opened conversation owns the section store. Commands from the view-model
//! and push events from the chat client are handled one after another, so page merges, batch
//! flushes and live updates never interleave.

use std::{pin::pin, sync::Arc};

use chatcoreclient::{
    ChatClient, ChatEvent, ConnectionState, Conversation, HistoryRequest, Message, MessageId,
    ThreadId, TimeStamp,
};
use tokio::{sync::mpsc, sync::watch, time::sleep};
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::{app_state::AppContext, util::spawn_from_sync};

use super::{
    batching::BatchQueue,
    pending::{PendingRequests, RequestKind},
    row::{RowKey, TransferState},
    scenarios::PendingJump,
    scroll::ScrollHandle,
    sections::SectionStore,
    state::{HistoryState, PaginationSnapshot},
    update::{Direction, HistoryUpdate, ScrollPosition},
};

/// Requests from the view-model to the history task
#[derive(Debug)]
pub(crate) enum HistoryCommand {
    /// Runs the opening scenario
    Start,
    LoadMore(Direction),
    MoveToTime {
        time: TimeStamp,
        message_id: Option<MessageId>,
        highlight: bool,
    },
    ScrollToBottom,
    /// The list was scrolled to the bottom by the user
    ReachedBottom,
    VisibleSettled(Vec<RowKey>),
    ApplyDeleted(Vec<MessageId>),
    ApplyForwarded(Vec<Message>),
    /// A request was not answered in time
    CancelTimer(Uuid),
    UpdateTransfer {
        key: RowKey,
        transfer: TransferState,
    },
}

enum Input {
    Command(HistoryCommand),
    Event(Arc<ChatEvent>),
}

#[derive(Debug, Default, Clone, Copy)]
pub(super) struct Pagination {
    pub(super) has_next_top: bool,
    pub(super) has_next_bottom: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct LoadingFlags {
    top: bool,
    bottom: bool,
    center: bool,
}

pub(super) struct HistoryContext<C> {
    pub(super) app: AppContext<C>,
    pub(super) thread_id: ThreadId,
    pub(super) conversation: Arc<watch::Sender<Conversation>>,
    state_tx: watch::Sender<HistoryState>,
    updates_tx: mpsc::UnboundedSender<HistoryUpdate>,
    commands_tx: mpsc::UnboundedSender<HistoryCommand>,
    pub(super) scroll: ScrollHandle,
    pub(super) sections: SectionStore,
    pub(super) pending: PendingRequests,
    pub(super) pagination: Pagination,
    pub(super) jump: Option<PendingJump>,
    pub(super) deletes: BatchQueue<MessageId>,
    pub(super) forwards: BatchQueue<Message>,
    pub(super) cancel: CancellationToken,
    loading: LoadingFlags,
    empty_state: Option<bool>,
    pub(super) move_to_bottom_shown: bool,
    /// Last connection state reported by the client, unknown until the first event
    pub(super) connection: Option<ConnectionState>,
    dirty: bool,
}

impl<C> HistoryContext<C>
where
    C: ChatClient + Clone + Send + Sync + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        app: AppContext<C>,
        conversation: Arc<watch::Sender<Conversation>>,
        state_tx: watch::Sender<HistoryState>,
        updates_tx: mpsc::UnboundedSender<HistoryUpdate>,
        commands_tx: mpsc::UnboundedSender<HistoryCommand>,
        scroll: ScrollHandle,
        cancel: CancellationToken,
    ) -> Self {
        let thread_id = conversation.borrow().id;
        let config = app.config();

        let tx = commands_tx.clone();
        let deletes = BatchQueue::new(
            "deletes",
            config.batch_capacity,
            config.delete_batch_window(),
            cancel.child_token(),
            move |_thread_id, ids| {
                let _no_receiver = tx.send(HistoryCommand::ApplyDeleted(ids));
            },
        );
        let tx = commands_tx.clone();
        let forwards = BatchQueue::new(
            "forwards",
            config.batch_capacity,
            config.forward_batch_window(),
            cancel.child_token(),
            move |_thread_id, messages| {
                let _no_receiver = tx.send(HistoryCommand::ApplyForwarded(messages));
            },
        );

        Self {
            app,
            thread_id,
            conversation,
            state_tx,
            updates_tx,
            commands_tx,
            scroll,
            sections: SectionStore::new(),
            pending: PendingRequests::default(),
            pagination: Pagination::default(),
            jump: None,
            deletes,
            forwards,
            cancel,
            loading: LoadingFlags::default(),
            empty_state: None,
            move_to_bottom_shown: false,
            connection: None,
            dirty: false,
        }
    }

    /// Spawns the history task
    ///
    /// The event subscription is created before the task starts, so no response to a request
    /// issued by the task can be missed.
    pub(super) fn spawn(self, commands: mpsc::UnboundedReceiver<HistoryCommand>) {
        let events = self.app.client().subscribe();
        spawn_from_sync(self.run(commands, events));
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<HistoryCommand>,
        events: impl Stream<Item = Arc<ChatEvent>>,
    ) {
        let mut events = pin!(events);
        loop {
            let input = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                command = commands.recv() => command.map(Input::Command),
                event = events.next() => event.map(Input::Event),
            };
            match input {
                Some(Input::Command(command)) => self.process_command(command).await,
                Some(Input::Event(event)) => self.process_event(&event).await,
                None => break,
            }
            self.sync_loading();
            self.publish_state();
        }
        debug!(thread_id = %self.thread_id, "History task stopped");
    }

    async fn process_command(&mut self, command: HistoryCommand) {
        if let Err(error) = self.try_process_command(command).await {
            error!(thread_id = %self.thread_id, %error, "Failed to process history command");
        }
    }

    async fn try_process_command(&mut self, command: HistoryCommand) -> anyhow::Result<()> {
        match command {
            HistoryCommand::Start => self.start().await?,
            HistoryCommand::LoadMore(direction) => self.load_more(direction).await?,
            HistoryCommand::MoveToTime {
                time,
                message_id,
                highlight,
            } => {
                self.move_to_time(time, message_id, highlight, ScrollPosition::Center)
                    .await?
            }
            HistoryCommand::ScrollToBottom => self.scroll_to_bottom().await?,
            HistoryCommand::ReachedBottom => self.show_move_to_bottom(false),
            HistoryCommand::VisibleSettled(keys) => self.fetch_reactions_for(&keys).await,
            HistoryCommand::ApplyDeleted(ids) => self.apply_deleted(ids),
            HistoryCommand::ApplyForwarded(messages) => self.apply_forwarded(messages).await,
            HistoryCommand::CancelTimer(correlation_id) => {
                if let Some(kind) = self.pending.pop(&correlation_id) {
                    warn!(
                        thread_id = %self.thread_id,
                        %correlation_id,
                        ?kind,
                        "History request timed out"
                    );
                    self.request_failed(kind).await;
                }
            }
            HistoryCommand::UpdateTransfer { key, transfer } => {
                if let Some((path, row)) = self.sections.message_mut(&key) {
                    row.transfer = transfer;
                    self.emit(HistoryUpdate::Reload(path));
                    self.mark_dirty();
                }
            }
        }
        Ok(())
    }

    async fn process_event(&mut self, event: &ChatEvent) {
        if event
            .subject_id()
            .is_some_and(|subject_id| subject_id != self.thread_id)
        {
            return;
        }
        if let Err(error) = self.try_process_event(event).await {
            error!(thread_id = %self.thread_id, %error, "Failed to process chat event");
        }
    }

    async fn try_process_event(&mut self, event: &ChatEvent) -> anyhow::Result<()> {
        match event {
            ChatEvent::History(response) => {
                let Some(kind) = self.pending.pop(&response.correlation_id) else {
                    debug!(
                        correlation_id = %response.correlation_id,
                        cache = response.cache,
                        "Dropping unrequested history response"
                    );
                    return Ok(());
                };
                self.handle_response(kind, response).await?;
            }
            ChatEvent::Message(event) => self.handle_message_event(event).await,
            ChatEvent::Reaction(event) => self.handle_reaction_event(event),
            ChatEvent::Thread(event) => self.handle_thread_event(event),
            ChatEvent::Connection(state) => self.handle_connection(*state).await?,
            ChatEvent::Error(event) => {
                let Some(kind) = event
                    .correlation_id
                    .and_then(|correlation_id| self.pending.pop(&correlation_id))
                else {
                    return Ok(());
                };
                warn!(
                    thread_id = %self.thread_id,
                    code = event.code,
                    message = %event.message,
                    ?kind,
                    "History request failed"
                );
                self.request_failed(kind).await;
            }
        }
        Ok(())
    }

    /// Registers and sends a history request
    ///
    /// A watchdog resets the loading state if no response arrives in time.
    pub(super) async fn issue_request(
        &mut self,
        kind: RequestKind,
        request: HistoryRequest,
    ) -> anyhow::Result<()> {
        let correlation_id = request.correlation_id;
        debug!(thread_id = %self.thread_id, ?kind, ?request, "Requesting history");
        self.pending.register(correlation_id, kind);
        self.sync_loading();

        let tx = self.commands_tx.clone();
        let cancel = self.cancel.child_token();
        let watchdog = self.app.config().request_watchdog();
        spawn_from_sync(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = sleep(watchdog) => {
                    let _no_receiver = tx.send(HistoryCommand::CancelTimer(correlation_id));
                }
            }
        });

        if let Err(error) = self.app.client().request_history(request).await {
            self.pending.pop(&correlation_id);
            self.request_failed(kind).await;
            return Err(error.into());
        }
        Ok(())
    }

    pub(super) fn emit(&mut self, update: HistoryUpdate) {
        if matches!(update, HistoryUpdate::ScrollTo { .. }) {
            self.scroll.disable_excessive_loading();
        }
        let _no_receiver = self.updates_tx.send(update);
    }

    pub(super) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(super) fn show_move_to_bottom(&mut self, show: bool) {
        if self.move_to_bottom_shown != show {
            self.move_to_bottom_shown = show;
            self.emit(HistoryUpdate::MoveToBottomButton(show));
        }
    }

    pub(super) fn sync_empty_state(&mut self) {
        let is_empty = self.sections.is_empty();
        if self.empty_state != Some(is_empty) {
            self.empty_state = Some(is_empty);
            self.emit(HistoryUpdate::EmptyState(is_empty));
        }
    }

    /// Emits loading indicator changes derived from the outstanding requests
    pub(super) fn sync_loading(&mut self) {
        let flags = LoadingFlags {
            top: self.pending.is_loading(Direction::Top),
            bottom: self.pending.is_loading(Direction::Bottom),
            center: self.pending.is_loading(Direction::Center),
        };
        if flags.top != self.loading.top {
            self.emit(HistoryUpdate::TopLoading(flags.top));
        }
        if flags.bottom != self.loading.bottom {
            self.emit(HistoryUpdate::BottomLoading(flags.bottom));
        }
        if flags.center != self.loading.center {
            self.emit(HistoryUpdate::CenterLoading(flags.center));
        }
        if flags != self.loading {
            self.loading = flags;
            self.dirty = true;
        }
    }

    fn publish_state(&mut self) {
        if !std::mem::take(&mut self.dirty) {
            return;
        }
        let pagination = PaginationSnapshot {
            has_next_top: self.pagination.has_next_top,
            has_next_bottom: self.pagination.has_next_bottom,
            top_loading: self.loading.top,
            bottom_loading: self.loading.bottom,
            center_loading: self.loading.center,
        };
        self.state_tx
            .send_replace(HistoryState::new(self.sections.clone(), pagination));
    }

    /// Whether the newest message of the conversation is loaded
    pub(super) fn reaches_tail(&self) -> bool {
        let last_message = self.conversation.borrow().last_message;
        match last_message {
            Some(last) => self.sections.contains(&RowKey::Id(last.id)),
            None => !self.pagination.has_next_bottom,
        }
    }
}
