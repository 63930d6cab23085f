// SPDX-FileCopyrightText: 2024 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Fetch strategies for opening a conversation, jumping in time and paginating

use chatcoreclient::{
    ChatClient, ConnectionState, Conversation, HistoryRequest, HistoryResponse, LastMessage,
    Message, MessageId, SeenPointer, TimeStamp,
};
use tracing::{debug, info};

use super::{
    context::HistoryContext,
    pending::RequestKind,
    row::{HistoryRow, ReactionsState, RowKey},
    update::{Direction, HistoryUpdate, ScrollPosition},
};

/// Strategy used to populate an empty section store when the conversation is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scenario {
    /// Neither messages nor a seen pointer; nothing to fetch
    NeverOpenedEmpty,
    /// Messages but no seen pointer; jumps to the last message
    NeverOpened(LastMessage),
    /// Unseen messages after the seen pointer
    UnreadAnchored(SeenPointer),
    /// Everything up to the last message was seen
    FullySeenTail,
    /// The last message is older than the seen pointer, so messages after it were deleted
    DeletedTail(LastMessage),
}

impl Scenario {
    pub(crate) fn select(conversation: &Conversation) -> Self {
        match (conversation.last_message, conversation.last_seen) {
            (None, None) => Self::NeverOpenedEmpty,
            (Some(last), None) => Self::NeverOpened(last),
            (None, Some(_)) => Self::FullySeenTail,
            (Some(last), Some(seen)) if last.id > seen.message_id => Self::UnreadAnchored(seen),
            (Some(last), Some(seen)) if last.id < seen.message_id => Self::DeletedTail(last),
            (Some(_), Some(_)) => Self::FullySeenTail,
        }
    }
}

/// A jump waiting for both of its windows
#[derive(Debug)]
pub(crate) struct PendingJump {
    target: Option<MessageId>,
    time: TimeStamp,
    highlight: bool,
    position: ScrollPosition,
    before: Option<(Vec<Message>, bool)>,
    after: Option<(Vec<Message>, bool)>,
}

impl<C> HistoryContext<C>
where
    C: ChatClient + Clone + Send + Sync + 'static,
{
    pub(super) async fn start(&mut self) -> anyhow::Result<()> {
        let conversation = self.conversation.borrow().clone();
        let scenario = Scenario::select(&conversation);
        info!(thread_id = %self.thread_id, ?scenario, "Opening history");

        let page_size = self.app.config().page_size;
        match scenario {
            Scenario::NeverOpenedEmpty => self.sync_empty_state(),
            Scenario::NeverOpened(last) => {
                self.move_to_time(last.time, Some(last.id), false, ScrollPosition::Bottom)
                    .await?
            }
            Scenario::UnreadAnchored(seen) => {
                let request = HistoryRequest::before(self.thread_id, page_size, seen.time);
                self.issue_request(RequestKind::UnreadTop, request).await?
            }
            Scenario::FullySeenTail => {
                let request = HistoryRequest::last_page(self.thread_id, page_size);
                self.issue_request(RequestKind::LastPage, request).await?
            }
            Scenario::DeletedTail(last) => {
                let request = HistoryRequest::before(self.thread_id, page_size, last.time);
                self.issue_request(RequestKind::DeletedTail, request).await?
            }
        }
        Ok(())
    }

    /// Shows the message at `time`
    ///
    /// A loaded target is scrolled to without any request. Otherwise the store is cleared and the
    /// windows before and after `time` are fetched; the target is shown once both arrived.
    pub(super) async fn move_to_time(
        &mut self,
        time: TimeStamp,
        message_id: Option<MessageId>,
        highlight: bool,
        position: ScrollPosition,
    ) -> anyhow::Result<()> {
        if let Some(key) = message_id
            .map(RowKey::Id)
            .filter(|key| self.sections.contains(key))
        {
            debug!(thread_id = %self.thread_id, ?key, "Jump target is loaded");
            if highlight {
                self.highlight(&key);
            }
            self.emit(HistoryUpdate::ScrollTo {
                key,
                position,
                animate: true,
            });
            return Ok(());
        }

        let removed = self.sections.index_paths();
        self.sections.clear();
        if !removed.is_empty() {
            self.emit(HistoryUpdate::Removed(removed));
        }
        self.pending.clear();
        self.pagination = Default::default();
        self.mark_dirty();
        self.jump = Some(PendingJump {
            target: message_id,
            time,
            highlight,
            position,
            before: None,
            after: None,
        });

        let page_size = self.app.config().page_size;
        let before = HistoryRequest::before(self.thread_id, page_size, time).with_read_only(true);
        let after = HistoryRequest::after(self.thread_id, page_size, time.plus_millis(1))
            .with_read_only(true);
        self.issue_request(RequestKind::JumpBefore, before).await?;
        self.issue_request(RequestKind::JumpAfter, after).await?;
        Ok(())
    }

    pub(super) async fn load_more(&mut self, direction: Direction) -> anyhow::Result<()> {
        if !self.can_load_more(direction) {
            debug!(thread_id = %self.thread_id, ?direction, "Not loading more");
            return Ok(());
        }
        let page_size = self.app.config().page_size;
        match direction {
            Direction::Top => {
                let Some(first) = self.sections.first_message_row() else {
                    return Ok(());
                };
                let to_time = first.time().minus_millis(1);
                let request = HistoryRequest::before(self.thread_id, page_size, to_time);
                self.issue_request(RequestKind::Top, request).await
            }
            Direction::Bottom => {
                let Some(last) = self.sections.last_message_row() else {
                    return Ok(());
                };
                let from_time = last.time().plus_millis(1);
                let request = HistoryRequest::after(self.thread_id, page_size, from_time);
                self.issue_request(RequestKind::Bottom, request).await
            }
            Direction::Center => Ok(()),
        }
    }

    /// Pagination needs more pages in that direction, no other page being loaded and no
    /// programmatic scroll in progress
    fn can_load_more(&self, direction: Direction) -> bool {
        let has_next = match direction {
            Direction::Top => self.pagination.has_next_top,
            Direction::Bottom => self.pagination.has_next_bottom,
            Direction::Center => false,
        };
        has_next
            && !self.pending.is_loading(Direction::Top)
            && !self.pending.is_loading(Direction::Bottom)
            && !self.pending.is_loading(Direction::Center)
            && !self.scroll.state().programmatic
    }

    pub(super) async fn scroll_to_bottom(&mut self) -> anyhow::Result<()> {
        self.show_move_to_bottom(false);
        if self.reaches_tail() {
            if let Some(last) = self.sections.last_message_row() {
                let key = last.key().clone();
                self.emit(HistoryUpdate::ScrollTo {
                    key,
                    position: ScrollPosition::Bottom,
                    animate: true,
                });
            }
            return Ok(());
        }
        let last_message = self.conversation.borrow().last_message;
        if let Some(last) = last_message {
            self.move_to_time(last.time, Some(last.id), false, ScrollPosition::Bottom)
                .await?;
        }
        Ok(())
    }

    /// Refreshes reactions and catches up at the bottom when the connection comes back
    pub(super) async fn handle_connection(&mut self, state: ConnectionState) -> anyhow::Result<()> {
        let previous = self.connection.replace(state);
        if state != ConnectionState::Connected || previous == Some(ConnectionState::Connected) {
            return Ok(());
        }
        let mut invalidated = false;
        for row in self.sections.message_rows_mut() {
            if row.reactions != ReactionsState::Invalid {
                row.reactions = ReactionsState::Invalid;
                invalidated = true;
            }
        }
        if invalidated {
            self.mark_dirty();
        }

        if !self.scroll.state().at_bottom || self.pending.is_loading(Direction::Bottom) {
            return Ok(());
        }
        let Some(last) = self.sections.last_message_row() else {
            return Ok(());
        };
        info!(thread_id = %self.thread_id, "Catching up after reconnect");
        let from_time = last.time().plus_millis(1);
        let request = HistoryRequest::after(self.thread_id, self.app.config().page_size, from_time);
        self.issue_request(RequestKind::Reconnect, request).await
    }

    pub(super) async fn handle_response(
        &mut self,
        kind: RequestKind,
        response: &HistoryResponse,
    ) -> anyhow::Result<()> {
        debug!(
            thread_id = %self.thread_id,
            ?kind,
            count = response.result.len(),
            has_next = response.has_next,
            cache = response.cache,
            "History response"
        );
        let messages = response.result.clone();
        match kind {
            RequestKind::UnreadTop => {
                self.pagination.has_next_top = response.has_next;
                self.merge_page(messages, Direction::Center, None).await;
                self.show_unread_anchor();
                let last_seen = self.conversation.borrow().last_seen;
                let Some(seen) = last_seen else {
                    return Ok(());
                };
                let request = HistoryRequest::after(
                    self.thread_id,
                    self.app.config().page_size,
                    seen.time.plus_millis(1),
                );
                self.issue_request(RequestKind::UnreadBottom, request).await?;
            }
            RequestKind::UnreadBottom | RequestKind::Bottom => {
                self.pagination.has_next_bottom = response.has_next;
                self.merge_page(messages, Direction::Bottom, None).await;
                if !response.has_next {
                    self.reconcile_tail();
                }
            }
            RequestKind::LastPage | RequestKind::DeletedTail => {
                self.pagination.has_next_top = response.has_next;
                self.pagination.has_next_bottom = false;
                self.merge_page(messages, Direction::Center, None).await;
                self.reconcile_tail();
                self.scroll_to_last(false);
            }
            RequestKind::Top => {
                self.pagination.has_next_top = response.has_next;
                let anchor = self.sections.first_message_row().map(|row| row.key().clone());
                self.merge_page(messages, Direction::Top, anchor).await;
            }
            RequestKind::Reconnect => {
                self.pagination.has_next_bottom = response.has_next;
                let inserted = self.merge_page(messages, Direction::Bottom, None).await;
                if !response.has_next {
                    self.reconcile_tail();
                }
                if !inserted.is_empty() && self.scroll.state().at_bottom {
                    self.scroll_to_last(true);
                }
            }
            RequestKind::JumpBefore | RequestKind::JumpAfter => {
                self.jump_part_arrived(kind, messages, response.has_next)
                    .await
            }
        }
        self.sync_empty_state();
        Ok(())
    }

    /// Resets the state of a request that failed or timed out
    ///
    /// A failed jump window counts as an empty one, so the other window is still shown.
    pub(super) async fn request_failed(&mut self, kind: RequestKind) {
        match kind {
            RequestKind::JumpBefore | RequestKind::JumpAfter => {
                self.jump_part_arrived(kind, Vec::new(), false).await;
                self.sync_empty_state();
            }
            RequestKind::UnreadTop
            | RequestKind::UnreadBottom
            | RequestKind::LastPage
            | RequestKind::DeletedTail => self.sync_empty_state(),
            RequestKind::Top | RequestKind::Bottom | RequestKind::Reconnect => {}
        }
        self.sync_loading();
    }

    async fn jump_part_arrived(&mut self, kind: RequestKind, messages: Vec<Message>, has_next: bool) {
        let Some(jump) = self.jump.as_mut() else {
            return;
        };
        if kind == RequestKind::JumpBefore {
            jump.before = Some((messages, has_next));
        } else {
            jump.after = Some((messages, has_next));
        }
        if jump.before.is_none() || jump.after.is_none() {
            return;
        }
        let Some(PendingJump {
            target,
            time,
            highlight,
            position,
            before: Some((mut messages, has_next_top)),
            after: Some((after, has_next_bottom)),
        }) = self.jump.take()
        else {
            return;
        };

        messages.extend(after);
        self.pagination.has_next_top = has_next_top;
        self.pagination.has_next_bottom = has_next_bottom;
        self.merge_page(messages, Direction::Center, None).await;
        if !has_next_bottom {
            self.reconcile_tail();
        }

        let key = target
            .map(RowKey::Id)
            .filter(|key| self.sections.contains(key))
            .or_else(|| self.nearest_row(time));
        let Some(key) = key else {
            return;
        };
        if highlight {
            self.highlight(&key);
        }
        self.emit(HistoryUpdate::ScrollTo {
            key,
            position,
            animate: false,
        });
    }

    /// Key of the first row at or after `time`, or of the last row
    fn nearest_row(&self, time: TimeStamp) -> Option<RowKey> {
        self.sections
            .message_rows()
            .find(|(_, row)| row.time() >= time)
            .or_else(|| self.sections.message_rows().next_back())
            .map(|(_, row)| row.key().clone())
    }

    fn highlight(&mut self, key: &RowKey) {
        if let Some((path, row)) = self.sections.message_mut(key) {
            row.highlighted = true;
            self.emit(HistoryUpdate::Reload(path));
            self.mark_dirty();
        }
    }

    /// Inserts the unread banner and scrolls to it
    ///
    /// Without unread messages the last seen message is scrolled to instead.
    fn show_unread_anchor(&mut self) {
        let (unread_count, last_seen) = {
            let conversation = self.conversation.borrow();
            (conversation.unread_count, conversation.last_seen)
        };
        let Some(seen) = last_seen else {
            return;
        };

        if unread_count > 0 {
            let before_sections = self.sections.section_count();
            if self
                .sections
                .insert(HistoryRow::UnreadBanner { time: seen.time })
            {
                let inserted =
                    self.sections
                        .inserted_indices(false, before_sections, &[RowKey::UnreadBanner]);
                self.emit(HistoryUpdate::Inserted {
                    sections: inserted.sections,
                    rows: inserted.rows,
                    direction: Direction::Center,
                    scroll_target: None,
                });
                self.mark_dirty();
            }
            self.emit(HistoryUpdate::ScrollTo {
                key: RowKey::UnreadBanner,
                position: ScrollPosition::Top,
                animate: false,
            });
        } else if self.sections.contains(&RowKey::Id(seen.message_id)) {
            self.emit(HistoryUpdate::ScrollTo {
                key: RowKey::Id(seen.message_id),
                position: ScrollPosition::Bottom,
                animate: false,
            });
        }
    }

    pub(super) fn scroll_to_last(&mut self, animate: bool) {
        if let Some(last) = self.sections.last_message_row() {
            let key = last.key().clone();
            self.emit(HistoryUpdate::ScrollTo {
                key,
                position: ScrollPosition::Bottom,
                animate,
            });
        }
    }
}
