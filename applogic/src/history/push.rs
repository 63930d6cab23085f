// SPDX-FileCopyrightText: 2024 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Live updates pushed by the chat service

use chatcoreclient::{
    ChatClient, Message, MessageEvent, MessageId, ReactionEvent, SeenPointer, ThreadEvent,
    TimeStamp, UniqueId,
};
use tracing::debug;

use super::{
    context::HistoryContext,
    row::{ReactionsState, RowKey},
    update::{Direction, HistoryUpdate, ScrollPosition},
};

impl<C> HistoryContext<C>
where
    C: ChatClient + Clone + Send + Sync + 'static,
{
    pub(super) async fn handle_message_event(&mut self, event: &MessageEvent) {
        match event {
            MessageEvent::New(message) => self.on_new_message(message.clone()).await,
            MessageEvent::Sent {
                unique_id,
                message_id,
                time,
                ..
            } => self.on_sent(unique_id, *message_id, *time),
            MessageEvent::Edited(message) => {
                let Some(key) = RowKey::of(message) else {
                    return;
                };
                let message = message.clone();
                self.update_row(&key, |row| row.replace_message(message));
            }
            MessageEvent::Deleted { message_id, .. } => {
                self.deletes.push(self.thread_id, *message_id)
            }
            MessageEvent::Forwarded(message) => self.forwards.push(self.thread_id, message.clone()),
            MessageEvent::Pinned { message_id, .. } => self.set_pinned(*message_id, true),
            MessageEvent::Unpinned { message_id, .. } => self.set_pinned(*message_id, false),
            MessageEvent::Delivered { message_id, .. } => {
                self.mark_own_rows(*message_id, |message| {
                    !std::mem::replace(&mut message.delivered, true)
                })
            }
            MessageEvent::Seen { message_id, .. } => self.mark_own_rows(*message_id, |message| {
                let changed = !message.seen || !message.delivered;
                message.seen = true;
                message.delivered = true;
                changed
            }),
        }
    }

    async fn on_new_message(&mut self, message: Message) {
        // the server's copy of a message sent from this device
        if let Some(key) = message
            .unique_id
            .clone()
            .map(RowKey::Unique)
            .filter(|key| self.sections.contains(key))
        {
            self.advance_last_message(&message);
            self.update_row(&key, |row| row.replace_message(message));
            return;
        }
        if let Some(key) = message
            .id
            .map(RowKey::Id)
            .filter(|key| self.sections.contains(key))
        {
            self.update_row(&key, |row| row.replace_message(message));
            return;
        }

        let at_tail = self.reaches_tail();
        let own = message.owner == self.app.user_id();
        self.advance_last_message(&message);
        self.conversation.send_modify(|conversation| {
            if own {
                conversation.unread_count = 0;
                if let Some(last) = message.as_last_message() {
                    conversation.last_seen = Some(SeenPointer {
                        message_id: last.id,
                        time: last.time,
                    });
                }
            } else {
                conversation.unread_count = conversation.unread_count.saturating_add(1);
            }
        });

        if !at_tail {
            debug!(thread_id = %self.thread_id, "New message outside of the loaded window");
            self.show_move_to_bottom(true);
            return;
        }
        let inserted = self.merge_page(vec![message], Direction::Bottom, None).await;
        self.sync_empty_state();
        let Some(key) = inserted.into_iter().next() else {
            return;
        };
        if own || self.scroll.state().at_bottom {
            self.emit(HistoryUpdate::ScrollTo {
                key,
                position: ScrollPosition::Bottom,
                animate: true,
            });
        } else {
            self.show_move_to_bottom(true);
        }
    }

    fn advance_last_message(&mut self, message: &Message) {
        let Some(candidate) = message.as_last_message() else {
            return;
        };
        self.conversation.send_if_modified(|conversation| {
            let newer = conversation
                .last_message
                .is_none_or(|last| candidate.time > last.time || candidate.id > last.id);
            if newer {
                conversation.last_message = Some(candidate);
            }
            newer
        });
    }

    fn on_sent(&mut self, unique_id: &UniqueId, message_id: MessageId, time: TimeStamp) {
        let key = RowKey::Unique(unique_id.clone());
        let Some(change) = self.update_row(&key, |row| row.mark_sent(message_id, time)) else {
            debug!(thread_id = %self.thread_id, %message_id, "Sent message is not loaded");
            return;
        };
        debug!(thread_id = %self.thread_id, %message_id, ?change, "Message sent");
        let Some((_, row)) = self.sections.message_mut(&RowKey::Id(message_id)) else {
            return;
        };
        let message = row.message.clone();
        self.advance_last_message(&message);
        self.conversation.send_modify(|conversation| {
            let seen_before = conversation
                .last_seen
                .is_some_and(|seen| seen.message_id >= message_id);
            if !seen_before {
                conversation.last_seen = Some(SeenPointer { message_id, time });
            }
        });
    }

    fn set_pinned(&mut self, message_id: MessageId, pinned: bool) {
        self.update_row(&RowKey::Id(message_id), |row| row.message.pinned = pinned);
        self.conversation.send_if_modified(|conversation| {
            let target = if pinned {
                Some(message_id)
            } else if conversation.pinned_message == Some(message_id) {
                None
            } else {
                return false;
            };
            std::mem::replace(&mut conversation.pinned_message, target) != target
        });
    }

    /// Applies a flag change to the local user's rows up to `message_id`
    fn mark_own_rows(&mut self, message_id: MessageId, mark: impl Fn(&mut Message) -> bool) {
        let mut changed = Vec::new();
        for (path, row) in self.sections.message_rows() {
            if row.is_me && row.id().is_some_and(|id| id <= message_id) {
                changed.push(path);
            }
        }
        let mut reloaded = Vec::new();
        for path in changed {
            let Some(row) = self
                .sections
                .row_mut(path)
                .and_then(|row| row.as_message_mut())
            else {
                continue;
            };
            if mark(&mut row.message) {
                reloaded.push(path);
            }
        }
        for path in reloaded {
            self.emit(HistoryUpdate::Reload(path));
        }
        self.mark_dirty();
    }

    /// Removes a batch of deleted messages
    pub(super) fn apply_deleted(&mut self, ids: Vec<MessageId>) {
        let paths: Vec<_> = ids
            .iter()
            .filter_map(|id| self.sections.index_path(&RowKey::Id(*id)))
            .collect();
        let removed = self.sections.remove(&paths);
        debug!(
            thread_id = %self.thread_id,
            requested = ids.len(),
            removed = removed.len(),
            "Applying deleted messages"
        );
        if !removed.is_empty() {
            self.emit(HistoryUpdate::Removed(removed));
            self.refresh_run_flags();
        }

        // replies to deleted messages become stubs
        let mut stubs = Vec::new();
        for (path, row) in self.sections.message_rows() {
            let replies_to_deleted = row.message.reply_info.as_ref().is_some_and(|reply| {
                !reply.deleted && reply.replied_to.is_some_and(|id| ids.contains(&id))
            });
            if replies_to_deleted {
                stubs.push(path);
            }
        }
        for path in stubs {
            if let Some(reply) = self
                .sections
                .row_mut(path)
                .and_then(|row| row.as_message_mut())
                .and_then(|row| row.message.reply_info.as_mut())
            {
                reply.deleted = true;
                reply.text = None;
            }
            self.emit(HistoryUpdate::Reload(path));
        }

        let newest = self
            .sections
            .last_message_row()
            .and_then(|row| row.message.as_last_message());
        self.conversation.send_if_modified(|conversation| {
            let mut modified = false;
            if conversation
                .pinned_message
                .is_some_and(|pinned| ids.contains(&pinned))
            {
                conversation.pinned_message = None;
                modified = true;
            }
            if conversation
                .last_message
                .is_some_and(|last| ids.contains(&last.id))
            {
                conversation.last_message = newest;
                modified = true;
            }
            modified
        });
        self.sync_empty_state();
        self.mark_dirty();
    }

    /// Appends a batch of forwarded messages if the loaded window reaches the tail
    pub(super) async fn apply_forwarded(&mut self, messages: Vec<Message>) {
        let at_tail = self.reaches_tail();
        for message in &messages {
            self.advance_last_message(message);
        }
        if !at_tail {
            self.show_move_to_bottom(true);
            return;
        }
        let inserted = self.merge_page(messages, Direction::Bottom, None).await;
        self.sync_empty_state();
        if !inserted.is_empty() && self.scroll.state().at_bottom {
            self.scroll_to_last(true);
        }
    }

    pub(super) fn handle_reaction_event(&mut self, event: &ReactionEvent) {
        let user_id = self.app.user_id();
        let mut updated = Vec::new();
        match event {
            ReactionEvent::Counts { counts, .. } => {
                for (message_id, summary) in counts {
                    if let Some((path, row)) = self.sections.message_mut(&RowKey::Id(*message_id)) {
                        row.message.reactions = Some(summary.clone());
                        row.reactions = ReactionsState::Valid;
                        updated.push(path);
                    }
                }
            }
            ReactionEvent::Add {
                message_id,
                user_id: reactor,
                reaction,
                ..
            } => {
                if let Some((path, row)) = self.sections.message_mut(&RowKey::Id(*message_id)) {
                    row.message
                        .reactions
                        .get_or_insert_default()
                        .add(reaction, *reactor == user_id);
                    updated.push(path);
                }
            }
            ReactionEvent::Replace {
                message_id,
                user_id: reactor,
                old_reaction,
                reaction,
                ..
            } => {
                if let Some((path, row)) = self.sections.message_mut(&RowKey::Id(*message_id)) {
                    let summary = row.message.reactions.get_or_insert_default();
                    summary.remove(old_reaction, *reactor == user_id);
                    summary.add(reaction, *reactor == user_id);
                    updated.push(path);
                }
            }
            ReactionEvent::Delete {
                message_id,
                user_id: reactor,
                reaction,
                ..
            } => {
                if let Some((path, row)) = self.sections.message_mut(&RowKey::Id(*message_id)) {
                    row.message
                        .reactions
                        .get_or_insert_default()
                        .remove(reaction, *reactor == user_id);
                    updated.push(path);
                }
            }
        }
        for path in updated {
            self.emit(HistoryUpdate::Reload(path));
        }
        self.mark_dirty();
    }

    pub(super) fn handle_thread_event(&mut self, event: &ThreadEvent) {
        match event {
            ThreadEvent::UnreadCount { unread_count, .. } => {
                let unread_count = *unread_count;
                self.conversation.send_if_modified(|conversation| {
                    std::mem::replace(&mut conversation.unread_count, unread_count) != unread_count
                });
            }
            ThreadEvent::LastSeenUpdated { last_seen, .. } => {
                let last_seen = *last_seen;
                self.conversation.send_if_modified(|conversation| {
                    let newer = conversation
                        .last_seen
                        .is_none_or(|seen| last_seen.message_id > seen.message_id);
                    if newer {
                        conversation.last_seen = Some(last_seen);
                    }
                    newer
                });
            }
        }
    }
}
