// SPDX-FileCopyrightText: 2024 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::collections::HashSet;

use chatcoreclient::{ChatClient, Message, MessageId};
use tracing::{debug, error, info};

use super::{
    context::HistoryContext,
    row::{HistoryRow, MessageRow, ReactionsState, RowKey},
    sections::{IndexPath, RowChange, SectionStore},
    stitching::{compute_run_flags, reactions_to_fetch, stitch_bottom, stitch_top},
    update::{Direction, HistoryUpdate},
};

fn is_loaded(sections: &SectionStore, row: &MessageRow) -> bool {
    let by_id = row
        .id()
        .is_some_and(|id| sections.contains(&RowKey::Id(id)));
    let by_unique_id = row
        .message
        .unique_id
        .as_ref()
        .is_some_and(|unique_id| sections.contains(&RowKey::Unique(unique_id.clone())));
    by_id || by_unique_id
}

impl<C> HistoryContext<C>
where
    C: ChatClient + Clone + Send + Sync + 'static,
{
    /// Merges a page of messages into the section store
    ///
    /// Rows already loaded are skipped, so merging the same page twice has no effect. Returns the
    /// keys of the inserted rows.
    pub(super) async fn merge_page(
        &mut self,
        mut messages: Vec<Message>,
        direction: Direction,
        scroll_target: Option<RowKey>,
    ) -> Vec<RowKey> {
        messages.sort_by(|a, b| {
            a.time
                .cmp(&b.time)
                .then_with(|| a.id.map(|id| id.value()).cmp(&b.id.map(|id| id.value())))
        });
        let user_id = self.app.user_id();
        let mut keys = HashSet::new();
        let mut rows: Vec<MessageRow> = messages
            .into_iter()
            .filter_map(|message| MessageRow::new(message, user_id))
            .filter(|row| !is_loaded(&self.sections, row) && keys.insert(row.key().clone()))
            .collect();
        if rows.is_empty() {
            return Vec::new();
        }

        compute_run_flags(&mut rows);
        let stitched = match direction {
            Direction::Top => {
                let edge = self.sections.first_message_row_mut();
                let edge_key = edge.as_ref().map(|row| row.key().clone());
                stitch_top(edge, &mut rows).then_some(edge_key).flatten()
            }
            Direction::Bottom => {
                let edge = self.sections.last_message_row_mut();
                let edge_key = edge.as_ref().map(|row| row.key().clone());
                stitch_bottom(edge, &mut rows).then_some(edge_key).flatten()
            }
            Direction::Center => None,
        };

        if !self.scroll.waiting_to_finish_decelerating(&self.cancel).await {
            return Vec::new();
        }

        let before_sections = self.sections.section_count();
        let keys: Vec<RowKey> = rows.iter().map(|row| row.key().clone()).collect();
        for row in rows {
            self.sections.insert(HistoryRow::Message(row));
        }
        let inserted =
            self.sections
                .inserted_indices(direction == Direction::Top, before_sections, &keys);
        debug!(
            thread_id = %self.thread_id,
            ?direction,
            count = keys.len(),
            "Merged history page"
        );
        self.emit(HistoryUpdate::Inserted {
            sections: inserted.sections,
            rows: inserted.rows,
            direction,
            scroll_target,
        });
        if let Some(path) = stitched.and_then(|key| self.sections.index_path(&key)) {
            self.emit(HistoryUpdate::Reload(path));
        }
        self.mark_dirty();

        self.fetch_reactions_for(&keys).await;
        keys
    }

    /// Requests reaction counts for the given rows whose reactions are not known
    pub(super) async fn fetch_reactions_for(&mut self, keys: &[RowKey]) {
        let rows = keys
            .iter()
            .filter_map(|key| self.sections.index_path(key))
            .filter_map(|path| self.sections.row(path)?.as_message());
        let ids = reactions_to_fetch(rows);
        if ids.is_empty() {
            return;
        }
        self.set_reactions_state(&ids, ReactionsState::Loading);
        if let Err(error) = self
            .app
            .client()
            .request_reaction_counts(self.thread_id, ids.clone())
            .await
        {
            error!(thread_id = %self.thread_id, %error, "Failed to request reactions");
            self.set_reactions_state(&ids, ReactionsState::Invalid);
        }
    }

    fn set_reactions_state(&mut self, ids: &[MessageId], state: ReactionsState) {
        for id in ids {
            if let Some((_, row)) = self.sections.message_mut(&RowKey::Id(*id)) {
                row.reactions = state;
            }
        }
        self.mark_dirty();
    }

    /// Corrects the conversation's last message once the newest page is loaded
    ///
    /// If the stored last message is not part of the loaded tail it was deleted; the newest
    /// loaded message takes its place.
    pub(super) fn reconcile_tail(&mut self) {
        let newest = self
            .sections
            .last_message_row()
            .and_then(|row| row.message.as_last_message());
        let last_message = self.conversation.borrow().last_message;
        let Some(stored) = last_message else {
            if newest.is_some() {
                self.conversation
                    .send_modify(|conversation| conversation.last_message = newest);
            }
            return;
        };
        if newest.is_some_and(|newest| newest.time > stored.time) {
            self.conversation
                .send_modify(|conversation| conversation.last_message = newest);
            return;
        }
        if self.sections.contains(&RowKey::Id(stored.id)) {
            return;
        }
        info!(
            thread_id = %self.thread_id,
            last_message_id = %stored.id,
            "Last message is gone; correcting"
        );
        self.conversation.send_modify(|conversation| {
            conversation.last_message = newest;
            let fully_seen = match (newest, conversation.last_seen) {
                (None, _) => true,
                (Some(newest), Some(seen)) => newest.id <= seen.message_id,
                (Some(_), None) => false,
            };
            if fully_seen {
                conversation.unread_count = 0;
            }
        });
    }

    /// Emits the updates for a row that was changed in place
    pub(super) fn emit_row_change(&mut self, change: RowChange) {
        let update = match change {
            RowChange::Reloaded(path) => HistoryUpdate::Reload(path),
            RowChange::Moved {
                from,
                to,
                removed_section,
                inserted_section,
            } => HistoryUpdate::Move {
                from,
                to,
                removed_section,
                inserted_section,
            },
            RowChange::Removed(path) => HistoryUpdate::Removed(vec![path]),
        };
        self.emit(update);
        self.mark_dirty();
    }

    /// Updates a row in place and emits the resulting change
    pub(super) fn update_row(
        &mut self,
        key: &RowKey,
        update: impl FnOnce(&mut MessageRow),
    ) -> Option<RowChange> {
        let change = self.sections.update_row(key, |row| {
            if let Some(row) = row.as_message_mut() {
                update(row);
            }
        })?;
        self.emit_row_change(change);
        Some(change)
    }

    /// Recomputes all run flags and reloads the rows whose flags changed
    pub(super) fn refresh_run_flags(&mut self) {
        let rows: Vec<(IndexPath, MessageRow)> = self
            .sections
            .message_rows()
            .map(|(path, row)| (path, row.clone()))
            .collect();
        let mut recomputed: Vec<MessageRow> = rows.iter().map(|(_, row)| row.clone()).collect();
        compute_run_flags(&mut recomputed);

        let mut changed = Vec::new();
        for ((path, old), new) in rows.iter().zip(recomputed) {
            if old.is_first_of_run != new.is_first_of_run || old.is_last_of_run != new.is_last_of_run
            {
                if let Some(row) = self
                    .sections
                    .row_mut(*path)
                    .and_then(HistoryRow::as_message_mut)
                {
                    row.is_first_of_run = new.is_first_of_run;
                    row.is_last_of_run = new.is_last_of_run;
                }
                changed.push(*path);
            }
        }
        for path in changed {
            self.emit(HistoryUpdate::Reload(path));
        }
    }
}
