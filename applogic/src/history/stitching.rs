// SPDX-FileCopyrightText: 2024 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Sender-run flags at page boundaries and reaction refetch selection

use chatcoreclient::{MessageId, MessageType};

use super::row::{MessageRow, ReactionsState};

/// Computes the run flags of a time-ordered batch as if it was the whole list
pub(crate) fn compute_run_flags(rows: &mut [MessageRow]) {
    let owners: Vec<_> = rows.iter().map(MessageRow::owner).collect();
    for (idx, row) in rows.iter_mut().enumerate() {
        let owner = owners[idx];
        row.is_first_of_run = idx == 0 || owners[idx - 1] != owner;
        row.is_last_of_run = owners.get(idx + 1) != Some(&owner);
    }
}

/// Joins a batch merged above the currently loaded rows
///
/// Only the boundary can change: if the last row of the batch has the same sender as the first
/// loaded row, the run continues across the boundary. Returns whether the loaded row changed and
/// must be re-rendered.
pub(crate) fn stitch_top(existing_first: Option<&mut MessageRow>, batch: &mut [MessageRow]) -> bool {
    let (Some(existing), Some(new_last)) = (existing_first, batch.last_mut()) else {
        return false;
    };
    if existing.owner() != new_last.owner() {
        return false;
    }
    new_last.is_last_of_run = false;
    let changed = existing.is_first_of_run;
    existing.is_first_of_run = false;
    changed
}

/// Joins a batch merged below the currently loaded rows; see [`stitch_top`]
pub(crate) fn stitch_bottom(
    existing_last: Option<&mut MessageRow>,
    batch: &mut [MessageRow],
) -> bool {
    let (Some(existing), Some(new_first)) = (existing_last, batch.first_mut()) else {
        return false;
    };
    if existing.owner() != new_first.owner() {
        return false;
    }
    new_first.is_first_of_run = false;
    let changed = existing.is_last_of_run;
    existing.is_last_of_run = false;
    changed
}

/// Server ids of the rows whose reactions need to be (re)fetched
pub(crate) fn reactions_to_fetch<'a>(rows: impl IntoIterator<Item = &'a MessageRow>) -> Vec<MessageId> {
    rows.into_iter()
        .filter(|row| row.reactions == ReactionsState::Invalid)
        .filter(|row| row.message.message_type != MessageType::System)
        .filter_map(|row| row.message.server_id())
        .collect()
}

#[cfg(test)]
mod tests {
    use chatcoreclient::{Message, ThreadId, TimeStamp, UserId};

    use super::*;

    fn rows(owners: &[i64], first_id: i64) -> Vec<MessageRow> {
        owners
            .iter()
            .enumerate()
            .map(|(idx, owner)| {
                let id = first_id + idx as i64;
                let message = Message::new(
                    ThreadId(1),
                    MessageId(id),
                    TimeStamp::from_millis(id * 1000),
                    UserId(*owner),
                );
                MessageRow::new(message, UserId(1)).unwrap()
            })
            .collect()
    }

    fn flags(rows: &[MessageRow]) -> Vec<(bool, bool)> {
        rows.iter()
            .map(|row| (row.is_first_of_run, row.is_last_of_run))
            .collect()
    }

    #[test]
    fn run_flags_within_batch() {
        let mut batch = rows(&[2, 2, 3, 2], 1);
        compute_run_flags(&mut batch);
        assert_eq!(
            flags(&batch),
            vec![(true, false), (false, true), (true, true), (true, true)]
        );
    }

    #[test]
    fn top_boundary_with_same_sender_is_joined() {
        let mut existing = rows(&[2, 3], 10);
        compute_run_flags(&mut existing);
        let mut batch = rows(&[3, 2], 1);
        compute_run_flags(&mut batch);

        assert!(stitch_top(existing.first_mut(), &mut batch));
        assert_eq!(flags(&batch), vec![(true, true), (true, false)]);
        assert_eq!(flags(&existing), vec![(false, true), (true, true)]);
    }

    #[test]
    fn bottom_boundary_with_other_sender_is_untouched() {
        let mut existing = rows(&[2], 1);
        compute_run_flags(&mut existing);
        let mut batch = rows(&[3, 3], 2);
        compute_run_flags(&mut batch);

        assert!(!stitch_bottom(existing.last_mut(), &mut batch));
        assert_eq!(flags(&existing), vec![(true, true)]);
        assert_eq!(flags(&batch), vec![(true, false), (false, true)]);
    }

    #[test]
    fn bottom_boundary_with_same_sender_is_joined() {
        let mut existing = rows(&[2], 1);
        compute_run_flags(&mut existing);
        let mut batch = rows(&[2, 3], 2);
        compute_run_flags(&mut batch);

        assert!(stitch_bottom(existing.last_mut(), &mut batch));
        assert_eq!(flags(&existing), vec![(true, false)]);
        assert_eq!(flags(&batch), vec![(false, true), (true, true)]);
    }

    #[test]
    fn only_invalid_reactions_are_fetched() {
        let mut batch = rows(&[2, 2, 2], 1);
        batch[1].reactions = ReactionsState::Valid;
        batch[2].message.message_type = MessageType::System;
        assert_eq!(reactions_to_fetch(&batch), vec![MessageId(1)]);
    }
}
