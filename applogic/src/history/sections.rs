// SPDX-FileCopyrightText: 2024 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Windowed set of loaded messages grouped into calendar-day sections

use chrono::NaiveDate;

use super::row::{HistoryRow, MessageRow, RowKey};

/// Position of a row in the section store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexPath {
    pub section: usize,
    pub row: usize,
}

impl IndexPath {
    pub fn new(section: usize, row: usize) -> Self {
        Self { section, row }
    }
}

/// All rows of a single calendar day
#[derive(Debug, Clone, PartialEq)]
pub struct MessageSection {
    day: NaiveDate,
    rows: Vec<HistoryRow>,
}

impl MessageSection {
    pub fn day(&self) -> NaiveDate {
        self.day
    }

    pub fn rows(&self) -> &[HistoryRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Sections and rows newly created by an insertion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertedIndices {
    pub sections: Vec<usize>,
    /// Rows inserted into sections that already existed
    pub rows: Vec<IndexPath>,
}

/// Outcome of updating a row in place
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RowChange {
    /// The row kept its position
    Reloaded(IndexPath),
    /// The row changed its position
    ///
    /// A section left empty is reported with its index before the move, a section created for
    /// the row with its index after the move.
    Moved {
        from: IndexPath,
        to: IndexPath,
        removed_section: Option<usize>,
        inserted_section: Option<usize>,
    },
    /// After the update the row collided with another row and was dropped
    Removed(IndexPath),
}

/// The loaded messages of a conversation
///
/// Sections are ordered by day, rows within a section by time. The unread banner follows the rows
/// up to its own time. No two rows share an id or a unique id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionStore {
    sections: Vec<MessageSection>,
}

impl SectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sections(&self) -> &[MessageSection] {
        &self.sections
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn rows_count(&self) -> usize {
        self.sections.iter().map(MessageSection::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn clear(&mut self) {
        self.sections.clear();
    }

    pub fn row(&self, path: IndexPath) -> Option<&HistoryRow> {
        self.sections.get(path.section)?.rows.get(path.row)
    }

    pub(crate) fn row_mut(&mut self, path: IndexPath) -> Option<&mut HistoryRow> {
        self.sections.get_mut(path.section)?.rows.get_mut(path.row)
    }

    pub(crate) fn message_mut(&mut self, key: &RowKey) -> Option<(IndexPath, &mut MessageRow)> {
        let path = self.index_path(key)?;
        let row = self.row_mut(path)?.as_message_mut()?;
        Some((path, row))
    }

    /// Returns `None` if the row is not loaded.
    pub fn index_path(&self, key: &RowKey) -> Option<IndexPath> {
        self.sections
            .iter()
            .enumerate()
            .rev()
            .find_map(|(section_idx, section)| {
                let row_idx = section.rows.iter().rposition(|row| row.matches(key))?;
                Some(IndexPath::new(section_idx, row_idx))
            })
    }

    pub fn contains(&self, key: &RowKey) -> bool {
        self.index_path(key).is_some()
    }

    /// Whether any loaded row shares the id or the unique id of `row`
    pub fn contains_identity_of(&self, row: &HistoryRow) -> bool {
        match row {
            HistoryRow::Message(row) => {
                let by_id = row.id().is_some_and(|id| self.contains(&RowKey::Id(id)));
                let by_unique_id = row
                    .message
                    .unique_id
                    .as_ref()
                    .is_some_and(|unique_id| self.contains(&RowKey::Unique(unique_id.clone())));
                by_id || by_unique_id
            }
            HistoryRow::UnreadBanner { .. } => self.contains(&RowKey::UnreadBanner),
        }
    }

    pub fn index_paths(&self) -> Vec<IndexPath> {
        self.sections
            .iter()
            .enumerate()
            .flat_map(|(section_idx, section)| {
                (0..section.len()).map(move |row_idx| IndexPath::new(section_idx, row_idx))
            })
            .collect()
    }

    pub fn message_rows(&self) -> impl DoubleEndedIterator<Item = (IndexPath, &MessageRow)> {
        self.sections
            .iter()
            .enumerate()
            .flat_map(|(section_idx, section)| {
                section
                    .rows
                    .iter()
                    .enumerate()
                    .filter_map(move |(row_idx, row)| {
                        Some((IndexPath::new(section_idx, row_idx), row.as_message()?))
                    })
            })
    }

    pub(crate) fn message_rows_mut(&mut self) -> impl Iterator<Item = &mut MessageRow> {
        self.sections
            .iter_mut()
            .flat_map(|section| section.rows.iter_mut())
            .filter_map(HistoryRow::as_message_mut)
    }

    pub fn first_message_row(&self) -> Option<&MessageRow> {
        self.message_rows().next().map(|(_, row)| row)
    }

    pub fn last_message_row(&self) -> Option<&MessageRow> {
        self.message_rows().next_back().map(|(_, row)| row)
    }

    pub(crate) fn first_message_row_mut(&mut self) -> Option<&mut MessageRow> {
        self.message_rows_mut().next()
    }

    pub(crate) fn last_message_row_mut(&mut self) -> Option<&mut MessageRow> {
        self.message_rows_mut().last()
    }

    /// Inserts a row into the section of its day
    ///
    /// Returns `false` without changing the store if a row with the same identity is already
    /// loaded.
    pub fn insert(&mut self, row: HistoryRow) -> bool {
        if self.contains_identity_of(&row) {
            return false;
        }
        let day = row.time().day();
        match self
            .sections
            .binary_search_by_key(&day, |section| section.day)
        {
            Ok(idx) => {
                let rows = &mut self.sections[idx].rows;
                rows.push(row);
                rows.sort_by(HistoryRow::cmp_position);
            }
            Err(idx) => {
                self.sections.insert(
                    idx,
                    MessageSection {
                        day,
                        rows: vec![row],
                    },
                );
            }
        }
        true
    }

    /// Removes the rows at the given paths
    ///
    /// Paths are resolved against the current state before anything is removed. Paths not
    /// pointing to a row are dropped. Rows are removed from the highest path to the lowest, and
    /// sections left empty are removed afterwards. Returns the paths that were removed in
    /// ascending order.
    pub fn remove(&mut self, paths: &[IndexPath]) -> Vec<IndexPath> {
        let mut valid: Vec<IndexPath> = paths
            .iter()
            .copied()
            .filter(|path| self.row(*path).is_some())
            .collect();
        valid.sort_unstable();
        valid.dedup();

        for path in valid.iter().rev() {
            self.sections[path.section].rows.remove(path.row);
        }
        for section_idx in (0..self.sections.len()).rev() {
            if self.sections[section_idx].rows.is_empty() {
                self.sections.remove(section_idx);
            }
        }
        valid
    }

    /// Computes which sections were created and which rows were added to existing sections
    ///
    /// `before_section_count` is the number of sections before the insertion of `new_rows`. New
    /// sections are expected at the top of the list for `insert_top` and at the bottom otherwise.
    pub fn inserted_indices(
        &self,
        insert_top: bool,
        before_section_count: usize,
        new_rows: &[RowKey],
    ) -> InsertedIndices {
        let added = self.sections.len().saturating_sub(before_section_count);
        let sections: Vec<usize> = if insert_top {
            (0..added).collect()
        } else {
            (self.sections.len() - added..self.sections.len()).collect()
        };
        let mut rows: Vec<IndexPath> = new_rows
            .iter()
            .filter_map(|key| self.index_path(key))
            .filter(|path| !sections.contains(&path.section))
            .collect();
        rows.sort_unstable();
        InsertedIndices { sections, rows }
    }

    /// Updates a row and re-sorts it
    pub(crate) fn update_row(
        &mut self,
        key: &RowKey,
        update: impl FnOnce(&mut HistoryRow),
    ) -> Option<RowChange> {
        let from = self.index_path(key)?;
        let days_before: Vec<NaiveDate> = self.sections.iter().map(MessageSection::day).collect();
        let mut row = self.sections[from.section].rows.remove(from.row);
        update(&mut row);
        if self.sections[from.section].rows.is_empty() {
            self.sections.remove(from.section);
        }

        let new_key = row.key();
        if !self.insert(row) {
            return Some(RowChange::Removed(from));
        }
        let to = self.index_path(&new_key)?;
        let from_day = days_before[from.section];
        let removed_section = (!self.sections.iter().any(|section| section.day == from_day))
            .then_some(from.section);
        let inserted_section =
            (!days_before.contains(&self.sections[to.section].day)).then_some(to.section);
        Some(
            if from == to && removed_section.is_none() && inserted_section.is_none() {
                RowChange::Reloaded(to)
            } else {
                RowChange::Moved {
                    from,
                    to,
                    removed_section,
                    inserted_section,
                }
            },
        )
    }
}
