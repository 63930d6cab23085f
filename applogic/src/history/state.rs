// SPDX-FileCopyrightText: 2024 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::sync::Arc;

use super::{
    row::{HistoryRow, MessageRow, RowKey},
    sections::{IndexPath, MessageSection, SectionStore},
};

/// Read-only snapshot of the loaded history
///
/// Cheap to clone. The snapshot is replaced as a whole whenever the history task changed the
/// section store, so it is always consistent with the updates emitted before it.
#[derive(Debug, Clone, Default)]
pub struct HistoryState {
    inner: Arc<HistoryStateInner>,
}

#[derive(Debug, Default)]
struct HistoryStateInner {
    sections: SectionStore,
    has_next_top: bool,
    has_next_bottom: bool,
    top_loading: bool,
    bottom_loading: bool,
    center_loading: bool,
}

/// Pagination flags captured together with the sections
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PaginationSnapshot {
    pub(crate) has_next_top: bool,
    pub(crate) has_next_bottom: bool,
    pub(crate) top_loading: bool,
    pub(crate) bottom_loading: bool,
    pub(crate) center_loading: bool,
}

impl HistoryState {
    pub(crate) fn new(sections: SectionStore, pagination: PaginationSnapshot) -> Self {
        let PaginationSnapshot {
            has_next_top,
            has_next_bottom,
            top_loading,
            bottom_loading,
            center_loading,
        } = pagination;
        Self {
            inner: Arc::new(HistoryStateInner {
                sections,
                has_next_top,
                has_next_bottom,
                top_loading,
                bottom_loading,
                center_loading,
            }),
        }
    }

    pub fn sections(&self) -> &[MessageSection] {
        self.inner.sections.sections()
    }

    pub fn sections_count(&self) -> usize {
        self.inner.sections.section_count()
    }

    pub fn rows_count(&self, section: usize) -> usize {
        self.sections().get(section).map_or(0, MessageSection::len)
    }

    pub fn row_at(&self, path: IndexPath) -> Option<&HistoryRow> {
        self.inner.sections.row(path)
    }

    pub fn index_path(&self, key: &RowKey) -> Option<IndexPath> {
        self.inner.sections.index_path(key)
    }

    pub fn message_rows(&self) -> impl Iterator<Item = &MessageRow> {
        self.inner.sections.message_rows().map(|(_, row)| row)
    }

    pub fn last_message_row(&self) -> Option<&MessageRow> {
        self.inner.sections.last_message_row()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.sections.is_empty()
    }

    pub fn has_next_top(&self) -> bool {
        self.inner.has_next_top
    }

    pub fn has_next_bottom(&self) -> bool {
        self.inner.has_next_bottom
    }

    pub fn is_top_loading(&self) -> bool {
        self.inner.top_loading
    }

    pub fn is_bottom_loading(&self) -> bool {
        self.inner.bottom_loading
    }

    pub fn is_center_loading(&self) -> bool {
        self.inner.center_loading
    }
}
