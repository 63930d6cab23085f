// SPDX-FileCopyrightText: 2024 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use tokio::sync::mpsc;

use super::{row::RowKey, sections::IndexPath};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Top,
    Bottom,
    Center,
}

/// Where a row should end up in the viewport after scrolling to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrollPosition {
    Top,
    Center,
    Bottom,
}

/// Change the UI layer applies to its list
///
/// Updates are delivered in the order the section store was mutated. Index paths refer to the
/// store state right before (`Removed`, `Move::from`) or right after (`Inserted`, `Reload`,
/// `Move::to`) the change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryUpdate {
    Inserted {
        /// Newly created sections
        sections: Vec<usize>,
        /// Rows inserted into existing sections
        rows: Vec<IndexPath>,
        direction: Direction,
        /// Row to keep in place while inserting, so the visible content does not jump
        scroll_target: Option<RowKey>,
    },
    Removed(Vec<IndexPath>),
    Reload(IndexPath),
    /// A row changed its position
    ///
    /// `removed_section` is a section left empty by the move, indexed before the change.
    /// `inserted_section` is a section created for the row, indexed after the change.
    Move {
        from: IndexPath,
        to: IndexPath,
        removed_section: Option<usize>,
        inserted_section: Option<usize>,
    },
    ScrollTo {
        key: RowKey,
        position: ScrollPosition,
        animate: bool,
    },
    TopLoading(bool),
    BottomLoading(bool),
    CenterLoading(bool),
    EmptyState(bool),
    MoveToBottomButton(bool),
}

pub type HistoryUpdates = mpsc::UnboundedReceiver<HistoryUpdate>;
