// SPDX-FileCopyrightText: 2024 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::collections::HashMap;

use uuid::Uuid;

use super::update::Direction;

/// What an outstanding history request was issued for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum RequestKind {
    /// Window ending at the last seen message
    UnreadTop,
    /// Window starting right after the last seen message
    UnreadBottom,
    /// Newest page by offset
    LastPage,
    /// Page ending at the stored last message time
    DeletedTail,
    JumpBefore,
    JumpAfter,
    Top,
    Bottom,
    /// Messages newer than the last loaded one after reconnecting
    Reconnect,
}

impl RequestKind {
    /// Loading indicator the request is shown with
    pub(crate) fn direction(self) -> Direction {
        match self {
            Self::Top => Direction::Top,
            Self::Bottom | Self::Reconnect | Self::UnreadBottom => Direction::Bottom,
            Self::UnreadTop
            | Self::LastPage
            | Self::DeletedTail
            | Self::JumpBefore
            | Self::JumpAfter => Direction::Center,
        }
    }
}

/// Registry of outstanding requests keyed by correlation id
///
/// The first response with a registered id pops the entry; later responses with the same id
/// (e.g. a network response following a cached one) find nothing and are dropped.
#[derive(Debug, Default)]
pub(crate) struct PendingRequests {
    requests: HashMap<Uuid, RequestKind>,
}

impl PendingRequests {
    pub(crate) fn register(&mut self, correlation_id: Uuid, kind: RequestKind) {
        self.requests.insert(correlation_id, kind);
    }

    pub(crate) fn pop(&mut self, correlation_id: &Uuid) -> Option<RequestKind> {
        self.requests.remove(correlation_id)
    }

    pub(crate) fn is_loading(&self, direction: Direction) -> bool {
        self.requests
            .values()
            .any(|kind| kind.direction() == direction)
    }

    pub(crate) fn clear(&mut self) {
        self.requests.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_response_pops_the_key() {
        let mut pending = PendingRequests::default();
        let id = Uuid::new_v4();
        pending.register(id, RequestKind::Top);
        assert!(pending.is_loading(Direction::Top));
        assert!(!pending.is_loading(Direction::Bottom));

        assert_eq!(pending.pop(&id), Some(RequestKind::Top));
        assert_eq!(pending.pop(&id), None);
        assert!(!pending.is_loading(Direction::Top));
    }
}
