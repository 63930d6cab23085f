// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Paginated history requests and their responses

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Message, ThreadId, TimeStamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    /// Oldest first; used when fetching forward in time
    Asc,
    /// Newest first; used when fetching backward in time
    Desc,
}

/// Request for a page of a thread's history
///
/// Both time bounds are inclusive. A request with neither bound set is answered from the newest
/// message backwards, skipping `offset` messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRequest {
    /// Correlates the request with the response delivered on the event stream
    pub correlation_id: Uuid,
    pub thread_id: ThreadId,
    pub count: usize,
    pub offset: Option<usize>,
    pub from_time: Option<TimeStamp>,
    pub to_time: Option<TimeStamp>,
    pub order: Order,
    pub read_only: bool,
}

impl HistoryRequest {
    fn new(thread_id: ThreadId, count: usize, order: Order) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            thread_id,
            count,
            offset: None,
            from_time: None,
            to_time: None,
            order,
            read_only: false,
        }
    }

    /// The newest page, addressed by `offset = 0`
    pub fn last_page(thread_id: ThreadId, count: usize) -> Self {
        Self {
            offset: Some(0),
            ..Self::new(thread_id, count, Order::Desc)
        }
    }

    /// Up to `count` messages at or before `to_time`, newest first
    pub fn before(thread_id: ThreadId, count: usize, to_time: TimeStamp) -> Self {
        Self {
            to_time: Some(to_time),
            ..Self::new(thread_id, count, Order::Desc)
        }
    }

    /// Up to `count` messages at or after `from_time`, oldest first
    pub fn after(thread_id: ThreadId, count: usize, from_time: TimeStamp) -> Self {
        Self {
            from_time: Some(from_time),
            ..Self::new(thread_id, count, Order::Asc)
        }
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Whether the message falls into the requested time bounds
    pub fn contains(&self, message: &Message) -> bool {
        message.thread_id == self.thread_id
            && self.from_time.is_none_or(|from| message.time >= from)
            && self.to_time.is_none_or(|to| message.time <= to)
    }
}

/// Response to a [`HistoryRequest`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub correlation_id: Uuid,
    /// The thread the messages belong to
    pub subject_id: ThreadId,
    /// Messages in the order of the request
    pub result: Vec<Message>,
    /// More messages exist beyond this page in the direction of the request
    pub has_next: bool,
    /// Served from the local cache instead of the network
    pub cache: bool,
}

#[cfg(test)]
mod tests {
    use crate::UserId;

    use super::*;

    #[test]
    fn order_serialization() {
        assert_eq!(serde_json::to_string(&Order::Asc).unwrap(), "\"asc\"");
        assert_eq!(serde_json::to_string(&Order::Desc).unwrap(), "\"desc\"");
    }

    #[test]
    fn time_bounds_are_inclusive() {
        let thread_id = ThreadId(1);
        let at = |millis| {
            Message::new(
                thread_id,
                crate::MessageId(millis),
                TimeStamp::from_millis(millis),
                UserId(1),
            )
        };

        let before = HistoryRequest::before(thread_id, 10, TimeStamp::from_millis(10));
        assert!(before.contains(&at(10)));
        assert!(!before.contains(&at(11)));
        assert_eq!(before.order, Order::Desc);

        let after = HistoryRequest::after(thread_id, 10, TimeStamp::from_millis(10));
        assert!(after.contains(&at(10)));
        assert!(!after.contains(&at(9)));
        assert_eq!(after.order, Order::Asc);

        let last_page = HistoryRequest::last_page(thread_id, 10);
        assert_eq!(last_page.offset, Some(0));
        assert!(last_page.contains(&at(1)));
    }

    #[test]
    fn correlation_ids_are_unique() {
        let a = HistoryRequest::last_page(ThreadId(1), 10);
        let b = HistoryRequest::last_page(ThreadId(1), 10);
        assert_ne!(a.correlation_id, b.correlation_id);
    }
}
