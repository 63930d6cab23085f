// SPDX-FileCopyrightText: 2024 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::time::Duration;

use chatcoreclient::{
    ConnectionState, Conversation, LastMessage, Message, MessageEvent, MessageId, Order,
    ReactionEvent, SeenPointer, ThreadId, TimeStamp, UserId,
    memory::{InMemoryChatClient, OutboundCall},
};
use tokio::time::sleep;

use crate::{app_state::AppContext, config::HistoryConfig, logging::init_logger};

use super::*;

const THREAD: ThreadId = ThreadId(7);
const ME: UserId = UserId(1);
const OTHER: UserId = UserId(2);

const MINUTE: i64 = 60 * 1000;
const DAY: i64 = 24 * 60 * MINUTE;
// 2024-01-01T00:00:00Z
const BASE: i64 = 1_704_067_200_000;

fn minute(id: i64) -> TimeStamp {
    TimeStamp::from_millis(BASE + id * MINUTE)
}

fn message(id: i64, time: TimeStamp) -> Message {
    Message::new(THREAD, MessageId(id), time, OTHER).with_text(format!("message {id}"))
}

fn messages(ids: impl IntoIterator<Item = i64>) -> Vec<Message> {
    ids.into_iter().map(|id| message(id, minute(id))).collect()
}

fn conversation(last: Option<(i64, TimeStamp)>, seen: Option<(i64, TimeStamp)>) -> Conversation {
    Conversation {
        last_message: last.map(|(id, time)| LastMessage {
            id: MessageId(id),
            time,
        }),
        last_seen: seen.map(|(id, time)| SeenPointer {
            message_id: MessageId(id),
            time,
        }),
        ..Conversation::new(THREAD)
    }
}

fn fully_seen(last: i64) -> Conversation {
    conversation(Some((last, minute(last))), Some((last, minute(last))))
}

struct Harness {
    client: InMemoryChatClient,
    view_model: HistoryViewModel<InMemoryChatClient>,
    updates: HistoryUpdates,
}

impl Harness {
    async fn open(messages: Vec<Message>, conversation: Conversation) -> Self {
        Self::open_with(messages, conversation, HistoryConfig::default(), false).await
    }

    async fn open_with(
        messages: Vec<Message>,
        conversation: Conversation,
        config: HistoryConfig,
        hold_history: bool,
    ) -> Self {
        init_logger();
        let client = InMemoryChatClient::new(ME);
        client.insert_messages(messages).await;
        client.set_hold_history(hold_history).await;
        let app = AppContext::new(client.clone(), config);
        let mut view_model = HistoryViewModel::new(app, conversation);
        let updates = view_model.take_updates().unwrap();
        settle().await;
        Self {
            client,
            view_model,
            updates,
        }
    }

    fn drain(&mut self) -> Vec<HistoryUpdate> {
        let mut drained = Vec::new();
        while let Ok(update) = self.updates.try_recv() {
            drained.push(update);
        }
        drained
    }

    fn loaded_ids(&self) -> Vec<i64> {
        self.view_model
            .state()
            .message_rows()
            .filter_map(|row| row.id())
            .map(|id| id.value())
            .collect()
    }
}

async fn settle() {
    sleep(Duration::from_millis(10)).await;
}

fn last_scroll_target(updates: &[HistoryUpdate]) -> Option<(RowKey, ScrollPosition)> {
    updates.iter().rev().find_map(|update| match update {
        HistoryUpdate::ScrollTo { key, position, .. } => Some((key.clone(), *position)),
        _ => None,
    })
}

#[tokio::test(start_paused = true)]
async fn unread_anchored_opening() {
    // unseen messages arrived the day after the last seen one
    let history: Vec<Message> = (1..=100)
        .map(|id| {
            let offset = if id > 80 { DAY } else { 0 };
            message(id, TimeStamp::from_millis(BASE + offset + id * MINUTE))
        })
        .collect();
    let seen_time = history[79].time;
    let mut conversation = conversation(Some((100, history[99].time)), Some((80, seen_time)));
    conversation.unread_count = 20;

    let mut harness = Harness::open(history, conversation).await;

    let requests = harness.client.history_requests().await;
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].order, Order::Desc);
    assert_eq!(requests[0].to_time, Some(seen_time));
    assert_eq!(requests[0].offset, None);
    assert_eq!(requests[1].order, Order::Asc);
    assert_eq!(requests[1].from_time, Some(seen_time.plus_millis(1)));

    let state = harness.view_model.state();
    assert_eq!(harness.loaded_ids(), (56..=100).collect::<Vec<_>>());
    assert_eq!(
        state.index_path(&RowKey::UnreadBanner),
        Some(IndexPath::new(0, 25))
    );
    assert!(state.has_next_top());
    assert!(!state.has_next_bottom());

    let updates = harness.drain();
    assert_eq!(
        last_scroll_target(&updates),
        Some((RowKey::UnreadBanner, ScrollPosition::Top))
    );
    assert_eq!(harness.view_model.conversation().unread_count, 20);
}

#[tokio::test(start_paused = true)]
async fn unread_banner_separates_seen_and_unseen_messages_of_one_day() {
    let mut conversation = conversation(Some((100, minute(100))), Some((80, minute(80))));
    conversation.unread_count = 20;

    let mut harness = Harness::open(messages(1..=100), conversation).await;

    assert_eq!(harness.loaded_ids(), (56..=100).collect::<Vec<_>>());
    let state = harness.view_model.state();
    assert_eq!(
        state.index_path(&RowKey::Id(MessageId(80))),
        Some(IndexPath::new(0, 24))
    );
    assert_eq!(
        state.index_path(&RowKey::UnreadBanner),
        Some(IndexPath::new(0, 25))
    );
    assert_eq!(
        state.index_path(&RowKey::Id(MessageId(81))),
        Some(IndexPath::new(0, 26))
    );
    assert_eq!(
        state.index_path(&RowKey::Id(MessageId(100))),
        Some(IndexPath::new(0, 45))
    );
    assert_eq!(
        last_scroll_target(&harness.drain()),
        Some((RowKey::UnreadBanner, ScrollPosition::Top))
    );
}

#[tokio::test(start_paused = true)]
async fn deleted_tail_opening_corrects_the_last_message() {
    // messages after 38 were deleted while the conversation was closed
    let mut conversation = conversation(Some((40, minute(40))), Some((50, minute(50))));
    conversation.unread_count = 3;

    let mut harness = Harness::open(messages(1..=38), conversation).await;

    let requests = harness.client.history_requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].order, Order::Desc);
    assert_eq!(requests[0].to_time, Some(minute(40)));
    assert_eq!(requests[0].from_time, None);
    assert_eq!(requests[0].offset, None);

    assert_eq!(harness.loaded_ids(), (14..=38).collect::<Vec<_>>());
    let state = harness.view_model.state();
    assert!(state.has_next_top());
    assert!(!state.has_next_bottom());

    let conversation = harness.view_model.conversation();
    assert_eq!(
        conversation.last_message.map(|last| last.id),
        Some(MessageId(38))
    );
    assert_eq!(conversation.unread_count, 0);
    assert_eq!(
        last_scroll_target(&harness.drain()),
        Some((RowKey::Id(MessageId(38)), ScrollPosition::Bottom))
    );
}

#[tokio::test(start_paused = true)]
async fn fully_seen_opening_fetches_the_last_page() {
    let mut harness = Harness::open(messages(1..=50), fully_seen(50)).await;

    let requests = harness.client.history_requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].offset, Some(0));
    assert_eq!(requests[0].from_time, None);
    assert_eq!(requests[0].to_time, None);

    let state = harness.view_model.state();
    assert_eq!(harness.loaded_ids(), (26..=50).collect::<Vec<_>>());
    assert_eq!(state.index_path(&RowKey::UnreadBanner), None);
    assert!(state.has_next_top());

    let updates = harness.drain();
    assert!(updates.contains(&HistoryUpdate::CenterLoading(true)));
    assert!(updates.contains(&HistoryUpdate::CenterLoading(false)));
    assert!(updates.contains(&HistoryUpdate::EmptyState(false)));
    assert_eq!(
        last_scroll_target(&updates),
        Some((RowKey::Id(MessageId(50)), ScrollPosition::Bottom))
    );
}

#[tokio::test(start_paused = true)]
async fn never_opened_empty_conversation_issues_no_request() {
    let mut harness = Harness::open(Vec::new(), Conversation::new(THREAD)).await;

    assert!(harness.client.calls().await.is_empty());
    assert_eq!(harness.drain(), vec![HistoryUpdate::EmptyState(true)]);
}

#[tokio::test(start_paused = true)]
async fn never_opened_conversation_jumps_to_the_last_message() {
    let conversation = conversation(Some((30, minute(30))), None);
    let mut harness = Harness::open(messages(1..=30), conversation).await;

    let requests = harness.client.history_requests().await;
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|request| request.read_only));
    assert_eq!(harness.loaded_ids(), (6..=30).collect::<Vec<_>>());
    assert_eq!(
        last_scroll_target(&harness.drain()),
        Some((RowKey::Id(MessageId(30)), ScrollPosition::Bottom))
    );
}

#[tokio::test(start_paused = true)]
async fn move_to_loaded_message_is_local() {
    let mut harness = Harness::open(messages(1..=50), fully_seen(50)).await;
    harness.client.clear_calls().await;
    harness.drain();

    harness
        .view_model
        .move_to_time(minute(42), Some(MessageId(42)));
    settle().await;

    assert!(harness.client.history_requests().await.is_empty());
    let state = harness.view_model.state();
    let path = state.index_path(&RowKey::Id(MessageId(42))).unwrap();
    assert!(state.row_at(path).unwrap().as_message().unwrap().highlighted);
    assert_eq!(
        harness.drain(),
        vec![
            HistoryUpdate::Reload(path),
            HistoryUpdate::ScrollTo {
                key: RowKey::Id(MessageId(42)),
                position: ScrollPosition::Center,
                animate: true,
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn move_to_unloaded_message_replaces_the_window() {
    let mut harness = Harness::open(messages(1..=50), fully_seen(50)).await;
    harness.client.clear_calls().await;
    harness.drain();

    harness.view_model.move_to_time(minute(5), Some(MessageId(5)));
    settle().await;

    let requests = harness.client.history_requests().await;
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|request| request.read_only));
    assert_eq!(requests[0].to_time, Some(minute(5)));
    assert_eq!(requests[1].from_time, Some(minute(5).plus_millis(1)));

    assert_eq!(harness.loaded_ids(), (1..=30).collect::<Vec<_>>());
    let state = harness.view_model.state();
    assert!(!state.has_next_top());
    assert!(state.has_next_bottom());

    let updates = harness.drain();
    assert!(matches!(&updates[0], HistoryUpdate::Removed(paths) if paths.len() == 25));
    assert_eq!(
        last_scroll_target(&updates),
        Some((RowKey::Id(MessageId(5)), ScrollPosition::Center))
    );
}

#[tokio::test(start_paused = true)]
async fn load_more_top_is_suppressed_after_programmatic_scroll() {
    let mut harness = Harness::open(messages(1..=50), fully_seen(50)).await;
    harness.client.clear_calls().await;

    // the opening scroll to the bottom suppresses pagination for a second
    harness.view_model.load_more_top();
    settle().await;
    assert!(harness.client.history_requests().await.is_empty());

    sleep(Duration::from_millis(1100)).await;
    harness.drain();
    harness.view_model.load_more_top();
    settle().await;

    let requests = harness.client.history_requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].to_time, Some(minute(26).minus_millis(1)));
    assert_eq!(harness.loaded_ids(), (1..=50).collect::<Vec<_>>());
    assert!(!harness.view_model.state().has_next_top());

    let updates = harness.drain();
    assert!(updates.iter().any(|update| matches!(
        update,
        HistoryUpdate::Inserted {
            direction: Direction::Top,
            scroll_target: Some(RowKey::Id(MessageId(26))),
            ..
        }
    )));
    // consecutive messages of the same sender now run across the page boundary
    let state = harness.view_model.state();
    let first_of_old_page = state
        .message_rows()
        .find(|row| row.id() == Some(MessageId(26)))
        .unwrap();
    assert!(!first_of_old_page.is_first_of_run);
}

#[tokio::test(start_paused = true)]
async fn burst_of_deletes_is_applied_once() {
    let config = HistoryConfig {
        page_size: 100,
        ..Default::default()
    };
    let mut harness =
        Harness::open_with(messages(1..=50), fully_seen(50), config, false).await;
    harness.drain();

    for id in 1..=40 {
        harness.client.publish(MessageEvent::Deleted {
            thread_id: THREAD,
            message_id: MessageId(id),
        });
        sleep(Duration::from_millis(5)).await;
    }
    sleep(Duration::from_millis(1500)).await;

    let removals: Vec<usize> = harness
        .drain()
        .into_iter()
        .filter_map(|update| match update {
            HistoryUpdate::Removed(paths) => Some(paths.len()),
            _ => None,
        })
        .collect();
    assert_eq!(removals, vec![40]);
    assert_eq!(harness.loaded_ids(), (41..=50).collect::<Vec<_>>());
}

#[tokio::test(start_paused = true)]
async fn deleting_updates_replies_and_the_last_message() {
    let mut history = messages(1..=50);
    history[49] = history[49].clone().with_reply_to(MessageId(48));
    let harness = Harness::open(history, fully_seen(50)).await;

    harness
        .view_model
        .delete_messages(vec![MessageId(48), MessageId(50)])
        .await
        .unwrap();
    sleep(Duration::from_millis(1100)).await;

    assert!(!harness.loaded_ids().contains(&48));
    assert_eq!(
        harness.view_model.conversation().last_message.map(|last| last.id),
        Some(MessageId(49))
    );
    assert!(harness.client.calls().await.contains(&OutboundCall::Delete {
        thread_id: THREAD,
        message_ids: vec![MessageId(48), MessageId(50)],
    }));
}

#[tokio::test(start_paused = true)]
async fn reply_to_deleted_message_becomes_a_stub() {
    let mut history = messages(1..=50);
    history[49] = history[49].clone().with_reply_to(MessageId(48));
    let mut harness = Harness::open(history, fully_seen(50)).await;

    harness.client.publish(MessageEvent::Deleted {
        thread_id: THREAD,
        message_id: MessageId(48),
    });
    sleep(Duration::from_millis(1100)).await;

    let state = harness.view_model.state();
    let reply = state
        .message_rows()
        .find(|row| row.id() == Some(MessageId(50)))
        .and_then(|row| row.message.reply_info.clone())
        .unwrap();
    assert!(reply.deleted);
    let path = state.index_path(&RowKey::Id(MessageId(50))).unwrap();
    assert!(harness.drain().contains(&HistoryUpdate::Reload(path)));
}

#[tokio::test(start_paused = true)]
async fn sent_message_moves_in_place() {
    let mut harness = Harness::open(messages(70..=76), fully_seen(76)).await;

    let local = Message::local(
        THREAD,
        "abc".into(),
        TimeStamp::from_millis(BASE + 76 * MINUTE + 30_000),
        ME,
    );
    harness.client.publish(MessageEvent::New(local));
    settle().await;
    harness
        .client
        .publish(MessageEvent::New(message(78, minute(77))));
    settle().await;
    harness.drain();

    let state = harness.view_model.state();
    let from = state.index_path(&RowKey::Unique("abc".into())).unwrap();
    assert_eq!(from, IndexPath::new(0, 7));

    harness.client.publish(MessageEvent::Sent {
        thread_id: THREAD,
        unique_id: "abc".into(),
        message_id: MessageId(77),
        time: minute(78),
    });
    settle().await;

    assert_eq!(
        harness.drain(),
        vec![HistoryUpdate::Move {
            from,
            to: IndexPath::new(0, 8),
            removed_section: None,
            inserted_section: None,
        }]
    );
    let state = harness.view_model.state();
    assert_eq!(state.index_path(&RowKey::Unique("abc".into())), None);
    assert_eq!(
        harness.loaded_ids(),
        vec![70, 71, 72, 73, 74, 75, 76, 78, 77]
    );
    assert_eq!(
        state
            .message_rows()
            .filter(|row| row.id() == Some(MessageId(77)))
            .count(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn new_message_scrolls_only_at_the_bottom() {
    let mut harness = Harness::open(messages(1..=10), fully_seen(10)).await;
    harness.drain();

    harness
        .client
        .publish(MessageEvent::New(message(11, minute(11))));
    settle().await;
    assert_eq!(
        last_scroll_target(&harness.drain()),
        Some((RowKey::Id(MessageId(11)), ScrollPosition::Bottom))
    );
    assert_eq!(harness.view_model.conversation().unread_count, 1);

    harness.view_model.did_scroll(ContentOffset {
        y: 0.0,
        content_height: 5_000.0,
        viewport_height: 1_000.0,
    });
    harness
        .client
        .publish(MessageEvent::New(message(12, minute(12))));
    settle().await;

    let updates = harness.drain();
    assert_eq!(last_scroll_target(&updates), None);
    assert!(updates.contains(&HistoryUpdate::MoveToBottomButton(true)));
    assert_eq!(harness.loaded_ids(), (1..=12).collect::<Vec<_>>());
    assert_eq!(
        harness.view_model.conversation().last_message.map(|last| last.id),
        Some(MessageId(12))
    );
}

#[tokio::test(start_paused = true)]
async fn lost_response_is_reset_by_the_watchdog() {
    let mut harness = Harness::open_with(
        messages(1..=50),
        fully_seen(50),
        HistoryConfig::default(),
        true,
    )
    .await;
    assert!(harness.view_model.state().is_center_loading());
    assert_eq!(harness.drain(), vec![HistoryUpdate::CenterLoading(true)]);

    sleep(Duration::from_secs(21)).await;
    assert!(!harness.view_model.state().is_center_loading());
    assert_eq!(
        harness.drain(),
        vec![
            HistoryUpdate::EmptyState(true),
            HistoryUpdate::CenterLoading(false),
        ]
    );

    // a late response is dropped
    assert_eq!(harness.client.release_held().await, 1);
    settle().await;
    assert!(harness.view_model.state().is_empty());
    assert!(harness.drain().is_empty());
}

#[tokio::test(start_paused = true)]
async fn reconnect_catches_up_at_the_bottom() {
    let mut harness = Harness::open(messages(1..=50), fully_seen(50)).await;
    harness.client.insert_messages(messages(51..=53)).await;
    harness.client.clear_calls().await;
    harness.drain();

    harness.client.publish(ConnectionState::Connected);
    settle().await;

    let requests = harness.client.history_requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].order, Order::Asc);
    assert_eq!(requests[0].from_time, Some(minute(50).plus_millis(1)));
    assert_eq!(harness.loaded_ids(), (26..=53).collect::<Vec<_>>());
    assert_eq!(
        last_scroll_target(&harness.drain()),
        Some((RowKey::Id(MessageId(53)), ScrollPosition::Bottom))
    );
}

#[tokio::test(start_paused = true)]
async fn only_a_change_to_connected_catches_up() {
    let harness = Harness::open(messages(1..=50), fully_seen(50)).await;
    harness.client.clear_calls().await;

    harness.client.publish(ConnectionState::Connected);
    settle().await;
    harness.client.publish(ConnectionState::Connected);
    settle().await;
    assert_eq!(harness.client.history_requests().await.len(), 1);

    harness.client.publish(ConnectionState::Disconnected);
    settle().await;
    harness.client.publish(ConnectionState::Connected);
    settle().await;
    assert_eq!(harness.client.history_requests().await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn reconnect_invalidates_reactions() {
    let harness = Harness::open(messages(1..=5), fully_seen(5)).await;
    assert!(
        harness
            .view_model
            .state()
            .message_rows()
            .all(|row| row.reactions == ReactionsState::Valid)
    );

    harness.client.publish(ConnectionState::Connected);
    settle().await;
    assert!(
        harness
            .view_model
            .state()
            .message_rows()
            .all(|row| row.reactions == ReactionsState::Invalid)
    );
}

#[tokio::test(start_paused = true)]
async fn reaction_events_update_the_summary() {
    let mut harness = Harness::open(messages(1..=5), fully_seen(5)).await;
    harness.drain();

    harness.client.publish(ReactionEvent::Add {
        thread_id: THREAD,
        message_id: MessageId(3),
        user_id: ME,
        reaction: "👍".to_owned(),
    });
    harness.client.publish(ReactionEvent::Add {
        thread_id: THREAD,
        message_id: MessageId(3),
        user_id: OTHER,
        reaction: "👍".to_owned(),
    });
    harness.client.publish(ReactionEvent::Replace {
        thread_id: THREAD,
        message_id: MessageId(3),
        user_id: OTHER,
        old_reaction: "👍".to_owned(),
        reaction: "🎉".to_owned(),
    });
    settle().await;

    let state = harness.view_model.state();
    let summary = state
        .message_rows()
        .find(|row| row.id() == Some(MessageId(3)))
        .and_then(|row| row.message.reactions.clone())
        .unwrap();
    assert_eq!(summary.counts.get("👍"), Some(&1));
    assert_eq!(summary.counts.get("🎉"), Some(&1));
    assert_eq!(summary.current_user_reaction.as_deref(), Some("👍"));
    assert_eq!(harness.drain().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn pin_updates_row_and_conversation() {
    let harness = Harness::open(messages(1..=5), fully_seen(5)).await;

    harness.view_model.pin_message(MessageId(2)).await.unwrap();
    settle().await;
    assert_eq!(
        harness.view_model.conversation().pinned_message,
        Some(MessageId(2))
    );
    let pinned = |harness: &Harness| {
        harness
            .view_model
            .state()
            .message_rows()
            .find(|row| row.id() == Some(MessageId(2)))
            .unwrap()
            .message
            .pinned
    };
    assert!(pinned(&harness));

    harness.view_model.unpin_message(MessageId(2)).await.unwrap();
    settle().await;
    assert_eq!(harness.view_model.conversation().pinned_message, None);
    assert!(!pinned(&harness));
}

#[tokio::test(start_paused = true)]
async fn seen_by_others_marks_own_messages() {
    let mut history = messages(1..=5);
    for message in &mut history {
        message.owner = ME;
    }
    let mut harness = Harness::open(history, fully_seen(5)).await;
    harness.drain();

    harness.client.publish(MessageEvent::Seen {
        thread_id: THREAD,
        message_id: MessageId(3),
    });
    settle().await;

    let state = harness.view_model.state();
    let seen: Vec<bool> = state.message_rows().map(|row| row.message.seen).collect();
    assert_eq!(seen, vec![true, true, true, false, false]);
    assert_eq!(harness.drain().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn appearing_rows_are_acknowledged() {
    let history = messages(1..=10);
    let mut conversation = conversation(Some((10, minute(10))), Some((7, minute(7))));
    conversation.unread_count = 3;
    let harness = Harness::open(history, conversation).await;

    let state = harness.view_model.state();
    for id in 8..=10 {
        let path = state.index_path(&RowKey::Id(MessageId(id))).unwrap();
        harness.view_model.on_appear(state.row_at(path).unwrap());
    }
    assert_eq!(harness.view_model.conversation().unread_count, 0);

    sleep(Duration::from_millis(600)).await;
    let calls = harness.client.calls().await;
    assert!(calls.contains(&OutboundCall::Seen {
        thread_id: THREAD,
        message_id: MessageId(10),
    }));
    assert_eq!(
        harness.view_model.conversation().last_seen_message_id(),
        Some(MessageId(10))
    );
}

#[tokio::test(start_paused = true)]
async fn transfer_progress_reloads_the_row() {
    let mut harness = Harness::open(messages(1..=3), fully_seen(3)).await;
    harness.drain();

    let key = RowKey::Id(MessageId(2));
    harness
        .view_model
        .update_transfer_progress(key.clone(), TransferState::Uploading(40));
    settle().await;

    let state = harness.view_model.state();
    let path = state.index_path(&key).unwrap();
    assert_eq!(
        state.row_at(path).unwrap().as_message().unwrap().transfer,
        TransferState::Uploading(40)
    );
    assert_eq!(harness.drain(), vec![HistoryUpdate::Reload(path)]);
}

#[tokio::test(start_paused = true)]
async fn closed_view_ignores_events() {
    let mut harness = Harness::open(messages(1..=3), fully_seen(3)).await;
    harness.drain();

    harness.view_model.close();
    assert!(harness.view_model.is_closed());
    harness
        .client
        .publish(MessageEvent::New(message(4, minute(4))));
    settle().await;

    assert!(harness.drain().is_empty());
    assert_eq!(harness.loaded_ids(), vec![1, 2, 3]);
}
