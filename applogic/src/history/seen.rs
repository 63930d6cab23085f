// SPDX-FileCopyrightText: 2024 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{sync::Arc, time::Duration};

use anyhow::Context as _;
use chatcoreclient::{ChatClient, Conversation, MessageId, ThreadId};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::util::Debouncer;

use super::{row::HistoryRow, scroll::ScrollHandle};

/// Optimistic unread bookkeeping and debounced seen acknowledgements
///
/// Every qualifying appearance decrements the local unread counter right away. The acknowledged
/// id is sent upstream once the appearances settle; only the highest id of a burst is sent, and
/// the same id is never sent twice in a row. The server confirms with a last-seen event.
pub(crate) struct SeenReconciler<C> {
    client: C,
    thread_id: ThreadId,
    conversation: Arc<watch::Sender<Conversation>>,
    scroll: ScrollHandle,
    /// Highest id counted locally, possibly not yet confirmed by the server
    local_last_seen: Arc<Mutex<Option<MessageId>>>,
    pipeline: Debouncer<MessageId>,
}

impl<C> SeenReconciler<C>
where
    C: ChatClient + Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        client: C,
        conversation: Arc<watch::Sender<Conversation>>,
        scroll: ScrollHandle,
        debounce: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let thread_id = conversation.borrow().id;
        let local_last_seen = Arc::new(Mutex::new(None));

        let send_client = client.clone();
        let mut last_sent: Option<MessageId> = None;
        let pipeline = Debouncer::spawn(debounce, cancel, MessageId::max, move |message_id| {
            let skip = last_sent == Some(message_id);
            last_sent = Some(message_id);
            let client = send_client.clone();
            async move {
                if skip {
                    return;
                }
                debug!(%thread_id, %message_id, "Sending seen");
                if let Err(error) = client.send_seen(thread_id, message_id).await {
                    error!(%error, %thread_id, %message_id, "Failed to send seen");
                }
            }
        });

        Self {
            client,
            thread_id,
            conversation,
            scroll,
            local_last_seen,
            pipeline,
        }
    }

    fn last_seen(&self, local: Option<MessageId>) -> Option<MessageId> {
        let confirmed = self.conversation.borrow().last_seen_message_id();
        local.max(confirmed)
    }

    /// Returns whether the row was counted as seen.
    pub(crate) fn on_appear(&self, row: &HistoryRow) -> bool {
        let Some(message_id) = row.as_message().and_then(|row| row.message.server_id()) else {
            return false;
        };
        if self.scroll.state().scrolling_up {
            return false;
        }

        let mut local = self.local_last_seen.lock();
        if self
            .last_seen(*local)
            .is_some_and(|last_seen| message_id <= last_seen)
        {
            return false;
        }
        let decremented = self.conversation.send_if_modified(|conversation| {
            if conversation.unread_count == 0 {
                return false;
            }
            conversation.unread_count -= 1;
            true
        });
        if decremented {
            *local = Some(message_id);
            self.pipeline.push(message_id);
        }
        decremented
    }

    /// Acknowledges the last message directly if the list rests at the bottom
    ///
    /// No appearances are reported for a list that did not move while the app was in the
    /// background.
    pub(crate) async fn on_foreground(&self) -> anyhow::Result<()> {
        if !self.scroll.state().at_bottom {
            return Ok(());
        }
        let last_message = self.conversation.borrow().last_message;
        let Some(last_message) = last_message else {
            return Ok(());
        };
        let local = *self.local_last_seen.lock();
        if self
            .last_seen(local)
            .is_some_and(|last_seen| last_message.id <= last_seen)
        {
            return Ok(());
        }

        self.client
            .send_seen(self.thread_id, last_message.id)
            .await
            .context("failed to send seen on foreground")?;
        *self.local_last_seen.lock() = Some(last_message.id);
        self.conversation
            .send_modify(|conversation| conversation.unread_count = 0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chatcoreclient::{
        LastMessage, Message, SeenPointer, TimeStamp, UserId, memory::InMemoryChatClient,
        memory::OutboundCall,
    };
    use quickcheck_macros::quickcheck;
    use tokio::time::sleep;

    use crate::history::row::MessageRow;

    use super::*;

    const THREAD: ThreadId = ThreadId(1);

    fn row(id: i64) -> HistoryRow {
        let message = Message::new(THREAD, MessageId(id), TimeStamp::from_millis(id), UserId(2));
        HistoryRow::Message(MessageRow::new(message, UserId(1)).unwrap())
    }

    fn conversation(unread_count: u32, last_seen: i64) -> Conversation {
        Conversation {
            last_message: Some(LastMessage {
                id: MessageId(100),
                time: TimeStamp::from_millis(100),
            }),
            last_seen: Some(SeenPointer {
                message_id: MessageId(last_seen),
                time: TimeStamp::from_millis(last_seen),
            }),
            unread_count,
            ..Conversation::new(THREAD)
        }
    }

    fn reconciler(
        client: &InMemoryChatClient,
        conversation: Conversation,
    ) -> (SeenReconciler<InMemoryChatClient>, Arc<watch::Sender<Conversation>>) {
        let conversation = Arc::new(watch::Sender::new(conversation));
        let cancel = CancellationToken::new();
        let scroll = ScrollHandle::new(Duration::from_secs(1), cancel.clone());
        let reconciler = SeenReconciler::new(
            client.clone(),
            conversation.clone(),
            scroll,
            Duration::from_millis(500),
            cancel,
        );
        (reconciler, conversation)
    }

    async fn sent_seen(client: &InMemoryChatClient) -> Vec<MessageId> {
        client
            .calls()
            .await
            .into_iter()
            .filter_map(|call| match call {
                OutboundCall::Seen { message_id, .. } => Some(message_id),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn burst_sends_the_highest_id_once() {
        let client = InMemoryChatClient::new(UserId(1));
        let (reconciler, conversation) = reconciler(&client, conversation(20, 80));

        for id in [81, 83, 82, 85] {
            reconciler.on_appear(&row(id));
        }
        // 82 is below the locally counted 83
        assert_eq!(conversation.borrow().unread_count, 17);
        assert!(sent_seen(&client).await.is_empty());

        sleep(Duration::from_millis(600)).await;
        assert_eq!(sent_seen(&client).await, vec![MessageId(85)]);
    }

    #[tokio::test(start_paused = true)]
    async fn seen_and_banner_rows_are_not_counted() {
        let client = InMemoryChatClient::new(UserId(1));
        let (reconciler, conversation) = reconciler(&client, conversation(5, 80));

        assert!(!reconciler.on_appear(&row(80)));
        assert!(!reconciler.on_appear(&row(12)));
        assert!(!reconciler.on_appear(&HistoryRow::UnreadBanner {
            time: TimeStamp::from_millis(80)
        }));
        assert_eq!(conversation.borrow().unread_count, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn foreground_at_bottom_sends_seen_directly() {
        let client = InMemoryChatClient::new(UserId(1));
        client
            .insert_messages([Message::new(
                THREAD,
                MessageId(100),
                TimeStamp::from_millis(100),
                UserId(2),
            )])
            .await;
        let (reconciler, conversation) = reconciler(&client, conversation(3, 97));

        reconciler.on_foreground().await.unwrap();
        assert_eq!(sent_seen(&client).await, vec![MessageId(100)]);
        assert_eq!(conversation.borrow().unread_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn foreground_away_from_bottom_does_nothing() {
        let client = InMemoryChatClient::new(UserId(1));
        let (reconciler, _conversation) = reconciler(&client, conversation(3, 97));
        reconciler.scroll.set_at_bottom(false);

        reconciler.on_foreground().await.unwrap();
        assert!(sent_seen(&client).await.is_empty());
    }

    #[quickcheck]
    fn unread_never_increases_on_appear(unread: u8, ids: Vec<i16>) -> bool {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        runtime.block_on(async {
            let client = InMemoryChatClient::new(UserId(1));
            let (reconciler, conversation) = reconciler(&client, conversation(unread.into(), 0));
            let mut previous = conversation.borrow().unread_count;
            for id in ids {
                reconciler.on_appear(&row(id.into()));
                let current = conversation.borrow().unread_count;
                if current > previous {
                    return false;
                }
                previous = current;
            }
            true
        })
    }
}
