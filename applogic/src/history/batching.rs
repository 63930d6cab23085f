// SPDX-FileCopyrightText: 2024 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{collections::HashMap, pin::pin, sync::Arc, time::Duration};

use chatcoreclient::ThreadId;
use tokio::sync::mpsc;
use tokio_stream::{StreamExt, wrappers::UnboundedReceiverStream};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::util::spawn_from_sync;

/// Coalesces bursts of push events per conversation
///
/// Items of one conversation are collected until either `capacity` items arrived or `window`
/// elapsed since the first item of the batch; the batch is then handed to the flush handler.
/// Each conversation has its own single-consumer pipeline, so batches of one conversation are
/// flushed in submission order.
pub(crate) struct BatchQueue<T> {
    name: &'static str,
    capacity: usize,
    window: Duration,
    flush: FlushFn<T>,
    cancel: CancellationToken,
    pipelines: HashMap<ThreadId, mpsc::UnboundedSender<T>>,
}

type FlushFn<T> = Arc<dyn Fn(ThreadId, Vec<T>) + Send + Sync>;

impl<T: Send + 'static> BatchQueue<T> {
    pub(crate) fn new(
        name: &'static str,
        capacity: usize,
        window: Duration,
        cancel: CancellationToken,
        flush: impl Fn(ThreadId, Vec<T>) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            capacity: capacity.max(1),
            window,
            flush: Arc::new(flush),
            cancel,
            pipelines: HashMap::new(),
        }
    }

    pub(crate) fn push(&mut self, thread_id: ThreadId, item: T) {
        let tx = self
            .pipelines
            .entry(thread_id)
            .or_insert_with(|| {
                let (tx, rx) = mpsc::unbounded_channel();
                spawn_from_sync(batch_loop(
                    self.name,
                    thread_id,
                    rx,
                    self.capacity,
                    self.window,
                    self.flush.clone(),
                    self.cancel.child_token(),
                ));
                tx
            });
        let _no_receiver = tx.send(item);
    }
}

async fn batch_loop<T>(
    name: &'static str,
    thread_id: ThreadId,
    rx: mpsc::UnboundedReceiver<T>,
    capacity: usize,
    window: Duration,
    flush: FlushFn<T>,
    cancel: CancellationToken,
) {
    let mut batches = pin!(UnboundedReceiverStream::new(rx).chunks_timeout(capacity, window));
    loop {
        let batch = tokio::select! {
            _ = cancel.cancelled() => return,
            batch = batches.next() => batch,
        };
        let Some(batch) = batch else { return };
        debug!(name, %thread_id, len = batch.len(), "Flushing batch");
        flush(thread_id, batch);
    }
}
