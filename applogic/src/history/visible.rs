// SPDX-FileCopyrightText: 2024 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::time::Duration;

use tokio::{
    sync::mpsc,
    time::{Instant, sleep},
};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::util::spawn_from_sync;

use super::row::RowKey;

#[derive(Debug)]
enum VisibleChange {
    Appeared(RowKey),
    Disappeared(RowKey),
}

/// Tracks which rows are on screen
///
/// The visible set lives in its own task. Appearing rows restart the settle timer, disappearing
/// rows are removed immediately without touching it. Once the timer fires the current set is
/// reported as stable.
pub(crate) struct VisibleTracker {
    tx: mpsc::UnboundedSender<VisibleChange>,
}

impl VisibleTracker {
    pub(crate) fn spawn(
        delay: Duration,
        cancel: CancellationToken,
        on_settled: impl Fn(Vec<RowKey>) + Send + 'static,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        spawn_from_sync(visible_loop(rx, delay, cancel, on_settled));
        Self { tx }
    }

    pub(crate) fn append(&self, key: RowKey) {
        let _no_receiver = self.tx.send(VisibleChange::Appeared(key));
    }

    pub(crate) fn remove(&self, key: RowKey) {
        let _no_receiver = self.tx.send(VisibleChange::Disappeared(key));
    }
}

async fn visible_loop(
    mut rx: mpsc::UnboundedReceiver<VisibleChange>,
    delay: Duration,
    cancel: CancellationToken,
    on_settled: impl Fn(Vec<RowKey>),
) {
    let mut visible: Vec<RowKey> = Vec::new();
    let timer = sleep(delay);
    tokio::pin!(timer);
    let mut armed = false;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            change = rx.recv() => match change {
                Some(VisibleChange::Appeared(key)) => {
                    if !visible.contains(&key) {
                        visible.push(key);
                    }
                    timer.as_mut().reset(Instant::now() + delay);
                    armed = true;
                }
                Some(VisibleChange::Disappeared(key)) => visible.retain(|visible| *visible != key),
                None => return,
            },
            _ = &mut timer, if armed => {
                armed = false;
                trace!(count = visible.len(), "Visible rows settled");
                if !visible.is_empty() {
                    on_settled(visible.clone());
                }
            }
        }
    }
}
