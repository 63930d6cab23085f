// SPDX-FileCopyrightText: 2024 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{future::Future, time::Duration};

use tokio::{sync::mpsc, time::sleep};
use tokio_util::sync::CancellationToken;

use super::spawn_from_sync;

/// Trailing debouncer
///
/// Values pushed in quick succession are folded with `merge`; the folded value is handed to the
/// settle handler once no new value arrived for `delay`. The background task stops when the
/// token is cancelled or the debouncer is dropped; a value pending at drop time is still
/// delivered.
pub(crate) struct Debouncer<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub(crate) fn spawn<M, F, Fut>(
        delay: Duration,
        cancel: CancellationToken,
        merge: M,
        on_settled: F,
    ) -> Self
    where
        M: Fn(T, T) -> T + Send + 'static,
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        spawn_from_sync(debounce_loop(rx, delay, cancel, merge, on_settled));
        Self { tx }
    }

    pub(crate) fn push(&self, value: T) {
        let _no_receiver = self.tx.send(value);
    }
}

async fn debounce_loop<T, M, F, Fut>(
    mut rx: mpsc::UnboundedReceiver<T>,
    delay: Duration,
    cancel: CancellationToken,
    merge: M,
    mut on_settled: F,
) where
    M: Fn(T, T) -> T,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = ()>,
{
    loop {
        let mut pending = tokio::select! {
            _ = cancel.cancelled() => return,
            value = rx.recv() => match value {
                Some(value) => value,
                None => return,
            },
        };
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                value = rx.recv() => match value {
                    Some(value) => pending = merge(pending, value),
                    None => {
                        on_settled(pending).await;
                        return;
                    }
                },
                _ = sleep(delay) => {
                    on_settled(pending).await;
                    break;
                }
            }
        }
    }
}
