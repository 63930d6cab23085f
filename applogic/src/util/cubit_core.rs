// SPDX-FileCopyrightText: 2024 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use tokio::sync::watch;
use tokio_stream::{Stream, wrappers::WatchStream};
use tokio_util::sync::CancellationToken;

pub(crate) trait Cubit {
    type State;

    fn close(&mut self);

    fn is_closed(&self) -> bool;

    fn state(&self) -> Self::State;

    fn stream(&self) -> impl Stream<Item = Self::State> + Send + 'static;
}

/// Holds the state of a view-model and the token cancelling its background tasks
///
/// The state is published through a watch channel; tasks owned by the view-model derive child
/// tokens from [`Self::cancellation_token`] and stop when the core is closed or dropped.
pub(crate) struct CubitCore<S> {
    state_tx: watch::Sender<S>,
    cancel: CancellationToken,
}

impl<S> Drop for CubitCore<S> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl<S> Cubit for CubitCore<S>
where
    S: Clone + Send + Sync + 'static,
{
    type State = S;

    fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn close(&mut self) {
        self.cancel.cancel();
    }

    fn state(&self) -> S {
        self.state_tx.borrow().clone()
    }

    /// Emits every state published after this call
    fn stream(&self) -> impl Stream<Item = S> + Send + 'static {
        WatchStream::from_changes(self.state_tx.subscribe())
    }
}

impl<S> CubitCore<S>
where
    S: Default + Clone + Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        let (state_tx, _) = watch::channel(S::default());
        Self {
            state_tx,
            cancel: CancellationToken::new(),
        }
    }

    pub(crate) fn state_tx(&self) -> &watch::Sender<S> {
        &self.state_tx
    }

    pub(crate) fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }
}
