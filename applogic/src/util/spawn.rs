// SPDX-FileCopyrightText: 2024 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::future::Future;

use tokio::{runtime::Handle, task::JoinHandle};

/// Spawn a future from a synchronous function.
///
/// Must be called from within a tokio runtime. View-models are constructed synchronously by the UI
/// layer, but their background tasks run on the runtime the UI layer drives.
#[track_caller]
pub(crate) fn spawn_from_sync<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    Handle::current().spawn(future)
}
