// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use thiserror::Error;

use crate::ThreadId;

pub type ChatResult<T> = Result<T, ChatError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("Not connected to the chat server")]
    NotConnected,
    #[error("Unknown thread {0}")]
    UnknownThread(ThreadId),
    #[error("Transport error: {0}")]
    Transport(String),
}
