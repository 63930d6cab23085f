// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! View-model layer of the messaging client
//!
//! The central piece is [`history::HistoryViewModel`], which synchronizes the locally loaded
//! window of a conversation's messages with the chat service.

pub mod app_state;
pub mod config;
pub mod history;
pub mod logging;

pub(crate) mod util;

pub use app_state::AppContext;
pub use config::{ConfigError, HistoryConfig};
pub use history::{HistoryState, HistoryUpdate, HistoryViewModel};
