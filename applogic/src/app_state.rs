// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::sync::Arc;

use chatcoreclient::{ChatClient, UserId};

use crate::config::HistoryConfig;

/// Application context shared by the view-models
///
/// Holds the chat client and the configuration. Contains only ephemeral data and is passed
/// explicitly to every view-model that needs it.
#[derive(Clone)]
pub struct AppContext<C> {
    client: C,
    config: Arc<HistoryConfig>,
}

impl<C: ChatClient> AppContext<C> {
    pub fn new(client: C, config: HistoryConfig) -> Self {
        Self {
            client,
            config: Arc::new(config),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// The local user
    pub fn user_id(&self) -> UserId {
        self.client.user_id()
    }
}
