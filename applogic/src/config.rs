// SPDX-FileCopyrightText: 2024 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tuning constants of the history view-model

use std::{io, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Configuration of the history synchronization
///
/// Missing fields take their default value, so an empty JSON object is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Number of messages requested per history page
    pub page_size: usize,
    /// Distance in pixels to either edge of the list at which the next page is requested
    pub edge_threshold: f64,
    pub visible_debounce_ms: u64,
    pub seen_debounce_ms: u64,
    pub offset_debounce_ms: u64,
    /// How long pagination triggers are suppressed after a programmatic scroll
    pub programmatic_scroll_ms: u64,
    pub delete_batch_window_ms: u64,
    pub forward_batch_window_ms: u64,
    /// Maximum number of items per batch of delete or forward events
    pub batch_capacity: usize,
    /// After this time an unanswered request is given up and its loading state reset
    pub request_watchdog_ms: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            page_size: 25,
            edge_threshold: 800.0,
            visible_debounce_ms: 500,
            seen_debounce_ms: 500,
            offset_debounce_ms: 500,
            programmatic_scroll_ms: 1000,
            delete_batch_window_ms: 1000,
            forward_batch_window_ms: 300,
            batch_capacity: 50,
            request_watchdog_ms: 20_000,
        }
    }
}

impl HistoryConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn visible_debounce(&self) -> Duration {
        Duration::from_millis(self.visible_debounce_ms)
    }

    pub fn seen_debounce(&self) -> Duration {
        Duration::from_millis(self.seen_debounce_ms)
    }

    pub fn offset_debounce(&self) -> Duration {
        Duration::from_millis(self.offset_debounce_ms)
    }

    pub fn programmatic_scroll(&self) -> Duration {
        Duration::from_millis(self.programmatic_scroll_ms)
    }

    pub fn delete_batch_window(&self) -> Duration {
        Duration::from_millis(self.delete_batch_window_ms)
    }

    pub fn forward_batch_window(&self) -> Duration {
        Duration::from_millis(self.forward_batch_window_ms)
    }

    pub fn request_watchdog(&self) -> Duration {
        Duration::from_millis(self.request_watchdog_ms)
    }
}
