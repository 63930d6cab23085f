// SPDX-FileCopyrightText: 2024 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Scroll state observed from the UI and the pagination triggers derived from it

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use parking_lot::Mutex;
use tokio::{sync::watch, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::util::{Debouncer, spawn_from_sync};

use super::update::Direction;

/// Distance to the bottom edge below which the list counts as scrolled to the bottom
const AT_BOTTOM_TOLERANCE: f64 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollState {
    pub scrolling_up: bool,
    /// The list is moved by the view-model, not by the user
    pub programmatic: bool,
    pub at_bottom: bool,
    pub ended_decelerating: bool,
}

impl Default for ScrollState {
    fn default() -> Self {
        Self {
            scrolling_up: false,
            programmatic: false,
            at_bottom: true,
            ended_decelerating: true,
        }
    }
}

/// Geometry of the list as reported by the UI, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContentOffset {
    /// Offset of the viewport's top edge from the top of the content
    pub y: f64,
    pub content_height: f64,
    pub viewport_height: f64,
}

impl ContentOffset {
    pub fn distance_to_top(&self) -> f64 {
        self.y.max(0.0)
    }

    pub fn distance_to_bottom(&self) -> f64 {
        (self.content_height - self.viewport_height - self.y).max(0.0)
    }
}

/// Shared view of the scroll state
///
/// Written by the UI side, read by the history task.
#[derive(Debug, Clone)]
pub(crate) struct ScrollHandle {
    state: Arc<watch::Sender<ScrollState>>,
    /// Incremented on every programmatic scroll; only the latest one may end the suppression.
    generation: Arc<AtomicU64>,
    suppression: Duration,
    cancel: CancellationToken,
}

impl ScrollHandle {
    pub(crate) fn new(suppression: Duration, cancel: CancellationToken) -> Self {
        Self {
            state: Arc::new(watch::Sender::new(ScrollState::default())),
            generation: Default::default(),
            suppression,
            cancel,
        }
    }

    pub(crate) fn state(&self) -> ScrollState {
        *self.state.borrow()
    }

    /// Suppresses pagination triggers while the list is scrolled programmatically
    pub(crate) fn disable_excessive_loading(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_if_modified(|state| !std::mem::replace(&mut state.programmatic, true));

        let handle = self.clone();
        spawn_from_sync(async move {
            tokio::select! {
                _ = handle.cancel.cancelled() => {}
                _ = sleep(handle.suppression) => {
                    if handle.generation.load(Ordering::SeqCst) == generation {
                        handle.set_programmatic(false);
                    }
                }
            }
        });
    }

    fn set_programmatic(&self, programmatic: bool) {
        self.state.send_if_modified(|state| {
            std::mem::replace(&mut state.programmatic, programmatic) != programmatic
        });
    }

    /// Waits until the list stopped its inertial scrolling
    ///
    /// Returns `false` if the view was closed while waiting.
    pub(crate) async fn waiting_to_finish_decelerating(&self, cancel: &CancellationToken) -> bool {
        let mut rx = self.state.subscribe();
        tokio::select! {
            _ = cancel.cancelled() => false,
            res = rx.wait_for(|state| state.ended_decelerating) => res.is_ok(),
        }
    }

    pub(crate) fn set_at_bottom(&self, at_bottom: bool) -> bool {
        self.state
            .send_if_modified(|state| std::mem::replace(&mut state.at_bottom, at_bottom) != at_bottom)
    }

    fn set_scrolling_up(&self, scrolling_up: bool) {
        self.state.send_if_modified(|state| {
            std::mem::replace(&mut state.scrolling_up, scrolling_up) != scrolling_up
        });
    }

    fn set_ended_decelerating(&self, ended: bool) {
        self.state.send_if_modified(|state| {
            std::mem::replace(&mut state.ended_decelerating, ended) != ended
        });
    }
}

/// Turns content offset callbacks into pagination triggers
///
/// Offsets are debounced so that a burst of per-frame callbacks yields a single decision once the
/// list settles.
pub(crate) struct ScrollCoordinator {
    handle: ScrollHandle,
    last_offset: Mutex<Option<f64>>,
    offsets: Debouncer<ContentOffset>,
    on_reached_bottom: Box<dyn Fn() + Send + Sync>,
}

impl ScrollCoordinator {
    pub(crate) fn new(
        handle: ScrollHandle,
        threshold: f64,
        debounce: Duration,
        cancel: CancellationToken,
        load_more: impl Fn(Direction) + Send + Sync + 'static,
        on_reached_bottom: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        let settle_handle = handle.clone();
        let offsets = Debouncer::spawn(
            debounce,
            cancel,
            |_older, newer| newer,
            move |offset: ContentOffset| {
                if let Some(direction) = pagination_trigger(settle_handle.state(), offset, threshold)
                {
                    debug!(?direction, y = offset.y, "Pagination triggered by scrolling");
                    load_more(direction);
                }
                async {}
            },
        );
        Self {
            handle,
            last_offset: Mutex::new(None),
            offsets,
            on_reached_bottom: Box::new(on_reached_bottom),
        }
    }

    pub(crate) fn handle(&self) -> &ScrollHandle {
        &self.handle
    }

    pub(crate) fn did_scroll(&self, offset: ContentOffset) {
        {
            let mut last = self.last_offset.lock();
            match *last {
                Some(previous) if previous != offset.y => {
                    self.handle.set_scrolling_up(offset.y < previous)
                }
                _ => {}
            }
            *last = Some(offset.y);
        }
        let at_bottom = offset.distance_to_bottom() <= AT_BOTTOM_TOLERANCE;
        if self.handle.set_at_bottom(at_bottom) && at_bottom {
            (self.on_reached_bottom)();
        }
        self.offsets.push(offset);
    }

    /// The user took over; a pending programmatic scroll no longer suppresses pagination.
    pub(crate) fn will_begin_dragging(&self) {
        self.handle.generation.fetch_add(1, Ordering::SeqCst);
        self.handle.set_programmatic(false);
        self.handle.set_ended_decelerating(true);
    }

    pub(crate) fn did_end_dragging(&self, will_decelerate: bool) {
        self.handle.set_ended_decelerating(!will_decelerate);
    }

    pub(crate) fn did_end_decelerating(&self) {
        self.handle.set_ended_decelerating(true);
    }
}

fn pagination_trigger(state: ScrollState, offset: ContentOffset, threshold: f64) -> Option<Direction> {
    if state.programmatic {
        return None;
    }
    if state.scrolling_up && offset.distance_to_top() <= threshold {
        Some(Direction::Top)
    } else if !state.scrolling_up && offset.distance_to_bottom() <= threshold {
        Some(Direction::Bottom)
    } else {
        None
    }
}
