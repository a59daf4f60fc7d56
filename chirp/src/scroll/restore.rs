//! Scroll position restoration after navigating back to a feed.
//!
//! The saved offset usually can't be applied at once: the cached page is
//! still being laid out and the scrollable height is short. [`ScrollRestore`]
//! re-applies the target, clamped to what is reachable, until it sticks, the
//! user scrolls, or the deadline passes.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tracing::{debug, info};

use crate::session::FeedScrollCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreState {
    Idle,
    Restoring {
        target: u32,
        deadline: Instant,
        attempts: u32,
    },
    /// The target was reached or the user took over.
    Confirmed,
    /// The deadline passed before the target became reachable.
    Abandoned,
}

#[derive(Debug, Clone)]
pub struct ScrollRestore {
    state: RestoreState,
    deadline_after: Duration,
}

impl ScrollRestore {
    pub fn new(deadline_after: Duration) -> Self {
        Self {
            state: RestoreState::Idle,
            deadline_after,
        }
    }

    pub fn state(&self) -> RestoreState {
        self.state
    }

    pub fn is_restoring(&self) -> bool {
        matches!(self.state, RestoreState::Restoring { .. })
    }

    /// Start (or restart) restoring towards `target`.
    pub fn begin(&mut self, target: u32, now: Instant) {
        self.state = RestoreState::Restoring {
            target,
            deadline: now + self.deadline_after,
            attempts: 0,
        };
    }

    /// Next offset to apply, clamped to `max_scroll`. `None` unless restoring.
    pub fn attempt(&mut self, max_scroll: u32) -> Option<u32> {
        match &mut self.state {
            RestoreState::Restoring {
                target, attempts, ..
            } => {
                *attempts += 1;
                Some((*target).min(max_scroll))
            }
            _ => None,
        }
    }

    /// Report the offset the surface actually ended up at.
    pub fn record_applied(&mut self, actual: u32, now: Instant) -> RestoreState {
        if let RestoreState::Restoring {
            target, attempts, ..
        } = self.state
        {
            if actual == target {
                debug!(target, attempts, "scroll restored");
                self.state = RestoreState::Confirmed;
            } else {
                self.poll_deadline(now);
            }
        }
        self.state
    }

    /// Only trusted (user-initiated) scrolls end restoration; our own
    /// programmatic scrolls are ignored.
    pub fn user_scrolled(&mut self, trusted: bool) -> RestoreState {
        if trusted && self.is_restoring() {
            debug!("user scrolled, restore cancelled");
            self.state = RestoreState::Confirmed;
        }
        self.state
    }

    pub fn poll_deadline(&mut self, now: Instant) -> RestoreState {
        if let RestoreState::Restoring {
            target,
            deadline,
            attempts,
        } = self.state
        {
            if now >= deadline {
                info!(target, attempts, "scroll restore abandoned at deadline");
                self.state = RestoreState::Abandoned;
            }
        }
        self.state
    }

    /// Drop back to idle without an outcome (the view went away).
    pub fn cancel(&mut self) {
        self.state = RestoreState::Idle;
    }
}

/// A scrollable surface the restore loop can drive.
pub trait ScrollSurface {
    /// Largest reachable offset (content height minus viewport height).
    fn max_scroll(&self) -> u32;
    fn scroll_to(&mut self, offset: u32);
    fn offset(&self) -> u32;
}

/// Run `machine` to completion against `surface`, one attempt per
/// `interval`. Each message on `user_scrolls` is a scroll event and its
/// trusted flag. The feed's restore keys are cleared once a terminal state
/// is reached.
pub async fn drive_restore<S: ScrollSurface>(
    machine: &mut ScrollRestore,
    surface: &mut S,
    user_scrolls: &mut mpsc::UnboundedReceiver<bool>,
    cache: &FeedScrollCache,
    interval: Duration,
) -> RestoreState {
    let mut scrolls_open = true;

    while machine.is_restoring() {
        if let Some(offset) = machine.attempt(surface.max_scroll()) {
            surface.scroll_to(offset);
            machine.record_applied(surface.offset(), Instant::now());
        }
        if !machine.is_restoring() {
            break;
        }

        tokio::select! {
            _ = time::sleep(interval) => {
                machine.poll_deadline(Instant::now());
            }
            event = user_scrolls.recv(), if scrolls_open => match event {
                Some(trusted) => {
                    machine.user_scrolled(trusted);
                }
                None => scrolls_open = false,
            },
        }
    }

    let state = machine.state();
    if matches!(state, RestoreState::Confirmed | RestoreState::Abandoned) {
        cache.finish_restore();
    }
    state
}
