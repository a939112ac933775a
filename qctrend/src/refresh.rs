//! Debounce and last-write-wins coordination for repeated refreshes.
//!
//! A user dragging a date slider fires many refresh requests in quick
//! succession. Only the last request inside the debounce window should
//! trigger a recompute, and a recompute that was superseded while in flight
//! must not clobber a newer result. There is no true concurrency here, just
//! sequential replacement of the current dataset: earlier passes are never
//! cancelled, their output is simply discarded on install.

use std::time::{Duration, Instant};

use crate::config::REFRESH_DEBOUNCE_MS;

/// Trailing-edge debouncer: a request only fires once the window has passed
/// with no newer request arriving.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    pending: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Debouncer {
            window,
            pending: None,
        }
    }

    pub fn with_default_window() -> Self {
        Debouncer::new(Duration::from_millis(REFRESH_DEBOUNCE_MS))
    }

    /// Record a refresh request. Any earlier pending request is superseded.
    pub fn request(&mut self, now: Instant) {
        self.pending = Some(now);
    }

    /// True once the latest pending request has aged past the window; the
    /// pending state is consumed.
    pub fn fire_due(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(requested) if now.duration_since(requested) >= self.window => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Generation-stamped holder for the current dataset. Installing with a
/// stale token is a no-op, so the newest recompute always wins regardless of
/// completion order.
#[derive(Debug, Clone, Default)]
pub struct SessionSlot<T> {
    generation: u64,
    installed: Option<(u64, T)>,
}

impl<T> SessionSlot<T> {
    pub fn new() -> Self {
        SessionSlot {
            generation: 0,
            installed: None,
        }
    }

    /// Start a recompute; the returned token identifies it at install time.
    pub fn begin(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Install a finished result. Returns false (and drops the value) when a
    /// newer recompute has already begun or installed.
    pub fn install(&mut self, token: u64, value: T) -> bool {
        if self
            .installed
            .as_ref()
            .is_some_and(|(current, _)| *current > token)
        {
            return false;
        }
        self.installed = Some((token, value));
        true
    }

    pub fn current(&self) -> Option<&T> {
        self.installed.as_ref().map(|(_, value)| value)
    }
}
