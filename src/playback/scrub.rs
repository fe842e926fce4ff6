use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

use crate::config::ScrubConfig;

use super::clock::{clamp_time, Clock};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrubState {
    Idle,
    Dragging {
        was_playing: bool,
        draft: f64,
        /// Trailing debounce deadline for the pending draft, if any.
        flush_at: Option<Instant>,
    },
}

/// Keyboard/button seeks that bypass dragging.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Nudge {
    Backward,
    Forward,
    Rewind,
}

/// How a drag ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrubRelease {
    pub committed: f64,
    pub resumed: bool,
}

/// Owns the play-head for the length of a seek-bar drag.
///
/// While dragging, pointer positions go into a draft; the clock only sees
/// the draft once it has been stable for the debounce window, and the
/// release always commits the last draft and restores the prior play state.
#[derive(Debug)]
pub struct ScrubController {
    state: ScrubState,
    debounce: Duration,
    nudge_secs: f64,
}

impl ScrubController {
    pub fn new(config: &ScrubConfig) -> Self {
        Self {
            state: ScrubState::Idle,
            debounce: config.debounce(),
            nudge_secs: config.nudge_secs,
        }
    }

    pub fn state(&self) -> ScrubState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, ScrubState::Dragging { .. })
    }

    /// Position the seek bar should show: the draft while dragging.
    pub fn display_position(&self, clock: &Clock) -> f64 {
        match self.state {
            ScrubState::Dragging { draft, .. } => draft,
            ScrubState::Idle => clock.current_time(),
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            ScrubState::Dragging { flush_at, .. } => flush_at,
            ScrubState::Idle => None,
        }
    }

    /// Pointer or touch down on the seek control.
    pub fn begin_drag(&mut self, clock: &Clock) {
        if self.is_dragging() {
            log_debug!("drag already in progress");
            return;
        }
        let was_playing = clock.is_playing();
        clock.set_playing(false);
        clock.acquire_scrub_lock();
        self.state = ScrubState::Dragging {
            was_playing,
            draft: clock.current_time(),
            flush_at: None,
        };
        log_debug!("drag started at {:.3}s (was_playing={was_playing})", clock.current_time());
    }

    /// Pointer moved to `t`; (re)arms the debounce. Returns the new deadline.
    pub fn drag_to(&mut self, t: f64, clock: &Clock, now: Instant) -> Option<Instant> {
        let debounce = self.debounce;
        match &mut self.state {
            ScrubState::Dragging { draft, flush_at, .. } => {
                if !t.is_nan() {
                    *draft = clamp_time(t, clock.duration());
                }
                *flush_at = Some(now + debounce);
                *flush_at
            }
            ScrubState::Idle => {
                log_debug!("drag movement to {t} without an active drag");
                None
            }
        }
    }

    /// Apply the pending draft if its debounce window has elapsed.
    pub fn flush_due(&mut self, clock: &Clock, now: Instant) -> bool {
        let ScrubState::Dragging { draft, flush_at, .. } = &mut self.state else {
            return false;
        };
        match *flush_at {
            Some(at) if at <= now => {
                *flush_at = None;
                clock.scrub_write(*draft);
                true
            }
            _ => false,
        }
    }

    /// Pointer or touch up: commit the draft and restore play state.
    ///
    /// Any pending debounced write is superseded by this commit.
    pub fn release(&mut self, clock: &Clock) -> Option<ScrubRelease> {
        let ScrubState::Dragging {
            was_playing, draft, ..
        } = self.state
        else {
            return None;
        };

        self.state = ScrubState::Idle;
        let committed = clock.scrub_write(draft);
        clock.release_scrub_lock();
        if was_playing {
            clock.set_playing(true);
        }
        log_debug!("drag released at {committed:.3}s (resumed={was_playing})");

        Some(ScrubRelease {
            committed,
            resumed: was_playing,
        })
    }

    /// Pointer tracking lost or the view is going away.
    ///
    /// Resolves exactly like a release so no drag outlives its control.
    pub fn cancel(&mut self, clock: &Clock) -> Option<ScrubRelease> {
        let released = self.release(clock);
        if released.is_some() {
            log_info!("drag cancelled; play-head settled");
        }
        released
    }

    /// Jump backward/forward by the configured step, or rewind to zero.
    pub fn nudge(&self, nudge: Nudge, clock: &Clock) -> Option<f64> {
        if self.is_dragging() {
            log_debug!("{nudge:?} ignored while dragging");
            return None;
        }
        let now = clock.current_time();
        let target = match nudge {
            Nudge::Backward => (now - self.nudge_secs).max(0.0),
            Nudge::Forward => (now + self.nudge_secs).min(clock.duration()),
            Nudge::Rewind => 0.0,
        };
        Some(clock.seek(target))
    }
}
