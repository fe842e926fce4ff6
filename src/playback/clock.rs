use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::watch;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// What every reader of the play-head observes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClockTick {
    pub current_time: f64,
    pub is_playing: bool,
}

impl ClockTick {
    /// Whole second of the play-head, as reflected into page locations.
    pub fn whole_second(&self) -> u64 {
        self.current_time.floor() as u64
    }
}

/// The authoritative play-head of one episode view.
///
/// Cloning yields another handle onto the same state. Every mutation is
/// published through a `watch` channel, so all subscribers see it before
/// the next event is processed.
#[derive(Debug, Clone)]
pub struct Clock {
    duration: f64,
    tx: Arc<watch::Sender<ClockTick>>,
    /// Held by the scrub controller for the length of a drag.
    scrub_lock: Arc<AtomicBool>,
}

impl Clock {
    pub fn new(duration: f64) -> Self {
        let duration = if duration.is_finite() && duration >= 0.0 {
            duration
        } else {
            log_warn!("invalid episode duration {duration}; clamping to 0");
            0.0
        };
        let (tx, _rx) = watch::channel(ClockTick::default());

        Self {
            duration,
            tx: Arc::new(tx),
            scrub_lock: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn current_time(&self) -> f64 {
        self.tx.borrow().current_time
    }

    pub fn is_playing(&self) -> bool {
        self.tx.borrow().is_playing
    }

    pub fn snapshot(&self) -> ClockTick {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ClockTick> {
        self.tx.subscribe()
    }

    pub fn is_scrub_locked(&self) -> bool {
        self.scrub_lock.load(Ordering::Acquire)
    }

    /// Jump to `t`, clamped to `[0, duration]`. Returns the resulting position.
    ///
    /// Refused while a drag owns the play-head; the current position is
    /// returned unchanged in that case.
    pub fn seek(&self, t: f64) -> f64 {
        if self.is_scrub_locked() {
            log_debug!("seek to {t} ignored while scrubbing");
            return self.current_time();
        }
        self.write_position(t)
    }

    pub fn set_playing(&self, playing: bool) -> bool {
        self.tx.send_if_modified(|tick| {
            if tick.is_playing == playing {
                return false;
            }
            tick.is_playing = playing;
            true
        })
    }

    pub fn toggle_playing(&self) -> bool {
        let playing = !self.is_playing();
        self.set_playing(playing);
        playing
    }

    /// Move the play-head forward to `t` on behalf of the reference stream.
    ///
    /// Forward only: targets behind the current position are refused, as
    /// are writes while a drag holds the lock.
    pub(crate) fn advance_to(&self, t: f64) -> f64 {
        let now = self.current_time();
        if self.is_scrub_locked() || !t.is_finite() || t < now {
            return now;
        }
        self.write_position(t)
    }

    pub(crate) fn acquire_scrub_lock(&self) {
        self.scrub_lock.store(true, Ordering::Release);
    }

    pub(crate) fn release_scrub_lock(&self) {
        self.scrub_lock.store(false, Ordering::Release);
    }

    /// Write issued by the scrub controller, which holds the lock.
    pub(crate) fn scrub_write(&self, t: f64) -> f64 {
        self.write_position(t)
    }

    fn write_position(&self, t: f64) -> f64 {
        if t.is_nan() {
            return self.current_time();
        }
        let clamped = clamp_time(t, self.duration);
        self.tx.send_if_modified(|tick| {
            if tick.current_time == clamped {
                return false;
            }
            tick.current_time = clamped;
            true
        });
        clamped
    }
}

pub fn clamp_time(t: f64, duration: f64) -> f64 {
    t.clamp(0.0, duration)
}
