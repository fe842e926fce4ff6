use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::config::ViewerConfig;
use crate::models::StreamDescriptor;

use super::clock::Clock;
use super::media::{MediaError, MediaHost, ReadyState};
use super::readiness::ReadinessBarrier;
use super::scrub::{Nudge, ScrubController};
use super::sync_driver::{SyncError, VideoSyncDriver};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Input events of one episode view, from the host page and media layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ViewCommand {
    #[serde(rename_all = "camelCase")]
    ReadyStateChanged { stream_id: String, state: ReadyState },
    /// Periodic media-time callback of one stream
    #[serde(rename_all = "camelCase")]
    TimeUpdate { stream_id: String, position: f64 },
    Play,
    Pause,
    TogglePlay,
    Seek { time: f64 },
    DragStart,
    DragMove { time: f64 },
    DragEnd,
    DragCancel,
    Nudge { nudge: Nudge },
    #[serde(rename_all = "camelCase")]
    Hide { stream_id: String },
    #[serde(rename_all = "camelCase")]
    Show { stream_id: String },
    #[serde(rename_all = "camelCase")]
    Enlarge { stream_id: String },
    Minimize,
}

impl ViewCommand {
    /// Operator input, which only takes effect once every stream is ready.
    fn is_user_input(&self) -> bool {
        matches!(
            self,
            ViewCommand::Play
                | ViewCommand::Pause
                | ViewCommand::TogglePlay
                | ViewCommand::Seek { .. }
                | ViewCommand::DragStart
                | ViewCommand::DragMove { .. }
                | ViewCommand::Nudge { .. }
        )
    }

    fn is_play_state_change(&self) -> bool {
        matches!(
            self,
            ViewCommand::Play | ViewCommand::Pause | ViewCommand::TogglePlay
        )
    }
}

/// Events surfaced to the display layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ViewNotice {
    /// Every stream can play through; playback was started.
    Ready,
    CapabilityError { codec: String },
    #[serde(rename_all = "camelCase")]
    PlaybackBlocked { stream_id: String, reason: String },
    StreamError { message: String },
}

/// All playback state of one mounted episode view.
///
/// Synchronous and single-owner: the async view loop feeds it one event at
/// a time, and tests drive it directly.
#[derive(Debug)]
pub struct EpisodeSession {
    clock: Clock,
    barrier: ReadinessBarrier,
    driver: VideoSyncDriver,
    scrub: ScrubController,
    outbox: Vec<ViewNotice>,
}

impl EpisodeSession {
    pub fn mount(
        duration: f64,
        descriptors: &[StreamDescriptor],
        host: &dyn MediaHost,
        config: &ViewerConfig,
    ) -> Self {
        let clock = Clock::new(duration);
        let driver = VideoSyncDriver::mount(descriptors, host, &config.sync);
        let barrier = ReadinessBarrier::new(driver.stream_ids());

        let mut session = Self {
            clock,
            barrier,
            driver,
            scrub: ScrubController::new(&config.scrub),
            outbox: Vec::new(),
        };

        if let Some(MediaError::Unsupported { codec }) = session.driver.capability_error() {
            session.outbox.push(ViewNotice::CapabilityError {
                codec: codec.clone(),
            });
        }

        // Streams buffered before we started listening still count
        for id in session.driver.already_playable() {
            session.credit(&id);
        }

        session.propagate();
        log_info!(
            "episode view mounted: {:.2}s, {} streams",
            session.clock.duration(),
            descriptors.len()
        );
        session
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn driver(&self) -> &VideoSyncDriver {
        &self.driver
    }

    pub fn scrub(&self) -> &ScrubController {
        &self.scrub
    }

    pub fn is_interactive(&self) -> bool {
        self.barrier.is_ready()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scrub.next_deadline()
    }

    pub fn drain_notices(&mut self) -> Vec<ViewNotice> {
        std::mem::take(&mut self.outbox)
    }

    pub fn handle(&mut self, command: ViewCommand, now: Instant) {
        if command.is_user_input() && !self.is_interactive() {
            log_debug!("{command:?} ignored until all streams are ready");
            return;
        }
        if command.is_play_state_change() && self.scrub.is_dragging() {
            log_debug!("{command:?} ignored while dragging");
            return;
        }

        match command {
            ViewCommand::ReadyStateChanged { stream_id, state } => {
                match self.driver.observe_ready(&stream_id, state) {
                    Ok(true) => self.credit(&stream_id),
                    Ok(false) => {}
                    Err(err) => self.report(err),
                }
            }
            ViewCommand::TimeUpdate {
                stream_id,
                position,
            } => {
                let dragging = self.scrub.is_dragging();
                if let Err(err) = self
                    .driver
                    .on_time_update(&stream_id, position, &self.clock, dragging)
                {
                    self.report(err);
                }
            }
            ViewCommand::Play => {
                self.clock.set_playing(true);
            }
            ViewCommand::Pause => {
                self.clock.set_playing(false);
            }
            ViewCommand::TogglePlay => {
                self.clock.toggle_playing();
            }
            ViewCommand::Seek { time } => {
                self.clock.seek(time);
            }
            ViewCommand::DragStart => self.scrub.begin_drag(&self.clock),
            ViewCommand::DragMove { time } => {
                self.scrub.drag_to(time, &self.clock, now);
            }
            ViewCommand::DragEnd => {
                self.scrub.release(&self.clock);
            }
            ViewCommand::DragCancel => {
                self.scrub.cancel(&self.clock);
            }
            ViewCommand::Nudge { nudge } => {
                self.scrub.nudge(nudge, &self.clock);
            }
            ViewCommand::Hide { stream_id } => {
                if let Err(err) = self.driver.hide(&stream_id) {
                    self.report(err);
                }
            }
            ViewCommand::Show { stream_id } => match self.driver.show(&stream_id, self.clock.snapshot()) {
                Ok(blocked) => self.report_blocked(blocked),
                Err(err) => self.report(err),
            },
            ViewCommand::Enlarge { stream_id } => {
                if let Err(err) = self.driver.enlarge(&stream_id) {
                    self.report(err);
                }
            }
            ViewCommand::Minimize => self.driver.minimize(),
        }

        self.propagate();
    }

    /// Apply a debounced drag position whose window has elapsed.
    pub fn flush_scrub(&mut self, now: Instant) {
        if self.scrub.flush_due(&self.clock, now) {
            self.propagate();
        }
    }

    pub fn reconcile(&mut self) {
        self.driver.reconcile(&self.clock, self.scrub.is_dragging());
    }

    /// Push the current clock state to the streams; idempotent.
    pub fn propagate(&mut self) {
        let report = self
            .driver
            .apply_clock(self.clock.snapshot(), self.scrub.is_dragging());
        self.report_blocked(report.blocked);
    }

    /// Resolve any drag and stop the streams before the view goes away.
    pub fn shutdown(&mut self) {
        if self.scrub.cancel(&self.clock).is_some() {
            log_warn!("view torn down mid-drag; drag resolved");
        }
        self.driver.pause_all();
        log_info!("episode view unmounted at {:.2}s", self.clock.current_time());
    }

    fn credit(&mut self, stream_id: &str) {
        if self.barrier.report_playable(stream_id) {
            self.clock.set_playing(true);
            self.outbox.push(ViewNotice::Ready);
        }
    }

    fn report(&mut self, err: SyncError) {
        log_warn!("{err}");
        self.outbox.push(ViewNotice::StreamError {
            message: err.to_string(),
        });
    }

    fn report_blocked(&mut self, blocked: Vec<(String, MediaError)>) {
        self.outbox
            .extend(blocked.into_iter().map(|(stream_id, err)| ViewNotice::PlaybackBlocked {
                stream_id,
                reason: err.to_string(),
            }));
    }
}
