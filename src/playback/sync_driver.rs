use thiserror::Error;

use crate::config::SyncConfig;
use crate::models::StreamDescriptor;

use super::clock::{Clock, ClockTick};
use super::media::{Focus, MediaError, MediaHost, ReadyState, StreamHandle, Visibility};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("unknown stream {id}")]
    UnknownStream { id: String },

    #[error("stream {id} is hidden")]
    StreamHidden { id: String },
}

/// What the driver did in response to a clock change.
#[derive(Debug, Default, PartialEq)]
pub struct SyncReport {
    pub corrective_seeks: usize,
    /// Streams whose native playback refused to start.
    pub blocked: Vec<(String, MediaError)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeUpdateOutcome {
    /// Paused, scrubbing or hidden: the report carries no authority.
    Ignored,
    /// Nothing to do: a stream within tolerance, or the reference trailing
    /// the play-head by no more than the tolerance.
    InSync,
    /// The reference stream moved the play-head to this position.
    Advanced(f64),
    /// The stream drifted and was snapped back to the play-head.
    Corrected,
}

/// Drift beyond which a stream is forcibly re-seeked to the play-head.
pub fn needs_correction(stream_position: f64, clock_position: f64, tolerance: f64) -> bool {
    (stream_position - clock_position).abs() > tolerance
}

/// Keeps every visible stream aligned with the [`Clock`].
///
/// The first visible stream is the reference: during playback the play-head
/// follows it forward, however far a single report moves. It never follows
/// it backwards; a reference trailing by more than the tolerance is re-seeked
/// like any other stream. Every other stream drifting past the tolerance is
/// re-seeked to the play-head.
#[derive(Debug)]
pub struct VideoSyncDriver {
    streams: Vec<StreamHandle>,
    tolerance: f64,
    /// Play-head position last pushed to the streams.
    applied_time: Option<f64>,
    applied_playing: Option<bool>,
    capability_error: Option<MediaError>,
}

impl VideoSyncDriver {
    /// Create one element per descriptor and run the codec capability check.
    pub fn mount(descriptors: &[StreamDescriptor], host: &dyn MediaHost, config: &SyncConfig) -> Self {
        let capability_error = if descriptors.is_empty() || host.can_play_type(&config.expected_codec) {
            None
        } else {
            log_warn!(
                "host cannot decode {}; streams will play in degraded form",
                config.expected_codec
            );
            Some(MediaError::Unsupported {
                codec: config.expected_codec.clone(),
            })
        };

        let streams = descriptors
            .iter()
            .map(|d| StreamHandle::new(d.clone(), host.create_element(d)))
            .collect();

        Self {
            streams,
            tolerance: config.drift_tolerance_secs,
            applied_time: None,
            applied_playing: None,
            capability_error,
        }
    }

    pub fn capability_error(&self) -> Option<&MediaError> {
        self.capability_error.as_ref()
    }

    pub fn stream_ids(&self) -> Vec<String> {
        self.streams.iter().map(|s| s.id().to_string()).collect()
    }

    /// Streams that were already buffered when mounted.
    pub fn already_playable(&self) -> Vec<String> {
        self.streams
            .iter()
            .filter(|s| s.ready_state() == ReadyState::Playable)
            .map(|s| s.id().to_string())
            .collect()
    }

    pub fn stream(&self, id: &str) -> Option<&StreamHandle> {
        self.streams.iter().find(|s| s.id() == id)
    }

    pub fn visible_count(&self) -> usize {
        self.streams.iter().filter(|s| s.is_visible()).count()
    }

    pub fn hidden_ids(&self) -> Vec<String> {
        self.streams
            .iter()
            .filter(|s| !s.is_visible())
            .map(|s| s.id().to_string())
            .collect()
    }

    pub fn reference_id(&self) -> Option<&str> {
        self.reference().map(|s| s.id())
    }

    fn reference(&self) -> Option<&StreamHandle> {
        self.streams.iter().find(|s| s.is_visible())
    }

    pub fn enlarged(&self) -> Option<&str> {
        self.streams
            .iter()
            .find(|s| s.focus == Focus::Enlarged)
            .map(|s| s.id())
    }

    /// Record buffering progress. `Ok(true)` on the first transition to playable.
    pub fn observe_ready(&mut self, id: &str, state: ReadyState) -> Result<bool, SyncError> {
        let stream = self.find_mut(id)?;
        Ok(stream.observe_ready(state))
    }

    /// Push the clock's state to the streams.
    ///
    /// Play/pause changes always propagate. Position changes propagate as
    /// corrective seeks unless a drag owns the play-head.
    pub fn apply_clock(&mut self, tick: ClockTick, scrubbing: bool) -> SyncReport {
        let mut report = SyncReport::default();

        // A position written during a drag stays unapplied until the drag ends
        if !scrubbing && self.applied_time != Some(tick.current_time) {
            self.applied_time = Some(tick.current_time);
            report.corrective_seeks = self.correct_drift(tick.current_time);
        }
        if self.applied_playing != Some(tick.is_playing) {
            self.applied_playing = Some(tick.is_playing);
            report.blocked = self.set_streams_playing(tick.is_playing);
        }
        report
    }

    /// Periodic drift check while playing.
    ///
    /// Catches the play-head up with the reference stream first, so natural
    /// playback is never mistaken for drift. Returns the corrective seeks.
    pub fn reconcile(&mut self, clock: &Clock, scrubbing: bool) -> usize {
        if scrubbing || !clock.is_playing() {
            return 0;
        }
        if let Some(position) = self.reference().map(|s| s.position()) {
            clock.advance_to(position);
        }
        self.correct_drift(clock.current_time())
    }

    /// Handle a native media-time report from one stream.
    pub fn on_time_update(
        &mut self,
        id: &str,
        position: f64,
        clock: &Clock,
        scrubbing: bool,
    ) -> Result<TimeUpdateOutcome, SyncError> {
        let is_reference = self.reference_id() == Some(id);
        let tolerance = self.tolerance;
        let stream = self.find_mut(id)?;

        if !stream.is_visible() || scrubbing || !clock.is_playing() || !position.is_finite() {
            return Ok(TimeUpdateOutcome::Ignored);
        }

        let now = clock.current_time();
        if is_reference && position >= now {
            return Ok(TimeUpdateOutcome::Advanced(clock.advance_to(position)));
        }

        if needs_correction(position, now, tolerance) {
            log_debug!("stream {id} drifted to {position:.3}s vs {now:.3}s; re-seeking");
            stream.seek(now);
            return Ok(TimeUpdateOutcome::Corrected);
        }

        Ok(TimeUpdateOutcome::InSync)
    }

    /// Drop a stream from the sync set.
    pub fn hide(&mut self, id: &str) -> Result<(), SyncError> {
        let stream = self.find_mut(id)?;
        if !stream.is_visible() {
            return Ok(());
        }
        stream.visibility = Visibility::Hidden;
        if stream.focus == Focus::Enlarged {
            stream.focus = Focus::Normal;
            log_debug!("minimized {id} because it was hidden");
        }
        stream.pause();
        log_info!("stream {id} hidden");
        Ok(())
    }

    /// Return a hidden stream to the sync set, snapped to the play-head.
    pub fn show(&mut self, id: &str, tick: ClockTick) -> Result<Vec<(String, MediaError)>, SyncError> {
        let stream = self.find_mut(id)?;
        if stream.is_visible() {
            return Ok(Vec::new());
        }
        stream.visibility = Visibility::Visible;
        stream.seek(tick.current_time);

        let mut blocked = Vec::new();
        if tick.is_playing {
            if let Err(err) = stream.play() {
                log_warn!("stream {id} failed to resume: {err}");
                blocked.push((id.to_string(), err));
            }
        }
        log_info!("stream {id} shown at {:.3}s", tick.current_time);
        Ok(blocked)
    }

    pub fn enlarge(&mut self, id: &str) -> Result<(), SyncError> {
        let stream = self.find_mut(id)?;
        if !stream.is_visible() {
            return Err(SyncError::StreamHidden { id: id.to_string() });
        }
        for stream in &mut self.streams {
            stream.focus = if stream.id() == id {
                Focus::Enlarged
            } else {
                Focus::Normal
            };
        }
        Ok(())
    }

    pub fn minimize(&mut self) {
        for stream in &mut self.streams {
            stream.focus = Focus::Normal;
        }
    }

    /// Stop every element, used when the view is torn down.
    pub fn pause_all(&mut self) {
        for stream in &mut self.streams {
            stream.pause();
        }
    }

    fn correct_drift(&mut self, target: f64) -> usize {
        let tolerance = self.tolerance;
        let mut seeks = 0;
        for stream in self.streams.iter_mut().filter(|s| s.is_visible()) {
            if needs_correction(stream.position(), target, tolerance) {
                stream.seek(target);
                seeks += 1;
            }
        }
        if seeks > 0 {
            log_debug!("re-seeked {seeks} streams to {target:.3}s");
        }
        seeks
    }

    fn set_streams_playing(&mut self, playing: bool) -> Vec<(String, MediaError)> {
        let mut blocked = Vec::new();
        for stream in self.streams.iter_mut().filter(|s| s.is_visible()) {
            if !playing {
                stream.pause();
                continue;
            }
            if let Err(err) = stream.play() {
                log_warn!("error playing stream {}: {err}", stream.id());
                blocked.push((stream.id().to_string(), err));
            }
        }
        blocked
    }

    fn find_mut(&mut self, id: &str) -> Result<&mut StreamHandle, SyncError> {
        self.streams
            .iter_mut()
            .find(|s| s.id() == id)
            .ok_or_else(|| SyncError::UnknownStream { id: id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::media::fake::FakeHost;

    fn descriptors(ids: &[&str]) -> Vec<StreamDescriptor> {
        ids.iter()
            .map(|id| StreamDescriptor::new(*id, format!("https://videos.test/{id}.mp4")))
            .collect()
    }

    fn mounted(ids: &[&str]) -> (VideoSyncDriver, FakeHost, Clock) {
        let host = FakeHost::new();
        let driver = VideoSyncDriver::mount(&descriptors(ids), &host, &SyncConfig::default());
        (driver, host, Clock::new(60.0))
    }

    #[test]
    fn tolerance_boundary_is_strict() {
        assert!(!needs_correction(10.2, 10.0, 0.2 + 1e-9));
        assert!(!needs_correction(10.15, 10.0, 0.2));
        assert!(!needs_correction(9.85, 10.0, 0.2));
        assert!(needs_correction(10.21, 10.0, 0.2));
        assert!(needs_correction(9.79, 10.0, 0.2));
        assert!(!needs_correction(0.2, 0.0, 0.2));
        assert!(needs_correction(0.2000001, 0.0, 0.2));
    }

    #[test]
    fn time_update_corrects_only_beyond_tolerance() {
        let (mut driver, host, clock) = mounted(&["front", "wrist"]);
        clock.seek(10.0);
        clock.set_playing(true);
        driver.apply_clock(clock.snapshot(), false);

        let outcome = driver.on_time_update("wrist", 10.19, &clock, false).unwrap();
        assert_eq!(outcome, TimeUpdateOutcome::InSync);
        assert_eq!(host.log("wrist").seeks, vec![10.0]);

        let outcome = driver.on_time_update("wrist", 10.5, &clock, false).unwrap();
        assert_eq!(outcome, TimeUpdateOutcome::Corrected);
        assert_eq!(host.log("wrist").seeks, vec![10.0, 10.0]);

        let outcome = driver.on_time_update("wrist", 9.7, &clock, false).unwrap();
        assert_eq!(outcome, TimeUpdateOutcome::Corrected);
        assert_eq!(clock.current_time(), 10.0);
    }

    #[test]
    fn reference_stream_drives_the_clock_forward() {
        let (mut driver, _host, clock) = mounted(&["front", "wrist"]);
        clock.set_playing(true);
        driver.apply_clock(clock.snapshot(), false);

        assert_eq!(driver.reference_id(), Some("front"));
        let outcome = driver.on_time_update("front", 0.15, &clock, false).unwrap();
        assert_eq!(outcome, TimeUpdateOutcome::Advanced(0.15));
        assert_eq!(clock.current_time(), 0.15);

        // the other stream never moves the play-head
        let outcome = driver.on_time_update("wrist", 0.3, &clock, false).unwrap();
        assert_eq!(outcome, TimeUpdateOutcome::InSync);
        assert_eq!(clock.current_time(), 0.15);
    }

    #[test]
    fn reference_reports_at_playback_cadence_move_the_clock() {
        for step in [0.25, 1.0] {
            let (mut driver, host, clock) = mounted(&["front", "wrist"]);
            clock.set_playing(true);
            driver.apply_clock(clock.snapshot(), false);

            for i in 1..=6 {
                let position = step * i as f64;
                host.set_native_position("front", position);
                host.set_native_position("wrist", position);

                let outcome = driver.on_time_update("front", position, &clock, false).unwrap();
                assert_eq!(outcome, TimeUpdateOutcome::Advanced(position));
                assert_eq!(clock.current_time(), position);
                driver.apply_clock(clock.snapshot(), false);
            }

            assert!(host.log("front").seeks.is_empty(), "step {step}");
            assert!(host.log("wrist").seeks.is_empty(), "step {step}");
        }
    }

    #[test]
    fn reference_behind_the_clock_never_rewinds_it() {
        let (mut driver, host, clock) = mounted(&["front"]);
        clock.seek(5.0);
        clock.set_playing(true);
        driver.apply_clock(clock.snapshot(), false);
        assert_eq!(host.log("front").seeks, vec![5.0]);

        let outcome = driver.on_time_update("front", 4.9, &clock, false).unwrap();
        assert_eq!(outcome, TimeUpdateOutcome::InSync);
        assert_eq!(clock.current_time(), 5.0);
        assert_eq!(host.log("front").seeks, vec![5.0]);

        let outcome = driver.on_time_update("front", 4.5, &clock, false).unwrap();
        assert_eq!(outcome, TimeUpdateOutcome::Corrected);
        assert_eq!(clock.current_time(), 5.0);
        assert_eq!(host.log("front").seeks, vec![5.0, 5.0]);
    }

    #[test]
    fn reconcile_follows_the_reference_stream() {
        let (mut driver, host, clock) = mounted(&["front", "wrist"]);
        clock.set_playing(true);
        driver.apply_clock(clock.snapshot(), false);

        host.set_native_position("front", 0.25);
        assert_eq!(driver.reconcile(&clock, false), 1);
        assert_eq!(clock.current_time(), 0.25);
        assert!(host.log("front").seeks.is_empty());
        assert_eq!(host.log("wrist").seeks, vec![0.25]);

        host.set_native_position("front", 1.25);
        host.set_native_position("wrist", 1.2);
        assert_eq!(driver.reconcile(&clock, false), 0);
        assert_eq!(clock.current_time(), 1.25);

        // a trailing reference is pulled forward, never the clock back
        host.set_native_position("front", 1.0);
        assert_eq!(driver.reconcile(&clock, false), 1);
        assert_eq!(clock.current_time(), 1.25);
        assert_eq!(host.log("front").seeks, vec![1.25]);
    }

    #[test]
    fn reports_are_ignored_while_paused_or_scrubbing() {
        let (mut driver, host, clock) = mounted(&["front"]);
        assert_eq!(
            driver.on_time_update("front", 5.0, &clock, false).unwrap(),
            TimeUpdateOutcome::Ignored
        );

        clock.set_playing(true);
        assert_eq!(
            driver.on_time_update("front", 5.0, &clock, true).unwrap(),
            TimeUpdateOutcome::Ignored
        );
        assert!(host.log("front").seeks.is_empty());
        assert_eq!(clock.current_time(), 0.0);
    }

    #[test]
    fn clock_seek_resyncs_drifted_streams() {
        let (mut driver, host, clock) = mounted(&["front", "wrist"]);
        driver.apply_clock(clock.snapshot(), false);

        host.set_native_position("wrist", 20.1);
        clock.seek(20.0);
        let report = driver.apply_clock(clock.snapshot(), false);

        assert_eq!(report.corrective_seeks, 1);
        assert_eq!(host.log("front").position, 20.0);
        assert_eq!(host.log("wrist").seeks, Vec::<f64>::new());
    }

    #[test]
    fn clock_changes_are_not_pushed_while_scrubbing() {
        let (mut driver, host, clock) = mounted(&["front"]);
        driver.apply_clock(clock.snapshot(), false);

        clock.seek(30.0);
        let report = driver.apply_clock(clock.snapshot(), true);
        assert_eq!(report.corrective_seeks, 0);
        assert!(host.log("front").seeks.is_empty());
        assert_eq!(driver.reconcile(&clock, true), 0);
    }

    #[test]
    fn play_state_propagates_to_visible_streams_only() {
        let (mut driver, host, clock) = mounted(&["front", "wrist"]);
        driver.hide("wrist").unwrap();

        clock.set_playing(true);
        driver.apply_clock(clock.snapshot(), false);
        assert!(host.log("front").playing);
        assert!(!host.log("wrist").playing);
        assert_eq!(host.log("wrist").play_calls, 0);

        clock.set_playing(false);
        driver.apply_clock(clock.snapshot(), false);
        assert!(!host.log("front").playing);
    }

    #[test]
    fn blocked_playback_leaves_the_clock_playing() {
        let (mut driver, host, clock) = mounted(&["front"]);
        host.block_play("front", true);

        clock.set_playing(true);
        let report = driver.apply_clock(clock.snapshot(), false);

        assert_eq!(report.blocked.len(), 1);
        assert_eq!(report.blocked[0].0, "front");
        assert!(clock.is_playing());

        // next toggle retries
        host.block_play("front", false);
        clock.set_playing(false);
        driver.apply_clock(clock.snapshot(), false);
        clock.set_playing(true);
        let report = driver.apply_clock(clock.snapshot(), false);
        assert!(report.blocked.is_empty());
        assert!(host.log("front").playing);
    }

    #[test]
    fn hide_then_show_snaps_to_the_play_head() {
        let (mut driver, host, clock) = mounted(&["front", "wrist"]);
        clock.set_playing(true);
        driver.apply_clock(clock.snapshot(), false);

        driver.hide("wrist").unwrap();
        assert_eq!(driver.reference_id(), Some("front"));
        assert!(!host.log("wrist").playing);

        for t in [3.3, 17.77, 42.0] {
            clock.seek(t);
            driver.apply_clock(clock.snapshot(), false);
            // hidden streams are out of the sync set
            assert_ne!(host.log("wrist").position, t);

            let blocked = driver.show("wrist", clock.snapshot()).unwrap();
            assert!(blocked.is_empty());
            assert_eq!(host.log("wrist").position, clock.current_time());
            assert!(host.log("wrist").playing);
            driver.hide("wrist").unwrap();
        }
    }

    #[test]
    fn show_while_paused_does_not_resume() {
        let (mut driver, host, clock) = mounted(&["front"]);
        driver.hide("front").unwrap();
        clock.seek(8.0);
        driver.show("front", clock.snapshot()).unwrap();

        assert_eq!(host.log("front").position, 8.0);
        assert_eq!(host.log("front").play_calls, 0);
    }

    #[test]
    fn hidden_reference_hands_over_to_next_visible() {
        let (mut driver, _host, clock) = mounted(&["front", "wrist"]);
        clock.set_playing(true);
        driver.hide("front").unwrap();

        assert_eq!(driver.reference_id(), Some("wrist"));
        assert_eq!(
            driver.on_time_update("front", 0.1, &clock, false).unwrap(),
            TimeUpdateOutcome::Ignored
        );
        assert_eq!(
            driver.on_time_update("wrist", 0.1, &clock, false).unwrap(),
            TimeUpdateOutcome::Advanced(0.1)
        );
    }

    #[test]
    fn only_one_stream_is_enlarged_and_hiding_minimizes() {
        let (mut driver, _host, _clock) = mounted(&["front", "wrist", "top"]);
        driver.enlarge("front").unwrap();
        driver.enlarge("wrist").unwrap();
        assert_eq!(driver.enlarged(), Some("wrist"));
        assert_eq!(driver.stream("front").unwrap().focus, Focus::Normal);

        driver.hide("wrist").unwrap();
        assert_eq!(driver.enlarged(), None);
        assert_eq!(
            driver.enlarge("wrist"),
            Err(SyncError::StreamHidden { id: "wrist".into() })
        );

        driver.enlarge("top").unwrap();
        driver.minimize();
        assert_eq!(driver.enlarged(), None);
    }

    #[test]
    fn enlarging_does_not_change_sync_membership() {
        let (mut driver, _host, _clock) = mounted(&["front", "wrist"]);
        driver.enlarge("wrist").unwrap();
        assert_eq!(driver.visible_count(), 2);
        assert_eq!(driver.reference_id(), Some("front"));
    }

    #[test]
    fn unknown_streams_are_reported() {
        let (mut driver, _host, clock) = mounted(&["front"]);
        assert_eq!(
            driver.hide("ghost"),
            Err(SyncError::UnknownStream { id: "ghost".into() })
        );
        assert!(driver.on_time_update("ghost", 1.0, &clock, false).is_err());
    }

    #[test]
    fn capability_failure_is_reported_but_streams_still_mount() {
        let host = FakeHost::without_codec();
        let driver = VideoSyncDriver::mount(&descriptors(&["front"]), &host, &SyncConfig::default());

        assert!(matches!(
            driver.capability_error(),
            Some(MediaError::Unsupported { .. })
        ));
        assert_eq!(driver.stream_ids(), vec!["front".to_string()]);
    }

    #[test]
    fn already_buffered_streams_are_listed_at_mount() {
        let host = FakeHost::new();
        host.preload("wrist", ReadyState::Playable);
        host.preload("top", ReadyState::Buffering);
        let driver = VideoSyncDriver::mount(
            &descriptors(&["front", "wrist", "top"]),
            &host,
            &SyncConfig::default(),
        );

        assert_eq!(driver.already_playable(), vec!["wrist".to_string()]);
    }

    #[test]
    fn ready_state_never_regresses() {
        let (mut driver, _host, _clock) = mounted(&["front"]);
        assert!(!driver.observe_ready("front", ReadyState::Buffering).unwrap());
        assert!(driver.observe_ready("front", ReadyState::Playable).unwrap());
        assert!(!driver.observe_ready("front", ReadyState::Buffering).unwrap());
        assert!(!driver.observe_ready("front", ReadyState::Playable).unwrap());
        assert_eq!(
            driver.stream("front").unwrap().ready_state(),
            ReadyState::Playable
        );
    }
}
