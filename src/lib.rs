//! Play-head synchronization and quality review for recorded teleoperation
//! episodes.
//!
//! A mounted [`EpisodeView`] keeps every camera stream of an episode aligned
//! to one [`Clock`], holds playback until all streams can play through, and
//! lets a reviewer scrub without the streams fighting the seek bar. The
//! [`quality`] module judges an episode good or bad from its telemetry, and
//! [`review`] covers what happens to that verdict afterwards.

pub mod config;
pub mod models;
pub mod playback;
pub mod quality;
pub mod review;
pub mod utils;

pub use config::{ConfigStore, ViewerConfig};
pub use models::{QualityLabel, QualityVerdict, StreamDescriptor, TelemetrySample};
pub use playback::{
    mount_episode_view, Clock, ClockTick, EpisodeView, MediaElement, MediaHost, ViewCommand,
    ViewNotice,
};
pub use quality::evaluate_quality;
pub use review::{apply_auto_verdict, MemoryVerdictStore, VerdictStore};
pub use utils::logging;
