mod clock;
mod controller;
pub mod media;
mod readiness;
mod scrub;
mod session;
mod sync_driver;

pub use clock::{clamp_time, Clock, ClockTick};
pub use controller::{mount_episode_view, EpisodeView};
pub use media::{Focus, MediaElement, MediaError, MediaHost, ReadyState, Visibility};
pub use readiness::{BarrierState, ReadinessBarrier};
pub use scrub::{Nudge, ScrubController, ScrubRelease, ScrubState};
pub use session::{EpisodeSession, ViewCommand, ViewNotice};
pub use sync_driver::{needs_correction, SyncError, SyncReport, TimeUpdateOutcome, VideoSyncDriver};
