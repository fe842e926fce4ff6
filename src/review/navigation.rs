use serde::{Deserialize, Serialize};

use crate::playback::{ClockTick, ViewCommand};

const ENABLE_LOGS: bool = true;

use crate::log_debug;

pub const EPISODES_PER_PAGE: usize = 100;

/// Reads the `t` location parameter into a seek target, in seconds.
///
/// Anything that is not a finite number is ignored.
pub fn parse_time_param(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|t| t.is_finite())
}

/// Decides when the paused play-head is written back into the page location.
///
/// Only whole seconds are reflected, only while paused and past zero, and
/// only when the second differs from the one last reflected.
#[derive(Debug, Default)]
pub struct PlayheadReflector {
    last_second: Option<u64>,
}

impl PlayheadReflector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The second to write into the location for `tick`, if any.
    pub fn observe(&mut self, tick: ClockTick) -> Option<u64> {
        if tick.is_playing || tick.current_time <= 0.0 {
            return None;
        }
        let second = tick.whole_second();
        if self.last_second == Some(second) {
            return None;
        }
        self.last_second = Some(second);
        Some(second)
    }
}

/// Keys the episode review page reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReviewKey {
    Space,
    ArrowUp,
    ArrowDown,
}

impl ReviewKey {
    /// Map a DOM-style key name.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            " " | "Space" => Some(ReviewKey::Space),
            "ArrowUp" => Some(ReviewKey::ArrowUp),
            "ArrowDown" => Some(ReviewKey::ArrowDown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationAction {
    TogglePlay,
    OpenEpisode(u64),
}

impl NavigationAction {
    /// The command to hand to the mounted view, if the action stays on it.
    pub fn view_command(&self) -> Option<ViewCommand> {
        match self {
            NavigationAction::TogglePlay => Some(ViewCommand::TogglePlay),
            NavigationAction::OpenEpisode(_) => None,
        }
    }
}

/// Moves between the episodes of one dataset and pages the episode list.
#[derive(Debug)]
pub struct EpisodeNavigator {
    episodes: Vec<u64>,
    current: u64,
    page: usize,
}

impl EpisodeNavigator {
    /// `episodes` is the dataset's episode id list in display order.
    pub fn new(episodes: Vec<u64>, current: u64) -> Self {
        let page = episodes
            .iter()
            .position(|id| *id == current)
            .map(|index| index / EPISODES_PER_PAGE + 1)
            .unwrap_or(1);

        Self {
            episodes,
            current,
            page,
        }
    }

    pub fn current(&self) -> u64 {
        self.current
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn total_pages(&self) -> usize {
        self.episodes.len().div_ceil(EPISODES_PER_PAGE)
    }

    pub fn page_episodes(&self) -> &[u64] {
        let start = ((self.page - 1) * EPISODES_PER_PAGE).min(self.episodes.len());
        let end = (start + EPISODES_PER_PAGE).min(self.episodes.len());
        &self.episodes[start..end]
    }

    pub fn next_page(&mut self) -> bool {
        if self.page >= self.total_pages() {
            return false;
        }
        self.page += 1;
        true
    }

    pub fn prev_page(&mut self) -> bool {
        if self.page <= 1 {
            return false;
        }
        self.page -= 1;
        true
    }

    /// ArrowDown opens the next episode id and ArrowUp the previous one,
    /// bounded by the first and last ids of the list.
    pub fn handle_key(&mut self, key: ReviewKey) -> Option<NavigationAction> {
        let target = match key {
            ReviewKey::Space => return Some(NavigationAction::TogglePlay),
            ReviewKey::ArrowDown => self.current.checked_add(1)?,
            ReviewKey::ArrowUp => self.current.checked_sub(1)?,
        };

        let (lowest, highest) = (*self.episodes.first()?, *self.episodes.last()?);
        if target < lowest || target > highest {
            log_debug!("episode {target} outside {lowest}..={highest}");
            return None;
        }
        self.current = target;
        Some(NavigationAction::OpenEpisode(target))
    }
}

/// Location path of an episode page, relative to its dataset.
pub fn episode_path(episode_id: u64) -> String {
    format!("episode_{episode_id}")
}
