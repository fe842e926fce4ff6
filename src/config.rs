use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use crate::quality::QualityThresholds;

/// AV1 in MP4, the format recorded episodes are published in.
pub const DEFAULT_EXPECTED_CODEC: &str = "video/mp4; codecs=\"av01.0.05M.08\"";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    /// Drift between a stream and the play-head tolerated before a corrective seek
    pub drift_tolerance_secs: f64,
    /// Period of the drift check while playing; must stay at or under one second
    pub reconcile_interval_ms: u64,
    pub expected_codec: String,
    /// Capacity of the view's command channel
    pub command_buffer: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            drift_tolerance_secs: 0.2,
            reconcile_interval_ms: 250,
            expected_codec: DEFAULT_EXPECTED_CODEC.into(),
            command_buffer: 64,
        }
    }
}

impl SyncConfig {
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_millis(self.reconcile_interval_ms.clamp(1, 1000))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ScrubConfig {
    pub debounce_ms: u64,
    /// Step of the jump-backward/forward keys
    pub nudge_secs: f64,
}

impl Default for ScrubConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 200,
            nudge_secs: 5.0,
        }
    }
}

impl ScrubConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewerConfig {
    pub sync: SyncConfig,
    pub scrub: ScrubConfig,
    pub quality: QualityThresholds,
}

impl ViewerConfig {
    /// Defaults adjusted by the environment.
    ///
    /// `EPISCOPE_DEBUG=1` tightens the drift check to 100 ms.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if debug_mode() {
            config.sync.reconcile_interval_ms = 100;
        }
        config
    }
}

fn debug_mode() -> bool {
    std::env::var("EPISCOPE_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// JSON-backed viewer configuration.
pub struct ConfigStore {
    path: PathBuf,
    data: RwLock<ViewerConfig>,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!(
                    "Ignoring unparsable config {}: {err}; using defaults",
                    path.display()
                );
                ViewerConfig::from_env()
            })
        } else {
            ViewerConfig::from_env()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn config(&self) -> ViewerConfig {
        self.read().clone()
    }

    pub fn update_sync(&self, sync: SyncConfig) -> Result<()> {
        let mut guard = self.write();
        guard.sync = sync;
        self.persist(&guard)
    }

    pub fn update_scrub(&self, scrub: ScrubConfig) -> Result<()> {
        let mut guard = self.write();
        guard.scrub = scrub;
        self.persist(&guard)
    }

    pub fn update_quality(&self, quality: QualityThresholds) -> Result<()> {
        let mut guard = self.write();
        guard.quality = quality;
        self.persist(&guard)
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read config from {}", self.path.display()))?;
        let data: ViewerConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid config in {}", self.path.display()))?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &ViewerConfig) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write config to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, ViewerConfig> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, ViewerConfig> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
