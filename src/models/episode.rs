use serde::{Deserialize, Serialize};

use super::TelemetrySample;

/// One video source of an episode, e.g. a single camera.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StreamDescriptor {
    #[serde(alias = "filename")]
    pub id: String,
    #[serde(alias = "url")]
    pub source_url: String,
}

impl StreamDescriptor {
    pub fn new(id: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source_url: source_url.into(),
        }
    }
}

/// Everything the data-loading collaborator hands over for one episode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeData {
    #[serde(default)]
    pub episode_id: u64,
    pub duration: f64,
    #[serde(default, alias = "videosInfo")]
    pub streams: Vec<StreamDescriptor>,
    #[serde(default)]
    pub telemetry: Vec<TelemetrySample>,
}

/// Telemetry file as accepted on the command line: either a bare sample
/// array or a full episode document.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TelemetryDocument {
    Samples(Vec<TelemetrySample>),
    Episode(EpisodeData),
}

impl TelemetryDocument {
    pub fn telemetry(&self) -> &[TelemetrySample] {
        match self {
            TelemetryDocument::Samples(samples) => samples,
            TelemetryDocument::Episode(episode) => &episode.telemetry,
        }
    }

    /// Duration carried by the document; bare arrays carry none.
    pub fn duration(&self) -> Option<f64> {
        match self {
            TelemetryDocument::Samples(_) => None,
            TelemetryDocument::Episode(episode) => Some(episode.duration),
        }
    }
}
