pub mod episode;
pub mod telemetry;
pub mod verdict;

pub use episode::{EpisodeData, StreamDescriptor, TelemetryDocument};
pub use telemetry::TelemetrySample;
pub use verdict::{EpisodeMetrics, Provenance, QualityLabel, QualityVerdict};
