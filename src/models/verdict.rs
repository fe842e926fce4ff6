use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum QualityLabel {
    Good,
    Bad,
}

impl QualityLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityLabel::Good => "good",
            QualityLabel::Bad => "bad",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Provenance {
    Auto,
    Manual,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Auto => "auto",
            Provenance::Manual => "manual",
        }
    }
}

/// Aggregates reduced from one episode's telemetry.
///
/// Reward-derived fields are 0 when the episode carries no reward samples.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeMetrics {
    pub frame_count: u64,
    pub duration_secs: f64,
    pub error_count: u64,
    pub success_rate: f64,
    pub reward_sum: f64,
    pub reward_count: u64,
    pub average_reward: f64,
    pub max_reward: f64,
    pub min_reward: f64,
    pub reward_variance: f64,
    pub done_count: u64,
}

/// A good/bad judgement for one episode.
///
/// Values are never mutated after construction; a reviewer's decision is a
/// new verdict produced by [`QualityVerdict::manual_override`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QualityVerdict {
    pub label: QualityLabel,
    pub criteria_met: u8,
    pub explanations: Vec<String>,
    pub metrics: EpisodeMetrics,
    pub provenance: Provenance,
    pub produced_at: DateTime<Utc>,
}

impl QualityVerdict {
    /// Reviewer decision superseding `self`, keeping the measured metrics.
    pub fn manual_override(&self, label: QualityLabel, note: Option<String>) -> Self {
        Self {
            label,
            criteria_met: self.criteria_met,
            explanations: note.into_iter().collect(),
            metrics: self.metrics,
            provenance: Provenance::Manual,
            produced_at: Utc::now(),
        }
    }

    /// Manual verdict with no automatic evaluation behind it.
    pub fn manual(label: QualityLabel, note: Option<String>) -> Self {
        Self {
            label,
            criteria_met: 0,
            explanations: note.into_iter().collect(),
            metrics: EpisodeMetrics::default(),
            provenance: Provenance::Manual,
            produced_at: Utc::now(),
        }
    }

    pub fn is_good(&self) -> bool {
        self.label == QualityLabel::Good
    }

    /// Explanations joined the way the review panel shows them.
    pub fn notes(&self) -> String {
        self.explanations.join("; ")
    }

    /// Compare everything except `produced_at`.
    pub fn same_judgement(&self, other: &Self) -> bool {
        self.label == other.label
            && self.criteria_met == other.criteria_met
            && self.explanations == other.explanations
            && self.metrics == other.metrics
            && self.provenance == other.provenance
    }
}
