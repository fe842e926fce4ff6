use serde::{Deserialize, Serialize};

/// Fixed thresholds for the seven quality criteria.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct QualityThresholds {
    /// Fraction of episodes reaching a done flag (0 or 1 per episode)
    pub min_success_rate: f64,

    /// Negative-reward frames tolerated
    pub max_error_count: u64,

    pub min_reward_sum: f64,
    pub min_average_reward: f64,

    /// Accepted duration range, seconds
    pub min_duration_secs: f64,
    pub max_duration_secs: f64,

    /// Peak reward that must be reached at least once
    pub min_max_reward: f64,

    pub max_reward_variance: f64,

    /// Criteria that must pass for a `good` label
    pub min_criteria_met: u8,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_success_rate: 0.3,
            max_error_count: 20,
            min_reward_sum: 0.05,
            min_average_reward: 0.005,
            min_duration_secs: 0.2,
            max_duration_secs: 1200.0,
            min_max_reward: 0.1,
            max_reward_variance: 0.5,
            min_criteria_met: 3,
        }
    }
}
