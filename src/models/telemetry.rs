use serde::{Deserialize, Serialize};

/// One captured frame of telemetry.
///
/// Only the fields the quality evaluator reads are modelled; other columns in
/// the source record are ignored on deserialization.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySample {
    #[serde(alias = "frame_index")]
    pub index: u64,
    #[serde(default, alias = "next.reward", skip_serializing_if = "Option::is_none")]
    pub reward: Option<f64>,
    #[serde(default, alias = "next.done", skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
}

impl TelemetrySample {
    pub fn new(index: u64) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    pub fn with_reward(mut self, reward: f64) -> Self {
        self.reward = Some(reward);
        self
    }

    pub fn with_done(mut self, done: bool) -> Self {
        self.done = Some(done);
        self
    }

    /// Reward usable for aggregation; non-finite values count as absent.
    pub fn finite_reward(&self) -> Option<f64> {
        self.reward.filter(|r| r.is_finite())
    }

    pub fn is_done(&self) -> bool {
        self.done == Some(true)
    }
}

/// Build samples `0..n` from a reward list, marking the last one done.
#[cfg(test)]
pub(crate) fn samples_from_rewards(rewards: &[f64], done_at_end: bool) -> Vec<TelemetrySample> {
    let last = rewards.len().saturating_sub(1);
    rewards
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let sample = TelemetrySample::new(i as u64).with_reward(*r);
            if done_at_end && i == last {
                sample.with_done(true)
            } else {
                sample
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_dataset_column_names() {
        let raw = r#"[
            {"frame_index": 0, "next.reward": 0.5, "next.done": false, "observation.state": [1.0]},
            {"index": 1},
            {"frame_index": 2, "next.done": true}
        ]"#;
        let samples: Vec<TelemetrySample> = serde_json::from_str(raw).unwrap();

        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].reward, Some(0.5));
        assert!(!samples[0].is_done());
        assert_eq!(samples[1].reward, None);
        assert_eq!(samples[1].done, None);
        assert!(samples[2].is_done());
    }

    #[test]
    fn non_finite_reward_is_treated_as_absent() {
        let sample = TelemetrySample::new(0).with_reward(f64::NAN);
        assert_eq!(sample.finite_reward(), None);
        assert_eq!(TelemetrySample::new(1).with_reward(-0.25).finite_reward(), Some(-0.25));
    }
}
