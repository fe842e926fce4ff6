use std::borrow::Cow;

use crate::models::{EpisodeMetrics, TelemetrySample};

const ENABLE_LOGS: bool = true;

use crate::log_warn;

/// Running sums collected in a single pass over the telemetry.
#[derive(Debug, Default)]
struct RewardAccumulator {
    sum: f64,
    sum_of_squares: f64,
    count: u64,
    max: Option<f64>,
    min: Option<f64>,
    negative_count: u64,
    done_count: u64,
}

impl RewardAccumulator {
    fn push(&mut self, sample: &TelemetrySample) {
        if let Some(reward) = sample.finite_reward() {
            self.sum += reward;
            self.sum_of_squares += reward * reward;
            self.count += 1;
            self.max = Some(self.max.map_or(reward, |m| m.max(reward)));
            self.min = Some(self.min.map_or(reward, |m| m.min(reward)));
            // A negative reward is how the recorder flags an operator error
            if reward < 0.0 {
                self.negative_count += 1;
            }
        }

        if sample.is_done() {
            self.done_count += 1;
        }
    }

    fn finish(self, frame_count: u64, duration_secs: f64) -> EpisodeMetrics {
        let average_reward = if self.count > 0 {
            self.sum / self.count as f64
        } else {
            0.0
        };
        let reward_variance = if self.count > 0 {
            // E[x²] − mean²; rounding can push a constant series a hair below zero
            (self.sum_of_squares / self.count as f64 - average_reward * average_reward).max(0.0)
        } else {
            0.0
        };

        EpisodeMetrics {
            frame_count,
            duration_secs,
            error_count: self.negative_count,
            success_rate: if self.done_count > 0 { 1.0 } else { 0.0 },
            reward_sum: self.sum,
            reward_count: self.count,
            average_reward,
            max_reward: self.max.unwrap_or(0.0),
            min_reward: self.min.unwrap_or(0.0),
            reward_variance,
            done_count: self.done_count,
        }
    }
}

/// Reduce telemetry to episode metrics, consuming samples in index order.
///
/// Samples handed over out of order are sorted by index first. Missing
/// rewards or done flags simply do not contribute. Without any sample there
/// is no recorded span, so the duration is reported as zero.
pub fn extract_metrics(telemetry: &[TelemetrySample], duration_secs: f64) -> EpisodeMetrics {
    let ordered = in_index_order(telemetry);

    let mut acc = RewardAccumulator::default();
    for sample in ordered.iter() {
        acc.push(sample);
    }

    let duration_secs = if duration_secs.is_finite() && !ordered.is_empty() {
        duration_secs
    } else {
        0.0
    };

    acc.finish(ordered.len() as u64, duration_secs)
}

fn in_index_order(telemetry: &[TelemetrySample]) -> Cow<'_, [TelemetrySample]> {
    let sorted = telemetry.windows(2).all(|pair| pair[0].index < pair[1].index);
    if sorted {
        return Cow::Borrowed(telemetry);
    }

    log_warn!(
        "telemetry of {} samples is not in index order; sorting before evaluation",
        telemetry.len()
    );
    let mut owned = telemetry.to_vec();
    owned.sort_by_key(|s| s.index);
    Cow::Owned(owned)
}
