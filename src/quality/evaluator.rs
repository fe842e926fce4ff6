use chrono::Utc;

use crate::models::{EpisodeMetrics, Provenance, QualityLabel, QualityVerdict, TelemetrySample};
use crate::quality::config::QualityThresholds;
use crate::quality::metrics::extract_metrics;

/// Outcome of one criterion: whether it passed and, if not, why.
struct Criterion {
    passed: bool,
    failure: String,
}

/// Evaluate an episode with the default thresholds.
pub fn evaluate_quality(telemetry: &[TelemetrySample], duration_secs: f64) -> QualityVerdict {
    evaluate(telemetry, duration_secs, &QualityThresholds::default())
}

/// Map telemetry and duration to an automatic verdict.
///
/// Never fails: empty or partial telemetry produces defaulted metrics and,
/// in practice, a `bad` label with one explanation per failed criterion.
pub fn evaluate(
    telemetry: &[TelemetrySample],
    duration_secs: f64,
    thresholds: &QualityThresholds,
) -> QualityVerdict {
    let metrics = extract_metrics(telemetry, duration_secs);
    judge(metrics, thresholds)
}

/// Apply the seven criteria to already-reduced metrics.
pub fn judge(metrics: EpisodeMetrics, thresholds: &QualityThresholds) -> QualityVerdict {
    let criteria = criteria(&metrics, thresholds);

    let criteria_met = criteria.iter().filter(|c| c.passed).count() as u8;
    let explanations: Vec<String> = criteria
        .into_iter()
        .filter(|c| !c.passed)
        .map(|c| c.failure)
        .collect();

    let label = if criteria_met >= thresholds.min_criteria_met {
        QualityLabel::Good
    } else {
        QualityLabel::Bad
    };

    QualityVerdict {
        label,
        criteria_met,
        explanations,
        metrics,
        provenance: Provenance::Auto,
        produced_at: Utc::now(),
    }
}

/// The criteria in their fixed reporting order.
fn criteria(m: &EpisodeMetrics, t: &QualityThresholds) -> [Criterion; 7] {
    [
        Criterion {
            passed: m.success_rate >= t.min_success_rate,
            failure: format!(
                "Success rate ({:.1}%) below threshold ({:.1}%)",
                m.success_rate * 100.0,
                t.min_success_rate * 100.0
            ),
        },
        Criterion {
            passed: m.error_count <= t.max_error_count,
            failure: format!(
                "Error count ({}) above threshold ({})",
                m.error_count, t.max_error_count
            ),
        },
        Criterion {
            passed: m.reward_sum >= t.min_reward_sum,
            failure: format!(
                "Total reward ({:.2}) below threshold ({})",
                m.reward_sum, t.min_reward_sum
            ),
        },
        Criterion {
            passed: m.average_reward >= t.min_average_reward,
            failure: format!(
                "Average reward ({:.3}) below threshold ({})",
                m.average_reward, t.min_average_reward
            ),
        },
        Criterion {
            passed: m.duration_secs >= t.min_duration_secs && m.duration_secs <= t.max_duration_secs,
            failure: format!(
                "Duration ({:.1}s) outside acceptable range ({}-{}s)",
                m.duration_secs, t.min_duration_secs, t.max_duration_secs
            ),
        },
        Criterion {
            passed: m.max_reward >= t.min_max_reward,
            failure: format!(
                "Maximum reward ({:.3}) below threshold ({})",
                m.max_reward, t.min_max_reward
            ),
        },
        Criterion {
            passed: m.reward_variance <= t.max_reward_variance,
            failure: format!(
                "Reward variance ({:.3}) above threshold ({})",
                m.reward_variance, t.max_reward_variance
            ),
        },
    ]
}
