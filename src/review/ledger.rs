use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{QualityLabel, QualityVerdict};

use super::store::{StoreError, StoredVerdict, VerdictStore};

const ENABLE_LOGS: bool = false;

use crate::log_debug;

/// Label filter over a dataset's episodes; `Unrated` matches episodes with
/// no stored verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QualityFilter {
    Good,
    Bad,
    Unrated,
}

impl QualityFilter {
    fn matches(&self, label: Option<QualityLabel>) -> bool {
        match (self, label) {
            (QualityFilter::Unrated, None) => true,
            (QualityFilter::Good, Some(QualityLabel::Good)) => true,
            (QualityFilter::Bad, Some(QualityLabel::Bad)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub total_episodes: u64,
    pub good_episodes: u64,
    pub bad_episodes: u64,
    pub unrated_episodes: u64,
    pub good_ratio: f64,
    pub bad_ratio: f64,
    /// Most recent verdict timestamp, if anything was rated.
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportDatasetInfo {
    pub name: String,
    pub organization: String,
    pub total_episodes: u64,
    pub good_episodes: u64,
    pub quality_ratio: f64,
    pub export_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportMetadata {
    pub frame_count: u64,
    pub duration: f64,
    pub error_count: u64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportedEpisode {
    pub episode_id: u64,
    pub quality_info: QualityVerdict,
    pub metadata: ExportMetadata,
}

/// Dataset-hub compatible listing of the good episodes of one dataset.
#[derive(Debug, Clone, Serialize)]
pub struct GoodEpisodesExport {
    pub dataset_info: ExportDatasetInfo,
    pub episodes: Vec<ExportedEpisode>,
}

impl GoodEpisodesExport {
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_good_episodes.json",
            self.dataset_info.organization, self.dataset_info.name
        )
    }
}

/// Verdicts of one dataset, keyed by episode id.
#[derive(Debug, Clone, Default)]
pub struct DatasetLedger {
    org: String,
    dataset: String,
    entries: BTreeMap<u64, StoredVerdict>,
}

impl DatasetLedger {
    pub fn new(org: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            org: org.into(),
            dataset: dataset.into(),
            entries: BTreeMap::new(),
        }
    }

    pub async fn load(store: &dyn VerdictStore, org: &str, dataset: &str) -> Result<Self, StoreError> {
        let mut ledger = Self::new(org, dataset);
        for (episode_id, verdict) in store.list(org, dataset).await? {
            ledger.record(episode_id, verdict);
        }
        log_debug!("loaded {} verdicts for {org}/{dataset}", ledger.entries.len());
        Ok(ledger)
    }

    pub fn record(&mut self, episode_id: u64, verdict: StoredVerdict) {
        self.entries.insert(episode_id, verdict);
    }

    pub fn get(&self, episode_id: u64) -> Option<&StoredVerdict> {
        self.entries.get(&episode_id)
    }

    pub fn label(&self, episode_id: u64) -> Option<QualityLabel> {
        self.get(episode_id).map(|stored| stored.verdict.label)
    }

    /// Counts against `total_episodes`, the dataset's known episode count.
    /// Rated episodes beyond that count still count towards the total.
    pub fn summary(&self, total_episodes: u64) -> DatasetSummary {
        let good = self.count(QualityLabel::Good);
        let bad = self.count(QualityLabel::Bad);
        let total = total_episodes.max(good + bad);

        DatasetSummary {
            total_episodes: total,
            good_episodes: good,
            bad_episodes: bad,
            unrated_episodes: total - good - bad,
            good_ratio: ratio(good, total),
            bad_ratio: ratio(bad, total),
            last_updated: self.entries.values().map(|s| s.verdict.produced_at).max(),
        }
    }

    /// Keep the episodes of `episodes` matching `filter`, in input order.
    pub fn filter(&self, episodes: &[u64], filter: QualityFilter) -> Vec<u64> {
        episodes
            .iter()
            .copied()
            .filter(|id| filter.matches(self.label(*id)))
            .collect()
    }

    /// Like [`DatasetLedger::summary`], good episodes beyond `total_episodes`
    /// raise the total, so the quality ratio stays within `[0, 1]`.
    pub fn export_good(&self, total_episodes: u64) -> GoodEpisodesExport {
        let episodes: Vec<ExportedEpisode> = self
            .entries
            .iter()
            .filter(|(_, stored)| stored.verdict.is_good())
            .map(|(episode_id, stored)| {
                let metrics = stored.verdict.metrics;
                ExportedEpisode {
                    episode_id: *episode_id,
                    quality_info: stored.verdict.clone(),
                    metadata: ExportMetadata {
                        frame_count: metrics.frame_count,
                        duration: metrics.duration_secs,
                        error_count: metrics.error_count,
                        success_rate: metrics.success_rate,
                    },
                }
            })
            .collect();

        let good = episodes.len() as u64;
        let total = total_episodes.max(good);
        GoodEpisodesExport {
            dataset_info: ExportDatasetInfo {
                name: self.dataset.clone(),
                organization: self.org.clone(),
                total_episodes: total,
                good_episodes: good,
                quality_ratio: ratio(good, total),
                export_date: Utc::now(),
            },
            episodes,
        }
    }

    fn count(&self, label: QualityLabel) -> u64 {
        self.entries
            .values()
            .filter(|stored| stored.verdict.label == label)
            .count() as u64
    }
}

fn ratio(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::telemetry::samples_from_rewards;
    use crate::quality::evaluate_quality;
    use crate::review::store::{apply_auto_verdict, EpisodeKey, MemoryVerdictStore};

    fn good() -> StoredVerdict {
        StoredVerdict::automatic(evaluate_quality(&samples_from_rewards(&[0.2, 0.8], true), 5.0))
    }

    fn bad() -> StoredVerdict {
        StoredVerdict::automatic(evaluate_quality(&[], 10.0))
    }

    fn ledger() -> DatasetLedger {
        let mut ledger = DatasetLedger::new("lab", "pick_place");
        ledger.record(0, good());
        ledger.record(2, bad());
        ledger.record(3, good());
        ledger
    }

    #[test]
    fn summary_counts_unrated_against_the_dataset_size() {
        let summary = ledger().summary(10);
        assert_eq!(summary.total_episodes, 10);
        assert_eq!(summary.good_episodes, 2);
        assert_eq!(summary.bad_episodes, 1);
        assert_eq!(summary.unrated_episodes, 7);
        assert!((summary.good_ratio - 0.2).abs() < 1e-12);
        assert!((summary.bad_ratio - 0.1).abs() < 1e-12);
        assert!(summary.last_updated.is_some());
    }

    #[test]
    fn empty_ledger_has_zero_ratios() {
        let summary = DatasetLedger::new("lab", "empty").summary(0);
        assert_eq!(summary.total_episodes, 0);
        assert_eq!(summary.good_ratio, 0.0);
        assert_eq!(summary.last_updated, None);
    }

    #[test]
    fn filter_treats_missing_verdicts_as_unrated() {
        let ledger = ledger();
        let episodes = [0, 1, 2, 3, 4];

        assert_eq!(ledger.filter(&episodes, QualityFilter::Good), vec![0, 3]);
        assert_eq!(ledger.filter(&episodes, QualityFilter::Bad), vec![2]);
        assert_eq!(ledger.filter(&episodes, QualityFilter::Unrated), vec![1, 4]);
    }

    #[test]
    fn export_lists_good_episodes_in_id_order() {
        let export = ledger().export_good(8);

        assert_eq!(export.dataset_info.good_episodes, 2);
        assert!((export.dataset_info.quality_ratio - 0.25).abs() < 1e-12);
        let ids: Vec<u64> = export.episodes.iter().map(|e| e.episode_id).collect();
        assert_eq!(ids, vec![0, 3]);
        assert_eq!(export.episodes[0].metadata.frame_count, 2);
        assert_eq!(export.file_name(), "lab_pick_place_good_episodes.json");

        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["dataset_info"]["organization"], "lab");
        assert_eq!(json["episodes"][1]["quality_info"]["label"], "good");
    }

    #[test]
    fn export_ratio_never_exceeds_one() {
        let export = ledger().export_good(1);
        assert_eq!(export.dataset_info.total_episodes, 2);
        assert_eq!(export.dataset_info.quality_ratio, 1.0);

        let export = ledger().export_good(0);
        assert_eq!(export.dataset_info.quality_ratio, 1.0);

        let export = DatasetLedger::new("lab", "empty").export_good(0);
        assert_eq!(export.dataset_info.quality_ratio, 0.0);
        assert!(export.episodes.is_empty());
    }

    #[tokio::test]
    async fn loads_from_a_verdict_store() {
        let store = MemoryVerdictStore::new();
        let key = EpisodeKey::new("lab", "pick_place", 9);
        apply_auto_verdict(&store, &key, good().verdict).await.unwrap();

        let ledger = DatasetLedger::load(&store, "lab", "pick_place").await.unwrap();
        assert_eq!(ledger.label(9), Some(QualityLabel::Good));
        assert_eq!(ledger.label(1), None);
    }
}
