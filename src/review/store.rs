//! Persistence contract for episode verdicts.
//!
//! The host owns storage; the core only decides what may be written.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::{Provenance, QualityLabel, QualityVerdict};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeKey {
    pub org: String,
    pub dataset: String,
    pub episode_id: u64,
}

impl EpisodeKey {
    pub fn new(org: impl Into<String>, dataset: impl Into<String>, episode_id: u64) -> Self {
        Self {
            org: org.into(),
            dataset: dataset.into(),
            episode_id,
        }
    }

    /// `org/dataset`, the repository id of the dataset.
    pub fn repo_id(&self) -> String {
        format!("{}/{}", self.org, self.dataset)
    }
}

impl fmt::Display for EpisodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.org, self.dataset, self.episode_id)
    }
}

/// A verdict as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredVerdict {
    pub verdict: QualityVerdict,
    /// Set once a reviewer has touched the entry.
    #[serde(default)]
    pub modified_by_user: bool,
}

impl StoredVerdict {
    pub fn automatic(verdict: QualityVerdict) -> Self {
        Self {
            verdict,
            modified_by_user: false,
        }
    }

    pub fn reviewed(verdict: QualityVerdict) -> Self {
        Self {
            verdict,
            modified_by_user: true,
        }
    }

    /// Whether an automatic evaluation may no longer replace this entry.
    pub fn is_reviewer_owned(&self) -> bool {
        self.modified_by_user || self.verdict.provenance == Provenance::Manual
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("verdict store unavailable: {0}")]
    Unavailable(String),

    #[error("stored verdict for {key} is malformed: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Storage for verdicts, implemented by the host.
#[async_trait]
pub trait VerdictStore: Send + Sync {
    async fn fetch(&self, key: &EpisodeKey) -> Result<Option<StoredVerdict>, StoreError>;

    async fn store(&self, key: &EpisodeKey, verdict: StoredVerdict) -> Result<(), StoreError>;

    /// Every verdict recorded for one dataset, keyed by episode id.
    async fn list(&self, org: &str, dataset: &str) -> Result<Vec<(u64, StoredVerdict)>, StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoApplyOutcome {
    Stored,
    /// A reviewer-owned verdict was already present and was left alone.
    KeptExisting,
}

/// Store an automatic verdict unless a reviewer already owns the entry.
///
/// Failures of the store are returned unchanged.
pub async fn apply_auto_verdict(
    store: &dyn VerdictStore,
    key: &EpisodeKey,
    verdict: QualityVerdict,
) -> Result<AutoApplyOutcome, StoreError> {
    if let Some(existing) = store.fetch(key).await? {
        if existing.is_reviewer_owned() {
            log_debug!(
                "keeping {} verdict for {key}",
                existing.verdict.provenance.as_str()
            );
            return Ok(AutoApplyOutcome::KeptExisting);
        }
    }

    log_info!("auto verdict for {key}: {}", verdict.label.as_str());
    store.store(key, StoredVerdict::automatic(verdict)).await?;
    Ok(AutoApplyOutcome::Stored)
}

/// Record a reviewer's decision, keeping the metrics of whatever verdict
/// was there before.
pub async fn record_manual_verdict(
    store: &dyn VerdictStore,
    key: &EpisodeKey,
    label: QualityLabel,
    note: Option<String>,
) -> Result<StoredVerdict, StoreError> {
    let verdict = match store.fetch(key).await? {
        Some(existing) => existing.verdict.manual_override(label, note),
        None => QualityVerdict::manual(label, note),
    };
    let stored = StoredVerdict::reviewed(verdict);
    store.store(key, stored.clone()).await?;
    log_info!("manual verdict for {key}: {}", label.as_str());
    Ok(stored)
}

/// Process-local store; contents are lost with the process.
#[derive(Debug, Default)]
pub struct MemoryVerdictStore {
    entries: RwLock<HashMap<EpisodeKey, StoredVerdict>>,
}

impl MemoryVerdictStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Restore entries from a JSON array of `[key, verdict]` pairs.
    pub async fn import_json(&self, raw: &str) -> Result<usize, StoreError> {
        let pairs: Vec<(EpisodeKey, StoredVerdict)> =
            serde_json::from_str(raw).map_err(|source| StoreError::Malformed {
                key: "import".into(),
                source,
            })?;
        let count = pairs.len();
        self.entries.write().await.extend(pairs);
        Ok(count)
    }
}

#[async_trait]
impl VerdictStore for MemoryVerdictStore {
    async fn fetch(&self, key: &EpisodeKey) -> Result<Option<StoredVerdict>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn store(&self, key: &EpisodeKey, verdict: StoredVerdict) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.clone(), verdict);
        Ok(())
    }

    async fn list(&self, org: &str, dataset: &str) -> Result<Vec<(u64, StoredVerdict)>, StoreError> {
        let entries = self.entries.read().await;
        let mut listed: Vec<(u64, StoredVerdict)> = entries
            .iter()
            .filter(|(key, _)| key.org == org && key.dataset == dataset)
            .map(|(key, verdict)| (key.episode_id, verdict.clone()))
            .collect();
        listed.sort_by_key(|(id, _)| *id);
        Ok(listed)
    }
}
