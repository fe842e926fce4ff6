use serde::Serialize;
use std::collections::HashSet;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "state")]
pub enum BarrierState {
    Waiting { remaining: usize },
    Ready,
}

/// Counts streams that can play through without stalling.
///
/// Each stream is credited at most once; the transition into `Ready`
/// is reported exactly once and never reverts.
#[derive(Debug)]
pub struct ReadinessBarrier {
    pending: HashSet<String>,
    credited: HashSet<String>,
    state: BarrierState,
}

impl ReadinessBarrier {
    pub fn new<I, S>(stream_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pending: HashSet<String> = stream_ids.into_iter().map(Into::into).collect();
        let state = if pending.is_empty() {
            BarrierState::Ready
        } else {
            BarrierState::Waiting {
                remaining: pending.len(),
            }
        };

        Self {
            pending,
            credited: HashSet::new(),
            state,
        }
    }

    pub fn state(&self) -> BarrierState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == BarrierState::Ready
    }

    pub fn remaining(&self) -> usize {
        match self.state {
            BarrierState::Waiting { remaining } => remaining,
            BarrierState::Ready => 0,
        }
    }

    /// Credit `id` as playable. Returns `true` only for the report that
    /// completes the barrier.
    pub fn report_playable(&mut self, id: &str) -> bool {
        if self.credited.contains(id) {
            log_debug!("stream {id} already credited");
            return false;
        }
        if !self.pending.remove(id) {
            log_warn!("readiness report for unknown stream {id}");
            return false;
        }
        self.credited.insert(id.to_string());

        match self.state {
            BarrierState::Waiting { remaining } if remaining > 1 => {
                self.state = BarrierState::Waiting {
                    remaining: remaining - 1,
                };
                false
            }
            BarrierState::Waiting { .. } => {
                self.state = BarrierState::Ready;
                log_info!("all {} streams ready", self.credited.len());
                true
            }
            BarrierState::Ready => false,
        }
    }
}
