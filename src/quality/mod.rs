pub mod config;
pub mod evaluator;
pub mod metrics;

pub use config::QualityThresholds;
pub use evaluator::{evaluate, evaluate_quality, judge};
pub use metrics::extract_metrics;
