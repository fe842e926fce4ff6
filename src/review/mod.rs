pub mod ledger;
pub mod navigation;
pub mod store;

pub use ledger::{DatasetLedger, DatasetSummary, GoodEpisodesExport, QualityFilter};
pub use navigation::{parse_time_param, EpisodeNavigator, NavigationAction, PlayheadReflector, ReviewKey};
pub use store::{
    apply_auto_verdict, record_manual_verdict, AutoApplyOutcome, EpisodeKey, MemoryVerdictStore,
    StoreError, StoredVerdict, VerdictStore,
};
