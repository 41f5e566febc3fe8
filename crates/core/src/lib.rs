//! Shared domain types, configuration and errors for RFM customer segmentation.

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, ScoringConfig};
pub use error::{RfmError, RfmResult};
pub use types::{
    CustomerMetricsRecord, Metric, RfmScore, ScoredRecord, Segment, SegmentedRecord,
    SCORE_LEVELS,
};
