//! RFM scoring and segmentation: quantile binning with fixed-width fallback,
//! and the ordered rule table that maps score triples to segments.

pub mod classifier;
pub mod engine;
pub mod scorer;

pub use classifier::{classify, classify_scores, matching_rule, SegmentRule, RULES};
pub use engine::{classify_record, segment_counts, SegmentationEngine};
pub use scorer::{score, BinPlan, MetricScorer, RfmScorer};
