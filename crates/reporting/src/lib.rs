//! Reporting around the segmentation engine: metrics table loading,
//! segment analysis and CSV/JSON export.

pub mod analysis;
pub mod dataset;
pub mod export;

pub use analysis::{
    AtRiskSummary, ScoreDistribution, SegmentAnalysis, SegmentSummary, StateSummary,
};
pub use dataset::load_metrics;
pub use export::{write_outputs, write_segment_details, ExportFormat};
