//! Core segmentation engine — scores a population, then classifies each customer.

use std::collections::BTreeMap;

use rfm_core::{CustomerMetricsRecord, RfmResult, ScoredRecord, ScoringConfig, Segment, SegmentedRecord};
use tracing::{debug, info};

use crate::classifier::classify_scores;
use crate::scorer::RfmScorer;

pub struct SegmentationEngine {
    scorer: RfmScorer,
}

impl SegmentationEngine {
    pub fn new(config: &ScoringConfig) -> RfmResult<Self> {
        Ok(Self {
            scorer: RfmScorer::new(config)?,
        })
    }

    pub fn scorer(&self) -> &RfmScorer {
        &self.scorer
    }

    /// Scores the whole population, then assigns one segment per customer.
    /// Fails on the first record outside the metric domains.
    pub fn run(&self, population: Vec<CustomerMetricsRecord>) -> RfmResult<Vec<SegmentedRecord>> {
        info!(customers = population.len(), "Segmenting population");

        let segmented: Vec<SegmentedRecord> = self
            .scorer
            .score_population(population)?
            .into_iter()
            .map(classify_record)
            .collect();

        for (segment, count) in segment_counts(&segmented) {
            debug!(segment = %segment, customers = count, "Segment assigned");
        }
        info!(customers = segmented.len(), "Segmentation complete");
        Ok(segmented)
    }
}

impl Default for SegmentationEngine {
    fn default() -> Self {
        Self {
            scorer: RfmScorer::with_default_edges(),
        }
    }
}

/// Attaches the segment and total score to an already scored record.
pub fn classify_record(scored: ScoredRecord) -> SegmentedRecord {
    let segment = classify_scores(scored.r_score, scored.f_score, scored.m_score);
    let rfm_total = scored.rfm_total();
    SegmentedRecord {
        scored,
        segment,
        rfm_total,
    }
}

/// Customers per segment, in rule order.
pub fn segment_counts(records: &[SegmentedRecord]) -> BTreeMap<Segment, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.segment).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> Vec<CustomerMetricsRecord> {
        vec![
            CustomerMetricsRecord::new("c1", 5, 10, 2500.0),
            CustomerMetricsRecord::new("c2", 400, 1, 50.0),
            CustomerMetricsRecord::new("c3", 20, 3, 800.0),
            CustomerMetricsRecord::new("c4", 600, 1, 20.0),
            CustomerMetricsRecord::new("c5", 2, 5, 1200.0),
        ]
    }

    #[test]
    fn test_run_scenario() {
        let engine = SegmentationEngine::default();
        let out = engine.run(scenario()).unwrap();
        let segments: Vec<Segment> = out.iter().map(|r| r.segment).collect();
        assert_eq!(
            segments,
            vec![
                Segment::Champions,
                Segment::AtRisk,
                Segment::NeedAttention,
                Segment::Hibernating,
                Segment::Champions,
            ]
        );
        assert_eq!(out[0].rfm_total, 14);
        assert_eq!(out[3].rfm_total, 4);
    }

    #[test]
    fn test_run_empty_population() {
        let engine = SegmentationEngine::default();
        assert!(engine.run(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn test_segment_counts() {
        let engine = SegmentationEngine::default();
        let out = engine.run(scenario()).unwrap();
        let counts = segment_counts(&out);
        assert_eq!(counts.get(&Segment::Champions), Some(&2));
        assert_eq!(counts.values().sum::<usize>(), 5);
        assert_eq!(counts.keys().next(), Some(&Segment::Champions));
    }
}
