//! Population-wide scoring of the raw metrics into ordinal 1..=5 scores.
//!
//! Each metric is binned independently. Quantile binning is used whenever the
//! population can form five distinct value bins; otherwise the metric's
//! fixed-width fallback edges apply. The choice is made up front from the
//! data and surfaced as a [`BinPlan`].

use rfm_core::{
    CustomerMetricsRecord, Metric, RfmError, RfmResult, RfmScore, ScoredRecord, ScoringConfig,
    SCORE_LEVELS,
};
use serde::Serialize;
use tracing::{debug, info};

const QUANTILES: [f64; SCORE_LEVELS + 1] = [0.0, 0.2, 0.4, 0.6, 0.8, 1.0];

/// How a metric's values are mapped to bins for one population.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum BinPlan {
    Empty,
    /// Right-closed bins between quantile cut points. When `ranked` is set the
    /// cuts apply to first-occurrence ranks rather than raw values.
    Quantile {
        cuts: [f64; SCORE_LEVELS + 1],
        ranked: bool,
    },
    /// Left-closed bins starting at each edge; the last bin is open-ended.
    Fallback { edges: [f64; SCORE_LEVELS] },
}

impl BinPlan {
    pub fn is_fallback(&self) -> bool {
        matches!(self, BinPlan::Fallback { .. })
    }

    pub fn strategy(&self) -> &'static str {
        match self {
            BinPlan::Empty => "empty",
            BinPlan::Quantile { .. } => "quantile",
            BinPlan::Fallback { .. } => "fallback",
        }
    }
}

/// Quantile cut points at the 0/20/40/60/80/100th percentiles, using linear
/// interpolation between closest ranks. `None` when the population has fewer
/// than five values or the cut points are not strictly increasing.
pub fn quantile_cuts(values: &[f64]) -> Option<[f64; SCORE_LEVELS + 1]> {
    if values.len() < SCORE_LEVELS {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut cuts = [0.0; SCORE_LEVELS + 1];
    for (cut, q) in cuts.iter_mut().zip(QUANTILES) {
        *cut = interpolate(&sorted, q);
    }
    cuts.windows(2).all(|w| w[0] < w[1]).then_some(cuts)
}

fn interpolate(sorted: &[f64], q: f64) -> f64 {
    let position = (sorted.len() - 1) as f64 * q;
    let lower = position.floor() as usize;
    let upper = (position.ceil() as usize).min(sorted.len() - 1);
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// 1-based ranks by ascending value; ties keep input order.
pub fn first_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    for (rank, index) in order.into_iter().enumerate() {
        ranks[index] = (rank + 1) as f64;
    }
    ranks
}

fn rank_cuts(len: usize) -> [f64; SCORE_LEVELS + 1] {
    QUANTILES.map(|q| 1.0 + len.saturating_sub(1) as f64 * q)
}

fn quantile_bin(value: f64, cuts: &[f64; SCORE_LEVELS + 1]) -> usize {
    cuts[1..SCORE_LEVELS].iter().filter(|&&cut| value > cut).count()
}

fn fallback_bin(value: f64, edges: &[f64; SCORE_LEVELS]) -> usize {
    edges.iter().rposition(|&edge| value >= edge).unwrap_or(0)
}

/// Rejects raw values outside the metric's domain. Offenders are identified by
/// their position in `values`.
fn check_values(metric: Metric, values: &[f64]) -> RfmResult<()> {
    let min = metric.min_value();
    match values.iter().position(|&v| !v.is_finite() || v < min) {
        Some(index) => Err(RfmError::InvalidInput {
            customer_id: format!("#{index}"),
            field: metric.column(),
            reason: format!("must be finite and at least {min}, got {}", values[index]),
        }),
        None => Ok(()),
    }
}

/// Scores one metric across a population.
#[derive(Debug, Clone)]
pub struct MetricScorer {
    metric: Metric,
    fallback_edges: [f64; SCORE_LEVELS],
}

impl MetricScorer {
    pub fn new(metric: Metric, fallback_edges: [f64; SCORE_LEVELS]) -> Self {
        Self {
            metric,
            fallback_edges,
        }
    }

    pub fn with_default_edges(metric: Metric) -> Self {
        Self::new(metric, metric.default_fallback_edges())
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn plan(&self, values: &[f64]) -> BinPlan {
        if values.is_empty() {
            return BinPlan::Empty;
        }
        match quantile_cuts(values) {
            Some(_) if self.metric.higher_is_better() => BinPlan::Quantile {
                cuts: rank_cuts(values.len()),
                ranked: true,
            },
            Some(cuts) => BinPlan::Quantile {
                cuts,
                ranked: false,
            },
            None => BinPlan::Fallback {
                edges: self.fallback_edges,
            },
        }
    }

    /// Scores positionally aligned with `values`.
    pub fn score(&self, values: &[f64]) -> RfmResult<Vec<RfmScore>> {
        Ok(self.score_with_plan(values)?.1)
    }

    pub fn score_with_plan(&self, values: &[f64]) -> RfmResult<(BinPlan, Vec<RfmScore>)> {
        check_values(self.metric, values)?;
        let plan = self.plan(values);
        let scores = match &plan {
            BinPlan::Empty => Vec::new(),
            BinPlan::Quantile { cuts, ranked: true } => first_ranks(values)
                .into_iter()
                .map(|rank| self.to_score(quantile_bin(rank, cuts)))
                .collect(),
            BinPlan::Quantile {
                cuts,
                ranked: false,
            } => values
                .iter()
                .map(|&value| self.to_score(quantile_bin(value, cuts)))
                .collect(),
            BinPlan::Fallback { edges } => values
                .iter()
                .map(|&value| self.to_score(fallback_bin(value, edges)))
                .collect(),
        };
        Ok((plan, scores))
    }

    fn to_score(&self, bin: usize) -> RfmScore {
        if self.metric.higher_is_better() {
            RfmScore::from_bin(bin)
        } else {
            RfmScore::from_bin(SCORE_LEVELS - 1 - bin.min(SCORE_LEVELS - 1))
        }
    }
}

/// Scores one metric's population with the default fallback edges.
pub fn score(metric: Metric, values: &[f64]) -> RfmResult<Vec<RfmScore>> {
    MetricScorer::with_default_edges(metric).score(values)
}

/// Scores all three metrics for a whole population.
#[derive(Debug, Clone)]
pub struct RfmScorer {
    recency: MetricScorer,
    frequency: MetricScorer,
    monetary: MetricScorer,
}

impl RfmScorer {
    pub fn new(config: &ScoringConfig) -> RfmResult<Self> {
        Ok(Self {
            recency: MetricScorer::new(Metric::Recency, config.edges_for(Metric::Recency)?),
            frequency: MetricScorer::new(Metric::Frequency, config.edges_for(Metric::Frequency)?),
            monetary: MetricScorer::new(Metric::Monetary, config.edges_for(Metric::Monetary)?),
        })
    }

    pub fn with_default_edges() -> Self {
        Self {
            recency: MetricScorer::with_default_edges(Metric::Recency),
            frequency: MetricScorer::with_default_edges(Metric::Frequency),
            monetary: MetricScorer::with_default_edges(Metric::Monetary),
        }
    }

    pub fn scorer(&self, metric: Metric) -> &MetricScorer {
        match metric {
            Metric::Recency => &self.recency,
            Metric::Frequency => &self.frequency,
            Metric::Monetary => &self.monetary,
        }
    }

    /// Validates every record, then scores the population. Output order
    /// matches input order.
    pub fn score_population(
        &self,
        population: Vec<CustomerMetricsRecord>,
    ) -> RfmResult<Vec<ScoredRecord>> {
        for record in &population {
            record.validate()?;
        }
        if population.is_empty() {
            debug!("Empty population, nothing to score");
            return Ok(Vec::new());
        }

        let [recency, frequency, monetary] = Metric::ALL.map(|metric| {
            let values: Vec<f64> = population.iter().map(|r| metric.value(r)).collect();
            let (plan, scores) = self.scorer(metric).score_with_plan(&values)?;
            info!(
                metric = %metric,
                strategy = plan.strategy(),
                customers = values.len(),
                "Metric binned"
            );
            debug!(metric = %metric, plan = ?plan, "Bin plan");
            Ok::<_, RfmError>(scores)
        });
        let (recency, frequency, monetary) = (recency?, frequency?, monetary?);

        let scored = population
            .into_iter()
            .zip(recency)
            .zip(frequency)
            .zip(monetary)
            .map(|(((record, r_score), f_score), m_score)| ScoredRecord {
                record,
                r_score,
                f_score,
                m_score,
            })
            .collect();
        Ok(scored)
    }
}
