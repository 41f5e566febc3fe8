//! Segment analysis: per-segment revenue and behavior summaries, score
//! distributions and at-risk totals over a segmented population.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rfm_core::{Metric, Segment, SegmentedRecord, SCORE_LEVELS};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Types ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub segment: Segment,
    pub customer_count: usize,
    pub total_revenue: f64,
    pub avg_spent: f64,
    pub median_spent: f64,
    pub avg_orders: f64,
    pub avg_recency: f64,
    pub avg_order_value: f64,
    pub avg_r: f64,
    pub avg_f: f64,
    pub avg_m: f64,
    pub avg_rfm_total: f64,
    /// Share of customers with more than one order, in percent.
    pub repeat_rate: f64,
    pub customer_pct: f64,
    pub revenue_pct: f64,
    /// Most common state among the segment's customers, if any have one.
    pub top_state: Option<String>,
}

/// Customers per state, with the state's most common segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSummary {
    pub state: String,
    pub customers: usize,
    pub customer_pct: f64,
    pub revenue: f64,
    pub top_segment: Segment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtRiskSummary {
    pub customers: usize,
    pub customer_pct: f64,
    pub revenue: f64,
    pub revenue_pct: f64,
}

/// Count of customers per score level, index 0 holding score 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreDistribution {
    pub recency: [usize; SCORE_LEVELS],
    pub frequency: [usize; SCORE_LEVELS],
    pub monetary: [usize; SCORE_LEVELS],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentAnalysis {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub total_customers: usize,
    pub total_revenue: f64,
    pub avg_customer_value: f64,
    pub repeat_rate: f64,
    /// Sorted by average spend, highest first.
    pub segments: Vec<SegmentSummary>,
    /// Sorted by customer count, highest first. Customers without a state are
    /// left out.
    pub states: Vec<StateSummary>,
    pub score_distribution: ScoreDistribution,
}

// ─── Analysis ───────────────────────────────────────────────────────────────

impl ScoreDistribution {
    pub fn from_records(records: &[SegmentedRecord]) -> Self {
        let mut distribution = Self::default();
        for record in records {
            for metric in Metric::ALL {
                let level = record.scored.score(metric).get() as usize;
                distribution.for_metric_mut(metric)[level - 1] += 1;
            }
        }
        distribution
    }

    pub fn for_metric(&self, metric: Metric) -> &[usize; SCORE_LEVELS] {
        match metric {
            Metric::Recency => &self.recency,
            Metric::Frequency => &self.frequency,
            Metric::Monetary => &self.monetary,
        }
    }

    fn for_metric_mut(&mut self, metric: Metric) -> &mut [usize; SCORE_LEVELS] {
        match metric {
            Metric::Recency => &mut self.recency,
            Metric::Frequency => &mut self.frequency,
            Metric::Monetary => &mut self.monetary,
        }
    }
}

impl SegmentAnalysis {
    pub fn from_records(records: &[SegmentedRecord]) -> Self {
        let total_customers = records.len();
        let total_revenue: f64 = records.iter().map(|r| r.metrics().monetary).sum();

        let mut segments: Vec<SegmentSummary> = Segment::ALL
            .iter()
            .filter_map(|&segment| {
                let members: Vec<&SegmentedRecord> =
                    records.iter().filter(|r| r.segment == segment).collect();
                summarize(segment, &members, total_customers, total_revenue)
            })
            .collect();
        segments.sort_by(|a, b| {
            b.avg_spent
                .total_cmp(&a.avg_spent)
                .then(a.segment.cmp(&b.segment))
        });

        let repeat = records.iter().filter(|r| r.metrics().is_repeat()).count();

        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            total_customers,
            total_revenue: round2(total_revenue),
            avg_customer_value: round2(ratio(total_revenue, total_customers as f64)),
            repeat_rate: round1(percent(repeat as f64, total_customers as f64)),
            segments,
            states: state_summaries(records, total_customers),
            score_distribution: ScoreDistribution::from_records(records),
        }
    }

    pub fn get(&self, segment: Segment) -> Option<&SegmentSummary> {
        self.segments.iter().find(|s| s.segment == segment)
    }

    /// Segments with the largest revenue share, at most `n`.
    pub fn top_by_revenue(&self, n: usize) -> Vec<&SegmentSummary> {
        let mut ranked: Vec<&SegmentSummary> = self.segments.iter().collect();
        ranked.sort_by(|a, b| {
            b.total_revenue
                .total_cmp(&a.total_revenue)
                .then(a.segment.cmp(&b.segment))
        });
        ranked.truncate(n);
        ranked
    }

    /// States with the most customers, at most `n`.
    pub fn top_states(&self, n: usize) -> &[StateSummary] {
        &self.states[..n.min(self.states.len())]
    }

    pub fn at_risk(&self) -> AtRiskSummary {
        let at_risk = self.segments.iter().filter(|s| s.segment.is_at_risk());
        let (customers, revenue) = at_risk.fold((0, 0.0), |(count, revenue), s| {
            (count + s.customer_count, revenue + s.total_revenue)
        });
        AtRiskSummary {
            customers,
            customer_pct: round1(percent(customers as f64, self.total_customers as f64)),
            revenue: round2(revenue),
            revenue_pct: round1(percent(revenue, self.total_revenue)),
        }
    }
}

fn summarize(
    segment: Segment,
    members: &[&SegmentedRecord],
    total_customers: usize,
    total_revenue: f64,
) -> Option<SegmentSummary> {
    if members.is_empty() {
        return None;
    }
    let count = members.len() as f64;
    let mean = |f: &dyn Fn(&SegmentedRecord) -> f64| members.iter().map(|r| f(r)).sum::<f64>() / count;

    let revenue: f64 = members.iter().map(|r| r.metrics().monetary).sum();
    let mut spend: Vec<f64> = members.iter().map(|r| r.metrics().monetary).collect();
    spend.sort_by(f64::total_cmp);
    let repeat = members.iter().filter(|r| r.metrics().is_repeat()).count();

    Some(SegmentSummary {
        segment,
        customer_count: members.len(),
        total_revenue: round2(revenue),
        avg_spent: round2(revenue / count),
        median_spent: round2(median(&spend)),
        avg_orders: round2(mean(&|r| r.metrics().frequency as f64)),
        avg_recency: round2(mean(&|r| r.metrics().recency_days as f64)),
        avg_order_value: round2(mean(&|r| r.metrics().avg_order_value())),
        avg_r: round2(mean(&|r| r.scored.r_score.get() as f64)),
        avg_f: round2(mean(&|r| r.scored.f_score.get() as f64)),
        avg_m: round2(mean(&|r| r.scored.m_score.get() as f64)),
        avg_rfm_total: round2(mean(&|r| r.rfm_total as f64)),
        repeat_rate: round1(percent(repeat as f64, count)),
        customer_pct: round1(percent(count, total_customers as f64)),
        revenue_pct: round1(percent(revenue, total_revenue)),
        top_state: most_common(members.iter().filter_map(|r| r.metrics().state.as_deref()))
            .map(str::to_string),
    })
}

fn state_summaries(records: &[SegmentedRecord], total_customers: usize) -> Vec<StateSummary> {
    let mut by_state: BTreeMap<&str, Vec<&SegmentedRecord>> = BTreeMap::new();
    for record in records {
        if let Some(state) = record.metrics().state.as_deref() {
            by_state.entry(state).or_default().push(record);
        }
    }

    let mut states: Vec<StateSummary> = by_state
        .into_iter()
        .filter_map(|(state, members)| {
            let top_segment = most_common(members.iter().map(|r| r.segment))?;
            let revenue: f64 = members.iter().map(|r| r.metrics().monetary).sum();
            Some(StateSummary {
                state: state.to_string(),
                customers: members.len(),
                customer_pct: round1(percent(members.len() as f64, total_customers as f64)),
                revenue: round2(revenue),
                top_segment,
            })
        })
        .collect();
    states.sort_by(|a, b| {
        b.customers
            .cmp(&a.customers)
            .then_with(|| a.state.cmp(&b.state))
    });
    states
}

/// Most frequent value; ties go to the smallest.
fn most_common<T: Ord>(values: impl Iterator<Item = T>) -> Option<T> {
    let mut counts: BTreeMap<T, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
        .map(|(value, _)| value)
}

fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    match n {
        0 => 0.0,
        _ if n % 2 == 1 => sorted[n / 2],
        _ => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0,
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

fn percent(part: f64, whole: f64) -> f64 {
    ratio(part, whole) * 100.0
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ─── Tests ──────────────────────────────────────────────────────────────────
