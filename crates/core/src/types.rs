use crate::error::{RfmError, RfmResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of ordinal scores per metric.
pub const SCORE_LEVELS: usize = 5;

// ─── Customer Metrics ───────────────────────────────────────────────────────

/// One row of the per-customer metrics table handed to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerMetricsRecord {
    pub customer_id: String,
    /// Days between the customer's latest order and the dataset's latest order.
    pub recency_days: i64,
    /// Distinct orders placed.
    pub frequency: u32,
    /// Total spent, freight excluded.
    pub monetary: f64,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub total_freight: Option<f64>,
}

impl CustomerMetricsRecord {
    pub fn new(
        customer_id: impl Into<String>,
        recency_days: i64,
        frequency: u32,
        monetary: f64,
    ) -> Self {
        Self {
            customer_id: customer_id.into(),
            recency_days,
            frequency,
            monetary,
            state: None,
            city: None,
            total_freight: None,
        }
    }

    pub fn avg_order_value(&self) -> f64 {
        if self.frequency == 0 {
            return 0.0;
        }
        self.monetary / self.frequency as f64
    }

    pub fn is_repeat(&self) -> bool {
        self.frequency > 1
    }

    /// Rejects values outside the documented metric domains.
    pub fn validate(&self) -> RfmResult<()> {
        if self.customer_id.trim().is_empty() {
            return Err(self.invalid("customer_id", "must not be empty"));
        }
        if self.recency_days < 0 {
            return Err(self.invalid(
                "recency_days",
                format!("must be non-negative, got {}", self.recency_days),
            ));
        }
        if self.frequency == 0 {
            return Err(self.invalid("frequency", "must be at least 1"));
        }
        if !self.monetary.is_finite() {
            return Err(self.invalid("monetary", format!("must be finite, got {}", self.monetary)));
        }
        if self.monetary < 0.0 {
            return Err(self.invalid(
                "monetary",
                format!("must be non-negative, got {}", self.monetary),
            ));
        }
        Ok(())
    }

    fn invalid(&self, field: &'static str, reason: impl Into<String>) -> RfmError {
        RfmError::InvalidInput {
            customer_id: self.customer_id.clone(),
            field,
            reason: reason.into(),
        }
    }
}

/// The three raw dimensions scored by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Recency,
    Frequency,
    Monetary,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Recency, Metric::Frequency, Metric::Monetary];

    /// Column holding the raw value in the metrics table.
    pub fn column(&self) -> &'static str {
        match self {
            Metric::Recency => "recency_days",
            Metric::Frequency => "frequency",
            Metric::Monetary => "monetary",
        }
    }

    pub fn score_column(&self) -> &'static str {
        match self {
            Metric::Recency => "r_score",
            Metric::Frequency => "f_score",
            Metric::Monetary => "m_score",
        }
    }

    /// Recency is the only metric where a smaller raw value scores higher.
    pub fn higher_is_better(&self) -> bool {
        !matches!(self, Metric::Recency)
    }

    /// Lower bounds of the fixed-width bins used when quantiles are degenerate.
    pub fn default_fallback_edges(&self) -> [f64; SCORE_LEVELS] {
        match self {
            Metric::Recency => [0.0, 30.0, 60.0, 90.0, 180.0],
            Metric::Frequency => [0.0, 1.0, 2.0, 3.0, 5.0],
            Metric::Monetary => [0.0, 100.0, 500.0, 1000.0, 2000.0],
        }
    }

    /// Smallest valid raw value: every customer has placed at least one order.
    pub fn min_value(&self) -> f64 {
        match self {
            Metric::Frequency => 1.0,
            Metric::Recency | Metric::Monetary => 0.0,
        }
    }

    pub fn value(&self, record: &CustomerMetricsRecord) -> f64 {
        match self {
            Metric::Recency => record.recency_days as f64,
            Metric::Frequency => record.frequency as f64,
            Metric::Monetary => record.monetary,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::Recency => "recency",
            Metric::Frequency => "frequency",
            Metric::Monetary => "monetary",
        };
        f.write_str(name)
    }
}

// ─── Scores ─────────────────────────────────────────────────────────────────

/// An ordinal score in 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct RfmScore(u8);

impl RfmScore {
    pub const MIN: RfmScore = RfmScore(1);
    pub const MAX: RfmScore = RfmScore(5);

    pub fn new(value: u8) -> RfmResult<Self> {
        Self::parse("rfm", value)
    }

    /// Like [`RfmScore::new`] but names the offending field in the error.
    pub fn parse(field: &'static str, value: u8) -> RfmResult<Self> {
        if (1..=SCORE_LEVELS as u8).contains(&value) {
            Ok(RfmScore(value))
        } else {
            Err(RfmError::InvalidScore { field, value })
        }
    }

    /// Score for a zero-based bin index, clamped into range.
    pub fn from_bin(index: usize) -> Self {
        RfmScore(index.min(SCORE_LEVELS - 1) as u8 + 1)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for RfmScore {
    type Error = RfmError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        RfmScore::new(value)
    }
}

impl From<RfmScore> for u8 {
    fn from(score: RfmScore) -> Self {
        score.0
    }
}

impl fmt::Display for RfmScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    #[serde(flatten)]
    pub record: CustomerMetricsRecord,
    pub r_score: RfmScore,
    pub f_score: RfmScore,
    pub m_score: RfmScore,
}

impl ScoredRecord {
    pub fn score(&self, metric: Metric) -> RfmScore {
        match metric {
            Metric::Recency => self.r_score,
            Metric::Frequency => self.f_score,
            Metric::Monetary => self.m_score,
        }
    }

    pub fn rfm_total(&self) -> u8 {
        self.r_score.get() + self.f_score.get() + self.m_score.get()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentedRecord {
    #[serde(flatten)]
    pub scored: ScoredRecord,
    pub segment: Segment,
    pub rfm_total: u8,
}

impl SegmentedRecord {
    pub fn customer_id(&self) -> &str {
        &self.scored.record.customer_id
    }

    pub fn metrics(&self) -> &CustomerMetricsRecord {
        &self.scored.record
    }
}

// ─── Segments ───────────────────────────────────────────────────────────────

/// Behavioral segment assigned from an (r, f, m) score triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Segment {
    #[serde(rename = "Champions")]
    Champions,
    #[serde(rename = "Loyal Customers")]
    LoyalCustomers,
    #[serde(rename = "Potential Loyalists")]
    PotentialLoyalists,
    #[serde(rename = "New Customers")]
    NewCustomers,
    #[serde(rename = "Promising")]
    Promising,
    #[serde(rename = "Need Attention")]
    NeedAttention,
    #[serde(rename = "At Risk - High Value")]
    AtRiskHighValue,
    #[serde(rename = "At Risk")]
    AtRisk,
    #[serde(rename = "Hibernating")]
    Hibernating,
    #[serde(rename = "Lost")]
    Lost,
    #[serde(rename = "Other")]
    Other,
}

impl Segment {
    /// Every label, in classification rule order.
    pub const ALL: [Segment; 11] = [
        Segment::Champions,
        Segment::LoyalCustomers,
        Segment::PotentialLoyalists,
        Segment::NewCustomers,
        Segment::Promising,
        Segment::NeedAttention,
        Segment::AtRiskHighValue,
        Segment::AtRisk,
        Segment::Hibernating,
        Segment::Lost,
        Segment::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::Champions => "Champions",
            Segment::LoyalCustomers => "Loyal Customers",
            Segment::PotentialLoyalists => "Potential Loyalists",
            Segment::NewCustomers => "New Customers",
            Segment::Promising => "Promising",
            Segment::NeedAttention => "Need Attention",
            Segment::AtRiskHighValue => "At Risk - High Value",
            Segment::AtRisk => "At Risk",
            Segment::Hibernating => "Hibernating",
            Segment::Lost => "Lost",
            Segment::Other => "Other",
        }
    }

    /// Segments counted toward revenue at risk.
    pub fn is_at_risk(&self) -> bool {
        matches!(
            self,
            Segment::AtRisk | Segment::AtRiskHighValue | Segment::Hibernating | Segment::Lost
        )
    }

    pub fn description(&self) -> &'static str {
        match self {
            Segment::Champions => "Bought recently, buy often and spend the most.",
            Segment::LoyalCustomers => "Order regularly and spend well.",
            Segment::PotentialLoyalists => "Recent buyers with good spend who show promise.",
            Segment::NewCustomers => "First-time or very recent buyers with few orders.",
            Segment::Promising => "Recent buyers with average metrics.",
            Segment::NeedAttention => "Average customers who need a nudge.",
            Segment::AtRiskHighValue => "Former high-value customers who stopped buying.",
            Segment::AtRisk => "Customers showing signs of disengagement.",
            Segment::Hibernating => "Long time since the last purchase, low spend.",
            Segment::Lost => "Very long time since the last purchase, minimal spend.",
            Segment::Other => "Customers outside every other segment.",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            Segment::Champions => "VIP treatment, early access, referral programs.",
            Segment::LoyalCustomers => "Loyalty programs, cross-selling, personalized picks.",
            Segment::PotentialLoyalists => "Engagement emails, second purchase incentives.",
            Segment::NewCustomers => "Welcome series, onboarding content, easy reorder.",
            Segment::Promising => "Nurture campaigns, offers based on first purchase.",
            Segment::NeedAttention => "Re-engagement emails, targeted discounts, feedback requests.",
            Segment::AtRiskHighValue => "Urgent reactivation, \"we miss you\" offers.",
            Segment::AtRisk => "Win-back campaigns, satisfaction surveys, limited-time offers.",
            Segment::Hibernating => "Last-chance reactivation with strong discounts.",
            Segment::Lost => "Drop from active marketing.",
            Segment::Other => "Monitor behavior for emerging patterns.",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Segment {
    type Err = RfmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Segment::ALL
            .iter()
            .copied()
            .find(|segment| segment.as_str() == s)
            .ok_or_else(|| RfmError::Dataset(format!("unknown segment label: {s:?}")))
    }
}
