//! Ordered rule table mapping an (r, f, m) score triple to a segment.
//!
//! Rules are evaluated top to bottom and the first match wins. Several rules
//! overlap, so the order is part of the contract: `r <= 2, m == 2` lands in
//! At Risk because rule 8 precedes rule 9, and rule 10 (Lost) can never fire
//! because rule 9 already covers it.

use rfm_core::{RfmResult, RfmScore, Segment};
use serde::Serialize;

/// One row of the segment rule table.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SegmentRule {
    pub number: u8,
    pub condition: &'static str,
    pub segment: Segment,
    #[serde(skip)]
    predicate: fn(u8, u8, u8) -> bool,
}

impl SegmentRule {
    pub fn matches(&self, r: RfmScore, f: RfmScore, m: RfmScore) -> bool {
        (self.predicate)(r.get(), f.get(), m.get())
    }
}

pub static RULES: [SegmentRule; 10] = [
    SegmentRule {
        number: 1,
        condition: "r >= 4 and f >= 4 and m >= 4",
        segment: Segment::Champions,
        predicate: |r, f, m| r >= 4 && f >= 4 && m >= 4,
    },
    SegmentRule {
        number: 2,
        condition: "f >= 4 and m >= 4",
        segment: Segment::LoyalCustomers,
        predicate: |_, f, m| f >= 4 && m >= 4,
    },
    SegmentRule {
        number: 3,
        condition: "r >= 4 and m >= 3",
        segment: Segment::PotentialLoyalists,
        predicate: |r, _, m| r >= 4 && m >= 3,
    },
    SegmentRule {
        number: 4,
        condition: "r >= 4 and f <= 2",
        segment: Segment::NewCustomers,
        predicate: |r, f, _| r >= 4 && f <= 2,
    },
    SegmentRule {
        number: 5,
        condition: "r >= 4",
        segment: Segment::Promising,
        predicate: |r, _, _| r >= 4,
    },
    SegmentRule {
        number: 6,
        condition: "r == 3 and f >= 3 and m >= 3",
        segment: Segment::NeedAttention,
        predicate: |r, f, m| r == 3 && f >= 3 && m >= 3,
    },
    SegmentRule {
        number: 7,
        condition: "r <= 2 and f >= 3 and m >= 4",
        segment: Segment::AtRiskHighValue,
        predicate: |r, f, m| r <= 2 && f >= 3 && m >= 4,
    },
    SegmentRule {
        number: 8,
        condition: "r <= 2 and m >= 2",
        segment: Segment::AtRisk,
        predicate: |r, _, m| r <= 2 && m >= 2,
    },
    SegmentRule {
        number: 9,
        condition: "r <= 2 and m <= 2",
        segment: Segment::Hibernating,
        predicate: |r, _, m| r <= 2 && m <= 2,
    },
    // Shadowed by rule 9. Kept in place so existing r <= 2, m <= 2 customers
    // stay Hibernating.
    SegmentRule {
        number: 10,
        condition: "r == 1 and m == 1",
        segment: Segment::Lost,
        predicate: |r, _, m| r == 1 && m == 1,
    },
];

/// Number and condition reported for the fall-through segment.
pub const FALLTHROUGH_RULE: (u8, &str) = (11, "none of the above");

/// First rule matching the triple, if any.
pub fn matching_rule(r: RfmScore, f: RfmScore, m: RfmScore) -> Option<&'static SegmentRule> {
    RULES.iter().find(|rule| rule.matches(r, f, m))
}

/// Total over every valid score triple.
pub fn classify_scores(r: RfmScore, f: RfmScore, m: RfmScore) -> Segment {
    matching_rule(r, f, m)
        .map(|rule| rule.segment)
        .unwrap_or(Segment::Other)
}

/// Classifies raw scores, rejecting any outside 1..=5.
pub fn classify(r: u8, f: u8, m: u8) -> RfmResult<Segment> {
    Ok(classify_scores(
        RfmScore::parse("r", r)?,
        RfmScore::parse("f", f)?,
        RfmScore::parse("m", m)?,
    ))
}
