//! Population-level properties of the scoring and segmentation engine.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rfm_core::{CustomerMetricsRecord, Metric, Segment, SegmentedRecord};
use rfm_segmentation::{classify, MetricScorer, SegmentationEngine};

/// Mostly one-time buyers, like a typical marketplace extract.
fn marketplace_population(seed: u64, size: usize) -> Vec<CustomerMetricsRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..size)
        .map(|i| {
            let frequency = if rng.gen_bool(0.9) { 1 } else { rng.gen_range(2..12) };
            let monetary = (rng.gen_range(5.0..4000.0_f64) * 100.0).round() / 100.0;
            CustomerMetricsRecord::new(
                format!("cust-{i:05}"),
                rng.gen_range(0..720),
                frequency,
                monetary,
            )
        })
        .collect()
}

/// Spread-out values on every metric so all three use quantile bins.
fn diverse_population(seed: u64, size: usize) -> Vec<CustomerMetricsRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..size)
        .map(|i| {
            CustomerMetricsRecord::new(
                format!("div-{i:05}"),
                rng.gen_range(0..1000),
                rng.gen_range(1..60),
                rng.gen_range(0.0..10_000.0),
            )
        })
        .collect()
}

fn assert_monotonic(records: &[SegmentedRecord]) {
    for a in records {
        for b in records {
            let (am, bm) = (a.metrics(), b.metrics());
            if am.recency_days < bm.recency_days {
                assert!(a.scored.r_score >= b.scored.r_score, "recency: {am:?} vs {bm:?}");
            }
            if am.frequency < bm.frequency {
                assert!(a.scored.f_score <= b.scored.f_score, "frequency: {am:?} vs {bm:?}");
            }
            if am.monetary < bm.monetary {
                assert!(a.scored.m_score <= b.scored.m_score, "monetary: {am:?} vs {bm:?}");
            }
        }
    }
}

#[test]
fn test_deterministic_output() {
    let engine = SegmentationEngine::default();
    let first = engine.run(marketplace_population(7, 500)).unwrap();
    let second = engine.run(marketplace_population(7, 500)).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_scores_in_range_and_totals_consistent() {
    let engine = SegmentationEngine::default();
    for seed in 0..5 {
        for record in engine.run(marketplace_population(seed, 300)).unwrap() {
            for metric in Metric::ALL {
                let score = record.scored.score(metric).get();
                assert!((1..=5).contains(&score));
            }
            assert_eq!(record.rfm_total, record.scored.rfm_total());
            assert!((3..=15).contains(&record.rfm_total));
            assert_eq!(
                classify(
                    record.scored.r_score.get(),
                    record.scored.f_score.get(),
                    record.scored.m_score.get()
                )
                .unwrap(),
                record.segment
            );
        }
    }
}

#[test]
fn test_monotonic_with_fallback_frequency() {
    let engine = SegmentationEngine::default();
    let population = marketplace_population(11, 250);
    let values: Vec<f64> = population.iter().map(|r| Metric::Frequency.value(r)).collect();
    assert!(MetricScorer::with_default_edges(Metric::Frequency)
        .plan(&values)
        .is_fallback());

    assert_monotonic(&engine.run(population).unwrap());
}

#[test]
fn test_monotonic_with_quantile_bins() {
    let engine = SegmentationEngine::default();
    let population = diverse_population(3, 250);
    for metric in Metric::ALL {
        let values: Vec<f64> = population.iter().map(|r| metric.value(r)).collect();
        assert!(!MetricScorer::with_default_edges(metric).plan(&values).is_fallback());
    }

    let out = engine.run(population).unwrap();
    assert_monotonic(&out);

    // Quantile bins spread customers across all five scores.
    for metric in Metric::ALL {
        for level in 1..=5u8 {
            assert!(out.iter().any(|r| r.scored.score(metric).get() == level));
        }
    }
}

#[test]
fn test_identical_frequency_falls_back() {
    let population: Vec<_> = (0..20)
        .map(|i| CustomerMetricsRecord::new(format!("c{i}"), i * 10, 2, 100.0 * i as f64))
        .collect();
    let out = SegmentationEngine::default().run(population).unwrap();
    assert!(out.iter().all(|r| r.scored.f_score.get() == 3));
}

#[test]
fn test_single_customer_and_zero_variance() {
    let engine = SegmentationEngine::default();
    let single = engine
        .run(vec![CustomerMetricsRecord::new("only", 45, 1, 250.0)])
        .unwrap();
    assert_eq!(single.len(), 1);
    assert_eq!(single[0].scored.r_score.get(), 4);
    assert_eq!(single[0].scored.f_score.get(), 2);
    assert_eq!(single[0].scored.m_score.get(), 2);
    assert_eq!(single[0].segment, Segment::NewCustomers);

    let flat: Vec<_> = (0..10)
        .map(|i| CustomerMetricsRecord::new(format!("f{i}"), 0, 1, 0.0))
        .collect();
    let out = engine.run(flat).unwrap();
    assert!(out.iter().all(|r| r.rfm_total == 5 + 2 + 1));
}

#[test]
fn test_end_to_end_scenario() {
    let population = vec![
        CustomerMetricsRecord::new("1", 5, 10, 2500.0),
        CustomerMetricsRecord::new("2", 400, 1, 50.0),
        CustomerMetricsRecord::new("3", 20, 3, 800.0),
        CustomerMetricsRecord::new("4", 600, 1, 20.0),
        CustomerMetricsRecord::new("5", 2, 5, 1200.0),
    ];
    let out = SegmentationEngine::default().run(population).unwrap();

    let top_recency: Vec<&str> = {
        let mut ids: Vec<_> = out.iter().collect();
        ids.sort_by_key(|r| std::cmp::Reverse(r.scored.r_score));
        ids.into_iter().take(2).map(|r| r.customer_id()).collect()
    };
    assert!(top_recency.contains(&"1") && top_recency.contains(&"5"));

    let lowest = &out[3];
    assert_eq!(lowest.customer_id(), "4");
    assert!(out.iter().all(|r| r.scored.r_score >= lowest.scored.r_score));
    assert!(out.iter().all(|r| r.scored.m_score >= lowest.scored.m_score));

    assert!(matches!(out[0].segment, Segment::Champions | Segment::LoyalCustomers));
    assert!(matches!(out[3].segment, Segment::Hibernating | Segment::Lost));
}

#[test]
fn test_invalid_record_fails_whole_batch() {
    let mut population = marketplace_population(5, 50);
    population[17].recency_days = -3;
    let err = SegmentationEngine::default().run(population).unwrap_err();
    assert!(err.to_string().contains("cust-00017"));
    assert!(err.to_string().contains("recency_days"));
}
