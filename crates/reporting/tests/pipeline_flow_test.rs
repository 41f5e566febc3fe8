//! Integration test for the full load → segment → analyse → export flow.

#[cfg(test)]
mod tests {
    use std::fs;

    use rfm_core::{ScoringConfig, Segment, SegmentedRecord};
    use rfm_reporting::{
        load_metrics, write_outputs, write_segment_details, ExportFormat, SegmentAnalysis,
    };
    use rfm_segmentation::SegmentationEngine;

    const METRICS: &str = "\
customer_id,recency_days,frequency,monetary,state,city
c1,5,10,2500.0,SP,sao paulo
c2,400,1,50.0,RJ,\"rio de janeiro
zona sul\"
c3,20,3,800.0,MG,
c4,600,1,20.0,,
c5,2,5,1200.0,SP,campinas
";

    #[test]
    fn test_csv_to_reports() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("customer_metrics.csv");
        fs::write(&input, METRICS).unwrap();

        let population = load_metrics(&input).unwrap();
        assert_eq!(population.len(), 5);

        let engine = SegmentationEngine::new(&ScoringConfig::default()).unwrap();
        let segmented = engine.run(population).unwrap();
        let segments: Vec<Segment> = segmented.iter().map(|r| r.segment).collect();
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

        let analysis = SegmentAnalysis::from_records(&segmented);
        assert_eq!(analysis.total_customers, 5);
        assert_eq!(analysis.total_revenue, 4570.0);
        assert_eq!(analysis.get(Segment::Champions).unwrap().customer_count, 2);
        assert_eq!(
            analysis.get(Segment::Champions).unwrap().top_state.as_deref(),
            Some("SP")
        );
        assert_eq!(analysis.at_risk().customers, 2);
        assert_eq!(analysis.top_states(1)[0].state, "SP");

        let out = dir.path().join("reports");
        let written = write_outputs(
            &out,
            &[ExportFormat::Csv, ExportFormat::Json],
            &segmented,
            &analysis,
        )
        .unwrap();
        assert_eq!(written.len(), 4);

        // Segmented CSV is itself a valid metrics table.
        let reloaded = load_metrics(&out.join("segmented_customers.csv")).unwrap();
        assert_eq!(reloaded.len(), 5);
        assert_eq!(reloaded[1].city.as_deref(), Some("rio de janeiro\nzona sul"));

        let json = fs::read_to_string(out.join("segmented_customers.json")).unwrap();
        let back: Vec<SegmentedRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, segmented);

        let details = write_segment_details(&out, &segmented).unwrap();
        assert_eq!(details.len(), 4);
        let champions = load_metrics(&out.join("champions_details.csv")).unwrap();
        assert_eq!(champions.len(), 2);
    }

    #[test]
    fn test_invalid_row_aborts_before_scoring() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("customer_metrics.json");
        fs::write(
            &input,
            r#"[{"customer_id": "a", "recency_days": -3, "frequency": 1, "monetary": 10.0}]"#,
        )
        .unwrap();

        let population = load_metrics(&input).unwrap();
        assert!(SegmentationEngine::default().run(population).is_err());
    }
}
