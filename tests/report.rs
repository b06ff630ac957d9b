mod common;

use common::analyzed;
use policyiq::report::{
    aggregate, render::render_text, render::write_outputs, AnalysisReport, ClauseInsight,
    Insights,
};

fn sample_report() -> AnalysisReport {
    let records = vec![
        analyzed("fees are bad", Some("Section 2"), Some("negative")),
        analyzed("fees hurt", Some("Section 2"), Some("negative")),
        analyzed("consent is good", Some("Section 1"), Some("positive")),
        analyzed("weather", None, None),
    ];
    let aggregation = aggregate(&records);
    AnalysisReport {
        law_name: "Data Act".into(),
        headers: vec!["Comment".into()],
        records,
        aggregation,
        insights: Insights {
            opposed: Some(ClauseInsight {
                clause_id: "Section 2".into(),
                narrative_text: "Citizens feel the fees are too high.".into(),
            }),
            supported: Some(ClauseInsight {
                clause_id: "Section 1".into(),
                narrative_text: "Support is driven by clearer consent.".into(),
            }),
        },
    }
}

#[test]
fn text_report_snapshot() {
    insta::assert_snapshot!(render_text(&sample_report()), @r"
    LAW IMPACT REPORT: Data Act
    Comments: 4 total, 3 linked to a clause, 3 classified

    MOST OPPOSED:  Section 2 (2 negative comments)
      Insight: Citizens feel the fees are too high.
    MOST SUPPORTED: Section 1 (1 positive comments)
      Insight: Support is driven by clearer consent.

    Clause breakdown:
    clause     negative   neutral  positive
    Section 2         2         0         0
    Section 1         0         0         1
    ");
}

#[test]
fn missing_polarity_reads_not_enough_data() {
    let records = vec![analyzed("good", Some("Section 1"), Some("positive"))];
    let aggregation = aggregate(&records);
    let report = AnalysisReport {
        law_name: "Act".into(),
        headers: vec!["Comment".into()],
        records,
        aggregation,
        insights: Insights::default(),
    };
    let text = render_text(&report);
    assert!(text.contains("MOST OPPOSED:  not enough data"));
    assert!(text.contains("MOST SUPPORTED: Section 1 (1 positive comments)"));
}

#[test]
fn writes_clean_table_insights_and_text() {
    let dir = tempfile::tempdir().unwrap();
    let report = sample_report();
    let paths = write_outputs(&report, dir.path(), false).unwrap();

    assert!(paths.table.ends_with("Data_Act_analysis.csv"));
    let mut reader = csv::Reader::from_path(&paths.table).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(
        headers,
        [
            "Comment",
            "Linked_Clause",
            "Match_Confidence",
            "Sentiment_Label",
            "Sentiment_Score"
        ]
    );
    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(&rows[0][1], "Section 2");
    assert_eq!(&rows[0][2], "0.8");
    assert_eq!(&rows[0][3], "negative");

    let insights: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&paths.insights).unwrap()).unwrap();
    assert_eq!(insights["opposed"]["clause_id"], "Section 2");
    assert_eq!(insights["supported"]["clause_id"], "Section 1");

    let text = std::fs::read_to_string(&paths.report).unwrap();
    assert!(text.starts_with("LAW IMPACT REPORT: Data Act"));
}

#[test]
fn all_rows_keeps_sentinels_at_the_boundary() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_outputs(&sample_report(), dir.path(), true).unwrap();
    let mut reader = csv::Reader::from_path(&paths.table).unwrap();
    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 4);
    assert_eq!(&rows[3][1], "Irrelevant");
    assert_eq!(&rows[3][3], "N/A");
}
