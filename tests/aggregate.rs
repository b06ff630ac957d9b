mod common;

use common::analyzed;
use policyiq::report::{aggregate, Polarity};

#[test]
fn picks_most_negative_and_most_positive_clauses() {
    let mut records = Vec::new();
    for i in 0..3 {
        records.push(analyzed(&format!("a{i}"), Some("A"), Some("negative")));
    }
    for i in 0..5 {
        records.push(analyzed(&format!("b{i}"), Some("B"), Some("negative")));
    }
    for i in 0..2 {
        records.push(analyzed(&format!("c{i}"), Some("C"), Some("positive")));
    }
    records.push(analyzed("noise", None, None));

    let agg = aggregate(&records);

    let opposed = agg.opposed.as_ref().unwrap();
    assert_eq!(opposed.clause_id, "B");
    assert_eq!(opposed.count, 5);
    assert_eq!(opposed.comments, vec!["b0", "b1", "b2", "b3", "b4"]);

    let supported = agg.supported.as_ref().unwrap();
    assert_eq!(supported.clause_id, "C");
    assert_eq!(supported.count, 2);
    assert_eq!(supported.comments, vec!["c0", "c1"]);

    assert_eq!(agg.summary.count("A", "negative"), 3);
    assert_eq!(agg.summary.count("A", "positive"), 0);
    assert_eq!(agg.clean_count(), 10);
    assert_eq!(agg.distribution["negative"], 8);
}

#[test]
fn polarity_without_comments_has_no_selection() {
    let records = vec![
        analyzed("nice", Some("A"), Some("positive")),
        analyzed("great", Some("B"), Some("positive")),
    ];
    let agg = aggregate(&records);
    assert!(agg.selection(Polarity::Negative).is_none());
    assert_eq!(agg.selection(Polarity::Positive).unwrap().clause_id, "A");
}

#[test]
fn ties_keep_the_clause_seen_first() {
    let records = vec![
        analyzed("x", Some("Z"), Some("negative")),
        analyzed("y", Some("A"), Some("negative")),
    ];
    let agg = aggregate(&records);
    assert_eq!(agg.opposed.unwrap().clause_id, "Z");
}

#[test]
fn unclean_rows_are_ignored() {
    let records = vec![
        analyzed("irrelevant but labelled", None, Some("negative")),
        analyzed("linked but unlabelled", Some("A"), None),
    ];
    let agg = aggregate(&records);
    assert!(agg.summary.is_empty());
    assert!(agg.opposed.is_none());
    assert!(agg.supported.is_none());
    assert_eq!(agg.clean_count(), 0);
}

#[test]
fn empty_input_aggregates_to_nothing() {
    let agg = aggregate(&[]);
    assert!(agg.summary.is_empty());
    assert!(agg.distribution.is_empty());
    assert!(agg.opposed.is_none() && agg.supported.is_none());
}

#[test]
fn breakdown_is_zero_filled_in_label_order() {
    let records = vec![
        analyzed("x", Some("A"), Some("positive")),
        analyzed("y", Some("B"), Some("neutral")),
    ];
    let rows = aggregate(&records).summary.breakdown();
    assert_eq!(rows.len(), 2);
    let labels: Vec<&String> = rows[0].counts.keys().collect();
    assert_eq!(labels, ["negative", "neutral", "positive"]);
    assert_eq!(rows[0].counts["negative"], 0);
    assert_eq!(rows[1].counts["neutral"], 1);
}
