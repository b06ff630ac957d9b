mod common;

use common::{FailingInsights, RecordingInsights};
use policyiq::report::{
    insight::{narrate, INSIGHT_COMMENT_CAP},
    InsightSelection, Polarity,
};

fn selection(n: usize) -> InsightSelection {
    InsightSelection {
        polarity: Polarity::Negative,
        clause_id: "Section 4".into(),
        count: n,
        comments: (0..n).map(|i| format!("comment {i}")).collect(),
    }
}

#[tokio::test]
async fn forwards_at_most_the_first_fifteen_comments() {
    let requester = RecordingInsights::default();
    let text = narrate(&requester, "Data Act", &selection(20)).await;
    assert_eq!(text, "Citizens feel strongly about Section 4.");

    let requests = requester.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.comments.len(), INSIGHT_COMMENT_CAP);
    assert_eq!(request.comments[0], "comment 0");
    assert_eq!(request.comments[14], "comment 14");
    assert_eq!(request.sentiment, "negative");
    assert_eq!(request.law_name, "Data Act");
}

#[tokio::test]
async fn short_selections_are_forwarded_whole() {
    let requester = RecordingInsights::default();
    narrate(&requester, "Data Act", &selection(3)).await;
    assert_eq!(requester.requests()[0].comments.len(), 3);
}

#[tokio::test]
async fn backend_failure_degrades_to_a_placeholder() {
    let text = narrate(&FailingInsights, "Data Act", &selection(2)).await;
    assert!(text.starts_with("Could not generate insight due to API Error"));
    assert!(text.contains("rate limited"));
}
