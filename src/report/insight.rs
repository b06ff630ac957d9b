//! One-sentence narrative insights for the selected clauses.
//!
//! Narrative generation is best effort: a failing backend degrades the one
//! insight to a placeholder and never fails the run.

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument, warn};

use super::aggregate::InsightSelection;
use crate::{
    config::Settings,
    data::http::{check_status, http_client, with_retry, RemoteError, RetryPolicy},
    error::{PipelineError, Result},
};

/// Most comments forwarded to the narrative backend per selection.
pub const INSIGHT_COMMENT_CAP: usize = 15;

pub const NO_COMMENTS_PLACEHOLDER: &str = "No comments available to analyze.";
pub const DISABLED_PLACEHOLDER: &str = "Insight generation is disabled for this run.";

const GROQ_BASE: &str = "https://api.groq.com/openai/v1";
const GROQ_MODEL: &str = "llama-3.3-70b-versatile";
const SERVICE: &str = "insight";

/// Everything the narrative backend gets to see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsightRequest {
    pub law_name: String,
    pub clause_id: String,
    pub sentiment: String,
    pub comments: Vec<String>,
}

impl InsightRequest {
    /// Build from a selection, keeping the first [`INSIGHT_COMMENT_CAP`] comments.
    pub fn from_selection(law_name: &str, selection: &InsightSelection) -> Self {
        Self {
            law_name: law_name.to_string(),
            clause_id: selection.clause_id.clone(),
            sentiment: selection.polarity.label().to_string(),
            comments: selection
                .comments
                .iter()
                .take(INSIGHT_COMMENT_CAP)
                .cloned()
                .collect(),
        }
    }

    pub fn prompt(&self) -> String {
        let comments = self.comments.join("\n- ");
        format!(
            r#"You are a legal analyst. Here are some user comments regarding '{clause}' of the law: "{law}".
The general sentiment is {upper}.

USER COMMENTS:
- {comments}

TASK:
Summarize the MAIN REASON for this {sentiment} sentiment in exactly one clear, professional sentence.
Start with "Citizens feel..." or "The opposition is due to..." or "Support is driven by..."
Do not mention individual users."#,
            clause = self.clause_id,
            law = self.law_name,
            upper = self.sentiment.to_uppercase(),
            sentiment = self.sentiment,
        )
    }
}

/// Produces a one-sentence narrative for a request.
pub trait InsightRequester: Send + Sync {
    fn request<'a>(&'a self, request: &'a InsightRequest) -> BoxFuture<'a, anyhow::Result<String>>;
}

/// Ask `requester` for a narrative, degrading failures to a placeholder.
#[instrument(skip_all, fields(clause = %selection.clause_id, polarity = selection.polarity.label()))]
pub async fn narrate(
    requester: &dyn InsightRequester,
    law_name: &str,
    selection: &InsightSelection,
) -> String {
    let request = InsightRequest::from_selection(law_name, selection);
    if request.comments.is_empty() {
        return NO_COMMENTS_PLACEHOLDER.to_string();
    }
    match requester.request(&request).await {
        Ok(text) => text.trim().to_string(),
        Err(err) => {
            warn!(error = %format!("{err:#}"), "insight generation failed");
            format!("Could not generate insight due to API Error: {err:#}")
        }
    }
}

/// Groq chat completions (OpenAI-compatible) backend.
pub struct GroqInsights {
    client: Client,
    api_key: String,
    base_url: String,
    retry: RetryPolicy,
}

impl GroqInsights {
    /// Build from settings; fails if `GROQ_API_KEY` is missing.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings.require_groq_key()?.to_string();
        let client = http_client(settings.remote_timeout())
            .map_err(|e| PipelineError::external(SERVICE, e.to_string()))?;
        Ok(Self {
            client,
            api_key,
            base_url: GROQ_BASE.to_string(),
            retry: RetryPolicy::with_attempts(settings.remote_max_attempts),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn complete(&self, request: &InsightRequest) -> Result<String, RemoteError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": GROQ_MODEL,
            "messages": [
                { "role": "system", "content": "You are a concise legal data analyst." },
                { "role": "user", "content": request.prompt() },
            ],
            "temperature": 0.2,
            "max_tokens": 100,
        });
        info!(clause = %request.clause_id, comments = request.comments.len(), "requesting insight");
        with_retry(&self.retry, SERVICE, || async {
            let resp = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await?;
            let payload: ChatResponse = check_status(resp).await?.json().await?;
            payload
                .choices
                .into_iter()
                .find_map(|c| c.message.content)
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty())
                .ok_or_else(|| RemoteError::Malformed("completion has no content".into()))
        })
        .await
    }
}

impl InsightRequester for GroqInsights {
    fn request<'a>(&'a self, request: &'a InsightRequest) -> BoxFuture<'a, anyhow::Result<String>> {
        Box::pin(async move { Ok(self.complete(request).await?) })
    }
}

/// Used when narrative generation is switched off.
pub struct DisabledInsights;

impl InsightRequester for DisabledInsights {
    fn request<'a>(&'a self, _request: &'a InsightRequest) -> BoxFuture<'a, anyhow::Result<String>> {
        Box::pin(async { Ok(DISABLED_PLACEHOLDER.to_string()) })
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::aggregate::Polarity;

    #[test]
    fn prompt_mentions_clause_law_and_comments() {
        let request = InsightRequest {
            law_name: "Forest Conservation Act".into(),
            clause_id: "Section 2".into(),
            sentiment: "negative".into(),
            comments: vec!["too vague".into(), "hurts villages".into()],
        };
        let prompt = request.prompt();
        assert!(prompt.contains("'Section 2' of the law: \"Forest Conservation Act\""));
        assert!(prompt.contains("The general sentiment is NEGATIVE."));
        assert!(prompt.contains("- too vague\n- hurts villages"));
    }

    #[tokio::test]
    async fn empty_selection_skips_the_backend() {
        let selection = InsightSelection {
            polarity: Polarity::Positive,
            clause_id: "Section 1".into(),
            count: 0,
            comments: Vec::new(),
        };
        let text = narrate(&DisabledInsights, "Act", &selection).await;
        assert_eq!(text, NO_COMMENTS_PLACEHOLDER);
    }
}
