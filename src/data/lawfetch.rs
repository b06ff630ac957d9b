//! Law context fetcher: asks a hosted Gemini model for the key clauses of a law.

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};

use super::{
    corpus::{parse_clauses, Clause, CorpusSource},
    http::{check_status, http_client, with_retry, RemoteError, RetryPolicy},
};
use crate::{
    config::Settings,
    error::{PipelineError, Result},
};

const GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const GEMINI_MODEL: &str = "gemini-2.5-flash";
const SERVICE: &str = "law-context";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Remote clause corpus backed by the Gemini `generateContent` endpoint.
pub struct GeminiCorpus {
    client: Client,
    api_key: String,
    base_url: String,
    retry: RetryPolicy,
}

impl GeminiCorpus {
    /// Build from settings; fails if `GENAI_API_KEY` is missing.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings.require_genai_key()?.to_string();
        let client = http_client(settings.remote_timeout())
            .map_err(|e| PipelineError::external(SERVICE, e.to_string()))?;
        Ok(Self {
            client,
            api_key,
            base_url: GEMINI_BASE.to_string(),
            retry: RetryPolicy::with_attempts(settings.remote_max_attempts),
        })
    }

    /// Point the client at another host (proxies, local mocks).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[instrument(skip(self))]
    async fn fetch_clauses(&self, law_name: &str) -> Result<Vec<Clause>> {
        info!(%law_name, "fetching law context");
        let url = format!("{}/models/{}:generateContent", self.base_url, GEMINI_MODEL);
        let body = json!({
            "contents": [{ "parts": [{ "text": law_prompt(law_name) }] }],
            "generationConfig": {
                "temperature": 0.2,
                "maxOutputTokens": 4000,
                "responseMimeType": "application/json",
            },
        });

        let text = with_retry(&self.retry, SERVICE, || async {
            let resp = self
                .client
                .post(&url)
                .header(API_KEY_HEADER, &self.api_key)
                .json(&body)
                .send()
                .await?;
            let payload: GenerateResponse = check_status(resp).await?.json().await?;
            payload
                .first_text()
                .ok_or_else(|| RemoteError::Malformed("no candidate text in response".into()))
        })
        .await
        .map_err(|e| PipelineError::external(SERVICE, e.to_string()))?;

        let clauses = parse_clauses(strip_code_fence(&text))
            .map_err(|e| PipelineError::external(SERVICE, format!("unparseable clause list: {e}")))?;
        info!(count = clauses.len(), "retrieved clauses");
        Ok(clauses)
    }
}

impl CorpusSource for GeminiCorpus {
    fn fetch<'a>(&'a self, law_name: &'a str) -> BoxFuture<'a, Result<Vec<Clause>>> {
        Box::pin(self.fetch_clauses(law_name))
    }
}

fn law_prompt(law_name: &str) -> String {
    format!(
        r#"I need a structured summary of the law: "{law_name}".

Please provide a response strictly in valid JSON format.
Do not add markdown formatting like ```json ... ```. Just the raw JSON string.

The JSON should be a list of objects, where each object represents a key clause/section.
Structure:
[
    {{
        "clause_id": "Section 1",
        "title": "Short Title",
        "simple_summary": "One sentence explanation for a layman."
    }}
]

Focus on the 5-10 most important or controversial sections of this law."#
    )
}

/// Models occasionally wrap JSON in a fenced block despite being told not to.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[derive(Debug, Deserialize, Serialize, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize, Serialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize, Serialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize, Serialize)]
struct Part {
    text: Option<String>,
}

impl GenerateResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .find(|t| !t.trim().is_empty())
    }
}
