//! Request and response shapes for the JSON API.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeQuery {
    /// Display name of the law the comments are about.
    pub law: String,
    /// Return every row instead of clean rows only.
    #[serde(default)]
    pub all_rows: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthDto {
    pub status: String,
    pub cached_reports: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDto {
    pub error: String,
}
