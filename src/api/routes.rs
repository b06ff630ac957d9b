//! HTTP route handlers for Axum.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use tracing::warn;

use super::{
    types::{AnalyzeQuery, ErrorDto, HealthDto},
    AppState,
};
use crate::error::PipelineError;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorDto>)>;

pub async fn health(State(state): State<AppState>) -> Json<HealthDto> {
    Json(HealthDto {
        status: "ok".into(),
        cached_reports: state.service.cache().len(),
    })
}

/// `POST /analyze?law=<name>` with the raw CSV upload as the body.
pub async fn analyze(
    State(state): State<AppState>,
    Query(query): Query<AnalyzeQuery>,
    body: Bytes,
) -> ApiResult<Value> {
    if query.law.trim().is_empty() {
        return Err(bad_request("query parameter 'law' must not be empty"));
    }
    let report = state
        .service
        .analyze(query.law.trim(), body.to_vec())
        .await
        .map_err(|err| {
            warn!(error = %err, "analysis failed");
            (status_for(&err), Json(ErrorDto { error: err.to_string() }))
        })?;
    let dto = serde_json::to_value(report.to_dto(query.all_rows)).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorDto { error: e.to_string() }),
        )
    })?;
    Ok(Json(dto))
}

fn bad_request(message: &str) -> (StatusCode, Json<ErrorDto>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorDto {
            error: message.to_string(),
        }),
    )
}

pub fn status_for(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::InputSchema(_) | PipelineError::Csv(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::ExternalService { .. } => StatusCode::BAD_GATEWAY,
        PipelineError::Configuration(_)
        | PipelineError::Stage { .. }
        | PipelineError::Json(_)
        | PipelineError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
