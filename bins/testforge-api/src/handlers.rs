// HTTP route handlers for the testforge API

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use testforge_common::gate;
use testforge_common::parser::{self, FileFormat, MalformedInputError};
use testforge_common::validator::{self, FieldError, ValidationMode};
use testforge_common::{PublishError, QuestionDraft, Test, TestCaseBundle, TestPatch};
use tracing::{info, warn};

use crate::{metrics, AppState};

#[derive(Debug, Deserialize)]
pub struct ParseRequest {
    pub content: String,
    #[serde(default)]
    pub format: Option<FileFormat>,
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    pub bundle: TestCaseBundle,
    pub format: FileFormat,
}

#[derive(Debug, Serialize)]
pub struct RenderResponse {
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ValidateParams {
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub question: QuestionDraft,
    pub advisories: Vec<FieldError>,
}

#[derive(Debug, Serialize)]
pub struct FieldErrorsResponse {
    pub errors: Vec<FieldError>,
}

#[derive(Debug, Deserialize)]
pub struct EditRequest {
    pub test: Test,
    pub patch: TestPatch,
}

#[derive(Debug, Deserialize)]
pub struct CanDeleteRequest {
    pub test: Test,
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct CanDeleteResponse {
    pub deletable: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_seconds: u64,
}

/// Explicit format wins, then the file extension, then the configured default
fn resolve_format(payload: &ParseRequest, default: FileFormat) -> FileFormat {
    payload
        .format
        .or_else(|| payload.file_name.as_deref().map(FileFormat::from_file_name))
        .unwrap_or(default)
}

fn upload_too_large(size: Option<usize>, limit: usize) -> Response {
    metrics::record_ingestion_rejected("too_large");
    warn!(?size, limit, "Rejected oversized test case upload");
    let err = MalformedInputError::new(format!("content exceeds the {} byte upload limit", limit));
    (StatusCode::PAYLOAD_TOO_LARGE, Json(err)).into_response()
}

/// POST /testcases/parse - Turn an uploaded file into a bundle
pub async fn parse_testcases(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ParseRequest>, JsonRejection>,
) -> Response {
    let limit = state.config.max_upload_bytes;
    let payload = match payload {
        Ok(Json(payload)) => payload,
        // Body cut off by the transport limit
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return upload_too_large(None, limit);
        }
        Err(rejection) => return rejection.into_response(),
    };
    if payload.content.len() > limit {
        return upload_too_large(Some(payload.content.len()), limit);
    }

    let format = resolve_format(&payload, state.config.default_format);

    match parser::parse(&payload.content, format) {
        Ok(bundle) => {
            metrics::record_bundle_parsed(&format.to_string());
            info!(
                format = %format,
                visible = bundle.visible.len(),
                hidden = bundle.hidden.len(),
                "Parsed test case upload"
            );
            (StatusCode::OK, Json(bundle)).into_response()
        }
        Err(e) => {
            metrics::record_ingestion_rejected("malformed");
            warn!(format = %format, reason = %e, "Rejected malformed test case upload");
            (StatusCode::UNPROCESSABLE_ENTITY, Json(e)).into_response()
        }
    }
}

/// POST /testcases/coerce - Normalize previously saved test cases
pub async fn coerce_testcases(Json(raw): Json<Value>) -> Response {
    match parser::coerce_to_bundle(&raw) {
        Ok(bundle) => (StatusCode::OK, Json(bundle)).into_response(),
        Err(e) => {
            metrics::record_ingestion_rejected("uncoercible");
            warn!(reason = %e, "Could not coerce saved test cases");
            (StatusCode::UNPROCESSABLE_ENTITY, Json(e)).into_response()
        }
    }
}

/// POST /testcases/render - Render a bundle back into a file format
pub async fn render_testcases(Json(payload): Json<RenderRequest>) -> Response {
    match parser::render(&payload.bundle, payload.format) {
        Ok(content) => (StatusCode::OK, Json(RenderResponse { content })).into_response(),
        Err(e) => {
            tracing::error!("Failed to render bundle as {}: {}", payload.format, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// POST /questions/validate - Validate one question draft
pub async fn validate_question(
    Query(params): Query<ValidateParams>,
    Json(question): Json<QuestionDraft>,
) -> Response {
    let mode = if params.strict {
        ValidationMode::Strict
    } else {
        ValidationMode::Lenient
    };

    match validator::validate(&question, mode) {
        Ok(normalized) => {
            metrics::record_question_validated("valid");
            let advisories = validator::advisories(&normalized);
            (
                StatusCode::OK,
                Json(ValidateResponse {
                    question: normalized,
                    advisories,
                }),
            )
                .into_response()
        }
        Err(errors) => {
            metrics::record_question_validated("invalid");
            info!(
                question_id = %question.id,
                kind = %question.kind,
                errors = errors.len(),
                "Question draft failed validation"
            );
            (StatusCode::UNPROCESSABLE_ENTITY, Json(FieldErrorsResponse { errors })).into_response()
        }
    }
}

fn publish_outcome(err: &PublishError) -> &'static str {
    match err {
        PublishError::AlreadyPublished => "already_published",
        PublishError::NoQuestions => "no_questions",
        PublishError::MissingCorrectAnswers { .. } => "missing_correct_answers",
        PublishError::IncompleteCodeQuestion { .. } => "incomplete_code_question",
        PublishError::InvalidQuestion { .. } => "invalid_question",
    }
}

/// POST /tests/publish - DRAFT -> PUBLISHED
pub async fn publish_test(Json(test): Json<Test>) -> Response {
    match gate::publish(&test) {
        Ok(published) => {
            metrics::record_publish_attempt("published");
            info!(
                test_id = %published.id,
                questions = published.questions.len(),
                "Test published"
            );
            (StatusCode::OK, Json(published)).into_response()
        }
        Err(e) => {
            let outcome = publish_outcome(&e);
            metrics::record_publish_attempt(outcome);
            warn!(test_id = %test.id, outcome, "Publish refused: {}", e);

            let status = match e {
                PublishError::AlreadyPublished => StatusCode::CONFLICT,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            };
            (status, Json(e)).into_response()
        }
    }
}

/// POST /tests/edit - Apply a patch, respecting the publication freeze
pub async fn edit_test(Json(payload): Json<EditRequest>) -> Response {
    match gate::apply_edit(&payload.test, &payload.patch) {
        Ok(edited) => (StatusCode::OK, Json(edited)).into_response(),
        Err(e) => {
            warn!(test_id = %payload.test.id, "Edit refused: {}", e);
            (StatusCode::CONFLICT, Json(e)).into_response()
        }
    }
}

/// POST /tests/can-delete - Whether a delete action may be offered
pub async fn can_delete_test(Json(payload): Json<CanDeleteRequest>) -> impl IntoResponse {
    let now = payload.now.unwrap_or_else(Utc::now);
    let deletable = gate::can_delete(&payload.test, now);

    (StatusCode::OK, Json(CanDeleteResponse { deletable }))
}

/// POST /tests/check - Form-level checks on the test settings
pub async fn check_test(Json(test): Json<Test>) -> impl IntoResponse {
    match gate::check_settings(&test) {
        Ok(()) => (StatusCode::OK, Json(FieldErrorsResponse { errors: vec![] })),
        Err(errors) => (StatusCode::UNPROCESSABLE_ENTITY, Json(FieldErrorsResponse { errors })),
    }
}

/// GET /metrics - Prometheus scrape endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    (StatusCode::OK, metrics::render_metrics())
}

/// GET /health - Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            uptime_seconds: state.start_time.elapsed().as_secs(),
        }),
    )
}
