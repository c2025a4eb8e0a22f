// Route definitions for the testforge API

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::{handlers, AppState};

/// Room for the JSON envelope around an upload
const ENVELOPE_BYTES: usize = 64 * 1024;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/testcases/parse", post(handlers::parse_testcases))
        .route("/testcases/coerce", post(handlers::coerce_testcases))
        .route("/testcases/render", post(handlers::render_testcases))
        .route("/questions/validate", post(handlers::validate_question))
        .route("/tests/publish", post(handlers::publish_test))
        .route("/tests/edit", post(handlers::edit_test))
        .route("/tests/can-delete", post(handlers::can_delete_test))
        .route("/tests/check", post(handlers::check_test))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/health", get(handlers::health_check))
}

/// Largest request body accepted for a given upload limit.
///
/// Uploads travel JSON-escaped, so a newline-heavy file roughly doubles in size.
pub fn body_limit(max_upload_bytes: usize) -> usize {
    max_upload_bytes.saturating_mul(2).saturating_add(ENVELOPE_BYTES)
}

/// The full application, with the request body limit taken from the config
pub fn app(state: Arc<AppState>) -> Router {
    let limit = body_limit(state.config.max_upload_bytes);
    Router::new()
        .merge(routes())
        .layer(DefaultBodyLimit::max(limit))
        .with_state(state)
}
