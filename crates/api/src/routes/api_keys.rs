//! API key rotation routes.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use serde_json::json;
use tracing::{error, info};

use crate::{AppState, middleware::ApiLedger};
use quill_db::ApiKeyRepository;

/// POST /api-keys/rotate - Rotate the calling ledger's API key.
///
/// The response is the only place the new plaintext ever appears; the key
/// used to authenticate this request stops working immediately.
async fn rotate_key(State(state): State<AppState>, ledger: ApiLedger) -> impl IntoResponse {
    let repo = ApiKeyRepository::new((*state.db).clone());

    match repo.rotate(ledger.id()).await {
        Ok(issued) => {
            info!(ledger_id = %ledger.id(), key_id = %issued.key.id, "API key rotated");
            (
                StatusCode::OK,
                Json(json!({
                    "api_key": issued.plaintext,
                    "rotated_at": issued.key.rotated_at,
                })),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, ledger_id = %ledger.id(), "Failed to rotate API key");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "internal_error",
                    "message": "An error occurred rotating the key"
                })),
            )
                .into_response()
        }
    }
}

/// Creates the API key routes (requires API key middleware externally).
pub fn routes() -> Router<AppState> {
    Router::new().route("/api-keys/rotate", post(rotate_key))
}
