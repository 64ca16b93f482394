//! Authentication middleware for protected routes.
//!
//! Ledger-scoped routes authenticate with a per-ledger API key in the
//! `X-Api-Key` header. Only the SHA-256 of the key is stored, so the lookup
//! hashes the presented plaintext and compares digests. The billing
//! endpoint uses a separate bearer service token, also compared by digest.

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::AppState;
use quill_db::ApiKeyRepository;
use quill_db::entities::ledgers;

/// Header carrying the per-ledger API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// API key middleware that resolves the calling ledger.
///
/// This middleware:
/// 1. Extracts the key from the `X-Api-Key` header
/// 2. Looks up the ledger by the key's SHA-256 digest
/// 3. Stores the ledger row in request extensions for handlers to access
pub async fn api_key_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(key) = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
    else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "missing_api_key",
                "message": "X-Api-Key header is required"
            })),
        )
            .into_response();
    };

    let repo = ApiKeyRepository::new((*state.db).clone());
    match repo.authenticate(key).await {
        Ok(Some(ledger)) => {
            request.extensions_mut().insert(ledger);
            next.run(request).await
        }
        Ok(None) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "invalid_api_key",
                "message": "Unknown or rotated API key"
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Database error authenticating API key");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "internal_error",
                    "message": "An error occurred"
                })),
            )
                .into_response()
        }
    }
}

/// Extractor for the authenticated ledger.
///
/// Use this in handlers behind [`api_key_middleware`]:
///
/// ```ignore
/// async fn handler(ledger: ApiLedger) -> impl IntoResponse {
///     let ledger_id = ledger.id();
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ApiLedger(pub ledgers::Model);

impl ApiLedger {
    /// Returns the ledger ID.
    #[must_use]
    pub fn id(&self) -> uuid::Uuid {
        self.0.id
    }

    /// Returns the owning organization ID.
    #[must_use]
    pub fn organization_id(&self) -> uuid::Uuid {
        self.0.organization_id
    }
}

impl<S> FromRequestParts<S> for ApiLedger
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ledgers::Model>()
            .cloned()
            .map(ApiLedger)
            .ok_or((
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "missing_api_key",
                    "message": "X-Api-Key header is required"
                })),
            ))
    }
}

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}

/// Verifies the billing service token by SHA-256 digest compare.
///
/// The plaintext token never touches configuration; only its hex digest is
/// configured, so a leaked config file does not leak the credential.
#[must_use]
pub fn verify_service_token(headers: &HeaderMap, expected_sha256: &str) -> bool {
    let Some(token) = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_bearer_token)
    else {
        return false;
    };

    let digest = hex::encode(Sha256::digest(token.as_bytes()));
    digest.eq_ignore_ascii_case(expected_sha256)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }

    #[test]
    fn test_service_token_digest_compare() {
        // sha256("secret-token")
        let expected = hex::encode(Sha256::digest(b"secret-token"));

        assert!(verify_service_token(
            &headers_with_bearer("secret-token"),
            &expected
        ));
        assert!(!verify_service_token(
            &headers_with_bearer("wrong-token"),
            &expected
        ));
        assert!(!verify_service_token(&HeaderMap::new(), &expected));
    }

    #[test]
    fn test_digest_compare_is_case_insensitive() {
        let expected = hex::encode(Sha256::digest(b"tok")).to_uppercase();
        assert!(verify_service_token(&headers_with_bearer("tok"), &expected));
    }
}
