//! Authentication middleware: resolves an API key to a `Caller`.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use ledger_repo::security::hash_api_key;
use ledger_types::{ApiKeyRepository, AppError, LedgerRepository};

use super::handlers::{ApiError, AppState};

/// Paths served without a key.
const PUBLIC_PATHS: [&str; 2] = ["/health", "/api-docs/openapi.json"];

/// Extracts the API key from the Authorization header.
/// Expected format: "Bearer <api_key>" or just "<api_key>"
fn extract_api_key(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?;
    Some(header.strip_prefix("Bearer ").unwrap_or(header).trim())
}

/// Hashes the presented key, looks it up, and inserts the resolved
/// `Caller` into the request extensions for the handlers.
///
/// Missing or unknown keys get 401; lookup failures get an opaque 500.
pub async fn auth_middleware<R: LedgerRepository + ApiKeyRepository>(
    State(state): State<Arc<AppState<R>>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if PUBLIC_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok());

    let api_key = match extract_api_key(auth_header) {
        Some(key) if !key.is_empty() => key,
        _ => return unauthorized("Missing or invalid Authorization header"),
    };

    let key_hash = hash_api_key(api_key);

    match state.service.repo().find_active_key(&key_hash).await {
        Ok(Some(key)) => {
            let caller = key.caller();
            tracing::debug!(user_id = %caller.user_id, role = %caller.role, "caller resolved");
            request.extensions_mut().insert(caller);
            next.run(request).await
        }
        Ok(None) => unauthorized("Invalid API key"),
        Err(e) => {
            tracing::error!(error = %e, "API key verification failed");
            ApiError(AppError::Internal(e.to_string())).into_response()
        }
    }
}

fn unauthorized(message: &str) -> Response {
    ApiError(AppError::Unauthorized(message.to_string())).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_api_key_bearer() {
        assert_eq!(
            extract_api_key(Some("Bearer sk_test_123")),
            Some("sk_test_123")
        );
    }

    #[test]
    fn test_extract_api_key_raw() {
        assert_eq!(extract_api_key(Some("sk_test_123")), Some("sk_test_123"));
    }

    #[test]
    fn test_extract_api_key_none() {
        assert_eq!(extract_api_key(None), None);
    }

    #[test]
    fn test_extract_api_key_empty_bearer() {
        assert_eq!(extract_api_key(Some("Bearer ")), Some(""));
    }
}
