//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use utoipa::OpenApi;

use ledger_types::{
    AccountResponse, ApiKeyRepository, ApiKeyResponse, AppError, Caller, CreateAccountRequest,
    CreateApiKeyRequest, CreatePaymentRequest, LedgerRepository, PaymentId, PaymentResponse,
    UserId,
};

use super::extract::ValidJson;
use crate::PaymentService;
use crate::openapi::ApiDoc;

/// Message shown to callers for every internal failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "Please contact sys admin";

/// Application state shared across handlers.
pub struct AppState<R: LedgerRepository> {
    pub service: PaymentService<R>,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, details) = match self.0 {
            AppError::Validation(details) => {
                let message = details
                    .first()
                    .map(|d| d.message.clone())
                    .unwrap_or_else(|| "Validation failed".into());
                (StatusCode::BAD_REQUEST, message, details)
            }
            err @ AppError::Conflict(_) => (StatusCode::CONFLICT, err.to_string(), Vec::new()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, Vec::new()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, Vec::new()),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_ERROR_MESSAGE.to_string(),
                Vec::new(),
            ),
        };

        let body = json!({
            "error": message,
            "code": status.as_u16(),
            "details": details,
        });

        (status, Json(body)).into_response()
    }
}

/// Parses a path segment as a payment id; a malformed id is reported the
/// same way as an unknown one.
fn parse_payment_id(raw: &str) -> Result<PaymentId, AppError> {
    raw.parse()
        .map_err(|_| AppError::validation("Payment not exists", &["paymentId"], json!(raw)))
}

fn require_privileged(caller: &Caller) -> Result<(), AppError> {
    if caller.is_privileged() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Back office role required".into()))
    }
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

/// OpenAPI document for the routes below.
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

// ─────────────────────────────────────────────────────────────────────────────
// Accounts
// ─────────────────────────────────────────────────────────────────────────────

/// Open an account for the calling client.
#[tracing::instrument(skip(state, req), fields(user_id = %caller.user_id))]
pub async fn create_account<R: LedgerRepository>(
    State(state): State<Arc<AppState<R>>>,
    Extension(caller): Extension<Caller>,
    ValidJson(req): ValidJson<CreateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if caller.is_privileged() {
        return Err(AppError::Forbidden("Only clients own accounts".into()).into());
    }

    let account = state
        .service
        .create_account(caller.user_id, req.currency)
        .await?;
    Ok((StatusCode::CREATED, Json(AccountResponse::from(account))))
}

/// List the accounts visible to the caller.
#[tracing::instrument(skip(state), fields(user_id = %caller.user_id))]
pub async fn list_accounts<R: LedgerRepository>(
    State(state): State<Arc<AppState<R>>>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    let accounts = state.service.list_accounts(&caller).await?;
    let body: Vec<AccountResponse> = accounts.into_iter().map(Into::into).collect();
    Ok(Json(body))
}

// ─────────────────────────────────────────────────────────────────────────────
// Payments
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip(state), fields(user_id = %caller.user_id))]
pub async fn list_payments<R: LedgerRepository>(
    State(state): State<Arc<AppState<R>>>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    let payments = state.service.list_payments(&caller).await?;
    let body: Vec<PaymentResponse> = payments.into_iter().map(Into::into).collect();
    Ok(Json(body))
}

#[tracing::instrument(skip(state), fields(user_id = %caller.user_id, payment_id = %id))]
pub async fn get_payment<R: LedgerRepository>(
    State(state): State<Arc<AppState<R>>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let payment_id = parse_payment_id(&id)?;
    let payment = state.service.get_payment(&caller, payment_id).await?;
    Ok(Json(PaymentResponse::from(payment)))
}

#[tracing::instrument(
    skip(state, req),
    fields(user_id = %caller.user_id, payer_id = %req.payer_id, amount = req.amount)
)]
pub async fn create_payment<R: LedgerRepository>(
    State(state): State<Arc<AppState<R>>>,
    Extension(caller): Extension<Caller>,
    ValidJson(req): ValidJson<CreatePaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let payment = state.service.create_payment(&caller, req).await?;
    Ok((StatusCode::CREATED, Json(PaymentResponse::from(payment))))
}

/// Approve a payment. Back office only.
#[tracing::instrument(skip(state), fields(user_id = %caller.user_id, payment_id = %id))]
pub async fn approve_payment<R: LedgerRepository>(
    State(state): State<Arc<AppState<R>>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require_privileged(&caller)?;
    let payment_id = parse_payment_id(&id)?;
    state.service.approve_payment(&caller, payment_id).await?;
    Ok(StatusCode::OK)
}

#[tracing::instrument(skip(state), fields(user_id = %caller.user_id, payment_id = %id))]
pub async fn cancel_payment<R: LedgerRepository>(
    State(state): State<Arc<AppState<R>>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let payment_id = parse_payment_id(&id)?;
    state.service.cancel_payment(&caller, payment_id).await?;
    Ok(StatusCode::OK)
}

// ─────────────────────────────────────────────────────────────────────────────
// API keys
// ─────────────────────────────────────────────────────────────────────────────

/// Issue an API key. Back office only; the raw key is returned once.
#[tracing::instrument(skip(state, req), fields(key_name = %req.name, role = %req.role))]
pub async fn create_api_key<R: LedgerRepository + ApiKeyRepository>(
    State(state): State<Arc<AppState<R>>>,
    Extension(caller): Extension<Caller>,
    ValidJson(req): ValidJson<CreateApiKeyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_privileged(&caller)?;

    if req.name.trim().is_empty() {
        let err = AppError::validation("'name' must not be empty", &["name"], json!(req.name));
        return Err(err.into());
    }

    let user_id = req.user_id.unwrap_or_else(UserId::new);
    let (api_key, raw_key) = state
        .service
        .repo()
        .create_api_key(&req.name, user_id, req.role)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to issue API key");
            AppError::Internal(e.to_string())
        })?;

    tracing::info!(key_id = %api_key.id, user_id = %api_key.user_id, "API key issued");
    Ok((
        StatusCode::CREATED,
        Json(ApiKeyResponse {
            id: api_key.id,
            name: api_key.name,
            user_id: api_key.user_id,
            role: api_key.role,
            api_key: raw_key,
        }),
    ))
}
