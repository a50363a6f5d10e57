//! Request extractors that report failures in the API error shape.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde_json::Value;

use ledger_types::AppError;

use super::handlers::ApiError;

/// `Json<T>` whose rejection (bad syntax, wrong field types, missing
/// content type) becomes a 400 validation error instead of axum's plain
/// text response.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ValidJson(value)),
            Err(rejection) => {
                tracing::warn!(status = %rejection.status(), "request body rejected");
                Err(ApiError(AppError::validation(
                    rejection.body_text(),
                    &["body"],
                    Value::Null,
                )))
            }
        }
    }
}
