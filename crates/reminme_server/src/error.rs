//! HTTP error taxonomy and JSON envelopes.
//!
//! # Responsibility
//! - Map core, auth and AI errors onto HTTP status codes.
//! - Render every failure as `{success: false, error}`.
//! - Provide extractors whose rejections use the same envelope.
//!
//! # Invariants
//! - Database and provider details are logged, never returned to clients.
//! - Another user's record is reported exactly like a missing one (404).

use axum::async_trait;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::{error, warn};
use reminme_ai::AiError;
use reminme_core::{AuthError, RepoError, ValidationError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    /// Missing, malformed, unknown or revoked bearer token.
    Unauthorized,
    /// Missing or invalid input; the message names the field.
    BadRequest(String),
    /// Entity kind that was not found for the caller.
    NotFound(&'static str),
    /// A required AI integration is not configured.
    Unavailable(String),
    /// An AI or vector provider failed.
    Upstream(String),
    /// Unexpected failure; the detail is only logged.
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Unauthorized => "unauthorized".to_string(),
            Self::BadRequest(message) => message.clone(),
            Self::NotFound(entity) => format!("{entity} not found"),
            Self::Unavailable(message) => message.clone(),
            Self::Upstream(_) => "upstream provider request failed".to_string(),
            Self::Internal(_) => "internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Internal(detail) => {
                error!("event=api_error module=server status=error kind=internal detail={detail}")
            }
            Self::Upstream(detail) => {
                warn!("event=api_error module=server status=error kind=upstream detail={detail}")
            }
            _ => {}
        }
        let body = serde_json::json!({
            "success": false,
            "error": self.client_message(),
        });
        (self.status(), Json(body)).into_response()
    }
}

impl From<RepoError> for ApiError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::BadRequest(err.to_string()),
            RepoError::NotFound { entity, .. } => Self::NotFound(entity),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(value: ValidationError) -> Self {
        Self::BadRequest(value.to_string())
    }
}

impl From<AiError> for ApiError {
    fn from(value: AiError) -> Self {
        match value {
            AiError::NotConfigured => Self::Unavailable("AI provider not configured".to_string()),
            other => Self::Upstream(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::InvalidToken => Self::Unauthorized,
            AuthError::Db(err) => Self::Internal(err.to_string()),
            other => Self::BadRequest(other.to_string()),
        }
    }
}

/// Wraps `value` as `{success: true, <key>: value}`.
pub fn envelope(key: &str, value: impl Serialize) -> ApiResult<Json<Value>> {
    let value = serde_json::to_value(value).map_err(|err| ApiError::Internal(err.to_string()))?;
    let mut body = Map::new();
    body.insert("success".to_string(), Value::Bool(true));
    body.insert(key.to_string(), value);
    Ok(Json(Value::Object(body)))
}

/// `{success: true}` with no payload, for deletes.
pub fn done() -> Json<Value> {
    Json(serde_json::json!({ "success": true }))
}

/// JSON body extractor rejecting with the error envelope.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| ApiError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Query string extractor rejecting with the error envelope.
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Query(value) =
            axum::extract::Query::<T>::from_request_parts(parts, state)
                .await
                .map_err(|rejection: QueryRejection| {
                    ApiError::BadRequest(rejection.body_text())
                })?;
        Ok(Self(value))
    }
}

/// Path parameter extractor rejecting with the error envelope.
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Path(value) =
            axum::extract::Path::<T>::from_request_parts(parts, state)
                .await
                .map_err(|rejection: PathRejection| {
                    ApiError::BadRequest(rejection.body_text())
                })?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::ApiError;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use reminme_ai::AiError;
    use reminme_core::{RepoError, ValidationError};
    use uuid::Uuid;

    #[test]
    fn repo_errors_map_to_client_buckets() {
        let validation: ApiError =
            RepoError::from(ValidationError::new("name", "is required")).into();
        assert_eq!(validation.into_response().status(), StatusCode::BAD_REQUEST);

        let missing: ApiError = RepoError::not_found("person", Uuid::new_v4()).into();
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);

        let internal: ApiError = RepoError::InvalidData("bad json".to_string()).into();
        assert_eq!(
            internal.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn ai_errors_distinguish_missing_provider_from_failures() {
        let missing: ApiError = AiError::NotConfigured.into();
        assert_eq!(
            missing.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );

        let failed: ApiError = AiError::Timeout.into();
        assert_eq!(failed.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let err = ApiError::Internal("no such table: people".to_string());
        assert_eq!(err.client_message(), "internal server error");
    }
}
