use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::AuthError;
use crate::models::ValidationError;
use crate::services::CoachingError;

/// Error type shared by every handler
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("{message}")]
    Upstream { code: &'static str, message: String },
    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Auth(e) => e.status_code(),
            ApiError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(ValidationError::MissingFields(_)) => "missing_fields",
            ApiError::Validation(ValidationError::Invalid { .. }) => "invalid_field",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::Auth(e) => e.code(),
            ApiError::Upstream { code, .. } => *code,
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<CoachingError> for ApiError {
    fn from(err: CoachingError) -> Self {
        match err {
            CoachingError::Storage(e) => ApiError::Internal(e),
            CoachingError::Llm(e) => ApiError::Upstream {
                code: "llm_failed",
                message: format!("{:#}", e),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = match self {
            ApiError::Auth(auth) => return auth.into_response(),
            err => err,
        };

        let status = err.status_code();
        if status.is_server_error() {
            error!(code = err.code(), "Request failed: {}", err);
        }

        let mut body = json!({
            "success": false,
            "error": err.code(),
            "message": err.to_string(),
        });

        match &err {
            ApiError::Validation(ValidationError::MissingFields(fields)) => {
                body["missing"] = json!(fields);
            }
            ApiError::Validation(ValidationError::Invalid { field, .. }) => {
                body["field"] = json!(field);
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let missing = ApiError::from(ValidationError::MissingFields(vec!["message".into()]));
        assert_eq!(missing.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(missing.code(), "missing_fields");

        assert_eq!(ApiError::NotFound("Profile").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(AuthError::InsufficientPermissions).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::Upstream {
                code: "forward_failed",
                message: "boom".into()
            }
            .status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(anyhow::anyhow!("db down")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_llm_failure_maps_to_bad_gateway() {
        let err = ApiError::from(CoachingError::Llm(anyhow::anyhow!("timeout")));
        assert_eq!(err.code(), "llm_failed");
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }
}
