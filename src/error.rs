use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::auth::store::StoreError;

/// One field with everything wrong about it, so a client gets the full
/// picture in a single round trip.
#[derive(Debug, Serialize)]
pub struct FieldError {
    pub field: String,
    pub messages: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    input_errors: Vec<FieldError>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed on {field}")]
    Validation {
        field: &'static str,
        messages: Vec<String>,
    },

    #[error("{message}")]
    Conflict {
        field: &'static str,
        message: &'static str,
    },

    #[error("{message}")]
    NotFound {
        field: &'static str,
        message: &'static str,
    },

    #[error("{message}")]
    Unauthorized {
        field: &'static str,
        message: &'static str,
    },

    #[error("credential store unavailable")]
    Dependency(#[source] StoreError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Uniform rejection for every refresh-token failure. Expired, forged
    /// and stale-reference tokens must be indistinguishable to the caller.
    pub fn invalid_refresh_token() -> Self {
        ApiError::Unauthorized {
            field: "refreshToken",
            message: "Invalid refresh token",
        }
    }

    pub fn invalid_access_token() -> Self {
        ApiError::Unauthorized {
            field: "accessToken",
            message: "Invalid access token",
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => ApiError::Conflict {
                field: "email",
                message: "User already exists",
            },
            unavailable @ StoreError::Unavailable(_) => ApiError::Dependency(unavailable),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, field, messages) = match self {
            ApiError::Validation { field, messages } => (StatusCode::BAD_REQUEST, field, messages),
            ApiError::Conflict { field, message } => {
                (StatusCode::CONFLICT, field, vec![message.to_string()])
            }
            ApiError::NotFound { field, message } => {
                (StatusCode::NOT_FOUND, field, vec![message.to_string()])
            }
            ApiError::Unauthorized { field, message } => {
                (StatusCode::UNAUTHORIZED, field, vec![message.to_string()])
            }
            ApiError::Dependency(err) => {
                error!(error = %err, "credential store failure");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "service",
                    vec!["Service temporarily unavailable".to_string()],
                )
            }
            ApiError::Internal(err) => {
                error!(error = %err, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "server",
                    vec!["Internal server error".to_string()],
                )
            }
        };

        let body = ErrorBody {
            input_errors: vec![FieldError {
                field: field.to_string(),
                messages,
            }],
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_uses_input_errors_wire_shape() {
        let body = ErrorBody {
            input_errors: vec![FieldError {
                field: "password".into(),
                messages: vec!["too weak".into()],
            }],
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("inputErrors"));
        assert!(json.contains("password"));
        assert!(json.contains("too weak"));
    }

    #[test]
    fn store_conflict_maps_to_conflict_on_email() {
        let err = ApiError::from(StoreError::DuplicateEmail);
        match err {
            ApiError::Conflict { field, .. } => assert_eq!(field, "email"),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn store_unavailable_maps_to_dependency() {
        let err = ApiError::from(StoreError::Unavailable("connection refused".into()));
        assert!(matches!(err, ApiError::Dependency(_)));
    }
}
