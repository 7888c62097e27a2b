use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    response::{IntoResponse, Response},
    Json,
};
use cinedb_store::error::StoreError;
use http::StatusCode;
use serde::Serialize;
use serde_json::json;
use tracing::{error, warn};

use crate::retry::Transient;

pub type ApiResult<T, E = ApiError> = std::result::Result<T, E>;

/// Error of request handling, each kind maps to one HTTP status
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation failed: {0}")]
    Validation(#[from] garde::Report),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Upload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DatabaseError(cinedb_dal::Error),

    #[error("Storage error: {0}")]
    StoreError(#[from] StoreError),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<cinedb_dal::Error> for ApiError {
    fn from(value: cinedb_dal::Error) -> Self {
        match value {
            cinedb_dal::Error::RecordNotFound(what) => ApiError::ResourceNotFound(what),
            cinedb_dal::Error::Conflict(what) => ApiError::Conflict(what),
            other => ApiError::DatabaseError(other),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(value: MultipartError) -> Self {
        if value.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(value.body_text())
        } else {
            ApiError::InvalidRequest(value.body_text())
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(value: MultipartRejection) -> Self {
        ApiError::InvalidRequest(value.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        ApiError::InvalidRequest(value.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(value: QueryRejection) -> Self {
        ApiError::InvalidQuery(value.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(value: PathRejection) -> Self {
        ApiError::InvalidRequest(value.body_text())
    }
}

impl Transient for ApiError {
    fn is_transient(&self) -> bool {
        match self {
            ApiError::DatabaseError(e) => e.is_transient(),
            ApiError::StoreError(e) => e.is_transient(),
            _ => false,
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Field path as client sees it, `birth_date` becomes `birthDate`
fn wire_field_name(path: &str) -> String {
    let mut name = String::with_capacity(path.len());
    let mut upper = false;
    for c in path.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            name.extend(c.to_uppercase());
            upper = false;
        } else {
            name.push(c);
        }
    }
    name
}

pub fn field_errors(report: &garde::Report) -> Vec<FieldError> {
    report
        .iter()
        .map(|(path, error)| FieldError {
            field: wire_field_name(&path.to_string()),
            message: error.message().to_string(),
        })
        .collect()
}

const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred";

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Validation(report) => {
                warn!("Validation failed: {report}");
                let body = json!({
                    "error": "Validation failed",
                    "code": "VALIDATION_ERROR",
                    "fields": field_errors(report),
                });
                return (StatusCode::BAD_REQUEST, Json(body)).into_response();
            }
            ApiError::InvalidRequest(msg) | ApiError::InvalidQuery(msg) => {
                warn!("Bad request: {msg}");
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone())
            }
            ApiError::PayloadTooLarge(msg) => {
                warn!("Payload too large: {msg}");
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg.clone())
            }
            ApiError::ResourceNotFound(what) => {
                warn!("Not found: {what}");
                (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{what} not found"),
                )
            }
            ApiError::Conflict(what) => {
                warn!("Conflict: {what}");
                (
                    StatusCode::CONFLICT,
                    "CONFLICT",
                    format!("{what} already exists"),
                )
            }
            ApiError::DatabaseError(e) => {
                error!(error = %e, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    INTERNAL_ERROR_MESSAGE.to_string(),
                )
            }
            ApiError::StoreError(e) => {
                error!(error = %e, "Storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    INTERNAL_ERROR_MESSAGE.to_string(),
                )
            }
            ApiError::InternalError(msg) => {
                error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    INTERNAL_ERROR_MESSAGE.to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_wire_field_name() {
        assert_eq!(wire_field_name("nombre"), "nombre");
        assert_eq!(wire_field_name("fecha_nacimiento"), "fechaNacimiento");
    }

    #[test]
    fn test_dal_error_mapping() {
        let err: ApiError = cinedb_dal::Error::RecordNotFound("Genre 1".into()).into();
        assert!(matches!(err, ApiError::ResourceNotFound(_)));
        let err: ApiError = cinedb_dal::Error::Conflict("Genre Drama".into()).into();
        assert!(matches!(err, ApiError::Conflict(_)));
        let err: ApiError = cinedb_dal::Error::DatabaseError(sqlx::Error::PoolTimedOut).into();
        assert!(matches!(err, ApiError::DatabaseError(_)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_internal_error_does_not_leak() {
        let err = ApiError::StoreError(StoreError::BlobServiceError {
            status: 500,
            message: "secret account details".into(),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["code"], "INTERNAL_ERROR");
        assert_eq!(body["error"], INTERNAL_ERROR_MESSAGE);
        assert!(!body.to_string().contains("secret"));
    }

    #[derive(garde::Validate)]
    struct Sample {
        #[garde(required)]
        fecha_nacimiento: Option<u32>,
    }

    #[tokio::test]
    async fn test_validation_response() {
        use garde::Validate as _;
        let report = Sample {
            fecha_nacimiento: None,
        }
        .validate()
        .unwrap_err();
        let response = ApiError::Validation(report).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["fields"][0]["field"], "fechaNacimiento");
        assert!(body["fields"][0]["message"].is_string());
    }

    #[tokio::test]
    async fn test_not_found_response() {
        let response = ApiError::ResourceNotFound("Actor 7".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["code"], "NOT_FOUND");
        assert_eq!(body["error"], "Actor 7 not found");
    }
}
