//! HTTP error envelope (§4.10): same shape as the teacher's `api::ApiError`
//! — `{status, message, code}`, rendered as `{"error": {code, message}}`.

use crate::mission::MissionError;
use crate::store::StoreError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub code: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            code: "BAD_REQUEST".to_string(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
            code: "NOT_FOUND".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": {
                "code": self.code,
                "message": self.message,
            }
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::not_found("resource not found"),
            StoreError::Backend(message) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message,
                code: "STORE_BACKEND".to_string(),
            },
            StoreError::Serialization(message) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message,
                code: "STORE_SERIALIZATION".to_string(),
            },
        }
    }
}

impl From<MissionError> for ApiError {
    fn from(err: MissionError) -> Self {
        match err {
            MissionError::AlreadyJoined => Self {
                status: StatusCode::CONFLICT,
                message: err.to_string(),
                code: "ALREADY_JOINED".to_string(),
            },
            MissionError::NotAMember => Self {
                status: StatusCode::BAD_REQUEST,
                message: err.to_string(),
                code: "NOT_A_MEMBER".to_string(),
            },
            MissionError::MissionNotFound => Self::not_found(err.to_string()),
            MissionError::Store(store_err) => store_err.into(),
        }
    }
}
