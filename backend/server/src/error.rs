use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload")]
    MalformedPayload,

    #[error("Email and password are required")]
    MissingCredentials,

    #[error("user_id is required")]
    MissingUserId,

    #[error("Authorization bearer token is required")]
    MissingToken,

    #[error("Invalid {0}")]
    InvalidField(&'static str),

    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Unexpected upstream response: {0}")]
    UnexpectedResponse(&'static str),

    #[error("Upstream error: {0}")]
    Upstream(#[from] reqwest::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MalformedPayload
            | AppError::MissingCredentials
            | AppError::MissingUserId
            | AppError::InvalidField(_) => StatusCode::BAD_REQUEST,
            AppError::MissingToken | AppError::Rejected { status: 401 | 403, .. } => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Rejected { .. } => StatusCode::BAD_REQUEST,
            AppError::ProfileNotFound(_) => StatusCode::NOT_FOUND,
            AppError::UnexpectedResponse(_) | AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(String),

    #[error("Invalid {key} value: {reason}")]
    Invalid { key: String, reason: String },
}
