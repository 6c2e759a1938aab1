use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::ban::BanError;
use crate::domain::error::DomainError;

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const BAN_FAILED: &str = "ban_failed";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
        }
    }

    pub fn bad_request(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

}

impl From<BanError> for ApiError {
    fn from(err: BanError) -> Self {
        if matches!(err, BanError::InvalidRequest { .. }) {
            return Self::bad_request("Invalid ban request", Some(err.to_string()));
        }
        Self::new(
            StatusCode::BAD_GATEWAY,
            codes::BAN_FAILED,
            "Cache server ban failed",
            Some(err.to_string()),
        )
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::bad_request("Invalid node", Some(err.to_string()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        (self.status, Json(body)).into_response()
    }
}
