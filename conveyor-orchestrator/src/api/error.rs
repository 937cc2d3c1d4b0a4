//! API Error Handling
//!
//! Maps controller errors onto status codes and the shared `{error, kind}` body.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use conveyor_core::dto::ErrorBody;

use crate::service::ControlError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    RateLimited { retry_after_secs: u64 },
    Control(ControlError),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Control(err) => match err {
                ControlError::IndexOutOfRange { .. } => StatusCode::BAD_REQUEST,
                ControlError::AlreadyRunning | ControlError::NoActiveRun => StatusCode::CONFLICT,
                ControlError::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retry_after = match &self {
            ApiError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };

        let body = match self {
            ApiError::BadRequest(msg) => ErrorBody {
                error: msg,
                kind: "bad_request".to_string(),
            },
            ApiError::RateLimited { retry_after_secs } => ErrorBody {
                error: format!("Too many requests, retry in {}s", retry_after_secs),
                kind: "rate_limited".to_string(),
            },
            ApiError::Control(ControlError::Persistence(err)) => {
                tracing::error!("Persistence error: {:?}", err);
                ErrorBody {
                    error: "State store unavailable, try again later".to_string(),
                    kind: "persistence".to_string(),
                }
            }
            ApiError::Control(err) => ErrorBody {
                error: err.to_string(),
                kind: err.kind().to_string(),
            },
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl From<ControlError> for ApiError {
    fn from(err: ControlError) -> Self {
        ApiError::Control(err)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
