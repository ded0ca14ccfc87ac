//! Gateway error types and their HTTP mapping.
//!
//! The domain crates already classify every failure into an
//! [`rfq_types::ErrorKind`] (§7). This module just wraps that
//! classification so axum can turn it into a response, plus a couple of
//! error variants that only make sense at the gateway boundary itself
//! (bad config, a socket that won't bind).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rfq_types::{ChannelId, CoordinatorError, ErrorKind};
use serde::Serialize;

/// Gateway-level errors, including every coordinator-core failure that
/// reaches the HTTP boundary.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{0}")]
    Coordinator(#[from] CoordinatorError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("server bind error: {0}")]
    Bind(String),

    #[error("malformed request body: {0}")]
    BadRequest(String),
}

impl GatewayError {
    pub fn shape(message: impl Into<String>) -> Self {
        Self::Coordinator(CoordinatorError::new(ErrorKind::Shape, message))
    }

    pub fn from_pipeline(err: rfq_pipeline::PipelineError, channel_id: ChannelId) -> Self {
        let kind = ErrorKind::from(&err);
        Self::Coordinator(CoordinatorError::new(kind, err.to_string()).with_channel(channel_id))
    }

    pub fn from_state(err: rfq_state::StateError, channel_id: ChannelId) -> Self {
        let kind = ErrorKind::from(&err);
        Self::Coordinator(CoordinatorError::new(kind, err.to_string()).with_channel(channel_id))
    }

    pub fn from_settlement(err: rfq_settlement::SettlementError, channel_id: ChannelId) -> Self {
        let kind = ErrorKind::from(&err);
        Self::Coordinator(CoordinatorError::new(kind, err.to_string()).with_channel(channel_id))
    }

    pub fn from_store(err: rfq_store::StoreError, channel_id: ChannelId) -> Self {
        let kind = ErrorKind::from(&err);
        Self::Coordinator(CoordinatorError::new(kind, err.to_string()).with_channel(channel_id))
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorBodyInner,
}

#[derive(Debug, Serialize)]
struct ErrorBodyInner {
    kind: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel_id: Option<String>,
}

fn status_for_kind(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Shape
        | ErrorKind::Range
        | ErrorKind::BadSignature
        | ErrorKind::NotParticipant
        | ErrorKind::WrongStatus
        | ErrorKind::InvalidParticipant
        | ErrorKind::InvalidDeposit
        | ErrorKind::TimeoutTooShort => StatusCode::BAD_REQUEST,

        ErrorKind::StaleNonce
        | ErrorKind::StaleTimestamp
        | ErrorKind::QuoteExpired
        | ErrorKind::AlreadyFilled => StatusCode::CONFLICT,

        ErrorKind::QuoteNotFound | ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InsufficientBalance => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::LockUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Overloaded => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::InvariantViolation => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, kind, message, channel_id) = match self {
            GatewayError::Coordinator(err) => (
                status_for_kind(err.kind),
                err.kind,
                err.message.clone(),
                err.channel_id.clone(),
            ),
            GatewayError::Config(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::InvariantViolation, msg, None)
            }
            GatewayError::Bind(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::InvariantViolation, msg, None)
            }
            GatewayError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorKind::Shape, msg, None),
        };

        let body = ErrorBody { error: ErrorBodyInner { kind: kind.to_string(), message, channel_id } };
        (status, Json(body)).into_response()
    }
}
