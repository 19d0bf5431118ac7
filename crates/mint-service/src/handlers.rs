//! API request handlers for the Mint Service

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use wormhole_common::{Error, ErrorKind, MintRequest, MintResponse};

use crate::service::MintService;

/// Shared application state
pub struct AppState {
    pub service: MintService,

    /// How long a request waits for its mint; a mint that already committed
    /// its nullifier keeps running after the deadline
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(service: MintService, request_timeout: Duration) -> Self {
        Self {
            service,
            request_timeout,
        }
    }
}

/// API Error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

impl ApiError {
    fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message,
            "kind": self.kind
        });

        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let (status, kind) = match err.kind() {
            ErrorKind::Validation => (StatusCode::BAD_REQUEST, "validation"),
            ErrorKind::Resource => (StatusCode::NOT_FOUND, "resource"),
            ErrorKind::Replay => (StatusCode::CONFLICT, "replay"),
            ErrorKind::Verification => (StatusCode::FORBIDDEN, "verification"),
            ErrorKind::Backend => (StatusCode::BAD_GATEWAY, "backend"),
            ErrorKind::Storage => (StatusCode::SERVICE_UNAVAILABLE, "storage"),
        };
        ApiError::new(status, kind, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, "validation", rejection.body_text())
    }
}

/// Health check endpoint
pub async fn health_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.health_check().await.map_err(|e| {
        error!("Health check failed: {}", e);
        ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "storage", e.to_string())
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": "mint-service",
        "minter": state.service.issuer().minter()
    })))
}

/// Mint against a verified proof
pub async fn mint_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MintRequest>, JsonRejection>,
) -> Result<Json<MintResponse>, ApiError> {
    let Json(req) = payload?;
    info!("Mint request: to={} proof={}", req.to, req.proof_data);

    match tokio::time::timeout(state.request_timeout, state.service.mint(req)).await {
        Ok(result) => Ok(Json(result?)),
        Err(_) => {
            warn!(
                "Mint request exceeded its {}s deadline",
                state.request_timeout.as_secs()
            );
            Err(ApiError::new(
                StatusCode::GATEWAY_TIMEOUT,
                "timeout",
                format!(
                    "mint did not complete within {}s",
                    state.request_timeout.as_secs()
                ),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wormhole_common::Nullifier;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::InvalidAmount, StatusCode::BAD_REQUEST),
            (Error::MissingProof, StatusCode::BAD_REQUEST),
            (
                Error::ProofNotFound("/x/proof".into()),
                StatusCode::NOT_FOUND,
            ),
            (
                Error::NullifierReplay(Nullifier::from(1u64)),
                StatusCode::CONFLICT,
            ),
            (Error::ProofRejected, StatusCode::FORBIDDEN),
            (Error::Backend("down".into()), StatusCode::BAD_GATEWAY),
            (Error::Store("down".into()), StatusCode::SERVICE_UNAVAILABLE),
            (
                Error::Io(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied")),
                StatusCode::NOT_FOUND,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn test_error_message_preserved() {
        let api = ApiError::from(Error::InvalidAmount);
        assert_eq!(api.message, "mint amount must be greater than 0");
        assert_eq!(api.kind, "validation");
    }
}
