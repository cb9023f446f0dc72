use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use crate::error::AppError;
use crate::gateway::UpstreamResponse;
use crate::AppState;

pub const CREATE_PROXY_MESSAGE: &str =
    "Error connecting to the payment gateway. Please try again.";
pub const STATUS_PROXY_MESSAGE: &str = "Error checking payment status.";
pub const MISSING_ID_MESSAGE: &str = "Transaction ID missing.";

/// `POST /api/pix`: forwards the body to the gateway with the server-side key.
pub async fn create_transaction(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    let api_key = state.credentials.resolve().ok_or_else(|| {
        tracing::error!("Gateway API key is not configured");
        AppError::Configuration
    })?;

    let Json(body) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    match state.upstream.create_transaction(&api_key, &body).await {
        Ok(response) => Ok(relay(response)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to create transaction at payment gateway");
            Err(AppError::Proxy(CREATE_PROXY_MESSAGE.to_string()))
        }
    }
}

/// `GET /api/pix/:id`: status lookup for one transaction.
pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let api_key = state.credentials.resolve().ok_or_else(|| {
        tracing::error!("Gateway API key is not configured");
        AppError::Configuration
    })?;

    let id = id.trim();
    if id.is_empty() {
        return Err(AppError::BadRequest(MISSING_ID_MESSAGE.to_string()));
    }

    match state.upstream.get_transaction(&api_key, id).await {
        Ok(response) => Ok(relay(response)),
        Err(e) => {
            tracing::error!(transaction_id = %id, error = %e, "Failed to check transaction status");
            Err(AppError::Proxy(STATUS_PROXY_MESSAGE.to_string()))
        }
    }
}

/// `GET /api/pix/`: a status lookup without an id.
pub async fn missing_transaction_id(State(state): State<AppState>) -> AppError {
    if state.credentials.resolve().is_none() {
        return AppError::Configuration;
    }
    AppError::BadRequest(MISSING_ID_MESSAGE.to_string())
}

pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

fn relay(response: UpstreamResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);
    (status, Json(response.body)).into_response()
}
