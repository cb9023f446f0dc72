pub mod pix;

use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub credential: String,
    pub gateway_circuit: String,
}

/// Reports whether the proxy can serve requests: the gateway key must be present.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let configured = state.credentials.resolve().is_some();

    let health_response = HealthStatus {
        status: if configured { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        credential: if configured { "configured" } else { "missing" }.to_string(),
        gateway_circuit: state.upstream.circuit_state(),
    };

    let status_code = if configured {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(health_response))
}
