pub mod amount;
pub mod checkout;
pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod middleware;
pub mod startup;
pub mod utils;
pub mod validation;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::{ApiKeySource, Config};
use crate::gateway::GatewayUpstream;

#[derive(Clone)]
pub struct AppState {
    pub upstream: GatewayUpstream,
    pub credentials: ApiKeySource,
    pub log_request_body: bool,
    pub cors_allowed_origins: Option<Vec<String>>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        let upstream = GatewayUpstream::with_circuit_breaker(
            config.gateway_base_url.clone(),
            Duration::from_secs(config.gateway_timeout_secs),
            config.circuit_breaker_failures,
            config.circuit_breaker_reset_secs,
        );

        AppState {
            upstream,
            credentials: config.api_key_source(),
            log_request_body: config.log_request_body,
            cors_allowed_origins: config.cors_allowed_origins.clone(),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(state.cors_allowed_origins.as_deref());

    let app = Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/pix",
            post(handlers::pix::create_transaction).fallback(handlers::pix::method_not_allowed),
        )
        .route(
            "/api/pix/",
            get(handlers::pix::missing_transaction_id)
                .fallback(handlers::pix::method_not_allowed),
        )
        .route(
            "/api/pix/:id",
            get(handlers::pix::get_transaction).fallback(handlers::pix::method_not_allowed),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::request_logger_middleware,
        ))
        .with_state(state);

    match cors {
        Some(cors) => app.layer(cors),
        None => app,
    }
}

fn cors_layer(origins: Option<&[String]>) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins?
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE]),
    )
}
