pub mod client;
pub mod models;
pub mod upstream;

pub use client::{extract_error_message, GatewayClient, GatewayError, ProxyClient};
pub use models::{PaymentArtifact, Transaction, TransactionRequest, TransactionStatus};
pub use upstream::{GatewayUpstream, UpstreamError, UpstreamResponse};
