use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::amount::Amount;
use crate::gateway::PaymentArtifact;

/// Receives display commands from the checkout.
///
/// Calls are made while the checkout holds its state lock, which is what
/// keeps them ordered against `cancel()`. Implementations must return
/// promptly and must not call back into the coordinator.
pub trait PresentationSink: Send + Sync {
    fn render_payment_artifact(&self, artifact: &PaymentArtifact, amount: Amount);

    fn render_success(&self);

    fn render_error(&self, message: &str);

    /// Navigate to `destination` once `delay` has passed.
    fn schedule_redirect(&self, delay: Duration, destination: &str);

    /// Drop a redirect scheduled earlier, if it has not fired yet.
    fn cancel_redirect(&self) {}
}

impl<T: PresentationSink + ?Sized> PresentationSink for Arc<T> {
    fn render_payment_artifact(&self, artifact: &PaymentArtifact, amount: Amount) {
        (**self).render_payment_artifact(artifact, amount)
    }

    fn render_success(&self) {
        (**self).render_success()
    }

    fn render_error(&self, message: &str) {
        (**self).render_error(message)
    }

    fn schedule_redirect(&self, delay: Duration, destination: &str) {
        (**self).schedule_redirect(delay, destination)
    }

    fn cancel_redirect(&self) {
        (**self).cancel_redirect()
    }
}

/// Terminal rendition of the checkout screens, used by the `pay` command.
#[derive(Default)]
pub struct ConsoleSink {
    redirect: Mutex<Option<JoinHandle<()>>>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for a scheduled redirect to fire. Returns immediately if none is pending.
    pub async fn wait_redirect(&self) {
        let handle = self
            .redirect
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl PresentationSink for ConsoleSink {
    fn render_payment_artifact(&self, artifact: &PaymentArtifact, amount: Amount) {
        println!();
        println!("PIX payment of {}", amount);
        println!("Copy and paste code:");
        println!("  {}", artifact.qrcode_text);
        if let Some(expires_at) = artifact.expires_at() {
            println!("Expires at {}", expires_at.format("%d/%m/%Y %H:%M"));
        }
        println!("Waiting for payment...");
    }

    fn render_success(&self) {
        println!("✓ Payment approved. Thank you, your payment was processed.");
    }

    fn render_error(&self, message: &str) {
        eprintln!("✗ {}", message);
    }

    fn schedule_redirect(&self, delay: Duration, destination: &str) {
        println!("Redirecting to {} in {}s", destination, delay.as_secs());

        let destination = destination.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::info!(%destination, "Redirecting");
            println!("→ {}", destination);
        });

        let previous = self
            .redirect
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    fn cancel_redirect(&self) {
        if let Some(handle) = self
            .redirect
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}
