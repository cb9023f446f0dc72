//! Transaction lifecycle: submit, render the PIX code, poll until the gateway
//! reports a terminal status, then settle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::error::CheckoutError;
use super::presentation::PresentationSink;
use super::session::SessionSlot;
use crate::config::{CheckoutConfig, StatusClass};
use crate::gateway::{GatewayClient, Transaction, TransactionRequest, TransactionStatus};

pub const PAYMENT_FAILED_MESSAGE: &str =
    "We could not confirm the payment. Please try again.";
pub const PAYMENT_TIMED_OUT_MESSAGE: &str =
    "Payment confirmation is taking too long. Please try again.";

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutState {
    Idle,
    Submitting,
    AwaitingPayment { transaction_id: String },
    Settled(Outcome),
    Cancelled,
}

impl CheckoutState {
    pub fn is_final(&self) -> bool {
        matches!(self, CheckoutState::Settled(_) | CheckoutState::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(FailureReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The gateway reported a status from the failure set.
    Status(TransactionStatus),
    /// Polling hit its duration or attempt bound without a terminal status.
    TimedOut,
}

impl FailureReason {
    pub fn user_message(&self) -> &'static str {
        match self {
            FailureReason::Status(_) => PAYMENT_FAILED_MESSAGE,
            FailureReason::TimedOut => PAYMENT_TIMED_OUT_MESSAGE,
        }
    }
}

struct Machine {
    state: CheckoutState,
    // Bumped on every submit and cancel; a creation result whose ticket is
    // stale is discarded.
    ticket: u64,
}

struct Inner<G, S> {
    gateway: G,
    sink: S,
    config: CheckoutConfig,
    machine: Mutex<Machine>,
    session: SessionSlot,
    state_tx: watch::Sender<CheckoutState>,
}

/// Drives one checkout. Cheap to clone; clones share the same state.
pub struct CheckoutCoordinator<G, S> {
    inner: Arc<Inner<G, S>>,
}

impl<G, S> Clone for CheckoutCoordinator<G, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G, S> CheckoutCoordinator<G, S>
where
    G: GatewayClient + 'static,
    S: PresentationSink + 'static,
{
    pub fn new(gateway: G, sink: S, config: CheckoutConfig) -> Self {
        let (state_tx, _) = watch::channel(CheckoutState::Idle);

        Self {
            inner: Arc::new(Inner {
                gateway,
                sink,
                config,
                machine: Mutex::new(Machine {
                    state: CheckoutState::Idle,
                    ticket: 0,
                }),
                session: SessionSlot::new(),
                state_tx,
            }),
        }
    }

    pub fn state(&self) -> CheckoutState {
        self.inner.lock().state.clone()
    }

    /// Observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<CheckoutState> {
        self.inner.state_tx.subscribe()
    }

    pub fn sink(&self) -> &S {
        &self.inner.sink
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.inner.config
    }

    /// Validates the customer, creates the transaction, renders its PIX code
    /// and starts polling. Any failure is rendered once and leaves the
    /// checkout ready for another submission.
    pub async fn submit(&self, name: &str, tax_id: &str) -> Result<Transaction, CheckoutError> {
        let config = &self.inner.config;

        let request = match TransactionRequest::new(
            name,
            tax_id,
            &config.product,
            &config.contact,
            config.expires_in_days,
        ) {
            Ok(request) => request,
            Err(e) => {
                warn!(field = e.field, "Checkout input rejected: {}", e.message);
                let error = CheckoutError::Validation(e);
                self.inner.sink.render_error(&error.user_message());
                return Err(error);
            }
        };

        let ticket = {
            let mut machine = self.inner.lock();
            if machine.state == CheckoutState::Submitting {
                return Err(CheckoutError::Busy);
            }
            machine.ticket += 1;
            // The previous transaction is abandoned once a new one is requested.
            if let Some(transaction_id) = self.inner.session.active_transaction() {
                self.inner.session.cancel();
                info!(%transaction_id, "Polling session replaced by a new submission");
            }
            if machine.state == CheckoutState::Settled(Outcome::Success) {
                self.inner.sink.cancel_redirect();
            }
            self.inner.transition(&mut machine, CheckoutState::Submitting);
            machine.ticket
        };

        let created = self.inner.gateway.create_transaction(&request).await;

        let mut machine = self.inner.lock();
        if machine.ticket != ticket || machine.state != CheckoutState::Submitting {
            debug!("Discarding transaction result for a cancelled submission");
            return Err(CheckoutError::Cancelled);
        }

        let transaction = match created {
            Ok(transaction) => transaction,
            Err(e) => {
                warn!(error = %e, "Transaction creation failed");
                let error = CheckoutError::from(e);
                self.inner.transition(&mut machine, CheckoutState::Idle);
                self.inner.sink.render_error(&error.user_message());
                return Err(error);
            }
        };

        let Some(artifact) = transaction.pix.as_ref() else {
            warn!(transaction_id = %transaction.id, "Transaction has no PIX artifact");
            let error = CheckoutError::InvalidTransaction(format!(
                "transaction {} has no PIX code",
                transaction.id
            ));
            self.inner.transition(&mut machine, CheckoutState::Idle);
            self.inner.sink.render_error(&error.user_message());
            return Err(error);
        };

        self.inner.transition(
            &mut machine,
            CheckoutState::AwaitingPayment {
                transaction_id: transaction.id.clone(),
            },
        );
        self.inner
            .sink
            .render_payment_artifact(artifact, transaction.amount);

        let inner = Arc::clone(&self.inner);
        let transaction_id = transaction.id.clone();
        self.inner.session.start(transaction.id.clone(), move |session_id| {
            poll(inner, session_id, transaction_id)
        });

        info!(transaction_id = %transaction.id, "Awaiting PIX payment");
        Ok(transaction)
    }

    /// Tears the checkout down. Once this returns the sink receives nothing more.
    pub fn cancel(&self) {
        let mut machine = self.inner.lock();

        if let Some(transaction_id) = self.inner.session.active_transaction() {
            self.inner.session.cancel();
            info!(%transaction_id, "Polling session cancelled");
        }
        if machine.state == CheckoutState::Settled(Outcome::Success) {
            self.inner.sink.cancel_redirect();
        }

        machine.ticket += 1;
        self.inner.transition(&mut machine, CheckoutState::Cancelled);
    }
}

impl<G, S> Inner<G, S>
where
    G: GatewayClient,
    S: PresentationSink,
{
    fn lock(&self) -> MutexGuard<'_, Machine> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, machine: &mut Machine, next: CheckoutState) {
        debug!(from = ?machine.state, to = ?next, "Checkout state change");
        machine.state = next.clone();
        self.state_tx.send_replace(next);
    }

    /// Applies a terminal poll result, unless the session was replaced or
    /// cancelled in the meantime.
    fn settle(&self, session_id: u64, outcome: Outcome) -> bool {
        let mut machine = self.lock();
        if !matches!(machine.state, CheckoutState::AwaitingPayment { .. }) {
            return false;
        }
        if !self.session.finish(session_id) {
            return false;
        }

        self.transition(&mut machine, CheckoutState::Settled(outcome.clone()));

        match outcome {
            Outcome::Success => {
                info!("Payment confirmed");
                self.sink.render_success();
                self.sink
                    .schedule_redirect(self.config.redirect_delay, &self.config.redirect_to);
            }
            Outcome::Failure(reason) => {
                warn!(?reason, "Payment not confirmed");
                self.sink.render_error(reason.user_message());
            }
        }

        true
    }
}

async fn poll<G, S>(inner: Arc<Inner<G, S>>, session_id: u64, transaction_id: String)
where
    G: GatewayClient,
    S: PresentationSink,
{
    let config = &inner.config;
    // interval_at panics on a zero period
    let period = config.poll_interval.max(MIN_POLL_INTERVAL);
    let started = Instant::now();
    let mut ticker = interval_at(started + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut attempts: u32 = 0;

    loop {
        ticker.tick().await;
        if !inner.session.is_current(session_id) {
            return;
        }
        attempts = attempts.saturating_add(1);

        let mut outcome = match inner.gateway.fetch_status(&transaction_id).await {
            Ok(status) => match config.statuses.classify(&status) {
                StatusClass::Success => Some(Outcome::Success),
                StatusClass::Failure => Some(Outcome::Failure(FailureReason::Status(status))),
                StatusClass::Pending => {
                    debug!(%transaction_id, %status, "Payment still pending");
                    None
                }
            },
            Err(e) => {
                warn!(
                    %transaction_id,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Status check failed, retrying on next tick"
                );
                None
            }
        };

        if outcome.is_none() {
            if polling_exhausted(config, started.elapsed(), attempts) {
                warn!(%transaction_id, attempts, "Giving up on payment confirmation");
                outcome = Some(Outcome::Failure(FailureReason::TimedOut));
            }
        }

        if let Some(outcome) = outcome {
            inner.settle(session_id, outcome);
            return;
        }
    }
}

fn polling_exhausted(config: &CheckoutConfig, elapsed: Duration, attempts: u32) -> bool {
    let out_of_time = config
        .max_poll_duration
        .is_some_and(|limit| elapsed >= limit);
    let out_of_attempts = config
        .max_poll_attempts
        .is_some_and(|limit| attempts >= limit);

    out_of_time || out_of_attempts
}
