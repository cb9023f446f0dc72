#![allow(dead_code)]

use async_trait::async_trait;
use pix_checkout::amount::Amount;
use pix_checkout::checkout::PresentationSink;
use pix_checkout::gateway::{
    GatewayClient, GatewayError, PaymentArtifact, Transaction, TransactionRequest,
    TransactionStatus,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const VALID_CPF: &str = "111.444.777-35";
pub const QR_CODE: &str = "00020126580014br.gov.bcb.pix0136pix-checkout-test5204000053039865406";

pub fn pending_transaction(id: &str) -> Transaction {
    Transaction {
        id: id.to_string(),
        payment_method: Some("PIX".to_string()),
        amount: Amount::from_cents(3400),
        status: TransactionStatus::WaitingPayment,
        pix: Some(PaymentArtifact {
            qrcode_text: QR_CODE.to_string(),
            expiration_date: Some("2026-10-18T12:00:00Z".to_string()),
        }),
    }
}

#[derive(Debug, Clone)]
pub enum CreateScript {
    Created(Transaction),
    Rejected(u16, String),
    Unreachable,
}

#[derive(Debug, Clone)]
pub enum PollScript {
    Status(TransactionStatus),
    HttpError(u16),
}

/// Gateway double: scripted creation results, scripted poll answers (the last
/// one repeats), and call counters.
pub struct FakeGateway {
    creates: Mutex<VecDeque<CreateScript>>,
    polls: Mutex<VecDeque<PollScript>>,
    create_delay: Duration,
    pub create_calls: AtomicUsize,
    pub polled_ids: Mutex<Vec<String>>,
    pub last_request: Mutex<Option<TransactionRequest>>,
}

impl FakeGateway {
    pub fn new(creates: Vec<CreateScript>, polls: Vec<PollScript>) -> Self {
        Self {
            creates: Mutex::new(creates.into()),
            polls: Mutex::new(polls.into()),
            create_delay: Duration::ZERO,
            create_calls: AtomicUsize::new(0),
            polled_ids: Mutex::new(Vec::new()),
            last_request: Mutex::new(None),
        }
    }

    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = delay;
        self
    }

    pub fn create_count(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn poll_count(&self) -> usize {
        self.polled_ids.lock().unwrap().len()
    }

    pub fn polled(&self) -> Vec<String> {
        self.polled_ids.lock().unwrap().clone()
    }
}

#[async_trait]
impl GatewayClient for FakeGateway {
    async fn create_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<Transaction, GatewayError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());

        if !self.create_delay.is_zero() {
            tokio::time::sleep(self.create_delay).await;
        }

        let script = self
            .creates
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected create_transaction call");

        match script {
            CreateScript::Created(tx) => Ok(tx),
            CreateScript::Rejected(status, message) => {
                Err(GatewayError::Rejected { status, message })
            }
            CreateScript::Unreachable => Err(GatewayError::Unavailable(502)),
        }
    }

    async fn fetch_status(&self, transaction_id: &str) -> Result<TransactionStatus, GatewayError> {
        self.polled_ids
            .lock()
            .unwrap()
            .push(transaction_id.to_string());

        let script = {
            let mut polls = self.polls.lock().unwrap();
            if polls.len() > 1 {
                polls.pop_front()
            } else {
                polls.front().cloned()
            }
        };

        match script.expect("no poll answers scripted") {
            PollScript::Status(status) => Ok(status),
            PollScript::HttpError(code) => Err(GatewayError::Unavailable(code)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Artifact { code: String, amount: Amount },
    Success,
    Error(String),
    Redirect { delay: Duration, destination: String },
    CancelRedirect,
}

/// Sink double that records every command it receives.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| predicate(event))
            .count()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl PresentationSink for RecordingSink {
    fn render_payment_artifact(&self, artifact: &PaymentArtifact, amount: Amount) {
        self.push(Event::Artifact {
            code: artifact.qrcode_text.clone(),
            amount,
        });
    }

    fn render_success(&self) {
        self.push(Event::Success);
    }

    fn render_error(&self, message: &str) {
        self.push(Event::Error(message.to_string()));
    }

    fn schedule_redirect(&self, delay: Duration, destination: &str) {
        self.push(Event::Redirect {
            delay,
            destination: destination.to_string(),
        });
    }

    fn cancel_redirect(&self) {
        self.push(Event::CancelRedirect);
    }
}
