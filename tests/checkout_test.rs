mod common;

use common::{
    pending_transaction, CreateScript, Event, FakeGateway, PollScript, RecordingSink, QR_CODE,
    VALID_CPF,
};
use pix_checkout::amount::Amount;
use pix_checkout::checkout::coordinator::{PAYMENT_FAILED_MESSAGE, PAYMENT_TIMED_OUT_MESSAGE};
use pix_checkout::checkout::error::{
    INVALID_CPF_MESSAGE, INVALID_NAME_MESSAGE, TRANSPORT_MESSAGE, UNEXPECTED_MESSAGE,
};
use pix_checkout::checkout::{
    CheckoutCoordinator, CheckoutError, CheckoutState, FailureReason, Outcome,
};
use pix_checkout::config::CheckoutConfig;
use pix_checkout::gateway::TransactionStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

type Checkout = CheckoutCoordinator<Arc<FakeGateway>, Arc<RecordingSink>>;

type Harness = (Checkout, Arc<FakeGateway>, Arc<RecordingSink>);

fn checkout_with(gateway: FakeGateway, config: CheckoutConfig) -> Harness {
    let gateway = Arc::new(gateway);
    let sink = Arc::new(RecordingSink::default());
    let coordinator = CheckoutCoordinator::new(gateway.clone(), sink.clone(), config);
    (coordinator, gateway, sink)
}

fn checkout(gateway: FakeGateway) -> Harness {
    checkout_with(gateway, CheckoutConfig::default())
}

fn artifact_event() -> Event {
    Event::Artifact {
        code: QR_CODE.to_string(),
        amount: Amount::from_cents(3400),
    }
}

fn pending() -> PollScript {
    PollScript::Status(TransactionStatus::WaitingPayment)
}

#[tokio::test(start_paused = true)]
async fn test_invalid_cpf_never_reaches_gateway() {
    let (checkout, gateway, sink) = checkout(FakeGateway::new(vec![], vec![]));

    let result = checkout.submit("Ana Souza", "123.456.789-00").await;

    assert!(matches!(result, Err(CheckoutError::Validation(_))));
    assert_eq!(gateway.create_count(), 0);
    assert_eq!(sink.events(), vec![Event::Error(INVALID_CPF_MESSAGE.to_string())]);
    assert_eq!(checkout.state(), CheckoutState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_incomplete_name_never_reaches_gateway() {
    let (checkout, gateway, sink) = checkout(FakeGateway::new(vec![], vec![]));

    let result = checkout.submit("Ana", VALID_CPF).await;

    assert!(matches!(result, Err(CheckoutError::Validation(_))));
    assert_eq!(gateway.create_count(), 0);
    assert_eq!(sink.events(), vec![Event::Error(INVALID_NAME_MESSAGE.to_string())]);
}

#[tokio::test(start_paused = true)]
async fn test_request_carries_normalized_cpf() {
    let (checkout, gateway, _sink) = checkout(FakeGateway::new(
        vec![CreateScript::Created(pending_transaction("tx-1"))],
        vec![pending()],
    ));

    checkout.submit("  Ana Souza ", VALID_CPF).await.unwrap();

    let request = gateway.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(request.customer.name, "Ana Souza");
    assert_eq!(request.customer.document.number, "11144477735");
    assert_eq!(request.amount, Amount::from_cents(3400));
    assert_eq!(request.items[0].quantity, 1);
    checkout.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_paid_settles_once_and_schedules_redirect() {
    let (checkout, gateway, sink) = checkout(FakeGateway::new(
        vec![CreateScript::Created(pending_transaction("tx-1"))],
        vec![pending(), PollScript::Status(TransactionStatus::Paid)],
    ));

    let transaction = checkout.submit("Ana Souza", VALID_CPF).await.unwrap();
    assert_eq!(transaction.id, "tx-1");
    assert_eq!(
        checkout.state(),
        CheckoutState::AwaitingPayment {
            transaction_id: "tx-1".to_string()
        }
    );

    // No poll before the first interval has elapsed.
    sleep(Duration::from_millis(2900)).await;
    assert_eq!(gateway.poll_count(), 0);

    sleep(Duration::from_secs(10)).await;
    assert_eq!(gateway.poll_count(), 2);
    assert_eq!(checkout.state(), CheckoutState::Settled(Outcome::Success));
    assert_eq!(
        sink.events(),
        vec![
            artifact_event(),
            Event::Success,
            Event::Redirect {
                delay: Duration::from_secs(7),
                destination: "/".to_string(),
            },
        ]
    );

    // Polling stopped for good.
    sleep(Duration::from_secs(60)).await;
    assert_eq!(gateway.poll_count(), 2);
    assert_eq!(sink.count(|e| *e == Event::Success), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failure_status_renders_one_error_without_redirect() {
    let (checkout, gateway, sink) = checkout(FakeGateway::new(
        vec![CreateScript::Created(pending_transaction("tx-1"))],
        vec![PollScript::Status(TransactionStatus::Refused)],
    ));

    checkout.submit("Ana Souza", VALID_CPF).await.unwrap();
    sleep(Duration::from_secs(30)).await;

    assert_eq!(gateway.poll_count(), 1);
    assert_eq!(
        checkout.state(),
        CheckoutState::Settled(Outcome::Failure(FailureReason::Status(
            TransactionStatus::Refused
        )))
    );
    assert_eq!(
        sink.events(),
        vec![
            artifact_event(),
            Event::Error(PAYMENT_FAILED_MESSAGE.to_string())
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_unknown_status_keeps_polling() {
    let (checkout, gateway, sink) = checkout(FakeGateway::new(
        vec![CreateScript::Created(pending_transaction("tx-1"))],
        vec![
            PollScript::Status(TransactionStatus::Other("processing".to_string())),
            PollScript::Status(TransactionStatus::Paid),
        ],
    ));

    checkout.submit("Ana Souza", VALID_CPF).await.unwrap();
    sleep(Duration::from_secs(7)).await;

    assert_eq!(gateway.poll_count(), 2);
    assert_eq!(sink.count(|e| *e == Event::Success), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_polling_and_rendering() {
    let (checkout, gateway, sink) = checkout(FakeGateway::new(
        vec![CreateScript::Created(pending_transaction("tx-1"))],
        vec![pending(), PollScript::Status(TransactionStatus::Paid)],
    ));

    checkout.submit("Ana Souza", VALID_CPF).await.unwrap();
    sleep(Duration::from_secs(4)).await;
    assert_eq!(gateway.poll_count(), 1);

    checkout.cancel();
    assert_eq!(checkout.state(), CheckoutState::Cancelled);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(gateway.poll_count(), 1);
    assert_eq!(sink.events(), vec![artifact_event()]);
}

#[tokio::test(start_paused = true)]
async fn test_poll_errors_are_ignored() {
    let (checkout, gateway, sink) = checkout(FakeGateway::new(
        vec![CreateScript::Created(pending_transaction("tx-1"))],
        vec![
            PollScript::HttpError(503),
            PollScript::HttpError(404),
            PollScript::Status(TransactionStatus::Paid),
        ],
    ));

    checkout.submit("Ana Souza", VALID_CPF).await.unwrap();
    sleep(Duration::from_secs(10)).await;

    assert_eq!(gateway.poll_count(), 3);
    assert_eq!(checkout.state(), CheckoutState::Settled(Outcome::Success));
    assert_eq!(sink.count(|e| matches!(e, Event::Error(_))), 0);
}

#[tokio::test(start_paused = true)]
async fn test_gives_up_after_max_poll_duration() {
    let config = CheckoutConfig {
        max_poll_duration: Some(Duration::from_secs(10)),
        ..CheckoutConfig::default()
    };
    let (checkout, gateway, sink) = checkout_with(
        FakeGateway::new(
            vec![CreateScript::Created(pending_transaction("tx-1"))],
            vec![pending()],
        ),
        config,
    );

    checkout.submit("Ana Souza", VALID_CPF).await.unwrap();
    sleep(Duration::from_secs(60)).await;

    // Ticks at 3, 6, 9 and 12 seconds; the last one is past the bound.
    assert_eq!(gateway.poll_count(), 4);
    assert_eq!(
        checkout.state(),
        CheckoutState::Settled(Outcome::Failure(FailureReason::TimedOut))
    );
    assert_eq!(
        sink.events(),
        vec![
            artifact_event(),
            Event::Error(PAYMENT_TIMED_OUT_MESSAGE.to_string())
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_gives_up_after_max_poll_attempts() {
    let config = CheckoutConfig {
        max_poll_duration: None,
        max_poll_attempts: Some(2),
        ..CheckoutConfig::default()
    };
    let (checkout, gateway, _sink) = checkout_with(
        FakeGateway::new(
            vec![CreateScript::Created(pending_transaction("tx-1"))],
            vec![PollScript::HttpError(500)],
        ),
        config,
    );

    checkout.submit("Ana Souza", VALID_CPF).await.unwrap();
    sleep(Duration::from_secs(60)).await;

    assert_eq!(gateway.poll_count(), 2);
    assert_eq!(
        checkout.state(),
        CheckoutState::Settled(Outcome::Failure(FailureReason::TimedOut))
    );
}

#[tokio::test(start_paused = true)]
async fn test_rejection_message_shown_verbatim_then_resubmit() {
    let (checkout, gateway, sink) = checkout(FakeGateway::new(
        vec![
            CreateScript::Rejected(422, "Customer document is invalid".to_string()),
            CreateScript::Created(pending_transaction("tx-2")),
        ],
        vec![PollScript::Status(TransactionStatus::Paid)],
    ));

    let first = checkout.submit("Ana Souza", VALID_CPF).await;
    assert!(matches!(
        first,
        Err(CheckoutError::GatewayRejection { status: 422, .. })
    ));
    assert_eq!(checkout.state(), CheckoutState::Idle);
    assert_eq!(
        sink.events(),
        vec![Event::Error("Customer document is invalid".to_string())]
    );

    sleep(Duration::from_secs(10)).await;
    assert_eq!(gateway.poll_count(), 0);

    let second = checkout.submit("Ana Souza", VALID_CPF).await.unwrap();
    assert_eq!(second.id, "tx-2");
    sleep(Duration::from_secs(4)).await;

    assert_eq!(gateway.create_count(), 2);
    assert_eq!(gateway.polled(), vec!["tx-2".to_string()]);
    assert_eq!(checkout.state(), CheckoutState::Settled(Outcome::Success));
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_gateway_renders_transport_message() {
    let (checkout, _gateway, sink) =
        checkout(FakeGateway::new(vec![CreateScript::Unreachable], vec![]));

    let result = checkout.submit("Ana Souza", VALID_CPF).await;

    assert!(matches!(result, Err(CheckoutError::Transport(_))));
    assert_eq!(sink.events(), vec![Event::Error(TRANSPORT_MESSAGE.to_string())]);
    assert_eq!(checkout.state(), CheckoutState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_transaction_without_pix_code_is_an_error() {
    let mut transaction = pending_transaction("tx-1");
    transaction.pix = None;
    let (checkout, gateway, sink) =
        checkout(FakeGateway::new(vec![CreateScript::Created(transaction)], vec![pending()]));

    let result = checkout.submit("Ana Souza", VALID_CPF).await;
    sleep(Duration::from_secs(10)).await;

    assert!(matches!(result, Err(CheckoutError::InvalidTransaction(_))));
    assert_eq!(sink.events(), vec![Event::Error(UNEXPECTED_MESSAGE.to_string())]);
    assert_eq!(gateway.poll_count(), 0);
    assert_eq!(checkout.state(), CheckoutState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_resubmit_replaces_polling_session() {
    let (checkout, gateway, _sink) = checkout(FakeGateway::new(
        vec![
            CreateScript::Created(pending_transaction("tx-1")),
            CreateScript::Created(pending_transaction("tx-2")),
        ],
        vec![pending()],
    ));

    checkout.submit("Ana Souza", VALID_CPF).await.unwrap();
    sleep(Duration::from_secs(4)).await;
    checkout.submit("Ana Souza", VALID_CPF).await.unwrap();
    sleep(Duration::from_secs(10)).await;

    let polled = gateway.polled();
    assert_eq!(polled[0], "tx-1");
    assert!(polled[1..].iter().all(|id| id == "tx-2"));
    assert_eq!(polled.len(), 4);
    assert_eq!(
        checkout.state(),
        CheckoutState::AwaitingPayment {
            transaction_id: "tx-2".to_string()
        }
    );
    checkout.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_submitting_discards_result() {
    let gateway = FakeGateway::new(
        vec![CreateScript::Created(pending_transaction("tx-1"))],
        vec![PollScript::Status(TransactionStatus::Paid)],
    )
    .with_create_delay(Duration::from_secs(5));
    let (checkout, gateway, sink) = checkout(gateway);

    let submitting = {
        let checkout = checkout.clone();
        tokio::spawn(async move { checkout.submit("Ana Souza", VALID_CPF).await })
    };

    sleep(Duration::from_secs(1)).await;
    assert_eq!(checkout.state(), CheckoutState::Submitting);
    checkout.cancel();

    let result = submitting.await.unwrap();
    assert!(matches!(result, Err(CheckoutError::Cancelled)));

    sleep(Duration::from_secs(30)).await;
    assert_eq!(gateway.poll_count(), 0);
    assert!(sink.events().is_empty());
    assert_eq!(checkout.state(), CheckoutState::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn test_second_submit_while_submitting_is_busy() {
    let gateway = FakeGateway::new(
        vec![CreateScript::Created(pending_transaction("tx-1"))],
        vec![pending()],
    )
    .with_create_delay(Duration::from_secs(5));
    let (checkout, gateway, sink) = checkout(gateway);

    let submitting = {
        let checkout = checkout.clone();
        tokio::spawn(async move { checkout.submit("Ana Souza", VALID_CPF).await })
    };

    sleep(Duration::from_secs(1)).await;
    let second = checkout.submit("Ana Souza", VALID_CPF).await;
    assert!(matches!(second, Err(CheckoutError::Busy)));

    let first = submitting.await.unwrap();
    assert_eq!(first.unwrap().id, "tx-1");
    assert_eq!(gateway.create_count(), 1);
    assert_eq!(sink.events(), vec![artifact_event()]);
    checkout.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_cancel_after_success_cancels_redirect() {
    let (checkout, _gateway, sink) = checkout(FakeGateway::new(
        vec![CreateScript::Created(pending_transaction("tx-1"))],
        vec![PollScript::Status(TransactionStatus::Paid)],
    ));

    checkout.submit("Ana Souza", VALID_CPF).await.unwrap();
    sleep(Duration::from_secs(4)).await;
    checkout.cancel();

    assert_eq!(sink.events().last(), Some(&Event::CancelRedirect));
    assert_eq!(checkout.state(), CheckoutState::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_observe_settlement() {
    let (checkout, _gateway, _sink) = checkout(FakeGateway::new(
        vec![CreateScript::Created(pending_transaction("tx-1"))],
        vec![pending(), PollScript::Status(TransactionStatus::Paid)],
    ));
    let mut states = checkout.subscribe();

    checkout.submit("Ana Souza", VALID_CPF).await.unwrap();
    let settled = states
        .wait_for(CheckoutState::is_final)
        .await
        .map(|state| (*state).clone())
        .unwrap();

    assert_eq!(settled, CheckoutState::Settled(Outcome::Success));
}

#[tokio::test(start_paused = true)]
async fn test_resubmit_stops_old_session_while_creating() {
    let gateway = FakeGateway::new(
        vec![
            CreateScript::Created(pending_transaction("tx-1")),
            CreateScript::Created(pending_transaction("tx-2")),
        ],
        vec![PollScript::Status(TransactionStatus::Expired)],
    )
    .with_create_delay(Duration::from_secs(1));
    let (checkout, gateway, sink) = checkout(gateway);

    // tx-1 is created at t=1s; its first tick would land at t=4s.
    checkout.submit("Ana Souza", VALID_CPF).await.unwrap();
    sleep(Duration::from_millis(2500)).await;

    let resubmitting = {
        let checkout = checkout.clone();
        tokio::spawn(async move { checkout.submit("Ana Souza", VALID_CPF).await })
    };

    // t=4s: the second creation is still in flight.
    sleep(Duration::from_millis(500)).await;
    assert_eq!(checkout.state(), CheckoutState::Submitting);

    let second = resubmitting.await.unwrap().unwrap();
    assert_eq!(second.id, "tx-2");
    assert_eq!(
        checkout.state(),
        CheckoutState::AwaitingPayment {
            transaction_id: "tx-2".to_string()
        }
    );
    assert!(gateway.polled().is_empty());
    assert_eq!(sink.events(), vec![artifact_event(), artifact_event()]);

    sleep(Duration::from_secs(10)).await;
    assert_eq!(gateway.create_count(), 2);
    assert_eq!(gateway.polled(), vec!["tx-2".to_string()]);
    assert_eq!(
        checkout.state(),
        CheckoutState::Settled(Outcome::Failure(FailureReason::Status(
            TransactionStatus::Expired
        )))
    );
    assert_eq!(
        sink.events(),
        vec![
            artifact_event(),
            artifact_event(),
            Event::Error(PAYMENT_FAILED_MESSAGE.to_string())
        ]
    );
}
