//! Consensus-throttle handling: identifier rebuild and resubmission

use ledgerlink::config::{ClientConfig, NodeEntry};
use ledgerlink::net::{MockTransport, QueryReply};
use ledgerlink::tx::TransactionBody;
use ledgerlink::types::{AccountId, Receipt, StatusCode};
use ledgerlink::{ExecuteError, LedgerClient, Operator, OperationBody};
use std::sync::Arc;

fn single_node_config() -> ClientConfig {
    ClientConfig::for_nodes(vec![NodeEntry {
        account: 3,
        address: "node0.example.net:50211".to_string(),
    }])
}

fn client_over(mock: &Arc<MockTransport>) -> LedgerClient {
    let operator = Operator::generate(AccountId(1001));
    LedgerClient::new(single_node_config(), operator, mock.clone()).expect("client")
}

fn transfer() -> OperationBody {
    OperationBody::Transfer {
        transfers: vec![(AccountId(1001), -100), (AccountId(2002), 100)],
    }
}

#[tokio::test(start_paused = true)]
async fn test_throttled_receipt_forces_fresh_identifier() {
    let mock = Arc::new(MockTransport::new());
    // Attempt 1: accepted, then throttled at consensus.
    mock.queue_submit(Ok(StatusCode::Ok));
    mock.queue_query(Ok(QueryReply::found(Receipt::with_status(
        StatusCode::ThrottledAtConsensus,
    ))));
    // Attempt 2 uses the script defaults: accepted and settled.
    let client = client_over(&mock);

    let outcome = client.submit(transfer()).await.expect("second identifier lands");
    assert!(outcome.is_success());
    assert_eq!(mock.submit_calls(), 2);

    let bodies: Vec<TransactionBody> = mock
        .seen_envelopes()
        .iter()
        .map(|(_, e)| TransactionBody::from_bytes(&e.body_bytes).expect("decode"))
        .collect();

    // The resubmission carries a brand-new identifier, not a reuse of the
    // throttled one, under the same payer account.
    assert_ne!(bodies[1].transaction_id, bodies[0].transaction_id);
    assert_eq!(bodies[1].transaction_id.payer, AccountId(1001));
    assert_eq!(outcome.transaction_id(), bodies[1].transaction_id);
}

#[tokio::test(start_paused = true)]
async fn test_rebuilt_envelope_is_freshly_signed() {
    let mock = Arc::new(MockTransport::new());
    mock.queue_submit(Ok(StatusCode::Ok));
    mock.queue_query(Ok(QueryReply::found(Receipt::with_status(
        StatusCode::ThrottledAtConsensus,
    ))));
    let client = client_over(&mock);

    client.submit(transfer()).await.expect("settles");

    let seen = mock.seen_envelopes();
    assert_eq!(seen.len(), 2);
    // The body bytes changed, so the signature must have changed too.
    assert_ne!(seen[0].1.body_bytes, seen[1].1.body_bytes);
    assert_ne!(
        seen[0].1.sig_pairs[0].signature,
        seen[1].1.sig_pairs[0].signature
    );
    assert_eq!(
        seen[0].1.sig_pairs[0].public_key,
        seen[1].1.sig_pairs[0].public_key
    );
}

#[tokio::test(start_paused = true)]
async fn test_repeated_throttle_exhausts_attempts() {
    let mock = Arc::new(MockTransport::new());
    for _ in 0..5 {
        mock.queue_submit(Ok(StatusCode::Ok));
        mock.queue_query(Ok(QueryReply::found(Receipt::with_status(
            StatusCode::ThrottledAtConsensus,
        ))));
    }
    let client = client_over(&mock);

    let err = client.submit(transfer()).await.expect_err("throttled every time");
    assert!(matches!(
        err,
        ExecuteError::RetryExhausted {
            attempts: 5,
            last_status: Some(StatusCode::ThrottledAtConsensus),
        }
    ));
    assert_eq!(mock.submit_calls(), 5);

    // Five distinct identifiers were burned.
    let mut ids: Vec<_> = mock
        .seen_envelopes()
        .iter()
        .map(|(_, e)| {
            TransactionBody::from_bytes(&e.body_bytes)
                .expect("decode")
                .transaction_id
        })
        .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_busy_retry_keeps_identifier_throttle_does_not() {
    let mock = Arc::new(MockTransport::new());
    // Busy precheck first: same identifier retried. Then accepted but
    // throttled: identifier replaced.
    mock.queue_submit(Ok(StatusCode::Busy));
    mock.queue_submit(Ok(StatusCode::Ok));
    mock.queue_query(Ok(QueryReply::found(Receipt::with_status(
        StatusCode::ThrottledAtConsensus,
    ))));
    let client = client_over(&mock);

    client.submit(transfer()).await.expect("third attempt settles");

    let ids: Vec<_> = mock
        .seen_envelopes()
        .iter()
        .map(|(_, e)| {
            TransactionBody::from_bytes(&e.body_bytes)
                .expect("decode")
                .transaction_id
        })
        .collect();
    assert_eq!(ids.len(), 3);
    assert_eq!(ids[0], ids[1], "busy retry reuses the identifier");
    assert_ne!(ids[2], ids[1], "throttle rebuild replaces it");
}
