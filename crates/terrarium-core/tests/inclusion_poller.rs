mod support;

use std::sync::Arc;
use std::time::Duration;

use terrarium_core::chain::{
    InclusionError, InclusionPoller, Ledger, LedgerError, MIN_POLL_INTERVAL, PollPolicy,
};

use support::{FakeLedger, LedgerCall};

fn poller(ledger: &Arc<FakeLedger>, interval: u64, timeout: u64) -> InclusionPoller {
    InclusionPoller::new(
        Arc::clone(ledger) as Arc<dyn Ledger>,
        PollPolicy {
            interval: Duration::from_secs(interval),
            timeout: Duration::from_secs(timeout),
        },
    )
}

#[tokio::test(start_paused = true)]
async fn keeps_polling_until_included() {
    let ledger = Arc::new(FakeLedger::new());
    ledger.push_lookup(Ok(None));
    ledger.push_lookup(Ok(None));
    ledger.push_included("ABC", "[]");

    let outcome = poller(&ledger, 6, 60).wait_for_inclusion("ABC").await.unwrap();

    assert_eq!(outcome.txhash, "ABC");
    assert_eq!(
        ledger.calls(),
        vec![LedgerCall::TxByHash("ABC".to_string()); 3]
    );
}

#[tokio::test(start_paused = true)]
async fn times_out_with_the_txhash() {
    let ledger = Arc::new(FakeLedger::new());

    let err = poller(&ledger, 6, 30).wait_for_inclusion("DEADBEEF").await.unwrap_err();

    match err {
        InclusionError::Timeout {
            txhash, attempts, ..
        } => {
            assert_eq!(txhash, "DEADBEEF");
            assert!(attempts >= 5, "attempts = {attempts}");
        }
        other => panic!("expected Timeout, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn transient_errors_are_retried() {
    let ledger = Arc::new(FakeLedger::new());
    ledger.push_lookup(Err(LedgerError::Transport {
        url: "http://localhost:1317".to_string(),
        message: "connection reset".to_string(),
    }));
    ledger.push_lookup(Err(LedgerError::Status {
        url: "http://localhost:1317".to_string(),
        status: 503,
        body: String::new(),
    }));
    ledger.push_included("ABC", "[]");

    let outcome = poller(&ledger, 1, 10).wait_for_inclusion("ABC").await.unwrap();
    assert_eq!(outcome.txhash, "ABC");
}

#[tokio::test(start_paused = true)]
async fn permanent_error_stops_polling() {
    let ledger = Arc::new(FakeLedger::new());
    ledger.push_lookup(Err(LedgerError::Status {
        url: "http://localhost:1317".to_string(),
        status: 400,
        body: "bad request".to_string(),
    }));

    let err = poller(&ledger, 1, 10).wait_for_inclusion("ABC").await.unwrap_err();

    assert!(matches!(err, InclusionError::Ledger(LedgerError::Status { status: 400, .. })));
    assert_eq!(ledger.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn zero_interval_is_raised_to_the_floor() {
    let ledger = Arc::new(FakeLedger::new());
    for _ in 0..3 {
        ledger.push_lookup(Ok(None));
    }
    ledger.push_included("ABC", "[]");

    let poller = InclusionPoller::new(
        Arc::clone(&ledger) as Arc<dyn Ledger>,
        PollPolicy {
            interval: Duration::ZERO,
            timeout: Duration::from_secs(60),
        },
    );
    assert_eq!(poller.policy().interval, MIN_POLL_INTERVAL);

    let started = tokio::time::Instant::now();
    poller.wait_for_inclusion("ABC").await.unwrap();

    assert_eq!(ledger.calls().len(), 4);
    assert!(started.elapsed() >= MIN_POLL_INTERVAL * 3);
}
