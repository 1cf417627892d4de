//! Waiting for block inclusion.
//!
//! A sync broadcast only says the mempool accepted a transaction. Everything
//! after it needs the block result, so the poller is the one place where
//! "submitted" becomes "final".

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

use super::types::TxOutcome;
use super::{Ledger, LedgerError};

/// Approximate Terra block time; polling faster only wastes requests
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(6);

pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(180);

/// Shortest interval the poller accepts; faster policies are raised to this
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum InclusionError {
    /// Gave up waiting. The chain may still include the transaction.
    #[error("Transaction {txhash} not included after {}s ({attempts} queries)", waited.as_secs())]
    Timeout {
        txhash: String,
        waited: Duration,
        attempts: u32,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Fixed-interval polling bounded by a total wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

#[derive(Clone)]
pub struct InclusionPoller {
    ledger: Arc<dyn Ledger>,
    policy: PollPolicy,
}

impl std::fmt::Debug for InclusionPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InclusionPoller")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl InclusionPoller {
    pub fn new(ledger: Arc<dyn Ledger>, policy: PollPolicy) -> Self {
        let policy = PollPolicy {
            interval: policy.interval.max(MIN_POLL_INTERVAL),
            ..policy
        };
        Self { ledger, policy }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Query `txhash` until it shows up in a block or the policy times out.
    ///
    /// "Not found" right after broadcast is normal, as are transient
    /// transport failures; both just mean "ask again later".
    #[tracing::instrument(skip(self))]
    pub async fn wait_for_inclusion(&self, txhash: &str) -> Result<TxOutcome, InclusionError> {
        let started = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            match self.ledger.tx_by_hash(txhash).await {
                Ok(Some(outcome)) => {
                    tracing::debug!(attempts, height = ?outcome.height, "Transaction included");
                    return Ok(outcome);
                }
                Ok(None) => tracing::debug!(attempts, "Transaction not yet included"),
                Err(err) if err.is_transient() => {
                    tracing::debug!(attempts, error = %err, "Transient error while polling")
                }
                Err(err) => return Err(err.into()),
            }

            let waited = started.elapsed();
            if waited + self.policy.interval > self.policy.timeout {
                return Err(InclusionError::Timeout {
                    txhash: txhash.to_string(),
                    waited,
                    attempts,
                });
            }
            tokio::time::sleep(self.policy.interval).await;
        }
    }
}
