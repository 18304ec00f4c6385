//! Waiting for newly created accounts to become visible on the ledger
//!
//! A holding account created by the wallet in one transaction is not
//! immediately readable from every RPC node. The waiter polls with a tiered
//! backoff and gives up at an attempt cap or an external deadline, whichever
//! comes first.

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::core::{Clock, LedgerPort, ServiceError, ServiceResult};

/// `attempts` polls at `interval`. `None` covers every remaining attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffTier {
    pub attempts: Option<u32>,
    pub interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffSchedule {
    tiers: Vec<BackoffTier>,
    max_attempts: u32,
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        Self::new(
            vec![
                BackoffTier { attempts: Some(10), interval: Duration::from_secs(1) },
                BackoffTier { attempts: Some(10), interval: Duration::from_secs(2) },
                BackoffTier { attempts: None, interval: Duration::from_secs(3) },
            ],
            40,
        )
    }
}

impl BackoffSchedule {
    pub fn new(tiers: Vec<BackoffTier>, max_attempts: u32) -> Self {
        Self { tiers, max_attempts }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Sleep that follows attempt `attempt` (zero-based), or `None` once the
    /// schedule is spent.
    pub fn interval_for(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let mut remaining = attempt;
        for tier in &self.tiers {
            match tier.attempts {
                None => return Some(tier.interval),
                Some(count) if remaining < count => return Some(tier.interval),
                Some(count) => remaining -= count,
            }
        }
        None
    }
}

/// Tokio-backed clock
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Found { attempts: u32 },
    Exhausted { attempts: u32 },
    DeadlineReached { attempts: u32 },
}

impl PollOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            PollOutcome::Found { attempts }
            | PollOutcome::Exhausted { attempts }
            | PollOutcome::DeadlineReached { attempts } => *attempts,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, PollOutcome::Found { .. })
    }
}

/// Poll `probe` until it reports `true`, the schedule runs out, or the next
/// sleep would pass `deadline`. Probe errors count as "not yet".
pub async fn poll_until<F, Fut>(
    schedule: &BackoffSchedule,
    clock: &dyn Clock,
    deadline: Instant,
    mut probe: F,
) -> PollOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ServiceResult<bool>>,
{
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match probe().await {
            Ok(true) => return PollOutcome::Found { attempts },
            Ok(false) => {}
            Err(e) => warn!(attempt = attempts, "Probe failed, retrying: {}", e),
        }

        let Some(interval) = schedule.interval_for(attempts - 1).filter(|_| attempts < schedule.max_attempts)
        else {
            return PollOutcome::Exhausted { attempts };
        };
        if clock.now() + interval > deadline {
            return PollOutcome::DeadlineReached { attempts };
        }
        debug!(attempt = attempts, interval_ms = interval.as_millis() as u64, "Not visible yet");
        clock.sleep(interval).await;
    }
}

/// Waits for an account to appear with data
pub struct PropagationWaiter {
    ledger: Arc<dyn LedgerPort>,
    clock: Arc<dyn Clock>,
    schedule: BackoffSchedule,
    deadline: Duration,
}

impl PropagationWaiter {
    pub fn new(
        ledger: Arc<dyn LedgerPort>,
        clock: Arc<dyn Clock>,
        schedule: BackoffSchedule,
        deadline: Duration,
    ) -> Self {
        Self {
            ledger,
            clock,
            schedule,
            deadline,
        }
    }

    pub async fn wait_for_account(&self, address: &Pubkey) -> ServiceResult<()> {
        let deadline = self.clock.now() + self.deadline;
        let ledger = &self.ledger;
        let outcome = poll_until(&self.schedule, self.clock.as_ref(), deadline, move || async move {
            let account = ledger.get_account(address).await?;
            Ok::<_, ServiceError>(account.is_some_and(|account| !account.data.is_empty()))
        })
        .await;

        match outcome {
            PollOutcome::Found { attempts } => {
                info!(account = %address, attempts, "Account visible");
                Ok(())
            }
            PollOutcome::Exhausted { attempts } | PollOutcome::DeadlineReached { attempts } => {
                Err(ServiceError::PropagationTimeout {
                    account: address.to_string(),
                    attempts,
                })
            }
        }
    }
}
