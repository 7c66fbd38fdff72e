//! Chain head monitor.
//!
//! Waits until the chain has reached a given block so that reads at a
//! certificate's reference block never race a lagging RPC node.

use crate::ports::outbound::ChainReader;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct BlockNumberMonitor {
    chain: Arc<dyn ChainReader>,
    poll_interval: Duration,
    /// Highest block observed so far.
    latest_seen: AtomicU64,
}

impl BlockNumberMonitor {
    /// A zero `poll_interval` disables waiting.
    pub fn new(chain: Arc<dyn ChainReader>, poll_interval: Duration) -> Self {
        Self {
            chain,
            poll_interval,
            latest_seen: AtomicU64::new(0),
        }
    }

    /// False when the poll interval is zero.
    pub fn is_enabled(&self) -> bool {
        !self.poll_interval.is_zero()
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn latest_seen(&self) -> u64 {
        self.latest_seen.load(Ordering::Relaxed)
    }

    /// Resolve once the chain head is at or past `target`.
    ///
    /// Read errors are logged and retried on the next tick. The wait is
    /// unbounded; callers bound it with a budget.
    pub async fn wait_for_block_number(&self, target: u64) -> u64 {
        if self.poll_interval.is_zero() || self.latest_seen() >= target {
            return self.latest_seen();
        }

        loop {
            match self.chain.latest_block_number().await {
                Ok(head) => {
                    self.latest_seen.fetch_max(head, Ordering::Relaxed);
                    if head >= target {
                        return head;
                    }
                    debug!(head, target, "waiting for chain to reach block");
                }
                Err(e) => {
                    debug!(target, error = %e, "failed to read latest block number");
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
