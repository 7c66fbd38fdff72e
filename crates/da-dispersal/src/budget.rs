//! # Deadline Budget
//!
//! Cancellation plus an optional absolute deadline, threaded explicitly
//! through every stage of a dispersal.
//!
//! ```text
//! caller budget ──stage(2s)──→ quorum lookup      deadline = min(parent, now + 2s)
//!               ──stage(30s)─→ submission         deadline = min(parent, now + 30s)
//!               ──stage(60s)─→ poll loop          ...
//! ```
//!
//! A stage budget never outlives its parent. Cancelling the parent token
//! cancels every stage derived from it.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a budgeted future did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BudgetError {
    #[error("cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation token with an optional deadline.
#[derive(Debug, Clone, Default)]
pub struct Budget {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl Budget {
    /// No deadline, fresh cancellation token.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::unbounded().stage(timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Budget driven by a caller-owned cancellation token.
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_expired(&self) -> bool {
        self.deadline
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false)
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Child budget bounded by `timeout` and by this budget's deadline.
    pub fn stage(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(parent) => parent.min(candidate),
            None => candidate,
        };
        Self {
            cancel: self.cancel.child_token(),
            deadline: Some(deadline),
        }
    }

    /// Like [`Budget::stage`], but a `None` timeout only inherits the parent
    /// deadline.
    pub fn stage_opt(&self, timeout: Option<Duration>) -> Self {
        match timeout {
            Some(timeout) => self.stage(timeout),
            None => Self {
                cancel: self.cancel.child_token(),
                deadline: self.deadline,
            },
        }
    }

    /// Drive `fut` until it completes, the budget is cancelled, or the
    /// deadline passes.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, BudgetError>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(BudgetError::Cancelled),
            _ = wait_until(self.deadline) => Err(BudgetError::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }

    /// Sleep for `period` unless the budget ends first.
    pub async fn sleep(&self, period: Duration) -> Result<(), BudgetError> {
        self.run(tokio::time::sleep(period)).await
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
