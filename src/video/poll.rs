//! Bounded, cancellable polling for long-running video jobs.

use crate::error::{PosterError, Result};
use crate::video::provider::VideoProvider;
use crate::video::types::{JobHandle, JobStatus, VideoAsset};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// How often and how long to poll a video job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Wait between status checks.
    pub interval: Duration,
    /// Maximum number of status checks.
    pub max_attempts: u32,
    /// Overall deadline measured from the start of polling.
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_attempts: 60,
            timeout: Duration::from_secs(600),
        }
    }
}

/// Fires the paired [`CancelToken`]s.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Cooperative cancellation signal observed by long waits.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Creates a linked handle/token pair.
    pub fn new() -> (CancelHandle, CancelToken) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelToken { rx })
    }

    /// A token that is never cancelled.
    pub fn never() -> Self {
        let (_handle, token) = Self::new();
        token
    }

    /// Returns true once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when cancellation is requested.
    ///
    /// If the handle is dropped without cancelling, this never resolves.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::never()
    }
}

/// Polls `handle` until the job finishes, fails, times out or is cancelled.
///
/// Each attempt sleeps `policy.interval` first and then checks status, so the
/// first status check happens one interval after submission. Neither the
/// sleep nor a status check runs past `policy.timeout`.
pub async fn wait_for_video<P: VideoProvider + ?Sized>(
    provider: &P,
    handle: &JobHandle,
    policy: &PollPolicy,
    cancel: &CancelToken,
) -> Result<VideoAsset> {
    let start = Instant::now();
    let deadline = start + policy.timeout;

    for attempt in 1..=policy.max_attempts {
        if cancel.is_cancelled() {
            return Err(PosterError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PosterError::Cancelled),
            _ = tokio::time::sleep_until(deadline) => {
                return Err(PosterError::Timeout(policy.timeout));
            }
            _ = tokio::time::sleep(policy.interval) => {}
        }

        let polled = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PosterError::Cancelled),
            polled = tokio::time::timeout_at(deadline, provider.poll(handle)) => polled,
        };
        let status = polled.map_err(|_| PosterError::Timeout(policy.timeout))??;

        match status {
            JobStatus::Done(asset) => return Ok(asset),
            JobStatus::Failed(message) => return Err(PosterError::VideoGeneration(message)),
            JobStatus::Pending => {
                tracing::debug!(
                    job = %handle,
                    attempt,
                    max_attempts = policy.max_attempts,
                    elapsed_secs = start.elapsed().as_secs(),
                    "video job still running"
                );
            }
        }
    }

    tracing::warn!(job = %handle, attempts = policy.max_attempts, "video polling exhausted");
    Err(PosterError::Timeout(start.elapsed()))
}
