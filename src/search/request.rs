//! Request generations, cancellation tokens and the debounce timer.
//!
//! Every request class keeps a monotonically increasing generation. Starting
//! a request cancels the previous one of the same class; a resolution that
//! carries anything but the current generation is stale and gets dropped,
//! whether or not the transport managed to abort in time.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestStatus {
    #[default]
    Idle,
    Pending,
    Resolved,
    Cancelled,
    Failed,
}

/// Handed to the task performing a request
#[derive(Debug, Clone)]
pub struct RequestTicket {
    pub generation: u64,
    pub token: CancellationToken,
}

/// Tracks the single outstanding request of one class
#[derive(Debug, Default)]
pub struct RequestTracker {
    generation: u64,
    status: RequestStatus,
    token: Option<CancellationToken>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel whatever is outstanding and start a new generation.
    pub fn begin(&mut self) -> RequestTicket {
        self.cancel();
        self.generation += 1;

        let token = CancellationToken::new();
        self.token = Some(token.clone());
        self.status = RequestStatus::Pending;

        RequestTicket {
            generation: self.generation,
            token,
        }
    }

    /// Abort the outstanding request, if any. Returns true if one was pending.
    pub fn cancel(&mut self) -> bool {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
        if self.status == RequestStatus::Pending {
            self.status = RequestStatus::Cancelled;
            true
        } else {
            false
        }
    }

    /// Only a pending request of the current generation may touch state.
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation && self.status == RequestStatus::Pending
    }

    pub fn resolve(&mut self, generation: u64) -> bool {
        self.settle(generation, RequestStatus::Resolved)
    }

    pub fn fail(&mut self, generation: u64) -> bool {
        self.settle(generation, RequestStatus::Failed)
    }

    fn settle(&mut self, generation: u64, status: RequestStatus) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.status = status;
        self.token = None;
        true
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}

/// Race `fut` against `token`; cancellation wins ties and drops `fut`, which
/// aborts the underlying HTTP request.
pub async fn cancellable<T, F>(token: CancellationToken, fut: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(ApiError::Cancelled),
        result = fut => result,
    }
}

/// Quiet-period timer. Scheduling again, cancelling, or dropping the
/// debouncer invalidates the pending timer.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: 0,
            pending: None,
        }
    }

    /// Run `on_elapsed` with the new generation once the quiet period passes.
    pub fn schedule<F>(&mut self, on_elapsed: F) -> u64
    where
        F: FnOnce(u64) + Send + 'static,
    {
        self.cancel();
        self.generation += 1;

        let generation = self.generation;
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_elapsed(generation);
        }));

        generation
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Accept an elapsed notification. False if it was superseded or cancelled.
    pub fn fire(&mut self, generation: u64) -> bool {
        if generation == self.generation && self.pending.is_some() {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
