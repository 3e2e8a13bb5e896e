use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Deadline for one pending request
///
/// Handed to the task that waits on it. The registry keeps a clone of the
/// token, so cancelling through the registry wakes the waiter.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    request_id: Uuid,
    deadline: Instant,
    token: CancellationToken,
}

impl TimerHandle {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the timer is cancelled
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Resolves once the deadline passes
    pub async fn elapsed(&self) {
        tokio::time::sleep_until(self.deadline).await
    }
}

/// Owns one cancellable deadline per active request
///
/// `cancel` and `fire` both take the entry out under the same lock, so for any
/// timer exactly one of them wins.
#[derive(Debug, Default)]
pub struct TimerRegistry {
    timers: Mutex<HashMap<Uuid, CancellationToken>>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a deadline for `request_id`, replacing any previous one
    pub async fn arm(&self, request_id: Uuid, duration: Duration) -> TimerHandle {
        let token = CancellationToken::new();
        let handle = TimerHandle {
            request_id,
            deadline: Instant::now() + duration,
            token: token.clone(),
        };

        if let Some(previous) = self.timers.lock().await.insert(request_id, token) {
            previous.cancel();
        }

        tracing::trace!("Armed timer for {} ({:?})", request_id, duration);
        handle
    }

    /// Stop and discard the timer; safe to call repeatedly or after firing
    ///
    /// Returns true if a live timer was cancelled.
    pub async fn cancel(&self, request_id: &Uuid) -> bool {
        match self.timers.lock().await.remove(request_id) {
            Some(token) => {
                token.cancel();
                tracing::trace!("Cancelled timer for {}", request_id);
                true
            }
            None => false,
        }
    }

    /// Claim the deadline path for an expired timer
    ///
    /// Returns false if the timer was cancelled (or replaced) first; the
    /// caller must then not run its timeout transition.
    pub async fn fire(&self, handle: &TimerHandle) -> bool {
        let mut timers = self.timers.lock().await;

        // Every removal or replacement cancels the token under this lock, so a
        // live handle still owns its entry.
        if handle.is_cancelled() {
            return false;
        }

        timers.remove(&handle.request_id);
        handle.token.cancel();
        true
    }

    pub async fn len(&self) -> usize {
        self.timers.lock().await.len()
    }
}
