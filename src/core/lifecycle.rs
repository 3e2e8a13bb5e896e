use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;
use validator::Validate;

use crate::core::error::MatchError;
use crate::core::intersect::{category_intersection, difficulty_intersection, select_language};
use crate::core::pool::{MatchedPair, PendingPool};
use crate::core::timers::{TimerHandle, TimerRegistry};
use crate::models::{
    MatchPolicy, MatchRequest, MatchResult, Notification, RequestStatus, SubmitMatchRequest,
};
use crate::services::{CollaboratorError, MatchStore, Notifier, ResultPublisher};

/// Tunables for the lifecycle controller
#[derive(Debug, Clone, Copy)]
pub struct MatchmakerConfig {
    /// Flat waiting window applied to every request
    pub timeout: Duration,
    pub policy: MatchPolicy,
    /// How long terminal statuses stay queryable in memory
    pub resolved_ttl: Duration,
    pub resolved_capacity: u64,
    /// Age after which resolved records are purged from the store
    pub stale_after: Duration,
}

impl Default for MatchmakerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            policy: MatchPolicy::default(),
            resolved_ttl: Duration::from_secs(600),
            resolved_capacity: 100_000,
            stale_after: Duration::from_secs(3600),
        }
    }
}

/// Downstream collaborators invoked after transitions commit
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn MatchStore>,
    pub publisher: Arc<dyn ResultPublisher>,
    pub notifier: Arc<dyn Notifier>,
}

/// Accepted submission
#[derive(Debug, Clone)]
pub struct Submission {
    pub request: MatchRequest,
    /// Set when the request was paired while registering
    pub result: Option<MatchResult>,
}

impl Submission {
    pub fn status(&self) -> RequestStatus {
        if self.result.is_some() {
            RequestStatus::Matched
        } else {
            RequestStatus::Pending
        }
    }
}

/// What a cancel call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled(Uuid),
    /// Already terminal; nothing changed
    AlreadyResolved(Uuid, RequestStatus),
    /// No such request (or nothing pending for the user); nothing changed
    Unknown,
}

impl CancelOutcome {
    pub fn request_id(&self) -> Option<Uuid> {
        match self {
            CancelOutcome::Cancelled(id) | CancelOutcome::AlreadyResolved(id, _) => Some(*id),
            CancelOutcome::Unknown => None,
        }
    }

    pub fn status(&self) -> Option<RequestStatus> {
        match self {
            CancelOutcome::Cancelled(_) => Some(RequestStatus::Cancelled),
            CancelOutcome::AlreadyResolved(_, status) => Some(*status),
            CancelOutcome::Unknown => None,
        }
    }
}

struct Inner {
    pool: PendingPool,
    timers: TimerRegistry,
    collaborators: Collaborators,
    config: MatchmakerConfig,
}

/// Drives each request from submission to exactly one terminal state
///
/// Cheap to clone; clones share the same pool and timers.
#[derive(Clone)]
pub struct Matchmaker {
    inner: Arc<Inner>,
}

impl Matchmaker {
    pub fn new(config: MatchmakerConfig, collaborators: Collaborators) -> Self {
        Self {
            inner: Arc::new(Inner {
                pool: PendingPool::new(
                    config.policy,
                    config.resolved_ttl,
                    config.resolved_capacity,
                ),
                timers: TimerRegistry::new(),
                collaborators,
                config,
            }),
        }
    }

    pub fn config(&self) -> &MatchmakerConfig {
        &self.inner.config
    }

    /// Validate a submission, pool it, and start its deadline
    ///
    /// Returns as soon as the request is registered; if no partner was waiting,
    /// the outcome is decided later by another arrival, a cancel, or the timer.
    pub async fn submit(&self, payload: SubmitMatchRequest) -> Result<Submission, MatchError> {
        payload.validate()?;
        let request = payload.into_match_request();
        let request_id = request.request_id;

        self.purge_stale();

        report(
            "Storing request",
            request_id,
            self.inner.collaborators.store.insert_request(&request).await,
        );

        // Armed before registering so an immediate match can cancel it
        let handle = self
            .inner
            .timers
            .arm(request_id, self.inner.config.timeout)
            .await;

        let registration = self.inner.pool.register(request).await;

        if let Some(old) = registration.superseded {
            tracing::info!(
                "Request {} superseded by {} for user {}",
                old.request_id,
                request_id,
                old.user_id
            );
            self.finish_unmatched(old).await;
        }

        let result = match registration.matched {
            Some(pair) => Some(self.commit_match(pair).await),
            None => {
                tracing::info!(
                    "Request {} from user {} is waiting for a partner",
                    request_id,
                    registration.request.user_id
                );
                self.spawn_deadline(handle);
                None
            }
        };

        Ok(Submission {
            request: registration.request,
            result,
        })
    }

    /// Cancel a pending request; idempotent for resolved and unknown ids
    pub async fn cancel(&self, request_id: Uuid) -> Result<CancelOutcome, MatchError> {
        match self.inner.pool.resolve(&request_id, RequestStatus::Cancelled).await {
            Ok(request) => {
                tracing::info!("Request {} cancelled by user {}", request_id, request.user_id);
                self.finish_unmatched(request).await;
                Ok(CancelOutcome::Cancelled(request_id))
            }
            Err(MatchError::RaceDiscarded(_)) => match self.status(request_id).await {
                Ok(status) if status.is_terminal() => {
                    tracing::debug!("Cancel of {} ignored, already {}", request_id, status);
                    Ok(CancelOutcome::AlreadyResolved(request_id, status))
                }
                // Not pooled but still Pending in the store: left over from an earlier run
                Ok(_) | Err(MatchError::NotFound(_)) => {
                    tracing::debug!("Cancel of unknown request {}", request_id);
                    Ok(CancelOutcome::Unknown)
                }
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    /// Cancel whatever the user currently has pending
    pub async fn cancel_for_user(&self, user_id: &str) -> Result<CancelOutcome, MatchError> {
        match self.inner.pool.pending_for_user(user_id).await {
            Some(request_id) => self.cancel(request_id).await,
            None => Ok(CancelOutcome::Unknown),
        }
    }

    /// Current status: pool and recent outcomes first, then the store
    pub async fn status(&self, request_id: Uuid) -> Result<RequestStatus, MatchError> {
        if let Some(status) = self.inner.pool.status(&request_id).await {
            return Ok(status);
        }

        match self.inner.collaborators.store.get_status(request_id).await {
            Ok(Some(status)) => Ok(status),
            Ok(None) => Err(MatchError::NotFound(request_id)),
            Err(e) => Err(CollaboratorError::from(e).into()),
        }
    }

    pub async fn pending_count(&self) -> usize {
        self.inner.pool.len().await
    }

    pub async fn store_healthy(&self) -> bool {
        match self.inner.collaborators.store.health_check().await {
            Ok(healthy) => healthy,
            Err(e) => {
                tracing::warn!("Store health check failed: {}", e);
                false
            }
        }
    }

    /// Finish a pair the pool already reserved as `Matched`
    async fn commit_match(&self, pair: MatchedPair) -> MatchResult {
        let MatchedPair { first, second } = pair;

        self.inner.timers.cancel(&first.request_id).await;
        self.inner.timers.cancel(&second.request_id).await;

        let result = build_result(&first, &second, &self.inner.config.policy);

        tracing::info!(
            "Matched user {} with user {} in room {} ({:?})",
            result.user_one.user_id,
            result.user_two.user_id,
            result.room_id,
            result.selected_language
        );

        let collaborators = self.inner.collaborators.clone();
        let dispatched = result.clone();
        tokio::spawn(async move { dispatch_match(collaborators, dispatched).await });

        result
    }

    /// Record a Cancelled or TimedOut request and tell its owner
    async fn finish_unmatched(&self, request: MatchRequest) {
        self.inner.timers.cancel(&request.request_id).await;

        let collaborators = self.inner.collaborators.clone();
        tokio::spawn(async move { dispatch_unmatched(collaborators, request).await });
    }

    fn spawn_deadline(&self, handle: TimerHandle) {
        let matchmaker = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = handle.cancelled() => {
                    tracing::trace!("Deadline for {} no longer needed", handle.request_id());
                }
                _ = handle.elapsed() => matchmaker.expire(&handle).await,
            }
        });
    }

    async fn expire(&self, handle: &TimerHandle) {
        let request_id = handle.request_id();

        if !self.inner.timers.fire(handle).await {
            tracing::debug!("Timer for {} was cancelled before firing", request_id);
            return;
        }

        match self.inner.pool.resolve(&request_id, RequestStatus::TimedOut).await {
            Ok(request) => {
                tracing::info!(
                    "Request {} from user {} timed out after {:?}",
                    request_id,
                    request.user_id,
                    self.inner.config.timeout
                );
                self.finish_unmatched(request).await;
            }
            Err(e) => tracing::debug!("Timeout discarded: {}", e),
        }
    }

    fn purge_stale(&self) {
        let store = self.inner.collaborators.store.clone();
        let Some(cutoff) = chrono::Duration::from_std(self.inner.config.stale_after)
            .ok()
            .and_then(|age| chrono::Utc::now().checked_sub_signed(age))
        else {
            tracing::debug!(
                "Stale purge skipped, cutoff {:?} out of range",
                self.inner.config.stale_after
            );
            return;
        };

        tokio::spawn(async move {
            if let Err(e) = store.purge_stale(cutoff).await {
                tracing::warn!("Stale request purge failed: {}", e);
            }
        });
    }
}

/// Build the immutable result for a reserved pair; `first` owns the room
pub fn build_result(first: &MatchRequest, second: &MatchRequest, policy: &MatchPolicy) -> MatchResult {
    MatchResult {
        room_id: first.request_id,
        user_one: first.participant(),
        user_two: second.participant(),
        selected_language: select_language(
            &first.criteria,
            &second.criteria,
            policy.fallback_language,
        ),
        difficulty_intersection: difficulty_intersection(&first.criteria, &second.criteria),
        category_intersection: category_intersection(&first.criteria, &second.criteria),
        matched_at: chrono::Utc::now(),
    }
}

async fn dispatch_match(collaborators: Collaborators, result: MatchResult) {
    report(
        "Recording match",
        result.room_id,
        collaborators.store.record_match(&result).await,
    );
    report(
        "Publishing match",
        result.room_id,
        collaborators.publisher.publish(&result).await,
    );
    report(
        "Notifying match",
        result.room_id,
        collaborators
            .notifier
            .notify(&Notification::matched(&result))
            .await,
    );
}

async fn dispatch_unmatched(collaborators: Collaborators, request: MatchRequest) {
    report(
        "Recording status",
        request.request_id,
        collaborators
            .store
            .update_status(request.request_id, request.status)
            .await,
    );
    report(
        "Notifying outcome",
        request.request_id,
        collaborators
            .notifier
            .notify(&Notification::unmatched(&request, request.status))
            .await,
    );
}

/// Collaborator failures never roll back a committed transition
fn report<E: Into<CollaboratorError>>(action: &str, id: Uuid, result: Result<(), E>) {
    if let Err(e) = result {
        let e: CollaboratorError = e.into();
        tracing::warn!("{} for {} failed: {}", action, id, e);
    }
}
