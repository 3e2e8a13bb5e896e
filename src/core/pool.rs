use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::core::error::MatchError;
use crate::core::intersect::is_compatible;
use crate::models::{MatchPolicy, MatchRequest, RequestStatus};

/// Two requests reserved together, both already flipped to `Matched`
///
/// `first` is the earlier-registered request.
#[derive(Debug, Clone)]
pub struct MatchedPair {
    pub first: MatchRequest,
    pub second: MatchRequest,
}

/// What happened when a request entered the pool
#[derive(Debug, Clone)]
pub struct Registration {
    /// The request as registered (sequence and timestamp assigned)
    pub request: MatchRequest,
    /// Older pending request of the same user, now `Cancelled`
    pub superseded: Option<MatchRequest>,
    /// Set when the arrival was paired immediately
    pub matched: Option<MatchedPair>,
}

/// Pending requests indexed by id, plus arrival order and per-user lookup
///
/// Every method runs to completion without suspending, so callers holding the
/// pool lock get atomic find-and-reserve semantics.
#[derive(Debug)]
pub struct PoolState {
    entries: HashMap<Uuid, MatchRequest>,
    arrival: BTreeMap<u64, Uuid>,
    by_user: HashMap<String, Uuid>,
    next_sequence: u64,
    policy: MatchPolicy,
}

impl PoolState {
    pub fn new(policy: MatchPolicy) -> Self {
        Self {
            entries: HashMap::new(),
            arrival: BTreeMap::new(),
            by_user: HashMap::new(),
            next_sequence: 0,
            policy,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, request_id: &Uuid) -> bool {
        self.entries.contains_key(request_id)
    }

    pub fn get(&self, request_id: &Uuid) -> Option<&MatchRequest> {
        self.entries.get(request_id)
    }

    pub fn pending_for_user(&self, user_id: &str) -> Option<Uuid> {
        self.by_user.get(user_id).copied()
    }

    /// Insert a new Pending request and immediately look for a partner
    ///
    /// An older pending request from the same user is cancelled first, so a
    /// user never waits twice and never matches themselves.
    pub fn register(&mut self, mut request: MatchRequest) -> Registration {
        let superseded = self
            .pending_for_user(&request.user_id)
            .and_then(|old| self.resolve(&old, RequestStatus::Cancelled).ok());

        request.status = RequestStatus::Pending;
        request.sequence = self.next_sequence;
        request.created_at = chrono::Utc::now();
        self.next_sequence += 1;

        let request_id = request.request_id;
        self.arrival.insert(request.sequence, request_id);
        self.by_user.insert(request.user_id.clone(), request_id);
        self.entries.insert(request_id, request.clone());

        // Registered just above, so this cannot be discarded
        let matched = self.try_match(&request_id).ok().flatten();

        Registration {
            request,
            superseded,
            matched,
        }
    }

    /// Find the oldest compatible partner for a pending request
    pub fn find_partner(&self, request_id: &Uuid) -> Option<Uuid> {
        let request = self.entries.get(request_id)?;

        self.arrival
            .values()
            .filter(|id| *id != request_id)
            .filter_map(|id| self.entries.get(id))
            .filter(|candidate| candidate.user_id != request.user_id)
            .find(|candidate| is_compatible(&request.criteria, &candidate.criteria, &self.policy))
            .map(|candidate| candidate.request_id)
    }

    /// Find and reserve a partner for `request_id`
    ///
    /// Returns `RaceDiscarded` if the request itself is no longer pending,
    /// `Ok(None)` if nobody compatible is waiting.
    pub fn try_match(&mut self, request_id: &Uuid) -> Result<Option<MatchedPair>, MatchError> {
        if !self.entries.contains_key(request_id) {
            return Err(MatchError::RaceDiscarded(*request_id));
        }

        match self.find_partner(request_id) {
            Some(partner_id) => self.reserve_pair(request_id, &partner_id).map(Some),
            None => Ok(None),
        }
    }

    /// Take both requests out of the pool as `Matched`, or neither
    fn reserve_pair(&mut self, a: &Uuid, b: &Uuid) -> Result<MatchedPair, MatchError> {
        for id in [a, b] {
            if !self.entries.contains_key(id) {
                return Err(MatchError::RaceDiscarded(*id));
            }
        }

        let mut first = self.take(a).ok_or(MatchError::RaceDiscarded(*a))?;
        let mut second = self.take(b).ok_or(MatchError::RaceDiscarded(*b))?;
        first.status = RequestStatus::Matched;
        second.status = RequestStatus::Matched;

        if second.sequence < first.sequence {
            std::mem::swap(&mut first, &mut second);
        }

        Ok(MatchedPair { first, second })
    }

    /// Commit a terminal status for a pending request
    ///
    /// Only the first transition out of Pending succeeds; later ones get
    /// `RaceDiscarded`.
    pub fn resolve(
        &mut self,
        request_id: &Uuid,
        status: RequestStatus,
    ) -> Result<MatchRequest, MatchError> {
        debug_assert!(status.is_terminal());

        let mut request = self
            .take(request_id)
            .ok_or(MatchError::RaceDiscarded(*request_id))?;
        request.status = status;
        Ok(request)
    }

    fn take(&mut self, request_id: &Uuid) -> Option<MatchRequest> {
        let request = self.entries.remove(request_id)?;
        self.arrival.remove(&request.sequence);
        if self.by_user.get(&request.user_id) == Some(request_id) {
            self.by_user.remove(&request.user_id);
        }
        Some(request)
    }
}

/// moka rejects time-to-live values above 1000 years
const MAX_RESOLVED_TTL: Duration = Duration::from_secs(365 * 24 * 3600);

/// Shared pool guarded by a single lock
///
/// All mutations go through this lock; nothing awaits while holding it.
/// Terminal statuses are recorded before the lock is released, so a request
/// is always visible either as pending or with its final status.
#[derive(Debug)]
pub struct PendingPool {
    state: Mutex<PoolState>,
    resolved: moka::sync::Cache<Uuid, RequestStatus>,
}

impl PendingPool {
    pub fn new(policy: MatchPolicy, resolved_ttl: Duration, resolved_capacity: u64) -> Self {
        Self {
            state: Mutex::new(PoolState::new(policy)),
            resolved: moka::sync::Cache::builder()
                .max_capacity(resolved_capacity)
                .time_to_live(resolved_ttl.min(MAX_RESOLVED_TTL))
                .build(),
        }
    }

    pub async fn register(&self, request: MatchRequest) -> Registration {
        let mut state = self.state.lock().await;
        let registration = state.register(request);

        if let Some(old) = &registration.superseded {
            self.record(old);
        }
        if let Some(pair) = &registration.matched {
            self.record(&pair.first);
            self.record(&pair.second);
        }

        drop(state);
        registration
    }

    pub async fn resolve(
        &self,
        request_id: &Uuid,
        status: RequestStatus,
    ) -> Result<MatchRequest, MatchError> {
        let mut state = self.state.lock().await;
        let request = state.resolve(request_id, status)?;
        self.record(&request);
        Ok(request)
    }

    /// Pending while pooled, the terminal status while retained, else unknown
    pub async fn status(&self, request_id: &Uuid) -> Option<RequestStatus> {
        let state = self.state.lock().await;
        if state.contains(request_id) {
            return Some(RequestStatus::Pending);
        }
        self.resolved.get(request_id)
    }

    pub async fn pending_for_user(&self, user_id: &str) -> Option<Uuid> {
        self.state.lock().await.pending_for_user(user_id)
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.len()
    }

    fn record(&self, request: &MatchRequest) {
        self.resolved.insert(request.request_id, request.status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DifficultyLevel, MatchCriteria, ProgrammingLanguage};

    fn request(user: &str, languages: &[ProgrammingLanguage]) -> MatchRequest {
        MatchRequest::new(
            user.to_string(),
            format!("User {}", user),
            format!("sock-{}", user),
            MatchCriteria {
                difficulty_levels: vec![DifficultyLevel::Easy],
                categories: vec!["arrays".to_string()],
                programming_languages: languages.to_vec(),
                generalize_languages: false,
            },
        )
    }

    #[test]
    fn test_register_into_empty_pool_stays_pending() {
        let mut pool = PoolState::new(MatchPolicy::default());
        let reg = pool.register(request("a", &[ProgrammingLanguage::Java]));

        assert!(reg.matched.is_none());
        assert!(reg.superseded.is_none());
        assert_eq!(pool.len(), 1);
        assert!(pool.contains(&reg.request.request_id));
    }

    #[test]
    fn test_register_matches_existing_partner() {
        let mut pool = PoolState::new(MatchPolicy::default());
        let a = pool.register(request("a", &[ProgrammingLanguage::Python]));
        let b = pool.register(request("b", &[ProgrammingLanguage::Python]));

        let pair = b.matched.expect("should match");
        assert_eq!(pair.first.request_id, a.request.request_id);
        assert_eq!(pair.second.request_id, b.request.request_id);
        assert_eq!(pair.first.status, RequestStatus::Matched);
        assert_eq!(pair.second.status, RequestStatus::Matched);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_oldest_compatible_candidate_wins() {
        let mut pool = PoolState::new(MatchPolicy::default());
        let java = pool.register(request("a", &[ProgrammingLanguage::Java]));
        let oldest_py = pool.register(request("b", &[ProgrammingLanguage::Python]));
        // "b" and "c" are compatible with each other, so "c" pairs with "b"
        let c = pool.register(request("c", &[ProgrammingLanguage::Python]));

        let pair = c.matched.expect("should match");
        assert_eq!(pair.first.request_id, oldest_py.request.request_id);
        assert!(pool.contains(&java.request.request_id));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_oldest_first_among_many() {
        let mut pool = PoolState::new(MatchPolicy::default());
        let mut flexible = request("x", &[]);
        flexible.criteria.generalize_languages = true;

        let first = pool.register(request("a", &[ProgrammingLanguage::Go]));
        // Java and Go don't overlap, so the second one waits too
        let second = pool.register(request("b", &[ProgrammingLanguage::Java]));
        assert!(second.matched.is_none());

        let reg = pool.register(flexible);
        let pair = reg.matched.expect("generalizing request matches anyone");
        assert_eq!(pair.first.request_id, first.request.request_id);
    }

    #[test]
    fn test_incompatible_requests_wait() {
        let mut pool = PoolState::new(MatchPolicy::default());
        pool.register(request("a", &[ProgrammingLanguage::Java]));
        let b = pool.register(request("b", &[ProgrammingLanguage::Python]));

        assert!(b.matched.is_none());
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_same_user_supersedes_and_never_self_matches() {
        let mut pool = PoolState::new(MatchPolicy::default());
        let first = pool.register(request("a", &[ProgrammingLanguage::Python]));
        let second = pool.register(request("a", &[ProgrammingLanguage::Python]));

        let superseded = second.superseded.expect("older request superseded");
        assert_eq!(superseded.request_id, first.request.request_id);
        assert_eq!(superseded.status, RequestStatus::Cancelled);
        assert!(second.matched.is_none());
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.pending_for_user("a"), Some(second.request.request_id));
    }

    #[test]
    fn test_resolve_only_once() {
        let mut pool = PoolState::new(MatchPolicy::default());
        let reg = pool.register(request("a", &[]));
        let id = reg.request.request_id;

        let cancelled = pool.resolve(&id, RequestStatus::Cancelled).unwrap();
        assert_eq!(cancelled.status, RequestStatus::Cancelled);

        let err = pool.resolve(&id, RequestStatus::TimedOut).unwrap_err();
        assert!(matches!(err, MatchError::RaceDiscarded(got) if got == id));
    }

    #[test]
    fn test_cancelled_request_never_selected() {
        let mut pool = PoolState::new(MatchPolicy::default());
        let d = pool.register(request("d", &[ProgrammingLanguage::Python]));
        pool.resolve(&d.request.request_id, RequestStatus::Cancelled).unwrap();

        let e = pool.register(request("e", &[ProgrammingLanguage::Python]));
        assert!(e.matched.is_none());
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_try_match_after_resolution_is_discarded() {
        let mut pool = PoolState::new(MatchPolicy::default());
        let reg = pool.register(request("a", &[]));
        let id = reg.request.request_id;
        pool.resolve(&id, RequestStatus::TimedOut).unwrap();

        assert!(matches!(pool.try_match(&id), Err(MatchError::RaceDiscarded(_))));
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_registrations_pair_each_request_once() {
        use std::collections::HashSet;
        use std::sync::Arc;

        let pool = Arc::new(PendingPool::new(
            MatchPolicy::default(),
            Duration::from_secs(600),
            1_000,
        ));
        let mut handles = Vec::new();
        for i in 0..100 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move {
                pool.register(request(&format!("user-{}", i), &[ProgrammingLanguage::Go]))
                    .await
            }));
        }

        let mut matched = HashSet::new();
        for handle in handles {
            if let Some(pair) = handle.await.unwrap().matched {
                assert!(matched.insert(pair.first.request_id));
                assert!(matched.insert(pair.second.request_id));
            }
        }

        assert_eq!(matched.len(), 100);
        assert_eq!(pool.len().await, 0);
    }

    #[tokio::test]
    async fn test_terminal_status_visible_when_lock_released() {
        let pool = PendingPool::new(MatchPolicy::default(), Duration::from_secs(600), 1_000);

        let a = pool.register(request("a", &[ProgrammingLanguage::C])).await;
        let a_id = a.request.request_id;
        assert_eq!(pool.status(&a_id).await, Some(RequestStatus::Pending));

        let b = pool.register(request("b", &[ProgrammingLanguage::C])).await;
        assert!(b.matched.is_some());
        assert_eq!(pool.status(&a_id).await, Some(RequestStatus::Matched));
        assert_eq!(
            pool.status(&b.request.request_id).await,
            Some(RequestStatus::Matched)
        );

        let c = pool.register(request("c", &[ProgrammingLanguage::Go])).await;
        let c_id = c.request.request_id;
        pool.resolve(&c_id, RequestStatus::Cancelled).await.unwrap();
        assert_eq!(pool.status(&c_id).await, Some(RequestStatus::Cancelled));

        // Losing transition leaves the recorded status alone
        assert!(pool.resolve(&c_id, RequestStatus::TimedOut).await.is_err());
        assert_eq!(pool.status(&c_id).await, Some(RequestStatus::Cancelled));

        assert_eq!(pool.status(&Uuid::new_v4()).await, None);
    }

    #[tokio::test]
    async fn test_oversized_retention_is_clamped() {
        let pool = PendingPool::new(MatchPolicy::default(), Duration::from_secs(u64::MAX), 10);
        let reg = pool.register(request("a", &[])).await;
        assert_eq!(pool.status(&reg.request.request_id).await, Some(RequestStatus::Pending));
    }
}
