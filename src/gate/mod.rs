//! Registration gate
//!
//! Classifies the current identity as anonymous, authenticated but not yet
//! provisioned as a forum user, or fully registered. The provisioning check
//! runs at most once per identity until the result is invalidated, and at
//! most one check is in flight at any time.
//!
//! Every check is tagged with the subject it was issued for and the gate's
//! generation counter; a result that arrives after logout, identity change,
//! or invalidation is discarded.

use crate::domain::IdentitySession;
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

/// Existence check for the application-user record backing an identity
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProvisioningCheck: Send + Sync {
    async fn user_exists(&self, subject_id: &str) -> Result<bool>;
}

/// Whether an application user exists for the current identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningResult {
    #[default]
    Unknown,
    Absent,
    Present,
}

impl From<bool> for ProvisioningResult {
    fn from(exists: bool) -> Self {
        if exists {
            ProvisioningResult::Present
        } else {
            ProvisioningResult::Absent
        }
    }
}

/// Booleans consumed by page guards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct GateDecision {
    pub is_checking_user: bool,
    pub needs_registration: bool,
    pub is_fully_registered: bool,
}

impl GateDecision {
    pub fn compute(
        is_authenticated: bool,
        is_loading: bool,
        result: ProvisioningResult,
        check_in_flight: bool,
    ) -> Self {
        let settled = is_authenticated && !is_loading;
        Self {
            is_checking_user: settled && check_in_flight,
            needs_registration: settled && result == ProvisioningResult::Absent,
            is_fully_registered: settled && result == ProvisioningResult::Present,
        }
    }

    /// Neither outcome is known yet
    pub fn is_resolving(&self) -> bool {
        !self.needs_registration && !self.is_fully_registered
    }
}

/// Observable gate state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    #[default]
    Unresolved,
    Checking,
    Registered,
    NeedsRegistration,
}

impl GateState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GateState::Registered | GateState::NeedsRegistration)
    }
}

#[derive(Debug, Default)]
struct GateInner {
    subject: Option<String>,
    result: ProvisioningResult,
    in_flight: bool,
    generation: u64,
}

impl GateInner {
    fn state(&self) -> GateState {
        match (self.in_flight, self.result) {
            (true, _) => GateState::Checking,
            (false, ProvisioningResult::Present) => GateState::Registered,
            (false, ProvisioningResult::Absent) => GateState::NeedsRegistration,
            (false, ProvisioningResult::Unknown) => GateState::Unresolved,
        }
    }

    /// Forget everything and make any in-flight check stale
    fn clear(&mut self) {
        self.subject = None;
        self.result = ProvisioningResult::Unknown;
        self.in_flight = false;
        self.generation += 1;
    }

    fn decision(&self, session: &IdentitySession) -> GateDecision {
        let matches = session.settled_subject().is_some()
            && session.settled_subject() == self.subject.as_deref();
        if matches {
            GateDecision::compute(
                session.is_authenticated,
                session.is_loading,
                self.result,
                self.in_flight,
            )
        } else {
            GateDecision::compute(
                session.is_authenticated,
                session.is_loading,
                ProvisioningResult::Unknown,
                false,
            )
        }
    }
}

/// Registration gate over a [`ProvisioningCheck`]
pub struct RegistrationGate<C: ProvisioningCheck> {
    checker: Arc<C>,
    inner: Arc<Mutex<GateInner>>,
    state_tx: Arc<watch::Sender<GateState>>,
}

impl<C: ProvisioningCheck> Clone for RegistrationGate<C> {
    fn clone(&self) -> Self {
        Self {
            checker: self.checker.clone(),
            inner: self.inner.clone(),
            state_tx: self.state_tx.clone(),
        }
    }
}

impl<C: ProvisioningCheck + 'static> RegistrationGate<C> {
    pub fn new(checker: Arc<C>) -> Self {
        let (state_tx, _) = watch::channel(GateState::Unresolved);
        Self {
            checker,
            inner: Arc::new(Mutex::new(GateInner::default())),
            state_tx: Arc::new(state_tx),
        }
    }

    fn publish(&self, inner: &GateInner) {
        let state = inner.state();
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(from = ?previous, to = ?state, "Registration gate transition");
        }
    }

    /// Resolve the gate for `session`.
    ///
    /// Issues the provisioning check when the session is authenticated and no
    /// result is cached, then waits for it. Calls made while a check is in
    /// flight return immediately with `is_checking_user` set.
    pub async fn resolve(&self, session: &IdentitySession) -> GateDecision {
        let (subject, generation) = {
            let mut inner = self.inner.lock().await;

            let Some(subject) = session.settled_subject() else {
                if inner.subject.is_some() || inner.in_flight {
                    debug!("Session not authenticated, discarding provisioning state");
                    inner.clear();
                    self.publish(&inner);
                }
                return inner.decision(session);
            };

            if inner.subject.as_deref() != Some(subject) {
                if inner.subject.is_some() {
                    info!("Identity changed, discarding provisioning state");
                }
                inner.clear();
                inner.subject = Some(subject.to_string());
            }

            if inner.result != ProvisioningResult::Unknown || inner.in_flight {
                return inner.decision(session);
            }

            inner.in_flight = true;
            self.publish(&inner);
            (subject.to_string(), inner.generation)
        };

        // The check runs on its own task so that dropping this future does
        // not leave the gate stuck in `Checking`.
        let task = {
            let gate = self.clone();
            let subject = subject.clone();
            tokio::spawn(async move {
                let result = match gate.checker.user_exists(&subject).await {
                    Ok(exists) => ProvisioningResult::from(exists),
                    Err(e) => {
                        warn!(
                            subject_id = %subject,
                            error = %e,
                            "Provisioning check failed, treating user as not registered"
                        );
                        ProvisioningResult::Absent
                    }
                };
                gate.apply(&subject, generation, result).await;
            })
        };

        if let Err(e) = task.await {
            error!(subject_id = %subject, error = %e, "Provisioning check task failed");
            self.apply(&subject, generation, ProvisioningResult::Absent)
                .await;
        }

        self.decision(session).await
    }

    async fn apply(&self, subject: &str, generation: u64, result: ProvisioningResult) {
        let mut inner = self.inner.lock().await;
        if inner.generation != generation || inner.subject.as_deref() != Some(subject) {
            debug!(subject_id = %subject, "Discarding stale provisioning result");
            return;
        }
        inner.result = result;
        inner.in_flight = false;
        self.publish(&inner);
    }

    /// Current decision for `session` without issuing a check
    pub async fn decision(&self, session: &IdentitySession) -> GateDecision {
        self.inner.lock().await.decision(session)
    }

    pub async fn state(&self) -> GateState {
        self.inner.lock().await.state()
    }

    pub async fn result(&self) -> ProvisioningResult {
        self.inner.lock().await.result
    }

    /// Watch gate transitions
    pub fn subscribe(&self) -> watch::Receiver<GateState> {
        self.state_tx.subscribe()
    }

    /// Drop the cached result for `subject_id` so the next resolve re-checks.
    ///
    /// Returns `false` when the gate holds no state for that subject.
    pub async fn invalidate(&self, subject_id: &str) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.subject.as_deref() != Some(subject_id) {
            return false;
        }
        inner.result = ProvisioningResult::Unknown;
        inner.in_flight = false;
        inner.generation += 1;
        self.publish(&inner);
        debug!(subject_id, "Provisioning result invalidated");
        true
    }

    /// Discard all gate state (logout)
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        inner.clear();
        self.publish(&inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Identity;
    use crate::error::AppError;
    use mockall::predicate::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    fn session_for(subject: &str) -> IdentitySession {
        IdentitySession::authenticated(Identity::new(subject))
    }

    /// Checker that blocks until released, counting calls.
    ///
    /// With `holding`, only that subject blocks; any other subject answers
    /// "absent" at once.
    struct HeldChecker {
        calls: AtomicUsize,
        release: Notify,
        exists: bool,
        held: Option<&'static str>,
    }

    impl HeldChecker {
        fn new(exists: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                release: Notify::new(),
                exists,
                held: None,
            }
        }

        fn holding(subject: &'static str, exists: bool) -> Self {
            Self {
                held: Some(subject),
                ..Self::new(exists)
            }
        }
    }

    #[async_trait]
    impl ProvisioningCheck for HeldChecker {
        async fn user_exists(&self, subject_id: &str) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.held.is_some_and(|held| held != subject_id) {
                return Ok(false);
            }
            self.release.notified().await;
            Ok(self.exists)
        }
    }

    async fn wait_for_state(rx: &mut watch::Receiver<GateState>, state: GateState) {
        rx.wait_for(|s| *s == state).await.unwrap();
    }

    #[test]
    fn test_decision_compute() {
        use ProvisioningResult::*;

        let d = GateDecision::compute(false, false, Present, true);
        assert_eq!(d, GateDecision::default());

        let d = GateDecision::compute(true, true, Absent, true);
        assert_eq!(d, GateDecision::default());

        let d = GateDecision::compute(true, false, Unknown, true);
        assert!(d.is_checking_user);
        assert!(d.is_resolving());

        let d = GateDecision::compute(true, false, Absent, false);
        assert!(d.needs_registration && !d.is_fully_registered);

        let d = GateDecision::compute(true, false, Present, false);
        assert!(d.is_fully_registered && !d.needs_registration);
    }

    #[tokio::test]
    async fn test_anonymous_session_issues_no_check() {
        let mut mock = MockProvisioningCheck::new();
        mock.expect_user_exists().never();
        let gate = RegistrationGate::new(Arc::new(mock));

        let decision = gate.resolve(&IdentitySession::anonymous()).await;
        assert_eq!(decision, GateDecision::default());

        let decision = gate.resolve(&IdentitySession::loading()).await;
        assert_eq!(decision, GateDecision::default());
        assert_eq!(gate.state().await, GateState::Unresolved);
    }

    #[tokio::test]
    async fn test_authenticated_without_subject_issues_no_check() {
        let mut mock = MockProvisioningCheck::new();
        mock.expect_user_exists().never();
        let gate = RegistrationGate::new(Arc::new(mock));

        let decision = gate.resolve(&session_for("")).await;
        assert_eq!(decision, GateDecision::default());
    }

    #[tokio::test]
    async fn test_existing_user_is_fully_registered() {
        let mut mock = MockProvisioningCheck::new();
        mock.expect_user_exists()
            .with(eq("auth0|abc"))
            .times(1)
            .returning(|_| Ok(true));
        let gate = RegistrationGate::new(Arc::new(mock));

        let decision = gate.resolve(&session_for("auth0|abc")).await;
        assert!(decision.is_fully_registered);
        assert!(!decision.needs_registration);
        assert!(!decision.is_checking_user);
        assert_eq!(gate.state().await, GateState::Registered);

        // Cached: a second resolve does not call the checker again
        let decision = gate.resolve(&session_for("auth0|abc")).await;
        assert!(decision.is_fully_registered);
    }

    #[tokio::test]
    async fn test_missing_user_needs_registration() {
        let mut mock = MockProvisioningCheck::new();
        mock.expect_user_exists().times(1).returning(|_| Ok(false));
        let gate = RegistrationGate::new(Arc::new(mock));

        let decision = gate.resolve(&session_for("auth0|abc")).await;
        assert!(decision.needs_registration);
        assert!(!decision.is_fully_registered);
        assert_eq!(gate.result().await, ProvisioningResult::Absent);
    }

    #[tokio::test]
    async fn test_check_failure_fails_closed() {
        let mut mock = MockProvisioningCheck::new();
        mock.expect_user_exists()
            .times(1)
            .returning(|_| Err(AppError::Internal(anyhow::anyhow!("connection refused"))));
        let gate = RegistrationGate::new(Arc::new(mock));

        let decision = gate.resolve(&session_for("auth0|abc")).await;
        assert!(decision.needs_registration);
        assert!(!decision.is_fully_registered);

        // The failure is sticky: no retry on the next resolve
        let decision = gate.resolve(&session_for("auth0|abc")).await;
        assert!(decision.needs_registration);
    }

    #[tokio::test]
    async fn test_cached_result_hidden_when_logged_out() {
        let mut mock = MockProvisioningCheck::new();
        mock.expect_user_exists().times(1).returning(|_| Ok(true));
        let gate = RegistrationGate::new(Arc::new(mock));

        gate.resolve(&session_for("auth0|abc")).await;

        let mut logged_out = session_for("auth0|abc");
        logged_out.is_authenticated = false;
        assert_eq!(gate.decision(&logged_out).await, GateDecision::default());
    }

    #[tokio::test]
    async fn test_logout_discards_result() {
        let mut mock = MockProvisioningCheck::new();
        mock.expect_user_exists().times(2).returning(|_| Ok(true));
        let gate = RegistrationGate::new(Arc::new(mock));

        gate.resolve(&session_for("auth0|abc")).await;
        gate.resolve(&IdentitySession::anonymous()).await;
        assert_eq!(gate.state().await, GateState::Unresolved);
        assert_eq!(gate.result().await, ProvisioningResult::Unknown);

        let decision = gate.resolve(&session_for("auth0|abc")).await;
        assert!(decision.is_fully_registered);
    }

    #[tokio::test]
    async fn test_identity_change_rechecks() {
        let mut mock = MockProvisioningCheck::new();
        mock.expect_user_exists()
            .with(eq("auth0|abc"))
            .times(1)
            .returning(|_| Ok(true));
        mock.expect_user_exists()
            .with(eq("auth0|xyz"))
            .times(1)
            .returning(|_| Ok(false));
        let gate = RegistrationGate::new(Arc::new(mock));

        assert!(gate.resolve(&session_for("auth0|abc")).await.is_fully_registered);
        assert!(gate.resolve(&session_for("auth0|xyz")).await.needs_registration);
    }

    #[tokio::test]
    async fn test_invalidate_forces_recheck() {
        let mut mock = MockProvisioningCheck::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_user_exists()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(false));
        mock.expect_user_exists()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(true));
        let gate = RegistrationGate::new(Arc::new(mock));
        let session = session_for("auth0|abc");

        assert!(gate.resolve(&session).await.needs_registration);
        assert!(gate.invalidate("auth0|abc").await);
        assert_eq!(gate.state().await, GateState::Unresolved);
        assert!(gate.resolve(&session).await.is_fully_registered);
    }

    #[tokio::test]
    async fn test_invalidate_other_subject_is_noop() {
        let mut mock = MockProvisioningCheck::new();
        mock.expect_user_exists().times(1).returning(|_| Ok(false));
        let gate = RegistrationGate::new(Arc::new(mock));

        gate.resolve(&session_for("auth0|abc")).await;
        assert!(!gate.invalidate("auth0|other").await);
        assert_eq!(gate.state().await, GateState::NeedsRegistration);
    }

    #[tokio::test]
    async fn test_concurrent_resolves_issue_one_check() {
        let checker = Arc::new(HeldChecker::new(true));
        let gate = RegistrationGate::new(checker.clone());
        let mut rx = gate.subscribe();
        let session = session_for("auth0|abc");

        let first = {
            let gate = gate.clone();
            let session = session.clone();
            tokio::spawn(async move { gate.resolve(&session).await })
        };
        wait_for_state(&mut rx, GateState::Checking).await;

        let second = gate.resolve(&session).await;
        assert!(second.is_checking_user);
        assert!(second.is_resolving());

        checker.release.notify_one();
        let first = first.await.unwrap();
        assert!(first.is_fully_registered);
        assert!(!first.is_checking_user);
        assert_eq!(checker.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_result_discarded_after_logout_mid_check() {
        let checker = Arc::new(HeldChecker::new(false));
        let gate = RegistrationGate::new(checker.clone());
        let mut rx = gate.subscribe();
        let session = session_for("auth0|abc");

        let pending = {
            let gate = gate.clone();
            let session = session.clone();
            tokio::spawn(async move { gate.resolve(&session).await })
        };
        wait_for_state(&mut rx, GateState::Checking).await;

        gate.reset().await;
        checker.release.notify_one();
        pending.await.unwrap();

        assert_eq!(gate.state().await, GateState::Unresolved);
        assert_eq!(gate.result().await, ProvisioningResult::Unknown);
    }

    #[tokio::test]
    async fn test_result_discarded_after_identity_change_mid_check() {
        let checker = Arc::new(HeldChecker::holding("auth0|abc", true));
        let gate = RegistrationGate::new(checker.clone());
        let mut rx = gate.subscribe();
        let first = session_for("auth0|abc");
        let second = session_for("auth0|xyz");

        let pending = {
            let gate = gate.clone();
            let session = first.clone();
            tokio::spawn(async move { gate.resolve(&session).await })
        };
        wait_for_state(&mut rx, GateState::Checking).await;

        let decision = gate.resolve(&second).await;
        assert!(decision.needs_registration);

        // The first identity's "present" lands after the switch
        checker.release.notify_one();
        let stale = pending.await.unwrap();
        assert_eq!(stale, GateDecision::default());

        let decision = gate.decision(&second).await;
        assert!(decision.needs_registration);
        assert!(!decision.is_fully_registered);
        assert_eq!(gate.state().await, GateState::NeedsRegistration);
        assert_eq!(checker.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_result_discarded_after_invalidate_mid_check() {
        let checker = Arc::new(HeldChecker::new(true));
        let gate = RegistrationGate::new(checker.clone());
        let mut rx = gate.subscribe();
        let session = session_for("auth0|abc");

        let pending = {
            let gate = gate.clone();
            let session = session.clone();
            tokio::spawn(async move { gate.resolve(&session).await })
        };
        wait_for_state(&mut rx, GateState::Checking).await;

        assert!(gate.invalidate("auth0|abc").await);
        checker.release.notify_one();
        pending.await.unwrap();

        assert_eq!(gate.state().await, GateState::Unresolved);
        assert_eq!(gate.result().await, ProvisioningResult::Unknown);
        assert!(gate.decision(&session).await.is_resolving());
        assert_eq!(checker.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dropped_caller_does_not_wedge_gate() {
        let checker = Arc::new(HeldChecker::new(true));
        let gate = RegistrationGate::new(checker.clone());
        let mut rx = gate.subscribe();
        let session = session_for("auth0|abc");

        let pending = {
            let gate = gate.clone();
            let session = session.clone();
            tokio::spawn(async move { gate.resolve(&session).await })
        };
        wait_for_state(&mut rx, GateState::Checking).await;
        pending.abort();

        checker.release.notify_one();
        wait_for_state(&mut rx, GateState::Registered).await;
        assert!(gate.decision(&session).await.is_fully_registered);
    }
}
