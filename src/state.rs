//! Application state shared by the CLI commands

use crate::api::{ForumApiClient, TokenStore};
use crate::config::Config;
use crate::domain::IdentitySession;
use crate::error::Result;
use crate::forum::ForumService;
use crate::gate::{GateDecision, RegistrationGate};
use crate::guard::{evaluate, GuardOutcome, Route};
use crate::identity::{AuthSession, IdentityProvider};
use crate::registration::RegistrationService;
use serde::Serialize;
use std::sync::Arc;

/// Session snapshot together with the gate's view of it
#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub authenticated: bool,
    pub subject_id: Option<String>,
    #[serde(flatten)]
    pub decision: GateDecision,
}

pub struct AppState<P: IdentityProvider> {
    pub config: Config,
    pub api: ForumApiClient,
    pub auth: AuthSession<P>,
    pub gate: RegistrationGate<ForumApiClient>,
    pub registration: RegistrationService<ForumApiClient>,
    pub forum: ForumService,
}

impl<P: IdentityProvider> AppState<P> {
    pub fn new(config: Config, provider: Arc<P>) -> Result<Self> {
        let tokens = TokenStore::new();
        let api = ForumApiClient::new(config.api.clone(), tokens.clone())?;
        let auth = AuthSession::new(provider, tokens, api.token_memo());
        let gate = RegistrationGate::new(Arc::new(api.clone()));
        let registration = RegistrationService::new(api.clone(), gate.clone());
        let forum = ForumService::new(api.clone(), config.paging.clone());

        Ok(Self {
            config,
            api,
            auth,
            gate,
            registration,
            forum,
        })
    }

    /// Sync the token store with the provider and resolve the gate
    pub async fn refresh(&self) -> (IdentitySession, GateDecision) {
        let session = self.auth.sync().await;
        let decision = self.gate.resolve(&session).await;
        (session, decision)
    }

    pub async fn status(&self) -> Status {
        let (session, decision) = self.refresh().await;
        Status {
            authenticated: session.is_authenticated,
            subject_id: session.settled_subject().map(str::to_string),
            decision,
        }
    }

    /// Guard outcome for navigating to `path`
    pub async fn navigate(&self, path: &str) -> (Route, GuardOutcome) {
        let route = Route::parse(path);
        let (session, decision) = self.refresh().await;
        (route, evaluate(route, &session, &decision))
    }

    /// Sign out and forget the provisioning state
    pub async fn logout(&self) -> Result<()> {
        self.gate.reset().await;
        self.auth.logout().await
    }
}
