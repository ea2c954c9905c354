//! Identity provider boundary

use crate::config::IdentityConfig;
use crate::domain::{Identity, IdentitySession};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// External identity provider session
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current session snapshot
    async fn session(&self) -> IdentitySession;

    async fn login(&self) -> Result<()>;

    async fn logout(&self) -> Result<()>;

    /// Access token for the backend API
    async fn access_token(&self) -> Result<String>;
}

#[derive(Debug, Default)]
struct StaticState {
    authenticated: bool,
}

/// Provider whose identity and token are supplied up front (CLI, tests)
#[derive(Debug)]
pub struct StaticIdentityProvider {
    identity: Option<Identity>,
    token: Option<String>,
    state: RwLock<StaticState>,
}

impl StaticIdentityProvider {
    /// Starts signed in when an identity is given
    pub fn new(identity: Option<Identity>, token: Option<String>) -> Self {
        let authenticated = identity.is_some();
        Self {
            identity,
            token,
            state: RwLock::new(StaticState { authenticated }),
        }
    }

    pub fn anonymous() -> Self {
        Self::new(None, None)
    }

    pub fn from_config(config: &IdentityConfig) -> Self {
        let identity = config.subject.as_ref().map(|subject| Identity {
            subject_id: subject.clone(),
            email: config.email.clone(),
            name: config.name.clone(),
            picture: config.picture.clone(),
        });
        Self::new(identity, config.access_token.clone())
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn session(&self) -> IdentitySession {
        let state = self.state.read().await;
        match (&self.identity, state.authenticated) {
            (Some(identity), true) => IdentitySession::authenticated(identity.clone()),
            _ => IdentitySession::anonymous(),
        }
    }

    async fn login(&self) -> Result<()> {
        if self.identity.is_none() {
            return Err(AppError::IdentityProvider(
                "No identity configured; set FORO_SUBJECT".to_string(),
            ));
        }
        self.state.write().await.authenticated = true;
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        self.state.write().await.authenticated = false;
        Ok(())
    }

    async fn access_token(&self) -> Result<String> {
        if !self.state.read().await.authenticated {
            return Err(AppError::IdentityProvider("Not signed in".to_string()));
        }
        self.token
            .clone()
            .ok_or_else(|| AppError::IdentityProvider("No access token configured".to_string()))
    }
}
