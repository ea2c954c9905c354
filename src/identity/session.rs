//! Auth session: keeps the persisted bearer token in step with the provider

use crate::api::{TokenMemo, TokenStore};
use crate::domain::IdentitySession;
use crate::error::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error};

use super::provider::IdentityProvider;

pub struct AuthSession<P: IdentityProvider> {
    provider: Arc<P>,
    tokens: TokenStore,
    memo: Arc<TokenMemo>,
    token_saved: Mutex<bool>,
}

impl<P: IdentityProvider> AuthSession<P> {
    pub fn new(provider: Arc<P>, tokens: TokenStore, memo: Arc<TokenMemo>) -> Self {
        Self {
            provider,
            tokens,
            memo,
            token_saved: Mutex::new(false),
        }
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Read the provider session and persist or drop the token accordingly.
    ///
    /// The token is fetched once per authentication, and again whenever the
    /// store was emptied behind our back (the API client drops it on 401).
    /// A failed fetch leaves no token behind.
    pub async fn sync(&self) -> IdentitySession {
        let session = self.provider.session().await;
        let mut saved = self.token_saved.lock().await;
        let token_missing = self.tokens.get().await.is_none();

        if session.is_authenticated && (!*saved || token_missing) {
            match self.provider.access_token().await {
                Ok(token) => {
                    self.tokens.set(token).await;
                    *saved = true;
                    debug!("Access token stored");
                }
                Err(e) => {
                    error!(error = %e, "Failed to obtain access token");
                    self.tokens.clear().await;
                }
            }
            self.memo.clear().await;
        } else if !session.is_authenticated && *saved {
            self.tokens.clear().await;
            self.memo.clear().await;
            *saved = false;
            debug!("Access token removed");
        }

        session
    }

    pub async fn login(&self) -> Result<IdentitySession> {
        self.provider.login().await?;
        Ok(self.sync().await)
    }

    /// Drop the stored token and sign out of the provider
    pub async fn logout(&self) -> Result<()> {
        {
            let mut saved = self.token_saved.lock().await;
            self.tokens.clear().await;
            self.memo.clear().await;
            *saved = false;
        }
        self.provider.logout().await
    }

    /// Fresh token from the provider; `None` when signed out or on failure
    pub async fn get_token(&self) -> Option<String> {
        if !self.provider.session().await.is_authenticated {
            return None;
        }
        match self.provider.access_token().await {
            Ok(token) => Some(token),
            Err(e) => {
                error!(error = %e, "Failed to obtain access token");
                None
            }
        }
    }
}
