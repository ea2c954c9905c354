//! Provisioning the signed-in identity as a forum user

use crate::api::ForumApiClient;
use crate::domain::{CreateUserInput, IdentitySession, User};
use crate::error::{AppError, Result};
use crate::gate::{GateDecision, ProvisioningCheck, RegistrationGate};
use serde::Serialize;
use tracing::info;
use validator::Validate;

#[derive(Debug, Clone, Serialize)]
pub struct RegistrationOutcome {
    pub user: User,
    /// Gate decision after the re-check
    pub decision: GateDecision,
}

pub struct RegistrationService<C: ProvisioningCheck + 'static> {
    api: ForumApiClient,
    gate: RegistrationGate<C>,
}

impl<C: ProvisioningCheck + 'static> RegistrationService<C> {
    pub fn new(api: ForumApiClient, gate: RegistrationGate<C>) -> Self {
        Self { api, gate }
    }

    /// Registration form prefilled from the identity provider's profile
    pub fn prefill(&self, session: &IdentitySession) -> Result<CreateUserInput> {
        let identity = session
            .identity
            .as_ref()
            .filter(|_| session.settled_subject().is_some())
            .ok_or_else(|| AppError::Unauthorized("Sign in before registering".to_string()))?;
        Ok(CreateUserInput::from_identity(identity))
    }

    /// Register with the prefilled form
    pub async fn register(&self, session: &IdentitySession) -> Result<RegistrationOutcome> {
        let input = self.prefill(session)?;
        self.register_with(session, input).await
    }

    /// Submit `input` for the signed-in identity, then re-resolve the gate
    pub async fn register_with(
        &self,
        session: &IdentitySession,
        input: CreateUserInput,
    ) -> Result<RegistrationOutcome> {
        let subject = session
            .settled_subject()
            .ok_or_else(|| AppError::Unauthorized("Sign in before registering".to_string()))?
            .to_string();

        if input.subject_id != subject {
            return Err(AppError::BadRequest(
                "Registration must be for the signed-in identity".to_string(),
            ));
        }

        if self.gate.decision(session).await.is_fully_registered {
            return Err(AppError::Conflict(format!(
                "User '{}' is already registered",
                subject
            )));
        }

        input.validate()?;

        let user = match self.api.create_user(&input).await {
            Ok(user) => user,
            Err(AppError::Conflict(msg)) => {
                // The backend already has the record: the cached "absent" is stale.
                self.gate.invalidate(&subject).await;
                return Err(AppError::Conflict(msg));
            }
            Err(e) => return Err(e),
        };

        self.gate.invalidate(&subject).await;
        let decision = self.gate.resolve(session).await;

        info!(user_id = user.id, subject_id = %subject, "User registered");
        Ok(RegistrationOutcome { user, decision })
    }
}
