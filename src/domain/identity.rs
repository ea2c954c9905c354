//! Identity supplied by the external identity provider

use serde::{Deserialize, Serialize};

/// Authenticated principal as reported by the identity provider.
///
/// Not owned by the forum backend; `subject_id` is the key used for the
/// provisioning check and for the backend's `auth0Id` column.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Identity {
    pub subject_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

impl Identity {
    pub fn new(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            ..Default::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_picture(mut self, picture: impl Into<String>) -> Self {
        self.picture = Some(picture.into());
        self
    }

    /// Email and name are both needed to prefill the registration form
    pub fn has_profile_data(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.email) && present(&self.name)
    }
}

/// Snapshot of the identity provider's session state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IdentitySession {
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub identity: Option<Identity>,
}

impl IdentitySession {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn loading() -> Self {
        Self {
            is_loading: true,
            ..Default::default()
        }
    }

    pub fn authenticated(identity: Identity) -> Self {
        Self {
            is_authenticated: true,
            is_loading: false,
            identity: Some(identity),
        }
    }

    /// Subject of a settled, authenticated session with a usable subject id
    pub fn settled_subject(&self) -> Option<&str> {
        if !self.is_authenticated || self.is_loading {
            return None;
        }
        self.identity
            .as_ref()
            .map(|i| i.subject_id.as_str())
            .filter(|s| !s.is_empty())
    }
}
