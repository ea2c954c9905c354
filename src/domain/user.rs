//! User domain model

use super::common::validate_not_blank;
use super::identity::Identity;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Application-level user record (the "provisioned" counterpart of an identity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "imagen", default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(rename = "auth0Id")]
    pub subject_id: String,
    #[serde(rename = "fechaCreacion")]
    pub created_at: NaiveDateTime,
}

impl User {
    /// First letter of the name, used for avatar placeholders
    pub fn initial(&self) -> char {
        self.name
            .chars()
            .next()
            .map(|c| c.to_uppercase().next().unwrap_or(c))
            .unwrap_or('U')
    }
}

/// Input for provisioning the current identity as a forum user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[serde(rename = "nombre")]
    #[validate(
        custom(function = "validate_not_blank", message = "Name is required"),
        length(max = 255, message = "Name cannot exceed 255 characters")
    )]
    pub name: String,
    #[serde(rename = "fotoPerfil", default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(rename = "auth0Id")]
    #[validate(custom(function = "validate_not_blank", message = "Subject id is required"))]
    pub subject_id: String,
}

impl CreateUserInput {
    /// Prefill the registration form from the identity provider's profile
    pub fn from_identity(identity: &Identity) -> Self {
        Self {
            email: identity.email.clone().unwrap_or_default(),
            name: identity.name.clone().unwrap_or_default(),
            picture: identity.picture.clone().filter(|p| !p.is_empty()),
            subject_id: identity.subject_id.clone(),
        }
    }
}
