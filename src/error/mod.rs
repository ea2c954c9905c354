//! Unified error handling for the forum client

use reqwest::StatusCode;
use thiserror::Error;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Generic text shown when a downstream API call fails
pub const GENERIC_RETRY_MESSAGE: &str = "Something went wrong. Please try again.";

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("API error ({status}): {message}")]
    Api { status: StatusCode, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Identity provider error: {0}")]
    IdentityProvider(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Text suitable for showing to the user.
    ///
    /// Downstream API and transport failures collapse into a generic retry
    /// message; validation and conflict errors keep their detail.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) | AppError::BadRequest(msg) => msg.clone(),
            AppError::Conflict(_) => "This user is already registered".to_string(),
            AppError::Unauthorized(_) => "Your session has expired. Please sign in again.".to_string(),
            AppError::Forbidden(_) => "You do not have access to this resource".to_string(),
            AppError::NotFound(_) => "The requested resource was not found".to_string(),
            AppError::IdentityProvider(msg) => format!("Sign-in failed: {}", msg),
            AppError::Api { .. } | AppError::Http(_) | AppError::Internal(_) => {
                GENERIC_RETRY_MESSAGE.to_string()
            }
        }
    }

    /// Whether the caller should send the user back to the login page.
    pub fn requires_login(&self) -> bool {
        matches!(self, AppError::Unauthorized(_))
    }
}

// Conversion from validation errors
impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("{}: {}", field, e.code),
                })
            })
            .collect();

        if messages.is_empty() {
            AppError::Validation(errors.to_string())
        } else {
            AppError::Validation(messages.join("; "))
        }
    }
}
