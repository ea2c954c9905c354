//! Identity provider integration

pub mod provider;
pub mod session;

pub use provider::{IdentityProvider, StaticIdentityProvider};
pub use session::AuthSession;
