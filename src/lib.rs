//! Foro Core - forum client
//!
//! This crate provides the client-side core of the forum application:
//! the registration gate that decides whether a signed-in identity still has
//! to register, page guards built on it, and the REST client for the forum
//! backend.

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod forum;
pub mod gate;
pub mod guard;
pub mod identity;
pub mod registration;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
