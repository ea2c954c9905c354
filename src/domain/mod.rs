//! Domain models for the forum client

pub mod common;
pub mod identity;
pub mod message;
pub mod topic;
pub mod upload;
pub mod user;

pub use common::*;
pub use identity::*;
pub use message::*;
pub use topic::*;
pub use upload::*;
pub use user::*;
