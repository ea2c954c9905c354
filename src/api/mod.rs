//! Forum backend REST client

mod client;
pub mod token;

pub use client::ForumApiClient;
pub use token::{TokenMemo, TokenStore};
