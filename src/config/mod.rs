//! Configuration management for the forum client

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Forum REST API configuration
    pub api: ApiConfig,
    /// Page sizes used by the page loaders
    pub paging: PagingConfig,
    /// Identity supplied to the static identity provider
    pub identity: IdentityConfig,
    /// Logging configuration
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the forum backend (e.g., http://localhost:8081)
    pub base_url: String,
    pub timeout_secs: u64,
    /// Freshness window of the bearer token memo
    pub token_cache_ms: u64,
    /// Largest image accepted for upload
    pub max_upload_bytes: usize,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn token_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.token_cache_ms)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8081".to_string(),
            timeout_secs: 30,
            token_cache_ms: 5_000,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PagingConfig {
    pub topics: u32,
    pub messages: u32,
    pub profile_topics: u32,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            topics: 10,
            messages: 20,
            profile_topics: 5,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IdentityConfig {
    pub access_token: Option<String>,
    pub subject: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// "text" or "json"
    pub log_format: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            api: ApiConfig {
                base_url: env::var("FORO_API_URL")
                    .unwrap_or_else(|_| "http://localhost:8081".to_string())
                    .trim_end_matches('/')
                    .to_string(),
                timeout_secs: env::var("FORO_HTTP_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .context("Invalid FORO_HTTP_TIMEOUT_SECS")?,
                token_cache_ms: env::var("FORO_TOKEN_CACHE_MS")
                    .unwrap_or_else(|_| "5000".to_string())
                    .parse()
                    .context("Invalid FORO_TOKEN_CACHE_MS")?,
                max_upload_bytes: env::var("FORO_MAX_UPLOAD_BYTES")
                    .unwrap_or_else(|_| (10 * 1024 * 1024).to_string())
                    .parse()
                    .context("Invalid FORO_MAX_UPLOAD_BYTES")?,
            },
            paging: PagingConfig {
                topics: env::var("FORO_PAGE_SIZE")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
                messages: env::var("FORO_MESSAGE_PAGE_SIZE")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .unwrap_or(20),
                profile_topics: env::var("FORO_PROFILE_PAGE_SIZE")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
            },
            identity: IdentityConfig {
                access_token: non_empty_var("FORO_ACCESS_TOKEN"),
                subject: non_empty_var("FORO_SUBJECT"),
                email: non_empty_var("FORO_EMAIL"),
                name: non_empty_var("FORO_NAME"),
                picture: non_empty_var("FORO_PICTURE"),
            },
            telemetry: TelemetryConfig {
                log_format: env::var("FORO_LOG_FORMAT").unwrap_or_else(|_| "text".to_string()),
            },
        })
    }
}
