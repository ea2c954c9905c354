//! Forum REST API client
//!
//! Thin wrapper over the backend's REST endpoints. Public endpoints are called
//! without credentials; everything else carries the bearer token read through
//! the [`TokenMemo`].

use crate::config::ApiConfig;
use crate::domain::{
    CreateMessageInput, CreateTopicInput, CreateUserInput, FileUploadResponse, HealthResponse,
    ImageFile, Message, Page, PageRequest, Topic, User, UserExistsResponse,
};
use crate::error::{AppError, Result};
use crate::gate::ProvisioningCheck;
use async_trait::async_trait;
use reqwest::{multipart, Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::token::{TokenMemo, TokenStore};

/// Forum REST API client
#[derive(Clone)]
pub struct ForumApiClient {
    config: ApiConfig,
    http_client: Client,
    tokens: TokenStore,
    memo: Arc<TokenMemo>,
}

/// Public endpoints never carry a bearer token
fn is_public_path(path: &str) -> bool {
    path.contains("/public/")
}

/// Pull a human-readable message out of an error body
fn extract_error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: Option<String>,
        error: Option<String>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed
        .message
        .or(parsed.error)
        .filter(|m| !m.trim().is_empty())
}

impl ForumApiClient {
    /// Create a new API client reading bearer tokens from `tokens`
    pub fn new(config: ApiConfig, tokens: TokenStore) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create HTTP client: {}", e)))?;

        let memo = Arc::new(TokenMemo::new(tokens.clone(), config.token_cache_ttl()));

        Ok(Self {
            config,
            http_client,
            tokens,
            memo,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.config.max_upload_bytes
    }

    /// Shared token memo, cleared by the auth session whenever the token changes
    pub fn token_memo(&self) -> Arc<TokenMemo> {
        self.memo.clone()
    }

    pub async fn clear_token_cache(&self) {
        self.memo.clear().await;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Public URL of an uploaded file
    pub fn image_url(&self, filename: &str) -> String {
        self.url(&format!("/api/upload/{}", filename))
    }

    async fn authorize(&self, request: RequestBuilder, path: &str) -> RequestBuilder {
        if is_public_path(path) {
            return request;
        }
        match self.memo.get().await {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, context: &str) -> Result<Response> {
        request.send().await.map_err(|e| {
            error!(error = %e, "Failed to {}", context);
            AppError::Http(e)
        })
    }

    /// Map a response to `T`, translating error statuses
    async fn handle<T: DeserializeOwned>(&self, response: Response, context: &str) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            return response.json::<T>().await.map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Failed to parse response to {}: {}", context, e))
            });
        }

        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unexpected response")
                .to_string()
        });

        match status {
            StatusCode::UNAUTHORIZED => {
                // Expired or invalid token: drop it so the next login starts clean.
                warn!("Unauthorized response, clearing stored token");
                self.tokens.clear().await;
                self.memo.clear().await;
                Err(AppError::Unauthorized(message))
            }
            StatusCode::FORBIDDEN => Err(AppError::Forbidden(message)),
            StatusCode::NOT_FOUND => Err(AppError::NotFound(message)),
            StatusCode::CONFLICT => Err(AppError::Conflict(message)),
            StatusCode::BAD_REQUEST => Err(AppError::BadRequest(message)),
            _ => {
                error!(status = %status, "Failed to {}: {}", context, message);
                Err(AppError::Api { status, message })
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        page: Option<PageRequest>,
        context: &str,
    ) -> Result<T> {
        let mut request = self.http_client.get(self.url(path));
        if let Some(page) = page {
            request = request.query(&page.query());
        }
        let request = self.authorize(request, path).await;
        let response = self.send(request, context).await?;
        self.handle(response, context).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        context: &str,
    ) -> Result<T> {
        let request = self.http_client.post(self.url(path)).json(body);
        let request = self.authorize(request, path).await;
        let response = self.send(request, context).await?;
        self.handle(response, context).await
    }

    // ============================================================================
    // Public endpoints
    // ============================================================================

    pub async fn health(&self) -> Result<HealthResponse> {
        self.get_json("/api/auth/public/health", None, "check health")
            .await
    }

    pub async fn public_topics(&self, page: PageRequest) -> Result<Page<Topic>> {
        self.get_json("/api/public/temas", Some(page), "list public topics")
            .await
    }

    /// Whether an application user exists for `subject_id`
    pub async fn user_exists(&self, subject_id: &str) -> Result<bool> {
        let path = format!(
            "/api/auth/public/user-exists/{}",
            urlencoding::encode(subject_id)
        );
        let response: UserExistsResponse = self
            .get_json(&path, None, "check user existence")
            .await?;
        debug!(subject_id, exists = response.exists, "Provisioning check completed");
        Ok(response.exists)
    }

    // ============================================================================
    // Current user
    // ============================================================================

    pub async fn me(&self) -> Result<User> {
        self.get_json("/api/auth/me", None, "load current user").await
    }

    pub async fn my_topics(&self, page: PageRequest) -> Result<Page<Topic>> {
        self.get_json("/api/auth/me/temas", Some(page), "list own topics")
            .await
    }

    // ============================================================================
    // Users
    // ============================================================================

    pub async fn create_user(&self, input: &CreateUserInput) -> Result<User> {
        self.post_json("/api/usuarios", input, "create user").await
    }

    pub async fn get_user(&self, id: i64) -> Result<User> {
        self.get_json(&format!("/api/usuarios/{}", id), None, "get user")
            .await
    }

    // ============================================================================
    // Topics
    // ============================================================================

    pub async fn list_topics(&self, page: PageRequest) -> Result<Page<Topic>> {
        self.get_json("/api/temas", Some(page), "list topics").await
    }

    pub async fn get_topic(&self, id: i64) -> Result<Topic> {
        self.get_json(&format!("/api/temas/{}", id), None, "get topic")
            .await
    }

    pub async fn create_topic(&self, input: &CreateTopicInput) -> Result<Topic> {
        self.post_json("/api/temas", input, "create topic").await
    }

    // ============================================================================
    // Messages
    // ============================================================================

    pub async fn list_messages(&self, topic_id: i64, page: PageRequest) -> Result<Page<Message>> {
        self.get_json(
            &format!("/api/mensajes/tema/{}", topic_id),
            Some(page),
            "list messages",
        )
        .await
    }

    pub async fn create_message(&self, input: &CreateMessageInput) -> Result<Message> {
        self.post_json("/api/mensajes", input, "create message").await
    }

    // ============================================================================
    // Uploads
    // ============================================================================

    /// Upload an image as multipart form data; the endpoint takes no credentials
    pub async fn upload_image(&self, file: &ImageFile) -> Result<FileUploadResponse> {
        let part = multipart::Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)?;
        let form = multipart::Form::new().part("file", part);

        let request = self
            .http_client
            .post(self.url("/api/upload"))
            .multipart(form);
        let response = self.send(request, "upload image").await?;
        self.handle(response, "upload image").await
    }
}

#[async_trait]
impl ProvisioningCheck for ForumApiClient {
    async fn user_exists(&self, subject_id: &str) -> Result<bool> {
        ForumApiClient::user_exists(self, subject_id).await
    }
}
