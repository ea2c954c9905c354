//! Page-level data loading and write actions

use crate::api::ForumApiClient;
use crate::config::PagingConfig;
use crate::domain::{
    CreateMessageInput, CreateTopicInput, IdentitySession, ImageFile, Message, Page, PageRequest,
    Topic, User,
};
use crate::error::{AppError, Result};
use crate::gate::GateDecision;
use crate::guard::{evaluate, GuardOutcome, PageAccess, Route};
use serde::Serialize;
use tracing::{error, info};
use validator::Validate;

/// Result of loading a guarded page
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PageLoad<T> {
    Ready { access: PageAccess, data: T },
    /// The guard redirected, asked for login, or is still waiting
    Blocked { guard: GuardOutcome },
}

impl<T> PageLoad<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            PageLoad::Ready { data, .. } => Some(data),
            PageLoad::Blocked { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicDetail {
    pub topic: Topic,
    pub messages: Page<Message>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub user: User,
    pub topics: Page<Topic>,
}

pub struct ForumService {
    api: ForumApiClient,
    paging: PagingConfig,
}

impl ForumService {
    pub fn new(api: ForumApiClient, paging: PagingConfig) -> Self {
        Self { api, paging }
    }

    fn guard(
        route: Route,
        session: &IdentitySession,
        decision: &GateDecision,
    ) -> std::result::Result<PageAccess, GuardOutcome> {
        match evaluate(route, session, decision) {
            GuardOutcome::Render(access) => Ok(access),
            other => Err(other),
        }
    }

    /// Topic listing: public for anonymous visitors, full otherwise
    pub async fn home(
        &self,
        session: &IdentitySession,
        decision: &GateDecision,
        page: u32,
    ) -> Result<PageLoad<Page<Topic>>> {
        let access = match Self::guard(Route::Home, session, decision) {
            Ok(access) => access,
            Err(guard) => return Ok(PageLoad::Blocked { guard }),
        };

        let request = PageRequest::new(page, self.paging.topics);
        let topics = if access.public_listing {
            self.api.public_topics(request).await
        } else {
            self.api.list_topics(request).await
        }
        .inspect_err(|e| error!(error = %e, "Failed to load topics"))?;

        Ok(PageLoad::Ready { access, data: topics })
    }

    pub async fn topic_detail(
        &self,
        session: &IdentitySession,
        decision: &GateDecision,
        topic_id: i64,
        page: u32,
    ) -> Result<PageLoad<TopicDetail>> {
        let access = match Self::guard(Route::Topic(topic_id), session, decision) {
            Ok(access) => access,
            Err(guard) => return Ok(PageLoad::Blocked { guard }),
        };

        let topic = self.api.get_topic(topic_id).await?;
        let messages = self
            .api
            .list_messages(topic_id, PageRequest::new(page, self.paging.messages))
            .await?;

        Ok(PageLoad::Ready {
            access,
            data: TopicDetail { topic, messages },
        })
    }

    /// Current user plus the first page of their topics.
    ///
    /// A failure to list the topics does not fail the profile.
    pub async fn profile(
        &self,
        session: &IdentitySession,
        decision: &GateDecision,
    ) -> Result<PageLoad<Profile>> {
        let access = match Self::guard(Route::Profile, session, decision) {
            Ok(access) => access,
            Err(guard) => return Ok(PageLoad::Blocked { guard }),
        };

        let user = self.api.me().await?;
        let size = self.paging.profile_topics;
        let topics = match self.api.my_topics(PageRequest::first(size)).await {
            Ok(topics) => topics,
            Err(e) => {
                error!(error = %e, "Failed to load user topics");
                Page::empty(size)
            }
        };

        Ok(PageLoad::Ready {
            access,
            data: Profile { user, topics },
        })
    }

    fn require_registered(decision: &GateDecision, action: &str) -> Result<()> {
        if decision.is_fully_registered {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Complete your registration to {}",
                action
            )))
        }
    }

    pub async fn create_topic(
        &self,
        decision: &GateDecision,
        input: CreateTopicInput,
    ) -> Result<Topic> {
        Self::require_registered(decision, "create topics")?;
        input.validate()?;

        let topic = self.api.create_topic(&input).await?;
        info!(topic_id = topic.id, "Topic created");
        Ok(topic)
    }

    pub async fn create_message(
        &self,
        decision: &GateDecision,
        input: CreateMessageInput,
    ) -> Result<Message> {
        Self::require_registered(decision, "post messages")?;
        input.validate()?;

        let message = self.api.create_message(&input).await?;
        info!(message_id = message.id, topic_id = input.topic_id, "Message posted");
        Ok(message)
    }

    /// Post a message, uploading `image` first when given.
    ///
    /// Registration and the message text are checked before anything is
    /// uploaded, so a rejected post leaves no orphaned file behind.
    pub async fn post_message(
        &self,
        decision: &GateDecision,
        input: CreateMessageInput,
        image: Option<&ImageFile>,
    ) -> Result<Message> {
        Self::require_registered(decision, "post messages")?;
        input.validate()?;

        let input = match image {
            Some(file) => {
                let url = self.attach_image(file).await?;
                input.with_image(url)
            }
            None => input,
        };
        self.create_message(decision, input).await
    }

    /// Upload an image attachment and return its URL
    pub async fn attach_image(&self, file: &ImageFile) -> Result<String> {
        file.validate(self.api.max_upload_bytes())?;

        let response = self.api.upload_image(file).await?;
        info!(file_name = %file.file_name, size = file.size(), "Image uploaded");
        Ok(response.url)
    }
}
