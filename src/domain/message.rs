//! Message domain model

use super::common::validate_not_blank;
use super::topic::Topic;
use super::user::User;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Message posted in a topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    #[serde(rename = "texto")]
    pub text: String,
    #[serde(rename = "urlImagen", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(rename = "autor")]
    pub author: User,
    #[serde(rename = "tema")]
    pub topic: Topic,
    #[serde(rename = "fechaCreacion")]
    pub created_at: NaiveDateTime,
}

/// Input for posting a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CreateMessageInput {
    #[serde(rename = "texto")]
    #[validate(
        custom(function = "validate_not_blank", message = "Message cannot be empty"),
        length(max = 2000, message = "Message cannot exceed 2000 characters")
    )]
    pub text: String,
    #[serde(rename = "urlImagen", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(rename = "temaId")]
    pub topic_id: i64,
}

impl CreateMessageInput {
    pub fn new(topic_id: i64, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image_url: None,
            topic_id,
        }
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.image_url = if url.is_empty() { None } else { Some(url) };
        self
    }

    pub fn remove_image(&mut self) {
        self.image_url = None;
    }
}
