//! Topic domain model

use super::common::validate_not_blank;
use super::user::User;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Discussion topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "descripcion", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "autor", default, skip_serializing_if = "Option::is_none")]
    pub author: Option<User>,
    #[serde(rename = "fechaCreacion")]
    pub created_at: NaiveDateTime,
    #[serde(rename = "cantidadMensajes", default)]
    pub message_count: u64,
}

impl Topic {
    pub fn author_name(&self) -> &str {
        self.author
            .as_ref()
            .map(|a| a.name.as_str())
            .unwrap_or("Anonymous user")
    }
}

/// Input for creating a new topic
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Validate)]
pub struct CreateTopicInput {
    #[serde(rename = "titulo")]
    #[validate(
        custom(function = "validate_not_blank", message = "Title is required"),
        length(min = 3, max = 100, message = "Title must be between 3 and 100 characters")
    )]
    pub title: String,
    #[serde(rename = "descripcion", default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 1000, message = "Description cannot exceed 1000 characters"))]
    pub description: Option<String>,
}

impl CreateTopicInput {
    pub fn new(title: impl Into<String>, description: Option<String>) -> Self {
        Self {
            title: title.into(),
            description: description.filter(|d| !d.is_empty()),
        }
    }
}
