use serde::{Deserialize, Serialize};

use crate::domain::{AdminSummary, MediaId, ProjectId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: AdminSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: AdminSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

fn default_published() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDraft {
    pub title: String,
    #[serde(default)]
    pub client: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub featured: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectCreate {
    #[serde(flatten)]
    pub draft: ProjectDraft,
    #[serde(default = "default_published")]
    pub published: bool,
}

impl From<ProjectDraft> for ProjectCreate {
    fn from(draft: ProjectDraft) -> Self {
        Self {
            draft,
            published: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
}

impl From<&ProjectDraft> for ProjectUpdate {
    fn from(draft: &ProjectDraft) -> Self {
        Self {
            title: Some(draft.title.clone()),
            client: Some(draft.client.clone()),
            date: Some(draft.date.clone()),
            location: Some(draft.location.clone()),
            description: Some(draft.description.clone()),
            featured: Some(draft.featured),
            published: None,
        }
    }
}

/// One `{id, order}` pair of a full-collection renumbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEntry<I> {
    pub id: I,
    pub order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaReorderRequest {
    pub media_order: Vec<OrderEntry<MediaId>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectReorderRequest {
    pub project_order: Vec<OrderEntry<ProjectId>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeaturedQuery {
    pub featured: bool,
}
