use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One page of repository query results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub responses: Vec<BookRecord>,
    #[serde(rename = "totalCount")]
    pub total_count: usize,
}

/// A single catalogue entry as returned by the repository backend.
///
/// Immutable once fetched; `metadata` carries the raw XML record that the
/// metadata extractor interprets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookRecord {
    pub uuid: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "createdDate", default)]
    pub created_date: String,
    #[serde(rename = "modifiedDate", default)]
    pub modified_date: String,
    #[serde(default)]
    pub metadata: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub drm: Drm,
    #[serde(default)]
    pub links: Links,
}

impl BookRecord {
    pub fn content_owners(&self) -> &[ContentOwner] {
        &self.drm.options.content_owners
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Drm {
    #[serde(default)]
    pub options: DrmOptions,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DrmOptions {
    #[serde(rename = "contentOwners", default)]
    pub content_owners: Vec<ContentOwner>,
}

/// Author entry; `name` may carry a bracketed internal username suffix
/// that display code strips.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentOwner {
    pub name: String,
}

/// A downloadable file or external url belonging to one record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default)]
    pub links: Links,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Links {
    #[serde(default)]
    pub view: String,
}

/// Incoming query parameters for one catalogue request. Read-only.
#[derive(Debug, Clone, Default)]
pub struct RequestArgs {
    pub search: Option<String>,
    pub subject: Option<String>,
    pub contributor: Option<String>,
    pub keyword: Option<String>,
    pub start: Option<usize>,
    pub uuid: Option<Uuid>,
    pub type_of: Option<String>,
    pub lists: Option<String>,
}

impl RequestArgs {
    pub fn search(&self) -> &str {
        self.search.as_deref().unwrap_or_default()
    }

    pub fn subject(&self) -> &str {
        self.subject.as_deref().unwrap_or_default()
    }

    pub fn contributor(&self) -> &str {
        self.contributor.as_deref().unwrap_or_default()
    }

    pub fn keyword(&self) -> &str {
        self.keyword.as_deref().unwrap_or_default()
    }
}
