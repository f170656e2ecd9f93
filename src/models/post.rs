use super::{AuthorSummary, Category, Tag};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const TITLE_MAX_LENGTH: usize = 70;
pub const EXCERPT_MAX_LENGTH: usize = 200;

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub created_time: DateTime<Utc>,
    pub modified_time: DateTime<Utc>,
    pub excerpt: String,
    pub category: Category,
    pub tags: Vec<Tag>,
    pub author: AuthorSummary,
    pub views: u32,
}

impl Post {
    pub fn url(&self) -> String {
        format!("/post/{}", self.id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePost {
    pub title: String,
    #[serde(default)]
    pub body: String,
    /// Left empty to have it derived from `body` when the post is saved.
    #[serde(default)]
    pub excerpt: String,
    pub category_id: i64,
    pub author_id: i64,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
    /// Defaults to the time of insertion.
    pub created_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePost {
    pub title: Option<String>,
    pub body: Option<String>,
    pub excerpt: Option<String>,
    pub category_id: Option<i64>,
    pub tag_ids: Option<Vec<i64>>,
}

/// Filters applied to a post listing. Every populated field narrows the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostQuery {
    pub category_id: Option<i64>,
    pub tag_id: Option<i64>,
    /// `(year, month)` of `created_time`.
    pub archive: Option<(i32, u32)>,
    /// Case-insensitive substring matched against title or body.
    pub keyword: Option<String>,
}

impl PostQuery {
    pub fn category(id: i64) -> Self {
        Self {
            category_id: Some(id),
            ..Self::default()
        }
    }

    pub fn tag(id: i64) -> Self {
        Self {
            tag_id: Some(id),
            ..Self::default()
        }
    }

    pub fn archive(year: i32, month: u32) -> Self {
        Self {
            archive: Some((year, month)),
            ..Self::default()
        }
    }

    pub fn keyword(keyword: impl Into<String>) -> Self {
        Self {
            keyword: Some(keyword.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveMonth {
    pub year: i32,
    pub month: u32,
    pub count: i64,
}
