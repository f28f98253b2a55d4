//! Data models shared by the aggregator and the system adapters.
//!
//! A `Post` is the one normalized entity every backend is translated into,
//! whatever its origin. `SysIdx` ties a post back to the system that
//! produced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable index of a system in the aggregator's registry.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SysIdx(pub usize);

impl SysIdx {
    pub fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for SysIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for SysIdx {
    fn from(idx: usize) -> Self {
        SysIdx(idx)
    }
}

/// A single content item, normalized from whatever backend produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Identifier, unique only within the origin system.
    pub id: String,
    /// Forum, board or community the post lives in, if the backend has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forum: Option<String>,
    /// Post title.
    pub title: String,
    /// Post body.
    #[serde(default)]
    pub body: String,
    /// Author display name.
    #[serde(default)]
    pub author: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Link to the post on its origin system.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Origin system. Stamped by the aggregator, not by adapters.
    #[serde(default)]
    pub sys_idx: SysIdx,
    /// Backend-specific fields, carried through untouched.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub meta: serde_json::Map<String, serde_json::Value>,
}

impl Post {
    /// Creates a post with the required fields; the rest start empty.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        author: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            forum: None,
            title: title.into(),
            body: String::new(),
            author: author.into(),
            created_at,
            url: None,
            sys_idx: SysIdx::default(),
            meta: serde_json::Map::new(),
        }
    }

    /// Builder-style forum setter.
    pub fn with_forum(mut self, forum: impl Into<String>) -> Self {
        self.forum = Some(forum.into());
        self
    }

    /// One-line attribution: author, forum and creation time.
    pub fn byline(&self) -> String {
        let when = self.created_at.format("%Y-%m-%d %H:%M");
        match self.forum {
            Some(ref forum) => format!("{} in {} at {}", self.author, forum, when),
            None => format!("{} at {}", self.author, when),
        }
    }
}

/// Draft submitted with the create-post action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    /// Title of the new post.
    pub title: String,
    /// Body of the new post.
    #[serde(default)]
    pub body: String,
    /// Target forum, for systems that have them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forum: Option<String>,
}

impl NewPost {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            forum: None,
        }
    }
}
