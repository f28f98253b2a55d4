//! In-process system seeded from configuration.
//!
//! Holds its posts in memory and, when configured with `create:post`,
//! accepts new ones. Nothing is written to disk.

use super::{Capabilities, System};
use crate::config::MemorySystemConfig;
use crate::error::SystemError;
use crate::models::{NewPost, Post};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::debug;

pub struct MemorySystem {
    id: String,
    author: String,
    capabilities: Capabilities,
    posts: Mutex<Vec<Post>>,
    next_id: AtomicU64,
}

impl MemorySystem {
    pub fn new(id: impl Into<String>, capabilities: Capabilities, posts: Vec<Post>) -> Self {
        Self {
            id: id.into(),
            author: "me".to_string(),
            capabilities,
            posts: Mutex::new(posts),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn from_config(config: &MemorySystemConfig) -> Self {
        let posts = config
            .posts
            .iter()
            .map(|seed| Post {
                id: seed.id.clone(),
                forum: seed.forum.clone(),
                title: seed.title.clone(),
                body: seed.body.clone(),
                author: seed.author.clone(),
                created_at: seed.created_at,
                url: seed.url.clone(),
                sys_idx: Default::default(),
                meta: Default::default(),
            })
            .collect();

        let mut system = Self::new(
            config.id.clone(),
            Capabilities::from_tokens(config.capabilities.iter().cloned()),
            posts,
        );
        system.author = config.author.clone();
        system
    }

    /// Next generated id not already taken by a seeded or created post.
    fn allocate_id(&self, posts: &[Post]) -> String {
        loop {
            let n = self.next_id.fetch_add(1, Ordering::Relaxed);
            let candidate = format!("{}-{}", self.id, n);
            if !posts.iter().any(|p| p.id == candidate) {
                return candidate;
            }
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Post>>, SystemError> {
        self.posts
            .lock()
            .map_err(|_| SystemError::Other(format!("post store for '{}' is poisoned", self.id)))
    }
}

#[async_trait]
impl System for MemorySystem {
    fn id(&self) -> &str {
        &self.id
    }

    async fn list_posts(&self) -> Result<Vec<Post>, SystemError> {
        let posts = self.lock()?.clone();
        debug!("Memory system '{}' holds {} posts", self.id, posts.len());
        Ok(posts)
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn create_post(&self, draft: &NewPost) -> Result<Post, SystemError> {
        let mut posts = self.lock()?;
        let post = Post {
            id: self.allocate_id(&posts),
            forum: draft.forum.clone(),
            title: draft.title.clone(),
            body: draft.body.clone(),
            author: self.author.clone(),
            created_at: Utc::now(),
            url: None,
            sys_idx: Default::default(),
            meta: Default::default(),
        };
        posts.push(post.clone());
        Ok(post)
    }
}
