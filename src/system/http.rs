//! Generic JSON-over-HTTP system.
//!
//! Talks to a service exposing `GET {base}/posts` (array of posts) and
//! `POST {base}/posts` (create, returns the new post).

use super::{Capabilities, System};
use crate::config::HttpSystemConfig;
use crate::error::SystemError;
use crate::models::{NewPost, Post};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tracing::debug;

/// Post as served by the backend.
#[derive(Debug, Deserialize)]
struct WirePost {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    title: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    author: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    forum: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl From<WirePost> for Post {
    fn from(wire: WirePost) -> Self {
        Post {
            id: wire.id,
            forum: wire.forum,
            title: wire.title,
            body: wire.body,
            author: wire.author,
            created_at: wire.created_at,
            url: wire.url,
            sys_idx: Default::default(),
            meta: wire.extra,
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

pub struct HttpSystem {
    id: String,
    client: Client,
    base_url: String,
    token: Option<String>,
    capabilities: Capabilities,
}

impl HttpSystem {
    pub fn new(
        id: impl Into<String>,
        base_url: &str,
        token: Option<String>,
        capabilities: Capabilities,
        timeout: Duration,
    ) -> Result<Self> {
        let id = id.into();
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("postdeck/", env!("CARGO_PKG_VERSION")))
            .build()
            .with_context(|| format!("Failed to create HTTP client for system '{}'", id))?;

        Ok(Self {
            id,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            capabilities,
        })
    }

    /// Build from configuration, resolving `token_env` if set.
    pub fn from_config(config: &HttpSystemConfig) -> Result<Self> {
        let token = match (&config.token, &config.token_env) {
            (Some(token), _) => Some(token.clone()),
            (None, Some(var)) => Some(std::env::var(var).with_context(|| {
                format!(
                    "System '{}' reads its token from ${}, which is not set",
                    config.id, var
                )
            })?),
            (None, None) => None,
        };

        Self::new(
            config.id.clone(),
            &config.base_url,
            token,
            Capabilities::from_tokens(config.capabilities.iter().cloned()),
            Duration::from_secs(config.timeout_seconds),
        )
    }

    fn posts_url(&self) -> String {
        format!("{}/posts", self.base_url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Map non-success statuses to typed errors.
    async fn check_status(&self, resp: Response) -> std::result::Result<Response, SystemError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SystemError::Auth(format!(
                "{} rejected credentials ({})",
                self.id, status
            ))),
            _ => Err(SystemError::Api {
                status: status.as_u16(),
                message: body.trim().to_string(),
            }),
        }
    }
}

#[async_trait]
impl System for HttpSystem {
    fn id(&self) -> &str {
        &self.id
    }

    async fn list_posts(&self) -> std::result::Result<Vec<Post>, SystemError> {
        let url = self.posts_url();
        debug!("GET {}", url);

        let resp = self.authorized(self.client.get(&url)).send().await?;
        let resp = self.check_status(resp).await?;

        let text = resp.text().await?;
        let wire: Vec<WirePost> = serde_json::from_str(&text)?;
        debug!("System '{}' returned {} posts", self.id, wire.len());

        Ok(wire.into_iter().map(Post::from).collect())
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn create_post(&self, draft: &NewPost) -> std::result::Result<Post, SystemError> {
        let url = self.posts_url();
        debug!("POST {}", url);

        let resp = self
            .authorized(self.client.post(&url).json(draft))
            .send()
            .await?;
        let resp = self.check_status(resp).await?;

        let text = resp.text().await?;
        let wire: WirePost = serde_json::from_str(&text)?;
        Ok(wire.into())
    }
}
