//! Backend system adapters.
//!
//! Every content source is reached through the [`System`] trait. The
//! aggregator only ever sees `dyn System`; [`build_system`] is the one place
//! that knows which concrete adapter a configuration entry maps to.

pub mod capabilities;
pub mod http;
pub mod memory;

pub use capabilities::{validate_token, Capabilities, CREATE_POST, LIST_POST};
pub use http::HttpSystem;
pub use memory::MemorySystem;

use crate::config::SystemConfig;
use crate::error::SystemError;
use crate::models::{NewPost, Post};
use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

/// A backend content source.
///
/// Implementations translate one backend's protocol into [`Post`]s and report
/// a capability set that stays the same for the instance's lifetime.
#[async_trait]
pub trait System: Send + Sync {
    /// Stable identity, taken from configuration.
    fn id(&self) -> &str;

    /// Fetch the posts this system currently exposes, in backend order.
    async fn list_posts(&self) -> std::result::Result<Vec<Post>, SystemError>;

    /// Actions this system supports.
    fn capabilities(&self) -> &Capabilities;

    /// Write path for the `create:post` action.
    ///
    /// Only called after the aggregator has confirmed [`CREATE_POST`] is in
    /// [`System::capabilities`]. Adapters that declare it must override this.
    async fn create_post(&self, draft: &NewPost) -> std::result::Result<Post, SystemError> {
        let _ = draft;
        Err(SystemError::Unsupported(CREATE_POST.to_string()))
    }
}

/// Construct the adapter described by one `[[systems]]` entry.
pub fn build_system(config: &SystemConfig) -> Result<Box<dyn System>> {
    debug!("Building {} system '{}'", config.kind(), config.id());

    let system: Box<dyn System> = match config {
        SystemConfig::Http(http) => Box::new(HttpSystem::from_config(http)?),
        SystemConfig::Memory(memory) => Box::new(MemorySystem::from_config(memory)),
    };

    Ok(system)
}

/// Construct every configured system, keeping configuration order.
pub fn build_systems(configs: &[SystemConfig]) -> Result<Vec<Box<dyn System>>> {
    configs.iter().map(build_system).collect()
}
