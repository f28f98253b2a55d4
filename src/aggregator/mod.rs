//! Fan-out/fan-in over the system registry.
//!
//! The [`Aggregator`] owns a fixed, ordered set of systems. Reads go to every
//! system concurrently and are merged into one [`PostListing`]; a failing
//! system contributes an error, never an aborted refresh. Actions go to a
//! single system and only after its capability set has been checked.

pub mod listing;

pub use listing::{sort_posts, PostListing};

use crate::config::{Config, MergeOrder};
use crate::error::{AggregatorError, SystemError};
use crate::models::{NewPost, Post, SysIdx};
use crate::system::{build_systems, System, CREATE_POST};
use futures::stream::{FuturesUnordered, StreamExt};
use listing::Outcome;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tuning knobs for a refresh.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregatorOptions {
    /// Deadline applied to each system's list call.
    pub per_system_timeout: Option<Duration>,
    /// Ordering of the merged list.
    pub merge_order: MergeOrder,
}

impl From<&crate::config::GeneralConfig> for AggregatorOptions {
    fn from(general: &crate::config::GeneralConfig) -> Self {
        Self {
            per_system_timeout: (general.timeout_seconds > 0)
                .then(|| Duration::from_secs(general.timeout_seconds)),
            merge_order: general.merge_order,
        }
    }
}

/// Owns the system registry and routes reads and actions through it.
pub struct Aggregator {
    systems: Box<[Box<dyn System>]>,
    options: AggregatorOptions,
}

impl Aggregator {
    /// Build an aggregator over `systems`. Their order fixes each `SysIdx`.
    pub fn new(systems: Vec<Box<dyn System>>) -> Self {
        Self::with_options(systems, AggregatorOptions::default())
    }

    pub fn with_options(systems: Vec<Box<dyn System>>, options: AggregatorOptions) -> Self {
        info!("Aggregator initialized with {} systems", systems.len());
        Self {
            systems: systems.into_boxed_slice(),
            options,
        }
    }

    /// Validate `config`, construct every configured system and wrap them
    /// in an aggregator.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        config.validate()?;
        let systems = build_systems(&config.systems)?;
        Ok(Self::with_options(
            systems,
            AggregatorOptions::from(&config.general),
        ))
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Registered systems with their indices, in registry order.
    pub fn systems(&self) -> impl Iterator<Item = (SysIdx, &dyn System)> {
        self.systems
            .iter()
            .enumerate()
            .map(|(idx, system)| (SysIdx(idx), system.as_ref()))
    }

    /// Look up a system, validating the index.
    pub fn checked_system(&self, idx: SysIdx) -> Result<&dyn System, AggregatorError> {
        self.systems
            .get(idx.0)
            .map(|system| system.as_ref())
            .ok_or(AggregatorError::InvalidSystemIndex {
                index: idx.0,
                len: self.systems.len(),
            })
    }

    /// Look up a system.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is outside the registry. Every `SysIdx` handed out by
    /// this aggregator is valid, so this only fires on a caller bug.
    pub fn system(&self, idx: SysIdx) -> &dyn System {
        match self.checked_system(idx) {
            Ok(system) => system,
            Err(err) => panic!("{}", err),
        }
    }

    /// Whether the system at `idx` declares `capability`.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is outside the registry.
    pub fn resolve_capability(&self, idx: SysIdx, capability: &str) -> bool {
        self.system(idx).capabilities().is_capable_of(capability)
    }

    /// Like [`Aggregator::resolve_capability`], as a descriptive error.
    pub fn require_capability(&self, idx: SysIdx, capability: &str) -> Result<(), AggregatorError> {
        if self.resolve_capability(idx, capability) {
            return Ok(());
        }

        let system = self.system(idx);
        debug!(
            "Rejecting '{}' on system {} (#{}): not in its capabilities",
            capability,
            system.id(),
            idx
        );
        Err(AggregatorError::CapabilityUnsupported {
            sys_idx: idx,
            system: system.id().to_string(),
            capability: capability.to_string(),
        })
    }

    /// Create a post on the system at `idx`.
    ///
    /// Fails with `CapabilityUnsupported` before contacting the system when
    /// it does not declare `create:post`.
    pub async fn create_post(&self, idx: SysIdx, draft: &NewPost) -> Result<Post, AggregatorError> {
        self.require_capability(idx, CREATE_POST)?;

        let system = self.system(idx);
        info!("Creating post on system {} (#{})", system.id(), idx);

        match system.create_post(draft).await {
            Ok(mut post) => {
                post.sys_idx = idx;
                Ok(post)
            }
            Err(source) => {
                warn!("System {} (#{}) failed to create post: {}", system.id(), idx, source);
                Err(AggregatorError::SystemAction {
                    sys_idx: idx,
                    system: system.id().to_string(),
                    capability: CREATE_POST.to_string(),
                    source,
                })
            }
        }
    }

    /// Fetch one post by id from a single system.
    ///
    /// Only the system at `idx` is asked, under the same per-system timeout
    /// as a refresh. `Ok(None)` means the system answered but has no post
    /// with that id.
    pub async fn get_post(&self, idx: SysIdx, post_id: &str) -> Result<Option<Post>, AggregatorError> {
        let system = self.checked_system(idx)?;
        debug!("Looking up post '{}' on system {} (#{})", post_id, system.id(), idx);

        let posts = self.fetch_one(system).await.map_err(|source| {
            warn!("System {} (#{}) failed: {}", system.id(), idx, source);
            AggregatorError::SystemFetch {
                sys_idx: idx,
                system: system.id().to_string(),
                source,
            }
        })?;

        Ok(posts.into_iter().find(|p| p.id == post_id).map(|mut post| {
            post.sys_idx = idx;
            post
        }))
    }

    /// List posts from every system and merge them.
    ///
    /// Never fails as a whole: systems that error out show up in
    /// [`PostListing::errors`].
    pub async fn list_posts(&self) -> PostListing {
        self.list_posts_until(std::future::pending::<()>()).await
    }

    /// Like [`Aggregator::list_posts`], but stops waiting once `cancel`
    /// completes. Systems that had not answered by then are reported as
    /// cancelled; everything that already settled is kept.
    pub async fn list_posts_until<C>(&self, cancel: C) -> PostListing
    where
        C: Future<Output = ()>,
    {
        let mut outcomes: Vec<Outcome> = self.systems.iter().map(|_| Outcome::Pending).collect();

        let mut pending: FuturesUnordered<_> = self
            .systems
            .iter()
            .enumerate()
            .map(|(idx, system)| async move { (idx, self.fetch_one(system.as_ref()).await) })
            .collect();

        tokio::pin!(cancel);

        loop {
            tokio::select! {
                biased;
                next = pending.next() => match next {
                    Some((idx, result)) => {
                        outcomes[idx] = match result {
                            Ok(posts) => {
                                debug!("System #{} returned {} posts", idx, posts.len());
                                Outcome::Posts(posts)
                            }
                            Err(err) => {
                                warn!("System #{} failed: {}", idx, err);
                                Outcome::Failed(err)
                            }
                        };
                    }
                    None => break,
                },
                _ = &mut cancel => {
                    warn!("Refresh cancelled with {} systems still pending", pending.len());
                    break;
                }
            }
        }
        drop(pending);

        let ids: Vec<&str> = self.systems.iter().map(|s| s.id()).collect();
        let listing = listing::merge(outcomes, &ids, self.options.merge_order);

        info!(
            "Refresh finished: {} posts, {} of {} systems failed",
            listing.posts.len(),
            listing.errors.len(),
            self.systems.len()
        );
        listing
    }

    async fn fetch_one(&self, system: &dyn System) -> Result<Vec<Post>, SystemError> {
        match self.options.per_system_timeout {
            Some(limit) => tokio::time::timeout(limit, system.list_posts())
                .await
                .unwrap_or(Err(SystemError::Timeout(limit))),
            None => system.list_posts().await,
        }
    }
}
