//! Merging per-system results into one listing.
//!
//! The fan-out produces one outcome slot per registered system. This module
//! turns those slots into the merged post list and the per-system error
//! list, and applies the configured ordering.

use crate::config::MergeOrder;
use crate::error::{AggregatorError, SystemError};
use crate::models::{Post, SysIdx};
use serde::Serialize;
use std::collections::BTreeMap;

/// Result of one refresh across every registered system.
#[derive(Debug, Clone, Default)]
pub struct PostListing {
    /// Posts from every system that answered, stamped with their origin.
    pub posts: Vec<Post>,
    /// One entry per system that failed, was cancelled or timed out.
    pub errors: Vec<AggregatorError>,
}

impl PostListing {
    /// True when no system failed.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    /// Indices of the systems that failed, in registry order.
    pub fn failed_systems(&self) -> Vec<SysIdx> {
        self.errors.iter().filter_map(|e| e.sys_idx()).collect()
    }

    /// Number of posts contributed by each system that returned any.
    pub fn counts_by_system(&self) -> BTreeMap<SysIdx, usize> {
        let mut counts = BTreeMap::new();
        for post in &self.posts {
            *counts.entry(post.sys_idx).or_insert(0) += 1;
        }
        counts
    }
}

/// What one system's list call came to.
#[derive(Debug)]
pub(crate) enum Outcome {
    Posts(Vec<Post>),
    Failed(SystemError),
    /// The call had not settled when the aggregation was cancelled.
    Pending,
}

/// Serializable view of a listing, used by the JSON report.
#[derive(Debug, Serialize)]
pub struct ListingSummary<'a> {
    pub posts: &'a [Post],
    pub errors: Vec<ErrorEntry>,
}

/// One failed system in serialized form.
#[derive(Debug, Serialize)]
pub struct ErrorEntry {
    pub sys_idx: Option<SysIdx>,
    pub message: String,
}

impl PostListing {
    pub fn summary(&self) -> ListingSummary<'_> {
        ListingSummary {
            posts: &self.posts,
            errors: self
                .errors
                .iter()
                .map(|e| ErrorEntry {
                    sys_idx: e.sys_idx(),
                    message: e.to_string(),
                })
                .collect(),
        }
    }
}

/// Merge outcome slots (indexed by system) into a listing.
///
/// `system_ids[i]` names the system behind `outcomes[i]`.
pub(crate) fn merge(outcomes: Vec<Outcome>, system_ids: &[&str], order: MergeOrder) -> PostListing {
    let mut listing = PostListing::default();

    for (idx, outcome) in outcomes.into_iter().enumerate() {
        let sys_idx = SysIdx(idx);
        let system = system_ids.get(idx).copied().unwrap_or_default().to_string();

        match outcome {
            Outcome::Posts(posts) => {
                listing.posts.extend(posts.into_iter().map(|mut post| {
                    post.sys_idx = sys_idx;
                    post
                }));
            }
            Outcome::Failed(source) => listing.errors.push(AggregatorError::SystemFetch {
                sys_idx,
                system,
                source,
            }),
            Outcome::Pending => listing.errors.push(AggregatorError::SystemFetch {
                sys_idx,
                system,
                source: SystemError::Cancelled,
            }),
        }
    }

    sort_posts(&mut listing.posts, order);
    listing
}

/// Order posts in place. Both orders are stable.
pub fn sort_posts(posts: &mut [Post], order: MergeOrder) {
    match order {
        MergeOrder::Registry => posts.sort_by_key(|p| p.sys_idx),
        MergeOrder::Newest => posts.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    }
}
