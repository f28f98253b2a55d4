//! Postdeck - aggregate posts from many independent systems.
//!
//! The core is the [`aggregator::Aggregator`]: it fans a refresh out to
//! every registered [`system::System`], merges what comes back into one
//! list, tolerates any subset of systems failing, and only dispatches
//! actions to systems whose capability set allows them.

pub mod actions;
pub mod aggregator;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod report;
pub mod system;

pub use aggregator::{Aggregator, AggregatorOptions, PostListing};
pub use error::{AggregatorError, SystemError};
pub use models::{NewPost, Post, SysIdx};
pub use system::{Capabilities, System};
