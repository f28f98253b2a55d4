//! Error types for systems and the aggregator.
//!
//! `SystemError` is what a single backend adapter reports. `AggregatorError`
//! wraps it with the origin system and adds the caller-contract violations
//! (unsupported capability, invalid system index).

use crate::models::SysIdx;
use std::time::Duration;
use thiserror::Error;

/// Failure of one system adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SystemError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Cancelled before the system responded")]
    Cancelled,

    /// Returned by adapters that do not implement an action at all.
    #[error("Not implemented by this system: {0}")]
    Unsupported(String),

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for SystemError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SystemError::Parse(err.to_string())
        } else {
            SystemError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SystemError {
    fn from(err: serde_json::Error) -> Self {
        SystemError::Parse(err.to_string())
    }
}

/// Errors surfaced by the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregatorError {
    /// One system's listing failed. Collected into a listing, never thrown.
    #[error("system {system} (#{sys_idx}) failed to list posts: {source}")]
    SystemFetch {
        sys_idx: SysIdx,
        system: String,
        #[source]
        source: SystemError,
    },

    /// An action was requested against a system lacking the capability.
    #[error("system {system} (#{sys_idx}) does not support '{capability}'")]
    CapabilityUnsupported {
        sys_idx: SysIdx,
        system: String,
        capability: String,
    },

    /// A `SysIdx` outside the registry. Indicates a caller bug.
    #[error("invalid system index {index} (registry holds {len} systems)")]
    InvalidSystemIndex { index: usize, len: usize },

    /// A capability-gated action reached the backend and the backend failed.
    #[error("system {system} (#{sys_idx}) failed to perform '{capability}': {source}")]
    SystemAction {
        sys_idx: SysIdx,
        system: String,
        capability: String,
        #[source]
        source: SystemError,
    },
}

impl AggregatorError {
    /// The system index this error is attributed to, if any.
    pub fn sys_idx(&self) -> Option<SysIdx> {
        match self {
            AggregatorError::SystemFetch { sys_idx, .. }
            | AggregatorError::CapabilityUnsupported { sys_idx, .. }
            | AggregatorError::SystemAction { sys_idx, .. } => Some(*sys_idx),
            AggregatorError::InvalidSystemIndex { .. } => None,
        }
    }

    /// Short message suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            AggregatorError::CapabilityUnsupported { capability, .. } => {
                match capability.as_str() {
                    crate::system::CREATE_POST => {
                        "This system doesn't support posting yet!".to_string()
                    }
                    crate::system::LIST_POST => {
                        "This system doesn't support listing posts yet!".to_string()
                    }
                    other => format!("This system doesn't support '{}' yet!", other),
                }
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_for_create_post() {
        let err = AggregatorError::CapabilityUnsupported {
            sys_idx: SysIdx(0),
            system: "alpha".to_string(),
            capability: "create:post".to_string(),
        };
        assert_eq!(err.user_message(), "This system doesn't support posting yet!");
        assert!(err.to_string().contains("create:post"));
        assert_eq!(err.sys_idx(), Some(SysIdx(0)));
    }

    #[test]
    fn test_user_message_for_unknown_capability() {
        let err = AggregatorError::CapabilityUnsupported {
            sys_idx: SysIdx(3),
            system: "beta".to_string(),
            capability: "vote:post".to_string(),
        };
        assert_eq!(err.user_message(), "This system doesn't support 'vote:post' yet!");
    }

    #[test]
    fn test_fetch_error_display_names_system() {
        let err = AggregatorError::SystemFetch {
            sys_idx: SysIdx(1),
            system: "beta".to_string(),
            source: SystemError::Network("connection refused".to_string()),
        };
        let text = err.to_string();
        assert!(text.contains("beta"));
        assert!(text.contains("#1"));
        assert!(text.contains("connection refused"));
    }

    #[test]
    fn test_invalid_index_has_no_origin() {
        let err = AggregatorError::InvalidSystemIndex { index: 9, len: 2 };
        assert_eq!(err.sys_idx(), None);
        assert_eq!(
            err.to_string(),
            "invalid system index 9 (registry holds 2 systems)"
        );
    }
}
