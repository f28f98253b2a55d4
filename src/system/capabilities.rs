//! Capability tokens and the per-system capability set.
//!
//! A capability is a `<verb>:<object>` token such as `create:post`. A system
//! supports exactly the tokens in its set; there is no implicit default.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Listing posts.
pub const LIST_POST: &str = "list:post";

/// Creating a new post.
pub const CREATE_POST: &str = "create:post";

/// Immutable set of capability tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capabilities(BTreeSet<String>);

impl Capabilities {
    /// The empty set: nothing is supported.
    pub fn none() -> Self {
        Self::default()
    }

    /// Build a set from tokens. Duplicates collapse.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(tokens.into_iter().map(Into::into).collect())
    }

    /// Whether `token` is in the set.
    pub fn is_capable_of(&self, token: &str) -> bool {
        self.0.contains(token)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "(none)");
        }
        let tokens: Vec<&str> = self.iter().collect();
        write!(f, "{}", tokens.join(", "))
    }
}

/// Check that a token has the `<verb>:<object>` shape.
///
/// Both halves must be non-empty and consist of lowercase ASCII letters,
/// digits, `-` or `_`.
pub fn validate_token(token: &str) -> Result<(), String> {
    let (verb, object) = token
        .split_once(':')
        .ok_or_else(|| format!("capability '{}' must look like 'verb:object'", token))?;

    let valid_part = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    };

    if !valid_part(verb) || !valid_part(object) {
        return Err(format!(
            "capability '{}' must look like 'verb:object' (lowercase letters, digits, '-', '_')",
            token
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_supports_nothing() {
        let caps = Capabilities::none();
        assert!(!caps.is_capable_of(LIST_POST));
        assert!(!caps.is_capable_of(CREATE_POST));
        assert!(caps.is_empty());
        assert_eq!(caps.to_string(), "(none)");
    }

    #[test]
    fn test_from_tokens() {
        let caps = Capabilities::from_tokens([LIST_POST, CREATE_POST, LIST_POST]);
        assert_eq!(caps.len(), 2);
        assert!(caps.is_capable_of("create:post"));
        assert!(!caps.is_capable_of("create:reply"));
        assert_eq!(caps.to_string(), "create:post, list:post");
    }

    #[test]
    fn test_validate_token() {
        assert!(validate_token("list:post").is_ok());
        assert!(validate_token("create:forum_post").is_ok());
        assert!(validate_token("list-all:post2").is_ok());

        assert!(validate_token("listpost").is_err());
        assert!(validate_token(":post").is_err());
        assert!(validate_token("list:").is_err());
        assert!(validate_token("Create:Post").is_err());
        assert!(validate_token("create:post:extra").is_err());
    }

    #[test]
    fn test_deserialize_from_list() {
        let caps: Capabilities = serde_json::from_str(r#"["list:post", "create:post"]"#).unwrap();
        assert!(caps.is_capable_of(CREATE_POST));
    }
}
