//! Single-system commands and the exit codes they map to.
//!
//! Each command returns what to print and how the process should exit,
//! leaving the actual printing to the binary.

use crate::aggregator::Aggregator;
use crate::cli::OutputFormat;
use crate::error::AggregatorError;
use crate::models::{NewPost, SysIdx};
use crate::report;
use anyhow::Result;
use tracing::warn;

/// Success.
pub const EXIT_OK: i32 = 0;
/// Runtime error or rejected action.
pub const EXIT_ERROR: i32 = 1;
/// Threshold hit: failed systems under `--fail-on-error`, or `can` said no.
pub const EXIT_THRESHOLD: i32 = 2;

/// Text destined for stdout/stderr plus the process exit code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    fn ok(stdout: String) -> Self {
        Self {
            exit_code: EXIT_OK,
            stdout,
            stderr: String::new(),
        }
    }
}

/// Create a post on one system.
///
/// A system without `create:post` is not an error here: the user gets the
/// rejection message and exit code 1. Backend failures propagate.
pub async fn create_post(
    aggregator: &Aggregator,
    idx: SysIdx,
    draft: &NewPost,
) -> Result<CommandOutput, AggregatorError> {
    aggregator.checked_system(idx)?;

    match aggregator.create_post(idx, draft).await {
        Ok(post) => {
            let mut stdout = format!("✅ Created post {} on system #{}\n", post.id, post.sys_idx);
            if let Some(url) = post.url {
                stdout.push_str(&format!("   {}\n", url));
            }
            Ok(CommandOutput::ok(stdout))
        }
        Err(err @ AggregatorError::CapabilityUnsupported { .. }) => {
            warn!("{}", err);
            Ok(CommandOutput {
                exit_code: EXIT_ERROR,
                stdout: String::new(),
                stderr: format!("{}\n", err.user_message()),
            })
        }
        Err(err) => Err(err),
    }
}

/// Fetch one post from one system and render it. Exit 1 if it isn't there.
pub async fn show_post(
    aggregator: &Aggregator,
    idx: SysIdx,
    post_id: &str,
    format: OutputFormat,
) -> Result<CommandOutput> {
    let Some(post) = aggregator.get_post(idx, post_id).await? else {
        let system = aggregator.system(idx);
        return Ok(CommandOutput {
            exit_code: EXIT_ERROR,
            stdout: String::new(),
            stderr: format!("No post '{}' on {} (#{})\n", post_id, system.id(), idx),
        });
    };

    let stdout = match format {
        OutputFormat::Text => report::generate_text_post(&post, aggregator),
        OutputFormat::Json => report::generate_json_post(&post)?,
    };
    Ok(CommandOutput::ok(stdout))
}

/// Answer whether a system declares `capability`. "No" exits with 2.
pub fn check_capability(
    aggregator: &Aggregator,
    idx: SysIdx,
    capability: &str,
) -> Result<CommandOutput, AggregatorError> {
    let target = aggregator.checked_system(idx)?;

    if aggregator.resolve_capability(idx, capability) {
        Ok(CommandOutput::ok(format!(
            "yes: {} (#{}) supports {}\n",
            target.id(),
            idx,
            capability
        )))
    } else {
        Ok(CommandOutput {
            exit_code: EXIT_THRESHOLD,
            stdout: format!(
                "no: {} (#{}) does not support {}\n",
                target.id(),
                idx,
                capability
            ),
            stderr: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::{Capabilities, MemorySystem, System, CREATE_POST, LIST_POST};
    use chrono::{TimeZone, Utc};

    fn create_test_aggregator() -> Aggregator {
        let mut post = crate::models::Post::new(
            "a1",
            "Archived",
            "ada",
            Utc.with_ymd_and_hms(2023, 11, 5, 18, 0, 0).unwrap(),
        );
        post.body = "Kept for the record.".to_string();

        let systems: Vec<Box<dyn System>> = vec![
            Box::new(MemorySystem::new(
                "archive",
                Capabilities::from_tokens([LIST_POST]),
                vec![post],
            )),
            Box::new(MemorySystem::new(
                "notes",
                Capabilities::from_tokens([LIST_POST, CREATE_POST]),
                Vec::new(),
            )),
        ];
        Aggregator::new(systems)
    }

    #[tokio::test]
    async fn test_create_post_refused_exits_with_message() {
        let aggregator = create_test_aggregator();

        let output = create_post(&aggregator, SysIdx(0), &NewPost::new("Hi", ""))
            .await
            .unwrap();

        assert_eq!(output.exit_code, EXIT_ERROR);
        assert_eq!(output.stderr, "This system doesn't support posting yet!\n");
        assert!(output.stdout.is_empty());
        assert_eq!(aggregator.list_posts().await.posts.len(), 1);
    }

    #[tokio::test]
    async fn test_create_post_success() {
        let aggregator = create_test_aggregator();

        let output = create_post(&aggregator, SysIdx(1), &NewPost::new("Hi", "there"))
            .await
            .unwrap();

        assert_eq!(output.exit_code, EXIT_OK);
        assert_eq!(output.stdout, "✅ Created post notes-1 on system #1\n");
    }

    #[tokio::test]
    async fn test_create_post_invalid_index_is_an_error() {
        let aggregator = create_test_aggregator();

        let err = create_post(&aggregator, SysIdx(9), &NewPost::new("Hi", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, AggregatorError::InvalidSystemIndex { index: 9, len: 2 }));
    }

    #[tokio::test]
    async fn test_show_post_prints_body() {
        let aggregator = create_test_aggregator();

        let output = show_post(&aggregator, SysIdx(0), "a1", OutputFormat::Text)
            .await
            .unwrap();

        assert_eq!(output.exit_code, EXIT_OK);
        assert!(output.stdout.starts_with("[0:archive] Archived\n"));
        assert!(output.stdout.contains("Kept for the record."));
    }

    #[tokio::test]
    async fn test_show_post_json() {
        let aggregator = create_test_aggregator();

        let output = show_post(&aggregator, SysIdx(0), "a1", OutputFormat::Json)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&output.stdout).unwrap();

        assert_eq!(value["body"], "Kept for the record.");
        assert_eq!(value["sys_idx"], 0);
    }

    #[tokio::test]
    async fn test_show_missing_post_exits_with_error() {
        let aggregator = create_test_aggregator();

        let output = show_post(&aggregator, SysIdx(1), "a1", OutputFormat::Text)
            .await
            .unwrap();

        assert_eq!(output.exit_code, EXIT_ERROR);
        assert_eq!(output.stderr, "No post 'a1' on notes (#1)\n");
    }

    #[tokio::test]
    async fn test_show_post_invalid_index_is_an_error() {
        let aggregator = create_test_aggregator();

        let result = show_post(&aggregator, SysIdx(5), "a1", OutputFormat::Text).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_check_capability_exit_codes() {
        let aggregator = create_test_aggregator();

        let yes = check_capability(&aggregator, SysIdx(1), CREATE_POST).unwrap();
        assert_eq!(yes.exit_code, EXIT_OK);
        assert!(yes.stdout.starts_with("yes: notes (#1)"));

        let no = check_capability(&aggregator, SysIdx(0), CREATE_POST).unwrap();
        assert_eq!(no.exit_code, EXIT_THRESHOLD);
        assert!(no.stdout.starts_with("no: archive (#0)"));

        assert!(check_capability(&aggregator, SysIdx(2), LIST_POST).is_err());
    }
}
