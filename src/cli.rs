//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::MergeOrder;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Postdeck - one list of posts from many independent systems
///
/// Fetches posts from every configured system concurrently, merges them,
/// and routes actions only to systems that support them.
///
/// Examples:
///   postdeck list
///   postdeck list --order newest --format json
///   postdeck systems
///   postdeck can 1 create:post
///   postdeck show 0 notes-1
///   postdeck post --system 1 --title "Hello" --body "First post"
///   postdeck --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .postdeck.toml in the current directory
    #[arg(short, long, value_name = "FILE", env = "POSTDECK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Per-system timeout in seconds for a refresh
    ///
    /// Overrides `general.timeout_seconds` from the config file.
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    /// Generate a default .postdeck.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fetch posts from every system and print the merged list
    List {
        /// Output format
        #[arg(long, default_value = "text", value_name = "FORMAT")]
        format: OutputFormat,

        /// Ordering of the merged list (overrides config)
        #[arg(long, value_name = "ORDER")]
        order: Option<MergeOrder>,

        /// Exit with code 2 if any system failed
        ///
        /// Useful for scripts and monitoring.
        #[arg(long)]
        fail_on_error: bool,
    },

    /// Show the registered systems and their capabilities
    Systems {
        /// Output format
        #[arg(long, default_value = "text", value_name = "FORMAT")]
        format: OutputFormat,
    },

    /// Print one post, body included, from a single system
    Show {
        /// System index, as shown by `postdeck systems`
        #[arg(value_name = "SYS_IDX")]
        system: usize,

        /// Post id within that system
        #[arg(value_name = "POST_ID")]
        post_id: String,

        /// Output format
        #[arg(long, default_value = "text", value_name = "FORMAT")]
        format: OutputFormat,
    },

    /// Check whether a system supports a capability (exit 2 if not)
    Can {
        /// System index, as shown by `postdeck systems`
        #[arg(value_name = "SYS_IDX")]
        system: usize,

        /// Capability token, e.g. create:post
        #[arg(value_name = "TOKEN")]
        capability: String,
    },

    /// Create a post on one system
    Post {
        /// System index, as shown by `postdeck systems`
        #[arg(short, long, value_name = "SYS_IDX")]
        system: usize,

        /// Title of the new post
        #[arg(short, long)]
        title: String,

        /// Body of the new post
        #[arg(short, long, default_value = "")]
        body: String,

        /// Forum to post into, for systems that have them
        #[arg(short, long)]
        forum: Option<String>,
    },
}

/// Output format for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain text (default)
    #[default]
    Text,
    /// JSON
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.command.is_none() {
            return Err("No command given. Try 'postdeck --help'.".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(Command::Post { ref title, .. }) = self.command {
            if title.trim().is_empty() {
                return Err("Post title must not be empty".to_string());
            }
        }

        if let Some(Command::Show { ref post_id, .. }) = self.command {
            if post_id.trim().is_empty() {
                return Err("Post id must not be empty".to_string());
            }
        }

        if let Some(Command::Can { ref capability, .. }) = self.command {
            crate::system::validate_token(capability)?;
        }

        // Validate config path if provided
        if let Some(ref config_path) = self.config {
            if !config_path.is_file() {
                return Err(format!(
                    "Config file does not exist: {}",
                    config_path.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args(command: Option<Command>) -> Args {
        Args {
            config: None,
            verbose: false,
            quiet: false,
            timeout: None,
            init_config: false,
            command,
        }
    }

    fn list_command() -> Command {
        Command::List {
            format: OutputFormat::Text,
            order: None,
            fail_on_error: false,
        }
    }

    #[test]
    fn test_parse_list() {
        let args = Args::try_parse_from(["postdeck", "list", "--order", "newest", "--format", "json"])
            .unwrap();
        match args.command {
            Some(Command::List { format, order, fail_on_error }) => {
                assert_eq!(format, OutputFormat::Json);
                assert_eq!(order, Some(MergeOrder::Newest));
                assert!(!fail_on_error);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_post_with_global_flags() {
        let args = Args::try_parse_from([
            "postdeck", "post", "--system", "1", "--title", "Hello", "-v", "--timeout", "5",
        ])
        .unwrap();
        assert!(args.verbose);
        assert_eq!(args.timeout, Some(5));
        match args.command {
            Some(Command::Post { system, title, body, forum }) => {
                assert_eq!(system, 1);
                assert_eq!(title, "Hello");
                assert_eq!(body, "");
                assert!(forum.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_show() {
        let args = Args::try_parse_from(["postdeck", "show", "2", "notes-7", "--format", "json"])
            .unwrap();
        match args.command {
            Some(Command::Show { system, post_id, format }) => {
                assert_eq!(system, 2);
                assert_eq!(post_id, "notes-7");
                assert_eq!(format, OutputFormat::Json);
            }
            other => panic!("unexpected command {:?}", other),
        }

        assert!(Args::try_parse_from(["postdeck", "show", "2"]).is_err());
    }

    #[test]
    fn test_validation_rejects_empty_post_id() {
        let args = make_args(Some(Command::Show {
            system: 0,
            post_id: " ".to_string(),
            format: OutputFormat::Text,
        }));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_requires_command() {
        assert!(make_args(None).validate().is_err());

        let mut args = make_args(None);
        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args(Some(list_command()));
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_malformed_token() {
        let args = make_args(Some(Command::Can {
            system: 0,
            capability: "posting".to_string(),
        }));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_empty_title() {
        let args = make_args(Some(Command::Post {
            system: 0,
            title: "  ".to_string(),
            body: String::new(),
            forum: None,
        }));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args(Some(list_command()));
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
