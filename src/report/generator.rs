//! Listing and registry output.
//!
//! Produces unstyled text for terminals and JSON for scripts. The
//! aggregator hands over data only; everything human-readable is built here.

use crate::aggregator::{Aggregator, PostListing};
use crate::models::Post;
use anyhow::Result;
use serde::Serialize;

/// Generate the text form of a listing.
pub fn generate_text_listing(listing: &PostListing, aggregator: &Aggregator) -> String {
    let mut output = String::new();

    output.push_str(&generate_posts_section(&listing.posts, aggregator));
    output.push_str(&generate_errors_section(listing));
    output.push_str(&generate_footer(listing, aggregator));

    output
}

/// Generate the posts section.
fn generate_posts_section(posts: &[Post], aggregator: &Aggregator) -> String {
    let mut section = String::new();

    if posts.is_empty() {
        section.push_str("No posts.\n\n");
        return section;
    }

    for post in posts {
        section.push_str(&generate_post_line(post, aggregator));
    }
    section.push('\n');

    section
}

/// One post: title line plus attribution line.
fn generate_post_line(post: &Post, aggregator: &Aggregator) -> String {
    let system = aggregator
        .checked_system(post.sys_idx)
        .map(|s| s.id())
        .unwrap_or("?");

    let mut line = format!("[{}:{}] {}\n", post.sys_idx, system, post.title);
    line.push_str(&format!("    {}", post.byline()));
    if let Some(ref url) = post.url {
        line.push_str(&format!(" <{}>", url));
    }
    line.push('\n');

    line
}

/// Generate the failures section, empty when every system answered.
fn generate_errors_section(listing: &PostListing) -> String {
    if listing.is_complete() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str(&format!("{} system(s) failed:\n", listing.errors.len()));
    for err in &listing.errors {
        section.push_str(&format!("  - {}\n", err));
    }
    section.push('\n');

    section
}

/// Totals line, then how many posts each contributing system returned.
fn generate_footer(listing: &PostListing, aggregator: &Aggregator) -> String {
    let mut footer = format!(
        "{} posts from {} of {} systems\n",
        listing.posts.len(),
        aggregator.len().saturating_sub(listing.errors.len()),
        aggregator.len()
    );

    let counts = listing.counts_by_system();
    if !counts.is_empty() {
        let parts: Vec<String> = counts
            .iter()
            .map(|(idx, count)| {
                let system = aggregator
                    .checked_system(*idx)
                    .map(|s| s.id())
                    .unwrap_or("?");
                format!("{}:{} {}", idx, system, count)
            })
            .collect();
        footer.push_str(&format!("  by system: {}\n", parts.join(", ")));
    }

    footer
}

/// Generate a JSON listing.
pub fn generate_json_listing(listing: &PostListing) -> Result<String> {
    serde_json::to_string_pretty(&listing.summary()).map_err(Into::into)
}

/// Generate the text form of a single post: header, attribution, body.
pub fn generate_text_post(post: &Post, aggregator: &Aggregator) -> String {
    let mut output = generate_post_line(post, aggregator);
    output.push('\n');

    if post.body.trim().is_empty() {
        output.push_str("(no body)\n");
    } else {
        output.push_str(post.body.trim_end());
        output.push('\n');
    }

    output
}

/// Generate a single post as JSON, origin and metadata included.
pub fn generate_json_post(post: &Post) -> Result<String> {
    serde_json::to_string_pretty(post).map_err(Into::into)
}

/// Registry entry in serialized form.
#[derive(Debug, Serialize)]
struct SystemEntry<'a> {
    sys_idx: usize,
    id: &'a str,
    capabilities: Vec<&'a str>,
}

/// Generate the text form of the registry.
pub fn generate_text_systems(aggregator: &Aggregator) -> String {
    let mut output = String::new();

    if aggregator.is_empty() {
        output.push_str("No systems configured.\n");
        return output;
    }

    for (idx, system) in aggregator.systems() {
        output.push_str(&format!(
            "{:>3}  {:<20} {}\n",
            idx,
            system.id(),
            system.capabilities()
        ));
    }

    output
}

/// Generate a JSON registry.
pub fn generate_json_systems(aggregator: &Aggregator) -> Result<String> {
    let entries: Vec<SystemEntry<'_>> = aggregator
        .systems()
        .map(|(idx, system)| SystemEntry {
            sys_idx: idx.get(),
            id: system.id(),
            capabilities: system.capabilities().iter().collect(),
        })
        .collect();

    serde_json::to_string_pretty(&entries).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::{Capabilities, MemorySystem, System, CREATE_POST, LIST_POST};
    use chrono::{TimeZone, Utc};

    fn create_test_aggregator() -> Aggregator {
        let post = Post::new(
            "n1",
            "Weekly thread",
            "ada",
            Utc.with_ymd_and_hms(2024, 4, 2, 9, 15, 0).unwrap(),
        )
        .with_forum("general");

        let systems: Vec<Box<dyn System>> = vec![
            Box::new(MemorySystem::new(
                "notes",
                Capabilities::from_tokens([LIST_POST, CREATE_POST]),
                vec![post],
            )),
            Box::new(MemorySystem::new(
                "archive",
                Capabilities::none(),
                Vec::new(),
            )),
        ];
        Aggregator::new(systems)
    }

    #[test]
    fn test_generate_text_listing() {
        let aggregator = create_test_aggregator();
        let listing = tokio_test::block_on(aggregator.list_posts());
        let text = generate_text_listing(&listing, &aggregator);

        assert!(text.contains("[0:notes] Weekly thread"));
        assert!(text.contains("ada in general at 2024-04-02 09:15"));
        assert!(text.contains("1 posts from 2 of 2 systems"));
        assert!(text.contains("by system: 0:notes 1\n"));
        assert!(!text.contains("failed"));
    }

    #[test]
    fn test_generate_errors_section() {
        let listing = PostListing {
            posts: Vec::new(),
            errors: vec![crate::error::AggregatorError::SystemFetch {
                sys_idx: crate::models::SysIdx(1),
                system: "archive".to_string(),
                source: crate::error::SystemError::Network("refused".to_string()),
            }],
        };
        let section = generate_errors_section(&listing);

        assert!(section.contains("1 system(s) failed"));
        assert!(section.contains("archive"));
        assert!(section.contains("refused"));
    }

    #[test]
    fn test_generate_text_systems() {
        let aggregator = create_test_aggregator();
        let text = generate_text_systems(&aggregator);

        assert!(text.contains("notes"));
        assert!(text.contains("create:post, list:post"));
        assert!(text.contains("(none)"));
    }

    #[test]
    fn test_generate_json_systems() {
        let aggregator = create_test_aggregator();
        let json = generate_json_systems(&aggregator).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value[0]["id"], "notes");
        assert_eq!(value[1]["sys_idx"], 1);
        assert_eq!(value[1]["capabilities"].as_array().map(|a| a.len()), Some(0));
    }

    #[test]
    fn test_generate_text_post() {
        let aggregator = create_test_aggregator();
        let mut post = Post::new(
            "n2",
            "Release notes",
            "ada",
            Utc.with_ymd_and_hms(2024, 4, 3, 8, 0, 0).unwrap(),
        );
        post.body = "Line one\nLine two\n\n".to_string();
        post.url = Some("https://forum.example.org/t/2".to_string());

        let text = generate_text_post(&post, &aggregator);
        assert!(text.starts_with("[0:notes] Release notes\n"));
        assert!(text.contains("<https://forum.example.org/t/2>"));
        assert!(text.ends_with("\n\nLine one\nLine two\n"));

        post.body.clear();
        assert!(generate_text_post(&post, &aggregator).contains("(no body)"));
    }

    #[test]
    fn test_generate_json_post() {
        let mut post = Post::new(
            "n2",
            "Release notes",
            "ada",
            Utc.with_ymd_and_hms(2024, 4, 3, 8, 0, 0).unwrap(),
        );
        post.sys_idx = crate::models::SysIdx(1);
        let json = generate_json_post(&post).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["id"], "n2");
        assert_eq!(value["sys_idx"], 1);
    }

    #[test]
    fn test_generate_json_listing() {
        let aggregator = create_test_aggregator();
        let listing = tokio_test::block_on(aggregator.list_posts());
        let json = generate_json_listing(&listing).unwrap();

        assert!(json.contains("\"posts\""));
        assert!(json.contains("\"errors\""));
        assert!(json.contains("Weekly thread"));
    }
}
