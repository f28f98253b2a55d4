//! Postdeck - one list of posts from many independent systems
//!
//! A CLI front end over the aggregation engine: refreshes every configured
//! system, prints the merged list, and gates actions by capability.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, rejected action, missing post, backend failure, etc.)
//!   2 - Threshold hit (--fail-on-error with failed systems, or `can` says no)

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use postdeck::actions::{self, CommandOutput, EXIT_OK, EXIT_THRESHOLD};
use postdeck::cli::{Args, Command, OutputFormat};
use postdeck::config::{Config, DEFAULT_CONFIG_FILE};
use postdeck::{report, Aggregator, NewPost, SysIdx};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration before logging so `general.verbose` can apply
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(&args, &config);

    info!("Postdeck v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .postdeck.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", DEFAULT_CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with a local notes system.", DEFAULT_CONFIG_FILE);
    println!("   Add [[systems]] entries to aggregate more sources.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = if !args.quiet && config.general.verbose {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: failed to set tracing subscriber: {}", e);
    }
}

/// Load configuration from file or use defaults, then apply CLI overrides.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = if let Some(ref config_path) = args.config {
        Config::load(config_path)?
    } else {
        Config::load_default()?.unwrap_or_default()
    };

    config.merge_with_args(args);
    Ok(config)
}

/// Dispatch the selected command. Returns the exit code.
async fn run(args: Args, mut config: Config) -> Result<i32> {
    if config.systems.is_empty() {
        warn!(
            "No systems configured. Run 'postdeck --init-config' or add [[systems]] to {}",
            DEFAULT_CONFIG_FILE
        );
    }

    if let Some(Command::List { order: Some(order), .. }) = args.command {
        config.general.merge_order = order;
    }

    let aggregator = Aggregator::from_config(&config)?;

    match args.command {
        Some(Command::List {
            format,
            fail_on_error,
            ..
        }) => run_list(&aggregator, format, fail_on_error, args.quiet).await,
        Some(Command::Systems { format }) => {
            let output = match format {
                OutputFormat::Text => report::generate_text_systems(&aggregator),
                OutputFormat::Json => report::generate_json_systems(&aggregator)?,
            };
            println!("{}", output.trim_end());
            Ok(EXIT_OK)
        }
        Some(Command::Show {
            system,
            post_id,
            format,
        }) => {
            let output = actions::show_post(&aggregator, SysIdx(system), &post_id, format).await?;
            Ok(emit(output))
        }
        Some(Command::Can { system, capability }) => {
            let output = actions::check_capability(&aggregator, SysIdx(system), &capability)?;
            Ok(emit(output))
        }
        Some(Command::Post {
            system,
            title,
            body,
            forum,
        }) => {
            let draft = NewPost {
                title,
                body,
                forum,
            };
            let output = actions::create_post(&aggregator, SysIdx(system), &draft).await?;
            Ok(emit(output))
        }
        None => Ok(EXIT_OK),
    }
}

/// Refresh every system once and print the merged listing.
async fn run_list(
    aggregator: &Aggregator,
    format: OutputFormat,
    fail_on_error: bool,
    quiet: bool,
) -> Result<i32> {
    let start_time = Instant::now();

    let spinner = if format == OutputFormat::Text && !quiet {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Refreshing {} systems...", aggregator.len()));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    // Ctrl-C stops waiting; whatever already arrived is still printed
    let listing = aggregator
        .list_posts_until(async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        })
        .await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    for err in &listing.errors {
        warn!("{}", err);
    }

    let output = match format {
        OutputFormat::Text => report::generate_text_listing(&listing, aggregator),
        OutputFormat::Json => report::generate_json_listing(&listing)?,
    };
    println!("{}", output.trim_end());

    debug!("Refresh took {:.2}s", start_time.elapsed().as_secs_f64());

    if fail_on_error && !listing.is_complete() {
        eprintln!(
            "\n⛔ {} of {} systems failed. Failing (exit code 2).",
            listing.errors.len(),
            aggregator.len()
        );
        return Ok(EXIT_THRESHOLD);
    }

    Ok(EXIT_OK)
}

/// Print a command's output and hand back its exit code.
fn emit(output: CommandOutput) -> i32 {
    if !output.stdout.is_empty() {
        print!("{}", output.stdout);
    }
    if !output.stderr.is_empty() {
        eprint!("{}", output.stderr);
    }
    output.exit_code
}
