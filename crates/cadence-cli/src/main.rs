//! Cadence CLI
//!
//! Author flashcards and review them on a fixed interval ladder.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use cadence_core::{
    format_interval, NewItemInput, PersistDispatcher, ReviewConfig, SessionCoordinator, Storage,
};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cadence_cli::display::{distribution_bar, due_label, parse_tags, truncate};
use cadence_cli::review::ReviewLoop;
use cadence_cli::settings;

/// Cadence - interval-ladder spaced repetition
#[derive(Parser)]
#[command(name = "cadence")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Review flashcards on a fixed interval ladder")]
#[command(long_about = "Cadence schedules each card on a fixed ladder of intervals (1, 3, 7, 14, 30 days by default).\n\nRemembered climbs one rung, partial holds, forgotten starts over.")]
struct Cli {
    /// Custom data directory (database file: cadence.db)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Review config JSON (falls back to CADENCE_CONFIG, then the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Author a new card
    Add {
        /// Prompt side
        front: String,
        /// Answer side
        #[arg(long)]
        back: Option<String>,
        /// Tags (comma-separated)
        #[arg(long)]
        tags: Option<String>,
        /// Days until the first review
        #[arg(long, default_value = "0")]
        offset_days: u32,
    },

    /// List cards due now
    Due {
        #[arg(long, default_value = "50")]
        limit: i64,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Run an interactive review session
    Review {
        /// Maximum cards in this session
        #[arg(long, default_value = "50")]
        limit: i64,
    },

    /// Show the interval each outcome would give a card
    Preview {
        id: String,
    },

    /// Show a card's review log
    History {
        id: String,
        #[arg(long, default_value = "20")]
        limit: i64,
    },

    /// Show collection statistics
    Stats {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Delete a card and its history
    Delete {
        id: String,
    },

    /// Write a consistent copy of the database
    Backup {
        /// Output file path for the backup
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so they never interleave with review prompts on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();

    let config = settings::load_review_config(cli.config.as_deref())?;
    let storage = open_storage(cli.data_dir.as_deref())?;

    match cli.command {
        Commands::Add {
            front,
            back,
            tags,
            offset_days,
        } => run_add(&storage, front, back, tags, offset_days),
        Commands::Due { limit, json } => run_due(&storage, limit, json),
        Commands::Review { limit } => run_review(storage, config, limit),
        Commands::Preview { id } => run_preview(&storage, &config, &id),
        Commands::History { id, limit } => run_history(&storage, &id, limit),
        Commands::Stats { json } => run_stats(&storage, &config, json),
        Commands::Delete { id } => run_delete(&storage, &id),
        Commands::Backup { output } => run_backup(&storage, &output),
    }
}

fn open_storage(data_dir: Option<&Path>) -> anyhow::Result<Storage> {
    let path = settings::db_path(data_dir);
    Storage::new(path).context("Failed to open the Cadence database")
}

/// Author a card
fn run_add(
    storage: &Storage,
    front: String,
    back: Option<String>,
    tags: Option<String>,
    offset_days: u32,
) -> anyhow::Result<()> {
    if front.trim().is_empty() {
        anyhow::bail!("Front cannot be empty");
    }

    let input = NewItemInput {
        front,
        back,
        tags: parse_tags(tags.as_deref()),
        initial_offset_days: offset_days,
    };
    let now = Utc::now();
    let card = storage.create_item(input, now)?;

    println!("{}", "=== Cadence Add ===".cyan().bold());
    println!();
    println!("{}: {}", "Card ID".white().bold(), card.item.id);
    println!("{}: {}", "Front".white().bold(), truncate(&card.front, 60));
    println!(
        "{}: {}",
        "First Review".white().bold(),
        due_label(card.item.next_review_at, now)
    );
    Ok(())
}

/// List due cards
fn run_due(storage: &Storage, limit: i64, json: bool) -> anyhow::Result<()> {
    let now = Utc::now();
    let cards = storage.due_cards(now, limit)?;
    let total = storage.count_due(now)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&cards)?);
        return Ok(());
    }

    println!("{}", "=== Cadence Due Cards ===".cyan().bold());
    println!();
    if cards.is_empty() {
        println!("{}", "Nothing due. Come back later.".dimmed());
        return Ok(());
    }

    for card in &cards {
        println!(
            "  {}  {:<8} {}  {}",
            card.item.id.dimmed(),
            format!("tier {}", card.item.current_tier),
            truncate(&card.front, 50),
            due_label(card.item.next_review_at, now).yellow()
        );
    }
    if total as usize > cards.len() {
        println!();
        println!("{}", format!("...and {} more", total as usize - cards.len()).dimmed());
    }
    Ok(())
}

/// Interactive review session
fn run_review(storage: Storage, config: ReviewConfig, limit: i64) -> anyhow::Result<()> {
    let now = Utc::now();
    let (due, cards) = storage.due_items_with_cards(now, limit)?;

    println!("{}", "=== Cadence Review ===".cyan().bold());
    if due.items.is_empty() {
        println!();
        println!("{}", "Nothing due. Come back later.".dimmed());
        return Ok(());
    }
    println!(
        "{} of {} due card(s), ladder {:?} days, partial: {}",
        due.items.len(),
        due.total,
        config.ladder_days.days(),
        if config.supports_partial {
            config.partial_policy.as_str()
        } else {
            "off"
        }
    );

    let storage = Arc::new(storage);
    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(async move {
        let session = SessionCoordinator::new(config, due, Utc::now());
        let (dispatcher, acks) = PersistDispatcher::new(storage);
        let review = ReviewLoop::new(session, dispatcher, acks, cards);
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        review.run(stdin.lock(), &mut stdout).await
    })?;

    let summary = &report.summary;
    println!();
    println!("{}", "=== Session Summary ===".cyan().bold());
    println!("{}: {}", "Reviews".white().bold(), summary.reviews);
    println!("{}: {}", "Remembered".green(), summary.remembered);
    println!("{}: {}", "Partial".yellow(), summary.partial);
    println!("{}: {}", "Forgotten".red(), summary.forgotten);
    println!(
        "{}: {} done, {} left",
        "Cards".white().bold(),
        summary.completed,
        summary.remaining
    );
    println!(
        "{}: {:.1}s per review",
        "Pace".white().bold(),
        summary.average_elapsed_seconds
    );
    if report.quit_early {
        println!("{}", "Session ended early; remaining cards stay due.".dimmed());
    }
    if !report.unsaved.is_empty() {
        println!(
            "{}",
            format!(
                "{} review(s) were not saved and will be due again.",
                report.unsaved.len()
            )
            .red()
            .bold()
        );
    }
    Ok(())
}

/// Intervals per outcome for one card
fn run_preview(storage: &Storage, config: &ReviewConfig, id: &str) -> anyhow::Result<()> {
    let item = storage
        .get_item(id)?
        .ok_or_else(|| anyhow::anyhow!("Card not found: {}", id))?;
    let preview = config.engine().preview(item.current_tier, Utc::now());

    println!("{}", "=== Cadence Preview ===".cyan().bold());
    println!();
    println!("{}: {}", "Current Tier".white().bold(), preview.current_tier);
    for option in &preview.options {
        println!(
            "  {:<11} -> tier {} ({}, {})",
            option.outcome.as_str(),
            option.update.new_tier,
            option.label,
            option.update.next_review_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

/// Review log for one card
fn run_history(storage: &Storage, id: &str, limit: i64) -> anyhow::Result<()> {
    let card = storage
        .get_card(id)?
        .ok_or_else(|| anyhow::anyhow!("Card not found: {}", id))?;
    let history = storage.review_history(id, limit)?;

    println!("{}", "=== Cadence History ===".cyan().bold());
    println!();
    println!("{}: {}", "Card".white().bold(), truncate(&card.front, 60));
    println!("{}: {}", "Reviews".white().bold(), card.review_count);
    println!();

    if history.is_empty() {
        println!("{}", "Never reviewed.".dimmed());
        return Ok(());
    }
    for entry in &history {
        let outcome = match entry.outcome {
            cadence_core::Outcome::Remembered => entry.outcome.as_str().green(),
            cadence_core::Outcome::Partial => entry.outcome.as_str().yellow(),
            cadence_core::Outcome::Forgotten => entry.outcome.as_str().red(),
        };
        println!(
            "  {}  {:<11} tier {}  next {}  ({}s)",
            entry.reviewed_at.format("%Y-%m-%d %H:%M"),
            outcome,
            entry.new_tier,
            entry.next_review_at.format("%Y-%m-%d"),
            entry.elapsed_seconds
        );
    }
    Ok(())
}

/// Collection statistics
fn run_stats(storage: &Storage, config: &ReviewConfig, json: bool) -> anyhow::Result<()> {
    let stats = storage.stats(Utc::now())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("{}", "=== Cadence Statistics ===".cyan().bold());
    println!();
    println!("{}: {}", "Total Cards".white().bold(), stats.total_items);
    println!("{}: {}", "Due Now".white().bold(), stats.due_items);
    println!("{}: {}", "Never Reviewed".white().bold(), stats.never_reviewed);

    println!();
    println!("{}", "=== Ladder Distribution ===".yellow().bold());
    for (tier, count) in &stats.tier_counts {
        let label = format!(
            "tier {} ({})",
            tier,
            format_interval(config.ladder_days.days_at(*tier))
        );
        println!("{}", distribution_bar(&label, *count, stats.total_items));
    }

    println!();
    println!("{}", "=== Today ===".magenta().bold());
    println!("{}: {}", "Reviews".white().bold(), stats.reviews_today);
    println!("{}: {}", "Remembered".green(), stats.remembered_today);
    println!("{}: {}", "Partial".yellow(), stats.partial_today);
    println!("{}: {}", "Forgotten".red(), stats.forgotten_today);
    Ok(())
}

/// Delete a card
fn run_delete(storage: &Storage, id: &str) -> anyhow::Result<()> {
    if storage.delete_item(id)? {
        println!("{}", format!("Deleted {}", id).green().bold());
    } else {
        anyhow::bail!("Card not found: {}", id);
    }
    Ok(())
}

/// Copy the database with VACUUM INTO
fn run_backup(storage: &Storage, output: &Path) -> anyhow::Result<()> {
    if output.exists() {
        anyhow::bail!("Refusing to overwrite existing file: {}", output.display());
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    storage.backup_to(output)?;

    let file_size = std::fs::metadata(output)?.len();
    let size_display = if file_size >= 1024 * 1024 {
        format!("{:.2} MB", file_size as f64 / (1024.0 * 1024.0))
    } else if file_size >= 1024 {
        format!("{:.1} KB", file_size as f64 / 1024.0)
    } else {
        format!("{} bytes", file_size)
    };

    println!(
        "{}",
        format!("Backup complete: {} ({})", output.display(), size_display)
            .green()
            .bold()
    );
    Ok(())
}
