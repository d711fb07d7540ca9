// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! picname: batch image renamer
//!
//! Plans clean names for every image under a folder and applies them on request.

use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::signal;
use tracing::{debug, info, warn};

use picname::config::{AppConfig, SettingsStore, SettingsUpdate};
use picname::executor::renamed_before;
use picname::history::{Journal, UndoStatus};
use picname::{FlickrClient, PicnameError, PlanBuilder, RemoteNameResolver, RenameSession, ResolverCache, Result};

/// picname CLI - batch image renamer
#[derive(Parser, Debug)]
#[command(name = "picname")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version)]
#[command(about = "Give image files clean, consistent names", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Output format for results
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json", "jsonl"])]
    format: String,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Plan new names for every image under a folder
    Scan {
        /// Folder to scan
        path: PathBuf,

        /// Word delimiter: a character or one of space, underscore, hyphen, period
        #[arg(short, long)]
        delimiter: Option<String>,

        /// Capitalize every word
        #[arg(long, overrides_with = "no_capitalize")]
        capitalize: bool,

        /// Keep words lowercase
        #[arg(long)]
        no_capitalize: bool,

        /// Look up titles of photos saved from Flickr
        #[arg(long, overrides_with = "no_remote")]
        remote: bool,

        /// Never contact Flickr
        #[arg(long)]
        no_remote: bool,

        /// Rename the files instead of only printing the plan
        #[arg(long)]
        apply: bool,
    },

    /// Stored naming settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommands,
    },

    /// Cached photo titles
    Cache {
        #[command(subcommand)]
        action: CacheCommands,
    },

    /// List recent renames
    History {
        /// Number of entries to show
        #[arg(short, long, default_value = "10")]
        count: usize,
    },

    /// Engine configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Undo recent renames
    Undo {
        /// Number of renames to undo
        #[arg(short, long, default_value = "1")]
        count: usize,

        /// Dry run (show what would be undone)
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsCommands {
    /// Show current settings
    Show,

    /// Change settings
    Set {
        #[arg(short, long)]
        delimiter: Option<String>,

        #[arg(long)]
        capitalize: Option<bool>,

        #[arg(long)]
        remote: Option<bool>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum CacheCommands {
    /// List cached titles
    Show,

    /// Forget all cached titles
    Clear,
}

/// `--x` / `--no-x` pair to an optional setting
fn flag_pair(yes: bool, no: bool) -> Option<bool> {
    match (yes, no) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load(&cli.config)?;
    debug!("Using configuration: {:?}", config);

    match cli.command {
        Commands::Scan { path, delimiter, capitalize, no_capitalize, remote, no_remote, apply } => {
            let update = SettingsUpdate {
                delimiter,
                capitalize_words: flag_pair(capitalize, no_capitalize),
                resolve_remote_names: flag_pair(remote, no_remote),
            };
            run_scan(config, path, update, apply, &cli.format, cli.quiet).await
        }
        Commands::Settings { action } => run_settings_command(config, action, &cli.format),
        Commands::Cache { action } => run_cache_command(config, action, &cli.format),
        Commands::History { count } => run_history(config, count, &cli.format),
        Commands::Config { action } => run_config_command(config, action),
        Commands::Undo { count, dry_run } => run_undo(config, count, dry_run),
    }
}

/// Plan (and optionally apply) renames for one folder
async fn run_scan(
    config: AppConfig,
    path: PathBuf,
    update: SettingsUpdate,
    apply: bool,
    format: &str,
    quiet: bool,
) -> Result<()> {
    let client = FlickrClient::new(&config.lookup)?;
    let resolver = RemoteNameResolver::new(client, &config.lookup)?;
    let cache = ResolverCache::load(config.cache_path.clone())?;
    let mut session = RenameSession::new(
        SettingsStore::new(config.settings_path.clone()),
        PlanBuilder::new(resolver, cache),
    )?;

    if !update.is_empty() {
        session.change_settings(&update).await?;
    }

    // Ctrl+C stops the pass at the next file
    let cancel = session.cancellation();
    let ctrl_c = tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, stopping scan...");
            cancel.request();
        }
    });

    let root = std::fs::canonicalize(&path).unwrap_or(path);
    let completed = session
        .open_path_with_progress(&root, |fraction| {
            if !quiet {
                eprint!("\rScanning {:>3}%", (fraction * 100.0).round() as u32);
                let _ = std::io::stderr().flush();
            }
        })
        .await;
    ctrl_c.abort();
    if !quiet {
        eprintln!();
    }

    if !completed? {
        println!("Scan cancelled, nothing planned");
        return Ok(());
    }

    print_plan(&session.plan().display_rows(&root), format)?;

    if apply {
        let plan = session.plan().clone();
        let journal = Journal::new(config.journal_path.clone());
        match session.apply(Some(&journal)) {
            Ok(renamed) => println!("Renamed {} files", renamed),
            Err(PicnameError::RenameFailed { path, renamed, source }) => {
                for done in renamed_before(&plan, &path) {
                    debug!("Renamed before failure: {:?}", done);
                }
                return Err(PicnameError::RenameFailed { path, renamed, source });
            }
            Err(e) => return Err(e),
        }
    }

    Ok(())
}

fn print_plan(rows: &[(String, String)], format: &str) -> Result<()> {
    let records = || {
        rows.iter()
            .map(|(old, new)| serde_json::json!({ "original": old, "destination": new }))
    };

    match format {
        "json" => {
            let all: Vec<_> = records().collect();
            println!("{}", serde_json::to_string_pretty(&all)?);
        }
        "jsonl" => {
            for record in records() {
                println!("{}", serde_json::to_string(&record)?);
            }
        }
        _ => {
            if rows.is_empty() {
                println!("Nothing to rename");
            }
            for (old, new) in rows {
                println!("{} -> {}", old, new);
            }
        }
    }

    Ok(())
}

fn run_settings_command(config: AppConfig, action: SettingsCommands, format: &str) -> Result<()> {
    let store = SettingsStore::new(config.settings_path.clone());
    let mut settings = store.load()?;

    if let SettingsCommands::Set { delimiter, capitalize, remote } = action {
        let update = SettingsUpdate {
            delimiter,
            capitalize_words: capitalize,
            resolve_remote_names: remote,
        };
        if update.is_empty() {
            warn!("Nothing to change");
        } else {
            settings.apply(&update)?;
            store.save(&settings)?;
        }
    }

    if format == "text" {
        println!("Settings at {:?}:", store.path());
        println!("  Delimiter:  {} ({:?})", settings.delimiter, settings.delimiter.as_char());
        println!("  Capitalize: {}", settings.capitalize_words);
        println!("  Remote:     {}", settings.resolve_remote_names);
        println!("  Last path:  {}", settings.last_path);
    } else {
        println!("{}", serde_json::to_string(&settings)?);
    }

    Ok(())
}

fn run_cache_command(config: AppConfig, action: CacheCommands, format: &str) -> Result<()> {
    let mut cache = ResolverCache::load(config.cache_path.clone())?;

    match action {
        CacheCommands::Show => match format {
            "text" => {
                println!("Cached titles ({} entries):", cache.len());
                for (id, title) in cache.iter() {
                    println!("  {}  {}", id, title);
                }
            }
            _ => {
                for (id, title) in cache.iter() {
                    println!("{}", serde_json::json!({ "id": id, "title": title }));
                }
            }
        },
        CacheCommands::Clear => {
            let count = cache.len();
            cache.clear();
            cache.flush()?;
            println!("Cleared {} cached titles", count);
        }
    }

    Ok(())
}

fn run_config_command(config: AppConfig, action: ConfigCommands) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output } => {
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
    }

    Ok(())
}

fn run_history(config: AppConfig, count: usize, format: &str) -> Result<()> {
    let journal = Journal::new(config.journal_path);
    let entries = journal.get_recent(count)?;

    if format != "text" {
        for entry in &entries {
            println!("{}", serde_json::to_string(entry)?);
        }
        return Ok(());
    }

    println!("Recent history ({} entries):", entries.len());
    for entry in entries {
        let status = if entry.undone { "[UNDONE]" } else { "" };
        println!("  {} {} -> {} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M"),
            entry.original_path.display(),
            entry.new_path.display(),
            status
        );
    }

    Ok(())
}

fn run_undo(config: AppConfig, count: usize, dry_run: bool) -> Result<()> {
    let journal = Journal::new(config.journal_path);
    let report = journal.undo(count, dry_run)?;

    if report.results.is_empty() && report.error.is_none() {
        println!("No renames to undo");
        return Ok(());
    }

    for (entry, status) in &report.results {
        let (new, original) = (display(&entry.new_path), display(&entry.original_path));
        match status {
            UndoStatus::Undone => println!("Undone: {} -> {}", new, original),
            UndoStatus::WouldUndo => println!("Would undo: {} -> {}", new, original),
            UndoStatus::Missing => println!("Skipped (file gone): {}", new),
            UndoStatus::Occupied => println!("Skipped ({} exists): {}", original, new),
        }
    }

    match report.error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_requires_command() {
        assert!(Cli::try_parse_from(["picname"]).is_err());
    }

    #[test]
    fn test_cli_scan_command() {
        let cli = Cli::try_parse_from([
            "picname", "scan", "/tmp/pics", "--delimiter", "_", "--capitalize", "--no-remote", "--apply",
        ]).unwrap();

        match cli.command {
            Commands::Scan { path, delimiter, capitalize, no_capitalize, remote, no_remote, apply } => {
                assert_eq!(path, PathBuf::from("/tmp/pics"));
                assert_eq!(delimiter.as_deref(), Some("_"));
                assert_eq!(flag_pair(capitalize, no_capitalize), Some(true));
                assert_eq!(flag_pair(remote, no_remote), Some(false));
                assert!(apply);
            }
            _ => panic!("Expected Scan command"),
        }
    }

    #[test]
    fn test_cli_scan_without_flags_keeps_settings() {
        let cli = Cli::try_parse_from(["picname", "scan", "."]).unwrap();
        match cli.command {
            Commands::Scan { capitalize, no_capitalize, remote, no_remote, apply, .. } => {
                assert_eq!(flag_pair(capitalize, no_capitalize), None);
                assert_eq!(flag_pair(remote, no_remote), None);
                assert!(!apply);
            }
            _ => panic!("Expected Scan command"),
        }
    }

    #[test]
    fn test_cli_settings_set() {
        let cli = Cli::try_parse_from([
            "picname", "settings", "set", "--capitalize", "false", "--remote", "true",
        ]).unwrap();

        match cli.command {
            Commands::Settings { action: SettingsCommands::Set { delimiter, capitalize, remote } } => {
                assert_eq!(delimiter, None);
                assert_eq!(capitalize, Some(false));
                assert_eq!(remote, Some(true));
            }
            _ => panic!("Expected Settings Set command"),
        }
    }

    #[test]
    fn test_cli_undo_and_global_flags() {
        let cli = Cli::try_parse_from([
            "picname", "undo", "--count", "3", "--dry-run", "--format", "json", "-q",
        ]).unwrap();

        assert!(cli.quiet);
        assert_eq!(cli.format, "json");
        match cli.command {
            Commands::Undo { count, dry_run } => {
                assert_eq!(count, 3);
                assert!(dry_run);
            }
            _ => panic!("Expected Undo command"),
        }
    }

    #[test]
    fn test_cli_config_generate() {
        let cli = Cli::try_parse_from(["picname", "config", "generate", "-o", "/tmp/picname.json"]).unwrap();
        match cli.command {
            Commands::Config { action: ConfigCommands::Generate { output } } => {
                assert_eq!(output, PathBuf::from("/tmp/picname.json"));
            }
            _ => panic!("Expected Config Generate command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["picname", "history", "--format", "xml"]).is_err());
    }
}
