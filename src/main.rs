// src/main.rs

use anyhow::{Result, bail};
use chrono::Utc;
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use devsetup::config::{ConfigLoader, DEFAULT_CONFIG_PATH, SettingsOverrides};
use devsetup::installer::{InstallOptions, Orchestrator};
use devsetup::packages::{HomebrewBackend, PackageKind, PackageSpec};
use devsetup::progress::{CliProgress, LogProgress, ProgressTracker, SilentProgress};
use devsetup::report::{RunReport, Summary, render_summary};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "devsetup")]
#[command(author, version, about = "Declarative workstation provisioning with parallel package installs", long_about = None)]
struct Cli {
    /// Package list (YAML)
    #[arg(short, long, global = true, env = "DEVSETUP_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Hide progress bars
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install every package from the enabled categories
    Install {
        /// Show what would be installed without touching anything
        #[arg(long)]
        dry_run: bool,
        /// Install a single category (even if disabled)
        #[arg(long, value_name = "CATEGORY")]
        only: Option<String>,
        /// Install a single kind of package (library or application)
        #[arg(long, value_parser = parse_kind)]
        kind: Option<PackageKind>,
        /// Maximum concurrent installs
        #[arg(short = 'j', long)]
        max_jobs: Option<usize>,
        /// Install attempts per package
        #[arg(long)]
        retry_attempts: Option<u32>,
        /// Seconds to wait before the first retry
        #[arg(long, value_name = "SECS")]
        retry_delay: Option<u64>,
        /// Stop starting new packages after the first failure
        #[arg(long)]
        fail_fast: bool,
        /// Print the run report as JSON on stdout
        #[arg(long)]
        json: bool,
    },
    /// List categories and their package counts
    List {
        /// Include disabled categories
        #[arg(short, long)]
        all: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        shell: Shell,
    },
}

fn parse_kind(s: &str) -> std::result::Result<PackageKind, String> {
    s.parse()
}

struct InstallArgs {
    dry_run: bool,
    only: Option<String>,
    kind: Option<PackageKind>,
    overrides: SettingsOverrides,
    fail_fast: bool,
    json: bool,
    quiet: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize tracing subscriber for logging
    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Install {
            dry_run,
            only,
            kind,
            max_jobs,
            retry_attempts,
            retry_delay,
            fail_fast,
            json,
        } => cmd_install(
            &cli.config,
            InstallArgs {
                dry_run,
                only,
                kind,
                overrides: SettingsOverrides {
                    max_jobs,
                    retry_attempts,
                    retry_delay,
                },
                fail_fast,
                json,
                quiet: cli.quiet,
            },
        ),
        Commands::List { all } => {
            cmd_list(&cli.config, all)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "devsetup", &mut std::io::stdout());
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Pick the progress display for a run
fn progress_for(name: &str, length: u64, quiet: bool) -> Box<dyn ProgressTracker> {
    if quiet {
        Box::new(SilentProgress::with_length(length))
    } else if std::io::stderr().is_terminal() {
        Box::new(CliProgress::new(name, length))
    } else {
        Box::new(LogProgress::new(name, length))
    }
}

/// Install packages from the selected categories, one run per kind
fn cmd_install(config_path: &Path, args: InstallArgs) -> Result<ExitCode> {
    let config = ConfigLoader::from_path(config_path)?;

    let categories: Vec<&str> = match args.only.as_deref() {
        Some(category) => {
            if !config.has_category(category) {
                bail!(
                    "Category '{}' not found in {}",
                    category,
                    config_path.display()
                );
            }
            if !config.is_category_enabled(category) {
                info!("Category '{}' is disabled but was requested explicitly", category);
            }
            vec![category]
        }
        None => config.enabled_categories(),
    };

    if categories.is_empty() {
        println!("No enabled categories in {}", config_path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let settings = config.settings().with_overrides(&args.overrides);
    let options = InstallOptions {
        max_jobs: settings.max_jobs,
        retry: settings.retry_policy(),
        dry_run: args.dry_run,
        fail_fast: args.fail_fast,
    };
    debug!("Install options: {:?}", options);

    let kinds: Vec<PackageKind> = match args.kind {
        Some(kind) => vec![kind],
        None => PackageKind::ALL.to_vec(),
    };

    let mut any_failed = false;
    let mut reports = Vec::new();

    for kind in kinds {
        let specs: Vec<PackageSpec> = categories
            .iter()
            .flat_map(|category| config.get_packages(category, kind))
            .collect();

        if specs.is_empty() {
            debug!("No {} packages in {:?}", kind, categories);
            continue;
        }

        let backend = HomebrewBackend::with_binary(kind, &settings.brew_path);
        let progress = progress_for(kind.as_str(), specs.len() as u64, args.quiet || args.json);
        let orchestrator = Orchestrator::new(&backend, options)?.with_progress(progress.as_ref());

        let started_at = Utc::now();
        let started = Instant::now();
        let ledger = orchestrator.install_all(&specs);
        let elapsed = started.elapsed();
        let cancelled = orchestrator.cancellation().is_cancelled();

        let summary = Summary::from_ledger(&ledger);
        if summary.is_success() {
            progress.finish_with_message("done");
        } else {
            progress.finish_with_error(&format!("{} failed", summary.failed));
        }
        any_failed |= !summary.is_success();

        if args.json {
            reports.push(serde_json::to_value(RunReport::new(
                started_at,
                kind,
                args.dry_run,
                cancelled,
                &ledger,
            ))?);
        } else {
            print!("{}", render_summary(kind.as_str(), &summary, elapsed));
            if args.dry_run {
                for outcome in &ledger {
                    println!("    would install {}", outcome.identifier);
                }
            }
        }

        if cancelled {
            warn!("Stopped after the first failure; skipping remaining package kinds");
            break;
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    if any_failed {
        eprintln!("Some packages failed. Re-run to retry; installed packages are skipped.");
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Show categories with their package counts
fn cmd_list(config_path: &Path, all: bool) -> Result<()> {
    let config = ConfigLoader::from_path(config_path)?;
    let categories = if all {
        config.categories()
    } else {
        config.enabled_categories()
    };

    if categories.is_empty() {
        println!("No categories found.");
        return Ok(());
    }

    println!("Categories:");
    for category in &categories {
        let libraries = config.get_packages(category, PackageKind::Library).len();
        let applications = config.get_packages(category, PackageKind::Application).len();
        let state = if config.is_category_enabled(category) {
            "enabled"
        } else {
            "disabled"
        };

        println!(
            "  {} [{}] {} libraries, {} applications",
            category, state, libraries, applications
        );
        if let Some(description) = config.description(category) {
            println!("      {}", description);
        }
    }
    println!("\nTotal: {} category(ies)", categories.len());

    Ok(())
}
