//! redis-index-migrate CLI - move a search index and its documents between
//! Redis deployments.

use clap::{Parser, Subcommand};
use redis_index_migrate::config::redact_url;
use redis_index_migrate::verify::{self, report};
use redis_index_migrate::{Config, MigrateError, MigrationOutcome, Orchestrator};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "redis-index-migrate")]
#[command(about = "Migrate a RediSearch index and its documents between Redis deployments")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recreate an index on the target and replicate its documents
    Migrate {
        /// Index to migrate (overrides migration.index_name)
        #[arg(long)]
        index: Option<String>,

        /// Dry run: show the translated schema and replication command without changing the target
        #[arg(long)]
        dry_run: bool,

        /// Compare keys under the index prefix after replication
        #[arg(long)]
        verify: bool,
    },

    /// Compare index names between source and target
    CompareIndexes,

    /// Compare key names between source and target
    CompareKeys {
        /// Key pattern to scan (overrides verify.key_pattern)
        #[arg(long)]
        pattern: Option<String>,

        /// Show key types, only-in-source and only-in-target samples, all target keys and source key patterns
        #[arg(long)]
        debug: bool,
    },

    /// Test connections to both deployments
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<ExitCode, MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);
    info!(
        "Source: {}  Target: {}",
        redact_url(&config.source.url()),
        redact_url(&config.target.url())
    );

    match cli.command {
        Commands::Migrate {
            index,
            dry_run,
            verify,
        } => {
            let orchestrator = Orchestrator::new(config).await?;
            let index_name = orchestrator.resolve_index_name(index.as_deref())?;

            if dry_run {
                let plan = orchestrator.plan(&index_name).await?;
                if cli.output_json {
                    println!("{}", plan.to_json()?);
                } else {
                    println!("Dry run for index {} (target not modified)\n", plan.index_name);
                    print!("{}", plan.to_yaml()?);
                }
                return Ok(ExitCode::SUCCESS);
            }

            let outcome = orchestrator.migrate(&index_name).await;
            if cli.output_json {
                println!("{}", outcome.to_json()?);
            } else {
                print_outcome(&outcome);
            }

            if !outcome.success {
                return Ok(ExitCode::from(outcome.exit_code));
            }

            if verify {
                if let Some(ref prefix) = outcome.prefix {
                    let comparison = orchestrator.verify_prefix(prefix).await?;
                    if !cli.output_json {
                        println!(
                            "  Verified: {} keys present on both deployments",
                            comparison.result.in_both.len()
                        );
                    }
                }
            }
        }

        Commands::CompareIndexes => {
            let orchestrator = Orchestrator::new(config).await?;
            let comparison =
                verify::compare_indexes(orchestrator.source(), orchestrator.target()).await;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&comparison)?);
            } else {
                print!("{}", report::render_index_report(&comparison));
            }
        }

        Commands::CompareKeys { pattern, debug } => {
            let pattern = pattern.unwrap_or_else(|| config.verify.key_pattern.clone());
            let scan_count = config.verify.scan_count;
            let sample = debug.then_some(config.verify.debug_sample);

            let orchestrator = Orchestrator::new(config).await?;
            let key_report = verify::compare_keys(
                orchestrator.source(),
                orchestrator.target(),
                &pattern,
                scan_count,
                sample,
            )
            .await;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&key_report)?);
            } else {
                print!("{}", report::render_key_report(&key_report));
            }
        }

        Commands::HealthCheck => {
            let orchestrator = Orchestrator::new(config).await?;
            let result = orchestrator.health_check().await;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  Source: {} ({}ms)",
                    if result.source_connected { "OK" } else { "FAILED" },
                    result.source_latency_ms
                );
                if let Some(ref err) = result.source_error {
                    println!("    Error: {}", err);
                }
                println!(
                    "  Target: {} ({}ms)",
                    if result.target_connected { "OK" } else { "FAILED" },
                    result.target_latency_ms
                );
                if let Some(ref err) = result.target_error {
                    println!("    Error: {}", err);
                }
                println!(
                    "\n  Overall: {}",
                    if result.healthy { "HEALTHY" } else { "UNHEALTHY" }
                );
            }

            if !result.healthy {
                return Err(MigrateError::Store("Health check failed".to_string()));
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_outcome(outcome: &MigrationOutcome) {
    if outcome.success {
        println!("\n✓ Migration of {} completed", outcome.index_name);
    } else {
        println!("\n✗ Migration of {} failed", outcome.index_name);
    }
    println!("  Run ID: {}", outcome.run_id);
    if let Some(ref prefix) = outcome.prefix {
        println!("  Prefix: {}", prefix);
    }
    if let Some(ref prepare) = outcome.prepare {
        println!(
            "  Target cleared: {} keys{}",
            prepare.keys_deleted,
            if prepare.index_dropped { ", old index dropped" } else { "" }
        );
    }
    println!("  Duration: {:.2}s", outcome.duration_seconds);
    if let (Some(step), Some(error)) = (outcome.failed_step, outcome.error.as_ref()) {
        println!("  Failed step: {}", step);
        println!("  Error: {}", error);
    }
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so --output-json stays parseable.
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
