use anyhow::Context;
use clap::{Parser, Subcommand};
use dialoguer::Confirm;
use dotenvy::dotenv;
use serde::Serialize;
use voteboard_cache::security::generate_key_material;
use voteboard_cache::{
    CacheBackend, CacheConfig, CacheService, ContestChange, GlobalChange, InvalidationReport,
    ProfileChange, SecurityPolicy, sanitize_key,
};
use voteboard_config::{CacheRateLimitConfig, SecurityConfig};
use voteboard_observability::{init_basic_console_logging, init_metrics, init_tracing};

#[derive(Parser)]
#[command(name = "voteboard-cli")]
#[command(about = "Voteboard CLI - Cache administration tools", long_about = None)]
struct Cli {
    /// Also write JSON and error logs under LOG_DIR
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Invalidate cached data after an out-of-band change
    Invalidate {
        /// Print the invalidation counters in Prometheus format afterwards
        #[arg(long)]
        metrics: bool,

        #[command(subcommand)]
        target: InvalidateTarget,
    },
    /// Check whether a key passes cache key validation
    CheckKey {
        key: String,
    },
    /// Print the sanitized form of a key
    SanitizeKey {
        key: String,
    },
    /// Generate random key material for CACHE_ENCRYPTION_KEY
    GenKey,
    /// Show backend health, entry count and active limits
    Stats,
}

#[derive(Subcommand)]
enum InvalidateTarget {
    /// Contest change: participation, vote or update
    Contest {
        contest_id: String,
        #[arg(default_value = "update")]
        change: ContestChange,
    },
    /// A vote for a profile in a contest
    Vote {
        contest_id: String,
        profile_id: String,
    },
    /// Profile change: rank or stats
    Profile {
        profile_id: String,
        #[arg(default_value = "stats")]
        change: ProfileChange,
    },
    /// Platform-wide change: vote, user, analytics or all
    Global {
        change: GlobalChange,

        /// Skip the confirmation prompt for `all`
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[derive(Serialize)]
struct StatsOutput {
    backend: &'static str,
    enabled: bool,
    entries: u64,
    rate_limit_max_requests: u32,
    rate_limit_window_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    if cli.log_file {
        init_tracing();
    } else {
        init_basic_console_logging();
    }

    match cli.command {
        Commands::Invalidate { metrics, target } => handle_invalidate(target, metrics).await,
        Commands::CheckKey { key } => handle_check_key(&key),
        Commands::SanitizeKey { key } => {
            println!("{}", sanitize_key(&key));
            Ok(())
        }
        Commands::GenKey => {
            println!("{}", generate_key_material());
            Ok(())
        }
        Commands::Stats => handle_stats().await,
    }
}

async fn connect() -> anyhow::Result<CacheService> {
    let config = CacheConfig::from_env();
    if config.backend == CacheBackend::Memory {
        eprintln!(
            "⚠️  CACHE_BACKEND is memory: this process cannot reach another instance's cache"
        );
    }

    CacheService::connect(
        config,
        &SecurityConfig::from_env(),
        &CacheRateLimitConfig::from_env(),
    )
    .await
    .context("Failed to initialize cache")
}

async fn handle_invalidate(target: InvalidateTarget, metrics: bool) -> anyhow::Result<()> {
    if let InvalidateTarget::Global {
        change: GlobalChange::All,
        yes: false,
    } = target
    {
        let confirmed = Confirm::new()
            .with_prompt("Invalidate every cached entry?")
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    let recorder = if metrics { init_metrics() } else { None };

    let cache = connect().await?;
    let report = match target {
        InvalidateTarget::Contest { contest_id, change } => {
            cache.invalidate_contest_cache(&contest_id, change).await
        }
        InvalidateTarget::Vote {
            contest_id,
            profile_id,
        } => cache.invalidate_vote(&contest_id, &profile_id).await,
        InvalidateTarget::Profile { profile_id, change } => {
            cache.invalidate_profile_cache(&profile_id, change).await
        }
        InvalidateTarget::Global { change, .. } => cache.invalidate_global_cache(change).await,
    };

    print_report(&report);
    if let Some(recorder) = recorder {
        println!("{}", recorder.render());
    }
    if !report.is_clean() {
        anyhow::bail!("{} invalidation step(s) failed", report.failures);
    }
    Ok(())
}

fn print_report(report: &InvalidationReport) {
    println!("✅ Removed {} cached entries", report.removed);
    if report.failures > 0 {
        eprintln!("❌ {} step(s) failed, see logs", report.failures);
    }
}

fn handle_check_key(key: &str) -> anyhow::Result<()> {
    let policy = SecurityPolicy::new(&SecurityConfig::from_env())
        .context("Invalid cache security configuration")?;

    match policy.validate_key(key) {
        Ok(()) => {
            println!("✅ Valid key");
            Ok(())
        }
        Err(e) => {
            let suggestion = sanitize_key(key);
            if !suggestion.is_empty() && policy.validate_key(&suggestion).is_ok() {
                eprintln!("Suggested key: {suggestion}");
            }
            anyhow::bail!("❌ Invalid key: {e}")
        }
    }
}

async fn handle_stats() -> anyhow::Result<()> {
    let cache = connect().await?;
    let entries = cache.health().await.context("Cache backend unreachable")?;
    let limiter = cache.rate_limiter();

    let output = StatsOutput {
        backend: cache.store().backend(),
        enabled: cache.is_enabled(),
        entries,
        rate_limit_max_requests: limiter.max_requests(),
        rate_limit_window_ms: limiter.window().as_millis() as u64,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
