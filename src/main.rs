//! Analytics Collector CLI
//!
//! Collects an environment snapshot and delivers it to a collection server.

use analytics_collector::{
    config::{Bootstrap, BootstrapSource, CollectorConfig, ConfigOverrides},
    environment::{Environment, HostEnvironment, PageInfo, ProfileEnvironment},
    probe::{self, fingerprint},
    transport::REQUEST_TIMEOUT,
    AnalyticsCollector, PointerPosition, VERSION,
};
use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "analytics-collector")]
#[command(version = VERSION)]
#[command(about = "Environment telemetry collector", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct EnvironmentArgs {
    /// Replay a recorded browser profile (JSON) instead of the local host
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Page URL reported for the local host
    #[arg(long)]
    url: Option<String>,

    /// Page title reported for the local host
    #[arg(long)]
    title: Option<String>,

    /// Referrer reported for the local host
    #[arg(long)]
    referrer: Option<String>,

    /// Report fetch as unavailable (uses the legacy transport)
    #[arg(long)]
    legacy_transport: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the collector and send snapshots
    Run {
        /// Collection server base URL
        #[arg(long)]
        server: Option<String>,

        /// Path appended to the server URL
        #[arg(long)]
        endpoint: Option<String>,

        /// Repeat interval in milliseconds (0 = send once)
        #[arg(long)]
        interval: Option<i64>,

        /// Enable collector logging
        #[arg(long)]
        debug: bool,

        /// Do not collect on init
        #[arg(long)]
        no_auto: bool,

        /// Additional JSON object merged into an explicit collection
        #[arg(long)]
        data: Option<String>,

        #[command(flatten)]
        environment: EnvironmentArgs,
    },

    /// Print the snapshot that would be sent
    Snapshot {
        #[command(flatten)]
        environment: EnvironmentArgs,
    },

    /// Print the derived fingerprints
    Fingerprint {
        #[command(flatten)]
        environment: EnvironmentArgs,
    },

    /// Show the bootstrap location and effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            server,
            endpoint,
            interval,
            debug,
            no_auto,
            data,
            environment,
        } => {
            let overrides = ConfigOverrides {
                server,
                auto: no_auto.then_some(false),
                interval,
                debug: debug.then_some(true),
                endpoint,
            };
            cmd_run(overrides, data.as_deref(), &environment).await
        }
        Commands::Snapshot { environment } => cmd_snapshot(&environment),
        Commands::Fingerprint { environment } => cmd_fingerprint(&environment),
        Commands::Config => cmd_config(),
    }
}

fn build_environment(args: &EnvironmentArgs) -> anyhow::Result<Arc<dyn Environment>> {
    if let Some(path) = &args.profile {
        let mut profile = load_profile(path)?;
        if args.legacy_transport {
            profile.fetch = false;
        }
        return Ok(Arc::new(profile));
    }

    let mut host = HostEnvironment::new();
    if args.url.is_some() || args.title.is_some() || args.referrer.is_some() {
        host = host.with_page(PageInfo {
            url: args.url.clone(),
            referrer: args.referrer.clone(),
            title: args.title.clone(),
        });
    }
    if args.legacy_transport {
        host = host.without_fetch();
    }
    Ok(Arc::new(host))
}

fn load_profile(path: &Path) -> anyhow::Result<ProfileEnvironment> {
    ProfileEnvironment::load(path).with_context(|| format!("loading profile {path:?}"))
}

fn parse_extra(data: &str) -> anyhow::Result<serde_json::Map<String, serde_json::Value>> {
    match serde_json::from_str(data).context("invalid JSON in --data")? {
        serde_json::Value::Object(map) => Ok(map),
        _ => bail!("--data must be a JSON object"),
    }
}

async fn cmd_run(
    cli_overrides: ConfigOverrides,
    data: Option<&str>,
    environment: &EnvironmentArgs,
) -> anyhow::Result<()> {
    let extra = data.map(parse_extra).transpose()?;

    let bootstrap = match Bootstrap::discover() {
        Ok(bootstrap) => bootstrap,
        Err(e) => {
            eprintln!("Warning: Ignoring bootstrap configuration: {e}");
            None
        }
    };
    let overrides = bootstrap
        .map(|b| b.overrides)
        .unwrap_or_default()
        .merged_with(cli_overrides);

    let collector = AnalyticsCollector::new(build_environment(environment)?, PointerPosition::new())?;

    println!("Analytics Collector v{VERSION}");
    println!("Instance ID: {}", collector.instance_id());
    println!("Transport: {}", collector.transport_kind());

    collector.init(overrides);
    let config = collector.config();
    println!("Target: {}", config.target_url());

    if let Some(extra) = extra {
        collector.collect(extra);
    }

    if collector.is_running() {
        println!("Collecting every {}ms. Press Ctrl+C to stop", config.interval);

        let shutdown = Arc::new(Notify::new());
        let notify = shutdown.clone();
        ctrlc::set_handler(move || notify.notify_one())
            .context("Error setting Ctrl+C handler")?;
        shutdown.notified().await;
        println!();
    }

    collector.stop();
    drain(&collector).await;

    println!("{}", collector.delivery_log().summary());
    Ok(())
}

/// Wait for in-flight deliveries, bounded by the request timeout.
async fn drain(collector: &AnalyticsCollector) {
    let log = collector.delivery_log();
    let deadline = tokio::time::Instant::now() + REQUEST_TIMEOUT + Duration::from_secs(1);
    while log.pending() > 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

fn cmd_snapshot(environment: &EnvironmentArgs) -> anyhow::Result<()> {
    let env = build_environment(environment)?;
    let snapshot = probe::gather(env.as_ref(), &PointerPosition::new());
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

fn cmd_fingerprint(environment: &EnvironmentArgs) -> anyhow::Result<()> {
    let env = build_environment(environment)?;
    println!("fingerprint:        {}", fingerprint::composite_fingerprint(env.as_ref()));
    println!("canvas_fingerprint: {}", fingerprint::canvas_fingerprint(env.as_ref()));
    println!("webgl_fingerprint:  {}", fingerprint::webgl_fingerprint(env.as_ref()));
    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Bootstrap::config_path());

    let overrides = match Bootstrap::discover()? {
        Some(bootstrap) => {
            match &bootstrap.source {
                BootstrapSource::Environment => {
                    println!("Bootstrap: ${}", analytics_collector::config::BOOTSTRAP_ENV)
                }
                BootstrapSource::File(path) => println!("Bootstrap: {path:?}"),
            }
            bootstrap.overrides
        }
        None => {
            println!("Bootstrap: none (no auto-initialization)");
            ConfigOverrides::default()
        }
    };

    println!();
    let config = overrides.apply_to(&CollectorConfig::default());
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
