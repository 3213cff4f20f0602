//! OCHP bridge CLI
//!
//! Headless clearing-house client suitable for deployment as a systemd
//! service, Docker container, or standalone process.
//!
//! ```sh
//! # Run with default config (~/.config/ochp-bridge/config.toml)
//! ochp-bridge
//!
//! # Custom config path
//! ochp-bridge --config /etc/ochp-bridge/config.toml
//!
//! # Pull everything once, print the reports and exit
//! ochp-bridge --once
//!
//! # Validate config without starting
//! ochp-bridge --check
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use ochp_bridge::config::AppConfig;
use ochp_bridge::service::{build_engine, init_tracing, BridgeHandle, BridgeOptions};
use ochp_bridge::support::ShutdownSignal;
use ochp_bridge::{InMemoryRoamingNetwork, JobKind, TickOutcome};

/// OCHP 1.4 bridge: keeps a local charging network in sync with a
/// clearing house.
#[derive(Parser, Debug)]
#[command(
    name = "ochp-bridge",
    version,
    about = "OCHP 1.4 clearing-house synchronization service",
    long_about = "Pulls charge point data, tariffs, roaming authorisations and live \
                  EVSE status from an OCHP 1.4 clearing house over SOAP.\n\n\
                  Default config: ~/.config/ochp-bridge/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "OCHP_BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Override the remote SOAP endpoint.
    #[arg(long)]
    endpoint: Option<String>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration file and exit without starting.
    #[arg(long)]
    check: bool,

    /// Run the data job, then the status job, print both reports and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // ── Load configuration ─────────────────────────────────────────
    let config_path = cli.config.unwrap_or_else(ochp_bridge::default_config_path);

    let mut config = match AppConfig::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) if cli.check => {
            eprintln!("❌ Invalid configuration in {}: {}", config_path.display(), e);
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", config_path.display(), e);
            eprintln!("Using default configuration.");
            AppConfig::default()
        }
    };

    // ── Apply CLI overrides ────────────────────────────────────────
    if let Some(endpoint) = cli.endpoint {
        config.remote.endpoint = endpoint;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    // ── Config validation mode ─────────────────────────────────────
    if cli.check {
        if let Err(e) = config.validate() {
            eprintln!("❌ {}", e);
            return Ok(ExitCode::FAILURE);
        }
        println!("✅ Configuration is valid");
        println!("   Config file : {}", config_path.display());
        println!("   Endpoint    : {}", config.remote.endpoint);
        println!(
            "   Credentials : {}",
            if config.credentials().is_some() { "set" } else { "none" }
        );
        println!(
            "   Data job    : {} every {}s",
            enabled(config.sync.data_enabled),
            config.sync.data_period_secs
        );
        println!(
            "   Status job  : {} every {}s",
            enabled(config.sync.status_enabled),
            config.sync.status_period_secs
        );
        println!("   Log level   : {}", config.logging.level);
        return Ok(ExitCode::SUCCESS);
    }

    init_tracing(&config);
    info!("Configuration: {}", config_path.display());

    // ── Single pass ────────────────────────────────────────────────
    if cli.once {
        let network = Arc::new(InMemoryRoamingNetwork::new());
        let engine = build_engine(&config, network.clone(), ShutdownSignal::new())?;

        let mut failed = false;
        for kind in JobKind::ALL {
            match engine.tick(kind).await {
                TickOutcome::Completed(report) => println!("{report}"),
                TickOutcome::Failed { error, report } => {
                    error!("{} failed: {}", kind, error);
                    print!("{report}");
                    failed = true;
                }
                TickOutcome::Disabled => println!("{kind}: disabled"),
                TickOutcome::AlreadyRunning => println!("{kind}: already running"),
            }
        }
        let size = network.size();
        println!(
            "network: {} pools, {} stations, {} EVSEs, {} tariffs, {} authorisations",
            size.pools, size.stations, size.evses, size.tariffs, size.authorisations
        );
        return Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS });
    }

    // ── Start service ──────────────────────────────────────────────
    let handle = BridgeHandle::start(BridgeOptions {
        config,
        ..BridgeOptions::default()
    })
    .await?;

    // Install OS signal handlers (SIGTERM, SIGINT)
    handle.install_signal_handler();

    info!("🚀 Press Ctrl+C to shutdown gracefully.");

    handle.wait().await;

    Ok(ExitCode::SUCCESS)
}

fn enabled(flag: bool) -> &'static str {
    if flag {
        "enabled"
    } else {
        "disabled"
    }
}
