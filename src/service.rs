//! Bridge runtime
//!
//! [`BridgeHandle`] owns the full lifecycle: metrics recorder, HTTP
//! transport, sync engine timers and graceful shutdown.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::application::sync::{OchpClient, SyncEngine};
use crate::config::AppConfig;
use crate::domain::RoamingNetwork;
use crate::infrastructure::{HttpSoapTransport, InMemoryRoamingNetwork};
use crate::support::shutdown::{ShutdownCoordinator, ShutdownSignal};

// ── Options ────────────────────────────────────────────────────────

pub struct BridgeOptions {
    pub config: AppConfig,
    /// Local network to reconcile into; in-memory when `None`.
    pub network: Option<Arc<dyn RoamingNetwork>>,
    /// How long running jobs get to finish after shutdown is triggered.
    pub grace_period: Duration,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            network: None,
            grace_period: Duration::from_secs(30),
        }
    }
}

// ── Wiring ─────────────────────────────────────────────────────────

/// Build an engine talking HTTP to the configured endpoint.
pub fn build_engine(
    config: &AppConfig,
    network: Arc<dyn RoamingNetwork>,
    shutdown: ShutdownSignal,
) -> Result<SyncEngine, Box<dyn std::error::Error>> {
    config.validate()?;
    let transport = HttpSoapTransport::new(&config.remote.endpoint, config.connect_timeout())?;
    let client = OchpClient::new(Arc::new(transport)).with_credentials(config.credentials());
    let engine = SyncEngine::new(client, network, config.sync_settings()?).with_shutdown(shutdown);
    Ok(engine)
}

/// Install the Prometheus scrape endpoint if `metrics.listen` is set.
///
/// The global recorder can only be installed once per process; later calls
/// are no-ops.
pub fn install_metrics(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    static INSTALLED: OnceLock<()> = OnceLock::new();

    let Some(addr) = config.metrics_listen()? else {
        return Ok(());
    };
    if INSTALLED.get().is_some() {
        return Ok(());
    }
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    let _ = INSTALLED.set(());
    info!("📊 Prometheus metrics listening on {}", addr);
    Ok(())
}

// ── BridgeHandle ───────────────────────────────────────────────────

/// Handle to a running bridge.
///
/// ```rust,no_run
/// use ochp_bridge::service::{BridgeHandle, BridgeOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = BridgeHandle::start(BridgeOptions::default()).await?;
///     handle.install_signal_handler();
///     handle.wait().await;
///     Ok(())
/// }
/// ```
pub struct BridgeHandle {
    pub engine: SyncEngine,
    pub network: Arc<dyn RoamingNetwork>,
    pub config: AppConfig,

    shutdown: ShutdownCoordinator,
    tasks: Vec<JoinHandle<()>>,
}

impl BridgeHandle {
    pub async fn start(opts: BridgeOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let config = opts.config;
        info!("Starting OCHP bridge...");
        info!("Remote endpoint: {}", config.remote.endpoint);

        install_metrics(&config)?;

        let network: Arc<dyn RoamingNetwork> = match opts.network {
            Some(network) => network,
            None => Arc::new(InMemoryRoamingNetwork::new()),
        };
        let shutdown = ShutdownCoordinator::new(opts.grace_period);
        let engine = build_engine(&config, network.clone(), shutdown.signal())?;
        let tasks = engine.start();

        Ok(Self {
            engine,
            network,
            config,
            shutdown,
            tasks,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for shutdown to be triggered, then for the timers to stop.
    pub async fn wait(self) {
        let tasks = self.tasks;
        self.shutdown
            .shutdown_with_cleanup(|| async move {
                for task in tasks {
                    if let Err(e) = task.await {
                        error!("Sync timer task panicked: {}", e);
                    }
                }
            })
            .await;
        info!("👋 OCHP bridge shutdown complete");
    }

    pub async fn shutdown(self) {
        info!("🛑 Shutting down OCHP bridge...");
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|task| !task.is_finished())
    }
}

/// Initialize tracing (logging) from the application config.
///
/// `RUST_LOG` takes precedence over `logging.level`. Call once at process
/// startup.
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::sync::JobKind;

    fn idle_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.sync.data_enabled = false;
        config.sync.status_enabled = false;
        config
    }

    #[tokio::test]
    async fn start_and_shutdown() {
        let handle = BridgeHandle::start(BridgeOptions {
            config: idle_config(),
            grace_period: Duration::from_secs(2),
            ..BridgeOptions::default()
        })
        .await
        .unwrap();
        assert!(handle.is_running());
        assert!(!handle.engine.is_enabled(JobKind::PullData));

        tokio::time::timeout(Duration::from_secs(5), handle.shutdown())
            .await
            .unwrap();
    }

    #[test]
    fn build_engine_rejects_invalid_config() {
        let mut config = AppConfig::default();
        config.sync.status_timeout_secs = 0;
        let network: Arc<dyn RoamingNetwork> = Arc::new(InMemoryRoamingNetwork::new());
        assert!(build_engine(&config, network, ShutdownSignal::new()).is_err());
    }
}
