//! Module orchestration -- assembly, settings delivery, and lifecycle management.
//!
//! The [`Orchestrator`] is the central coordinator of `kubeward-daemon`.
//! It validates configuration, builds the admission decision manager,
//! feeds it policy settings from disk, and runs the main event loop.
//!
//! # Lifecycle
//!
//! 1. Start the admission manager (spawns its settings watcher)
//! 2. Push the settings file, if configured
//! 3. Spawn the alert logger and uptime updater
//! 4. Wait for SIGTERM/SIGINT, re-reading settings on SIGHUP
//! 5. Broadcast shutdown, then stop the admission manager

use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use kubeward_admission::{
    AdmissionControlConfig, AdmissionManager, AdmissionManagerBuilder, AdmissionSettings,
    OfflineConnector,
};
use kubeward_core::config::KubewardConfig;
use kubeward_core::event::AlertBatch;
use kubeward_core::pipeline::Pipeline;

use crate::health::{DaemonHealth, ModuleHealth, aggregate_status};
use crate::metrics_server;

/// Module name used in health reports.
pub const ADMISSION_MODULE: &str = "admission-control";

/// How often the main loop logs a non-healthy status.
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(30);

/// The main daemon orchestrator.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: KubewardConfig,
    /// Admission decision manager (absent when disabled in config).
    admission: Option<AdmissionManager<OfflineConnector>>,
    /// Alerts produced by admission reviews.
    alert_rx: Option<mpsc::Receiver<AlertBatch>>,
    /// Shutdown broadcast sender (signals all background tasks).
    shutdown_tx: broadcast::Sender<()>,
    /// Daemon start time (for uptime reporting).
    start_time: Instant,
}

impl Orchestrator {
    /// Load configuration and build the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read or parsed
    /// - Configuration validation fails
    /// - The admission manager fails to build
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = KubewardConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config)
    }

    /// Build from an already-loaded configuration.
    pub fn build_from_config(config: KubewardConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
            record_daemon_metrics();
        }

        let (shutdown_tx, _) = broadcast::channel(16);

        let (admission, alert_rx) = if config.admission.enabled {
            tracing::info!(
                namespace = %config.admission.namespace,
                "initializing admission control"
            );
            let (manager, alert_rx) = AdmissionManagerBuilder::new()
                .config(AdmissionControlConfig::from_core(&config.admission))
                .connector(OfflineConnector)
                .build()
                .map_err(|e| anyhow::anyhow!("failed to build admission manager: {}", e))?;
            (Some(manager), alert_rx)
        } else {
            tracing::info!("admission control disabled");
            (None, None)
        };

        Ok(Self {
            config,
            admission,
            alert_rx,
            shutdown_tx,
            start_time: Instant::now(),
        })
    }

    /// Start the admission manager and apply the configured settings file.
    ///
    /// The manager is stopped again if the settings cannot be applied.
    pub async fn start(&mut self) -> Result<()> {
        let Some(manager) = self.admission.as_mut() else {
            return Ok(());
        };
        manager
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start admission control: {}", e))?;

        if let Err(e) = self.reload_settings().await {
            tracing::warn!("settings could not be applied, stopping admission control");
            self.shutdown().await?;
            return Err(e);
        }
        Ok(())
    }

    /// Read `admission.settings_path` and hand it to the admission manager.
    ///
    /// Returns `false` when there is nothing to load (admission disabled or
    /// no settings path configured).
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed, or the manager is gone.
    pub async fn reload_settings(&self) -> Result<bool> {
        let Some(manager) = self.admission.as_ref() else {
            return Ok(false);
        };
        let path = &self.config.admission.settings_path;
        if path.is_empty() {
            tracing::info!("no admission settings path configured, reviews stay disabled");
            return Ok(false);
        }

        let settings = AdmissionSettings::load(path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load admission settings: {}", e))?;
        tracing::info!(
            path = %path,
            timestamp = %settings.timestamp,
            "loaded admission settings"
        );
        manager
            .settings_sender()
            .send(Some(settings))
            .await
            .map_err(|_| anyhow::anyhow!("admission settings watcher is not running"))?;
        Ok(true)
    }

    /// Start all modules and block until SIGTERM or SIGINT.
    pub async fn run(&mut self) -> Result<()> {
        self.run_until(wait_for_shutdown_signal()).await
    }

    /// Start all modules and block until `shutdown` resolves.
    ///
    /// SIGHUP re-reads the settings file while running.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = Result<&'static str>>,
    {
        let mut hangup = reload_signal()?;
        self.start().await?;

        let mut alert_logger_task = self.alert_rx.take().map(|alert_rx| {
            let shutdown_rx = self.shutdown_tx.subscribe();
            spawn_alert_logger(alert_rx, shutdown_rx)
        });

        let mut uptime_updater_task = if self.config.metrics.enabled {
            let shutdown_rx = self.shutdown_tx.subscribe();
            Some(spawn_uptime_updater(self.start_time, shutdown_rx))
        } else {
            None
        };

        let mut health_interval = tokio::time::interval(HEALTH_LOG_INTERVAL);
        health_interval.tick().await;
        tokio::pin!(shutdown);

        tracing::info!("entering main event loop");
        let outcome = loop {
            tokio::select! {
                signal = &mut shutdown => break signal,
                _ = hangup.recv() => {
                    tracing::info!("SIGHUP received, reloading admission settings");
                    if let Err(e) = self.reload_settings().await {
                        tracing::error!(error = %e, "settings reload failed, keeping current state");
                    }
                }
                _ = health_interval.tick() => {
                    let health = self.health().await;
                    if !health.status.is_healthy() {
                        tracing::warn!(status = %health.status, "daemon is not healthy");
                    }
                }
            }
        };

        match &outcome {
            Ok(signal) => tracing::info!(signal = *signal, "shutdown signal received"),
            Err(e) => tracing::error!(error = %e, "shutdown signal handling failed"),
        }

        tracing::info!("broadcasting shutdown signal to all tasks");
        let _ = self.shutdown_tx.send(());

        if let Some(task) = alert_logger_task.take() {
            let _ = task.await;
        }
        if let Some(task) = uptime_updater_task.take() {
            let _ = task.await;
        }

        self.shutdown().await?;
        outcome.map(|_| ())
    }

    /// Stop the admission manager if it is running.
    pub async fn shutdown(&mut self) -> Result<()> {
        if let Some(manager) = self.admission.as_mut()
            && manager.state_name() == "running"
        {
            tracing::info!("stopping admission control");
            manager.stop().await.map_err(anyhow::Error::from)?;
        }
        Ok(())
    }

    /// Get the current aggregated health status.
    pub async fn health(&self) -> DaemonHealth {
        let mut modules = Vec::new();
        let mut policy_count = 0;
        match &self.admission {
            Some(manager) => {
                policy_count = manager
                    .current_state()
                    .map_or(0, |state| state.policy_count());
                modules.push(ModuleHealth {
                    name: ADMISSION_MODULE.to_owned(),
                    enabled: true,
                    status: manager.health_check().await,
                });
            }
            None => modules.push(ModuleHealth {
                name: ADMISSION_MODULE.to_owned(),
                enabled: false,
                status: kubeward_core::pipeline::HealthStatus::Healthy,
            }),
        }

        let uptime_secs = self.start_time.elapsed().as_secs();
        DaemonHealth {
            status: aggregate_status(&modules),
            uptime_secs,
            policy_count,
            modules,
        }
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &KubewardConfig {
        &self.config
    }

    /// The admission manager, when enabled.
    pub fn admission(&self) -> Option<&AdmissionManager<OfflineConnector>> {
        self.admission.as_ref()
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

fn reload_signal() -> Result<tokio::signal::unix::Signal> {
    use tokio::signal::unix::{SignalKind, signal};

    signal(SignalKind::hangup())
        .map_err(|e| anyhow::anyhow!("failed to install SIGHUP handler: {}", e))
}

/// Log every alert batch produced by admission reviews.
///
/// Remaining batches are drained once shutdown is signalled.
fn spawn_alert_logger(
    mut alert_rx: mpsc::Receiver<AlertBatch>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                batch = alert_rx.recv() => match batch {
                    Some(batch) => log_alert_batch(&batch),
                    None => {
                        tracing::debug!("alert channel closed");
                        break;
                    }
                },
                _ = shutdown_rx.recv() => {
                    while let Ok(batch) = alert_rx.try_recv() {
                        log_alert_batch(&batch);
                    }
                    tracing::debug!("alert logger shutting down");
                    break;
                }
            }
        }
    })
}

fn log_alert_batch(batch: &AlertBatch) {
    for alert in &batch.alerts {
        tracing::warn!(
            batch_id = %batch.id,
            trace_id = %batch.metadata.trace_id,
            request_uid = batch.request_uid.as_deref().unwrap_or(""),
            policy = %alert.policy.name,
            stage = %alert.lifecycle_stage,
            violations = alert.violations.len(),
            "{}",
            alert
        );
    }
}

fn record_daemon_metrics() {
    use kubeward_core::metrics as m;

    metrics::gauge!(m::DAEMON_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

fn spawn_uptime_updater(
    start_time: Instant,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    use kubeward_core::metrics as m;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(15));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    #[allow(clippy::cast_precision_loss)]
                    metrics::gauge!(m::DAEMON_UPTIME_SECONDS)
                        .set(start_time.elapsed().as_secs() as f64);
                }
                _ = shutdown_rx.recv() => break,
            }
        }
    })
}
