//! Pool monitor.
//!
//! A single scheduled sampler per pool: builds a snapshot, checks the
//! alert thresholds, drives the scaling attempt and logs the stats line.
//! The pool is held through a weak handle so the monitor never keeps a
//! shut-down pool alive.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use flexpool_config::{AlertConfig, MonitoringConfig};
use flexpool_domain::events::{metadata_keys, AlertKind, AlertLevel, AlertMetadata};
use flexpool_domain::ports::{ScalingDriver, SnapshotSource};
use flexpool_domain::value_objects::PoolSnapshot;

use crate::alert_bus::AlertBus;

pub struct PoolMonitor {
    shutdown_tx: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

struct MonitorContext {
    pool_name: String,
    monitoring: MonitoringConfig,
    alert: AlertConfig,
    source: Weak<dyn SnapshotSource>,
    scaler: Option<Arc<dyn ScalingDriver>>,
    bus: Arc<AlertBus>,
}

impl PoolMonitor {
    /// Spawns the monitor task. The first sample runs immediately, then
    /// every `monitoring_period_ms`.
    pub fn start(
        pool_name: String,
        monitoring: MonitoringConfig,
        alert: AlertConfig,
        source: Weak<dyn SnapshotSource>,
        scaler: Option<Arc<dyn ScalingDriver>>,
        bus: Arc<AlertBus>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let ctx = MonitorContext {
            pool_name,
            monitoring,
            alert,
            source,
            scaler,
            bus,
        };
        let handle = tokio::spawn(monitor_loop(ctx, shutdown_rx));
        Self {
            shutdown_tx,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Stops the sampler, waiting up to 5 seconds before aborting it.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let handle = self.handle.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(mut handle) = handle {
            if timeout(Duration::from_secs(5), &mut handle).await.is_err() {
                warn!("Monitor did not stop in time, aborting");
                handle.abort();
            }
        }
    }
}

async fn monitor_loop(ctx: MonitorContext, mut shutdown_rx: watch::Receiver<bool>) {
    let monitor_name = format!("{}-monitor", ctx.pool_name);
    let mut ticker = interval(Duration::from_millis(ctx.monitoring.monitoring_period_ms()));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let Some(source) = ctx.source.upgrade() else {
                    break;
                };
                if source.is_shutdown() {
                    break;
                }
                if let Err(e) = ctx.run_tick(source.as_ref()) {
                    ctx.publish(format!("Monitoring failed: {e}"), AlertLevel::Error, None);
                }
            }
        }
    }
    debug!(monitor = %monitor_name, "Monitor loop stopped");
}

impl MonitorContext {
    fn run_tick(&self, source: &dyn SnapshotSource) -> anyhow::Result<()> {
        if !self.monitoring.detailed_metrics_enabled() {
            return Ok(());
        }

        let snapshot = source.pool_snapshot();

        if self.monitoring.thread_metrics_enabled() && snapshot.pool_size > 0 {
            let usage_percent = (snapshot.active_threads as f64 / snapshot.pool_size as f64
                * 100.0) as u32;
            let threshold = self.alert.thread_pool_usage_threshold() as u32;
            if usage_percent > threshold {
                self.publish(
                    format!(
                        "Thread pool usage ({usage_percent}%) exceeded threshold ({threshold}%)"
                    ),
                    AlertLevel::Warning,
                    Some(&snapshot),
                );
            }
        }

        if self.monitoring.queue_metrics_enabled()
            && snapshot.queue_size > self.alert.queue_size_warning_threshold()
        {
            self.publish(
                format!(
                    "Queue size ({}) exceeded threshold ({})",
                    snapshot.queue_size,
                    self.alert.queue_size_warning_threshold()
                ),
                AlertLevel::Warning,
                Some(&snapshot),
            );
        }

        if let Some(scaler) = &self.scaler {
            scaler.attempt_scaling(&snapshot);
        }

        self.publish(
            format!("Thread pool stats: {}", snapshot.to_json()),
            AlertLevel::Info,
            Some(&snapshot),
        );

        Ok(())
    }

    /// Alerts below the configured minimum level are suppressed here,
    /// at the source, not at the bus.
    fn publish(&self, message: String, level: AlertLevel, snapshot: Option<&PoolSnapshot>) {
        if level < self.alert.minimum_alert_level() {
            return;
        }

        let message = format!("[ThreadPool: {}] {message}", self.pool_name);
        let mut metadata =
            AlertMetadata::new().with(metadata_keys::POOL_NAME, self.pool_name.as_str());
        if let Some(snapshot) = snapshot {
            metadata.insert(metadata_keys::ACTIVE_THREADS, snapshot.active_threads);
            metadata.insert(metadata_keys::POOL_SIZE, snapshot.pool_size);
            metadata.insert(metadata_keys::QUEUE_SIZE, snapshot.queue_size);
        }

        self.bus
            .publish_alert(message.clone(), level, AlertKind::Monitoring, metadata);

        match level {
            AlertLevel::Info => info!("{message}"),
            AlertLevel::Warning => warn!("{message}"),
            AlertLevel::Error | AlertLevel::Critical => error!("{message}"),
        }
    }
}
