use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info};

use crate::config::SchedulerConfig;
use crate::services::scanner::SubscriptionScanner;

/// Drives the subscription scanner on a fixed cadence.
///
/// The scan is awaited inline, so a cycle that overruns the interval simply
/// causes the missed ticks to be skipped; ticks are never queued. Scan-level
/// errors are logged and the loop continues to the next tick.
pub struct Scheduler {
    scanner: Arc<SubscriptionScanner>,
    config: SchedulerConfig,
    running: Arc<RwLock<bool>>,
}

impl Scheduler {
    #[must_use]
    pub fn new(scanner: Arc<SubscriptionScanner>, config: SchedulerConfig) -> Self {
        Self {
            scanner,
            config,
            running: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("Scheduler is disabled in config");
            return Ok(());
        }

        *self.running.write().await = true;
        info!("Starting subscription scheduler");

        if let Some(cron_expr) = &self.config.cron_expression {
            self.run_with_cron(cron_expr).await
        } else {
            self.run_with_interval().await
        }
    }

    async fn run_with_cron(&self, cron_expr: &str) -> Result<()> {
        let mut sched = JobScheduler::new().await?;

        let scanner = Arc::clone(&self.scanner);
        let running = Arc::clone(&self.running);

        // Overlap protection lives in the scanner itself; a cron firing
        // while a scan is in flight resolves to a skipped summary.
        let job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let scanner = Arc::clone(&scanner);
            let running = Arc::clone(&running);
            Box::pin(async move {
                if !*running.read().await {
                    return;
                }
                run_scan_job(&scanner).await;
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        info!("Scheduler running with cron: {}", cron_expr);

        loop {
            if !*self.running.read().await {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        sched.shutdown().await?;
        Ok(())
    }

    async fn run_with_interval(&self) -> Result<()> {
        let interval_mins = self.config.scan_interval_minutes.max(1);
        info!("Scheduler running: subscription scan every {}m", interval_mins);

        let mut scan_interval = interval(Duration::from_secs(u64::from(interval_mins) * 60));
        scan_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            scan_interval.tick().await;
            if !*self.running.read().await {
                break;
            }
            run_scan_job(&self.scanner).await;
        }

        Ok(())
    }

    pub async fn stop(&self) {
        info!("Stopping scheduler...");
        *self.running.write().await = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    pub async fn run_once(&self) -> Result<()> {
        info!("Running manual subscription scan...");
        let summary = self.scanner.scan().await?;
        info!(
            scanned = summary.scanned,
            transitions = summary.events.len(),
            "Manual scan complete"
        );
        Ok(())
    }
}

async fn run_scan_job(scanner: &SubscriptionScanner) {
    let start = std::time::Instant::now();
    info!(
        event = "job_started",
        job_name = "subscription_scan",
        "Starting scheduled subscription scan"
    );

    match scanner.scan().await {
        Ok(summary) if summary.skipped => {
            debug!(
                event = "job_skipped",
                job_name = "subscription_scan",
                "Previous scan still in flight"
            );
        }
        Ok(summary) => {
            info!(
                event = "job_finished",
                job_name = "subscription_scan",
                scanned = summary.scanned,
                failures = summary.failures,
                transitions = summary.events.len(),
                duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                "Scheduled subscription scan finished"
            );
        }
        Err(e) => {
            error!(
                event = "job_failed",
                job_name = "subscription_scan",
                error = %e,
                "Scheduled subscription scan failed"
            );
        }
    }
}
