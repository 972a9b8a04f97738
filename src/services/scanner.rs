//! Periodic subscription scan over all registered users.
//!
//! The scanner resolves every user's entitlement with a bounded worker pool,
//! diffs the subscription-active flag against the last observed state, and
//! broadcasts a [`TransitionEvent`] the first time a user is seen expired.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use anyhow::Result;
use futures::{StreamExt, stream};
use tokio::sync::{Mutex, RwLock, broadcast};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::db::Store;
use crate::domain::UserId;
use crate::domain::events::TransitionEvent;
use crate::services::entitlement_service::EntitlementService;

/// Outcome of one scan cycle.
#[derive(Debug, Default)]
pub struct ScanSummary {
    /// Users whose entitlement resolved successfully this cycle.
    pub scanned: usize,
    /// Users skipped because their resolution failed.
    pub failures: usize,
    /// Transitions detected and broadcast this cycle.
    pub events: Vec<TransitionEvent>,
    /// True when the cycle was skipped because another scan was in flight.
    pub skipped: bool,
}

impl ScanSummary {
    const fn skipped() -> Self {
        Self {
            scanned: 0,
            failures: 0,
            events: Vec::new(),
            skipped: true,
        }
    }
}

pub struct SubscriptionScanner {
    store: Store,
    entitlements: Arc<dyn EntitlementService>,
    config: Arc<RwLock<Config>>,
    event_bus: broadcast::Sender<TransitionEvent>,

    /// Last observed subscription-active flag per user id. Written only from
    /// the single-threaded collection phase after concurrent resolution.
    last_observed: Mutex<HashMap<i64, bool>>,

    in_flight: AtomicBool,
}

impl SubscriptionScanner {
    #[must_use]
    pub fn new(
        store: Store,
        entitlements: Arc<dyn EntitlementService>,
        config: Arc<RwLock<Config>>,
        event_bus: broadcast::Sender<TransitionEvent>,
    ) -> Self {
        Self {
            store,
            entitlements,
            config,
            event_bus,
            last_observed: Mutex::new(HashMap::new()),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Receiver for transition events emitted by future scans.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TransitionEvent> {
        self.event_bus.subscribe()
    }

    /// Runs one scan cycle.
    ///
    /// Never overlaps with itself: if another scan is still in flight the
    /// call returns a skipped summary instead of queueing. Per-user
    /// resolution failures are logged and do not abort the cycle.
    pub async fn scan(&self) -> Result<ScanSummary> {
        let Some(_guard) = ScanGuard::acquire(&self.in_flight) else {
            debug!("Subscription scan already in flight; skipping this cycle");
            return Ok(ScanSummary::skipped());
        };

        let started = Instant::now();
        let (include_banned, concurrency) = {
            let config = self.config.read().await;
            (
                config.scheduler.include_banned,
                config.scheduler.max_concurrent_resolutions.max(1),
            )
        };

        let user_ids = self.store.list_user_ids(include_banned).await?;
        info!(users = user_ids.len(), "Starting subscription scan");

        let resolutions: Vec<_> = stream::iter(user_ids.iter().copied())
            .map(|id| {
                let entitlements = Arc::clone(&self.entitlements);
                async move { (id, entitlements.resolve(UserId::new(id)).await) }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut summary = ScanSummary::default();
        {
            let mut observed = self.last_observed.lock().await;

            for (id, result) in resolutions {
                match result {
                    Ok(entitlement) => {
                        summary.scanned += 1;
                        let was_active = observed
                            .insert(id, entitlement.is_active_subscription)
                            .unwrap_or(true);
                        if was_active && !entitlement.is_active_subscription {
                            summary.events.push(TransitionEvent::BecameExpired {
                                user_id: entitlement.user_id,
                                username: entitlement.username,
                                subscription_end_date: entitlement.subscription_end_date,
                            });
                        }
                    }
                    Err(e) => {
                        summary.failures += 1;
                        warn!(user_id = id, error = %e, "Skipping user for this scan cycle");
                    }
                }
            }

            // Entries for users that left the enumeration (deleted or newly
            // banned) are dropped so the map stays bounded by the live set.
            let live: HashSet<i64> = user_ids.iter().copied().collect();
            observed.retain(|id, _| live.contains(id));
        }

        for event in &summary.events {
            // A send error only means nobody is subscribed right now.
            let _ = self.event_bus.send(event.clone());
        }

        metrics::counter!("subscription_scans_total").increment(1);
        metrics::counter!("subscription_transitions_total")
            .increment(summary.events.len() as u64);
        metrics::histogram!("subscription_scan_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        info!(
            scanned = summary.scanned,
            failures = summary.failures,
            transitions = summary.events.len(),
            duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Subscription scan finished"
        );

        Ok(summary)
    }
}

/// Clears the in-flight flag when the scan ends, even on early return.
struct ScanGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ScanGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
