use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};

use crate::config::Config;
use crate::db::Store;
use crate::domain::events::TransitionEvent;
use crate::services::{
    EntitlementService, SeaOrmEntitlementService, SubscriptionScanner,
};

/// Explicitly wired application state: every component receives its
/// dependencies here, nothing reaches for globals.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub entitlement_service: Arc<dyn EntitlementService>,

    pub scanner: Arc<SubscriptionScanner>,

    pub event_bus: broadcast::Sender<TransitionEvent>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let (event_bus, _) = broadcast::channel(config.general.event_bus_buffer_size);
        Self::with_event_bus(config, event_bus).await
    }

    pub async fn with_event_bus(
        config: Config,
        event_bus: broadcast::Sender<TransitionEvent>,
    ) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let config_arc = Arc::new(RwLock::new(config));

        let entitlement_service = Arc::new(SeaOrmEntitlementService::new(
            store.clone(),
            config_arc.clone(),
        )) as Arc<dyn EntitlementService + Send + Sync + 'static>;

        let scanner = Arc::new(SubscriptionScanner::new(
            store.clone(),
            entitlement_service.clone(),
            config_arc.clone(),
            event_bus.clone(),
        ));

        Ok(Self {
            config: config_arc,
            store,
            entitlement_service,
            scanner,
            event_bus,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }

    /// Receiver for subscription transition events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TransitionEvent> {
        self.event_bus.subscribe()
    }
}
