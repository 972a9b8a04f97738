pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod entities;
pub mod services;
pub mod state;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tokio::sync::broadcast;
use tokio::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
pub use config::Config;
use domain::UserId;
use services::{EntitlementError, Scheduler};
use state::SharedState;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    config.validate()?;

    init_tracing(&config)?;

    if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let port = config.observability.metrics_port;
        PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], port))
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!("Prometheus metrics exporter listening on :{}", port);
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::Daemon => run_daemon(config).await,
        Commands::Scan => run_single_scan(config).await,
        Commands::Entitlement { user_id } => cmd_entitlement(config, user_id).await,
        Commands::Quota { user_id } => cmd_quota(config, user_id).await,
        Commands::Configs { user_id } => cmd_configs(config, user_id).await,
        Commands::Init => {
            Config::create_default_if_missing()?;
            println!("✓ Config file created. Edit config.toml and run again.");
            Ok(())
        }
    }
}

fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let (layer, task) = tracing_loki::builder()
            .label("app", "quotarr")?
            .extra_field("env", "production")?
            .build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    Ok(())
}

async fn run_daemon(config: Config) -> anyhow::Result<()> {
    info!(
        "Quotarr v{} starting in daemon mode...",
        env!("CARGO_PKG_VERSION")
    );

    let state = SharedState::new(config.clone()).await?;

    // Transition events are logged here in the same serialized form a
    // notifier transport would deliver; deployments that message users
    // subscribe to the same bus.
    let mut events = state.subscribe();
    let notifier_handle = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Ok(payload) = serde_json::to_string(&event) {
                        info!(%payload, "Subscription transition");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Notifier lagged behind the event bus");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let scheduler = Arc::new(Scheduler::new(
        state.scanner.clone(),
        config.scheduler.clone(),
    ));

    let mut scheduler_handle = {
        let sched = Arc::clone(&scheduler);
        tokio::spawn(async move {
            if let Err(e) = sched.start().await {
                error!("Scheduler error: {}", e);
            }
        })
    };

    info!("Daemon running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }

    scheduler.stop().await;

    let grace = Duration::from_secs(config.scheduler.shutdown_grace_seconds);
    if tokio::time::timeout(grace, &mut scheduler_handle)
        .await
        .is_err()
    {
        warn!("In-flight scan did not finish within grace period; cutting it off");
        scheduler_handle.abort();
    }

    notifier_handle.abort();
    info!("Daemon stopped");

    Ok(())
}

async fn run_single_scan(config: Config) -> anyhow::Result<()> {
    info!("Running single subscription scan...");

    let state = SharedState::new(config.clone()).await?;
    let scheduler = Scheduler::new(state.scanner.clone(), config.scheduler.clone());

    scheduler.run_once().await?;

    info!("Scan complete");
    Ok(())
}

async fn cmd_entitlement(config: Config, user_id: i64) -> anyhow::Result<()> {
    let state = SharedState::new(config).await?;

    match state
        .entitlement_service
        .resolve(UserId::new(user_id))
        .await
    {
        Ok(entitlement) => {
            println!("Entitlement for user {}", entitlement.user_id);
            println!("{:-<50}", "");
            println!("Username:          {}", entitlement.username);
            println!(
                "Banned:            {}",
                if entitlement.is_banned { "yes" } else { "no" }
            );
            println!(
                "Subscription:      {} (ends {})",
                if entitlement.is_active_subscription {
                    "active"
                } else {
                    "expired"
                },
                entitlement.subscription_end_date
            );
            println!("Configs created:   {}", entitlement.configs_created);
            println!("Bonus configs:     {}", entitlement.bonus_configs);
            println!("Configs remaining: {}", entitlement.configs_remaining);
            println!(
                "Registered at:     {}",
                entitlement.created_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
        Err(EntitlementError::UserNotFound(id)) => {
            println!("User {} is not registered.", id);
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

async fn cmd_quota(config: Config, user_id: i64) -> anyhow::Result<()> {
    let state = SharedState::new(config).await?;

    match state
        .entitlement_service
        .remaining_quota(UserId::new(user_id))
        .await
    {
        Ok(remaining) if remaining > 0 => {
            println!("User {} can create {} more configs.", user_id, remaining);
        }
        Ok(remaining) => {
            println!(
                "User {} has exhausted their allotment (remaining: {}).",
                user_id, remaining
            );
        }
        Err(EntitlementError::UserNotFound(id)) => {
            println!("User {} is not registered.", id);
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

async fn cmd_configs(config: Config, user_id: i64) -> anyhow::Result<()> {
    let state = SharedState::new(config).await?;

    let configs = state
        .entitlement_service
        .list_configs(UserId::new(user_id))
        .await?;

    if configs.is_empty() {
        println!("User {} has no configs.", user_id);
        return Ok(());
    }

    println!("Configs for user {} ({} total)", user_id, configs.len());
    println!("{:-<50}", "");
    for config_info in configs {
        println!(
            "#{:<6} {} ({})",
            config_info.id, config_info.config_name, config_info.config_uuid
        );
    }

    Ok(())
}
