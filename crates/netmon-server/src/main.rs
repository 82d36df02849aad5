use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tokio::time::{interval, Duration};
use tracing_subscriber::EnvFilter;

use netmon_alert::engine::{AlertEngine, StalePolicy};
use netmon_notify::dispatcher::NotificationDispatcher;
use netmon_notify::registry::NotifierRegistry;
use netmon_server::config::ServerConfig;
use netmon_server::manager::{AlertManager, CycleReport};
use netmon_server::seed;
use netmon_storage::{AlertStore, MetricSource, MuteStore, SqliteStore};

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  netmon-server [config.toml]                            Start the server");
    eprintln!("  netmon-server evaluate <config.toml>                   Run one evaluation cycle and print a report");
    eprintln!("  netmon-server init-rules <config.toml> <seed.json>     Initialize alert rules from seed file");
    eprintln!("  netmon-server init-channels <config.toml> <seed.json>  Initialize notification channels from seed file");
}

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|e| anyhow::anyhow!("Failed to install default CryptoProvider: {e:?}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("netmon_server=info".parse()?)
                .add_directive("netmon_alert=info".parse()?)
                .add_directive("netmon_notify=info".parse()?)
                .add_directive("netmon_storage=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("evaluate") => {
            let config_path = args.get(2).cloned().ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("evaluate requires a config file")
            })?;
            run_evaluate(&config_path).await
        }
        Some("init-rules") => {
            let config_path = args.get(2).cloned().ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("init-rules requires a config file and a seed file")
            })?;
            let seed_path = args.get(3).cloned().ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("init-rules requires a config file and a seed file")
            })?;
            run_init_rules(&config_path, &seed_path)
        }
        Some("init-channels") => {
            let config_path = args.get(2).cloned().ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("init-channels requires a config file and a seed file")
            })?;
            let seed_path = args.get(3).cloned().ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("init-channels requires a config file and a seed file")
            })?;
            run_init_channels(&config_path, &seed_path)
        }
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        Some(other) => {
            if other.ends_with(".toml") {
                run_server(other).await
            } else {
                print_usage();
                Err(anyhow::anyhow!("unknown argument: {other}"))
            }
        }
        None => run_server("config/server.toml").await,
    }
}

fn load_config(path: &str) -> Result<ServerConfig> {
    let config = ServerConfig::load(path)
        .map_err(|e| anyhow::anyhow!("Failed to load config '{}': {}", path, e))?;
    netmon_common::id::init(config.id.machine_id, config.id.node_id);
    Ok(config)
}

fn build_manager(config: &ServerConfig) -> Result<AlertManager> {
    let store = Arc::new(SqliteStore::open(Path::new(&config.database_path))?);
    let metrics: Arc<dyn MetricSource> = store.clone();
    let alerts: Arc<dyn AlertStore> = store.clone();
    let mutes: Arc<dyn MuteStore> = store.clone();
    let engine = AlertEngine::new(metrics, alerts, mutes);

    let dispatcher = NotificationDispatcher::new(
        Arc::new(NotifierRegistry::default()),
        config.notify.max_concurrent,
        Duration::from_secs(config.notify.send_timeout_secs),
        Duration::from_secs(config.notify.dispatch_timeout_secs),
    );

    let stale_policy = StalePolicy {
        threshold_after: chrono::Duration::hours(config.engine.stale_after_hours as i64),
        status_change_after: config
            .engine
            .status_stale_after_hours
            .map(|hours| chrono::Duration::hours(hours as i64)),
    };

    Ok(AlertManager::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store,
        engine,
        dispatcher,
        stale_policy,
    ))
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = load_config(config_path)?;
    tracing::info!(
        database = %config.database_path,
        interval_secs = config.engine.interval_secs,
        "netmon-server starting"
    );

    let manager = Arc::new(build_manager(&config)?);

    let eval_manager = manager.clone();
    let eval_secs = config.engine.interval_secs.max(1);
    let eval_handle = tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(eval_secs));
        loop {
            tick.tick().await;
            if let Err(e) = eval_manager.evaluate_rules().await {
                tracing::error!(error = %e, "Evaluation cycle failed");
            }
        }
    });

    let maintenance_manager = manager.clone();
    let maintenance_secs = config.engine.maintenance_interval_secs.max(1);
    let maintenance_handle = tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(maintenance_secs));
        loop {
            tick.tick().await;
            match maintenance_manager.resolve_stale_alerts() {
                Ok(n) if n > 0 => tracing::info!(resolved = n, "Stale alerts auto-resolved"),
                Err(e) => tracing::error!(error = %e, "Stale alert sweep failed"),
                _ => {}
            }
            match maintenance_manager.cleanup_expired_mutes() {
                Ok(n) if n > 0 => tracing::info!(removed = n, "Expired mutes removed"),
                Err(e) => tracing::error!(error = %e, "Mute cleanup failed"),
                _ => {}
            }
        }
    });

    tracing::info!("Server started");
    signal::ctrl_c().await?;
    tracing::info!("Shutting down gracefully");

    eval_handle.abort();
    maintenance_handle.abort();
    tracing::info!("Server stopped");
    Ok(())
}

async fn run_evaluate(config_path: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let manager = build_manager(&config)?;
    let report = manager.evaluate_rules().await?;
    print_report(&report);
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_report(report: &CycleReport) {
    println!("Evaluation cycle complete");
    println!("  rules evaluated:      {}", report.rules_evaluated);
    println!("  device checks:        {}", report.devices_evaluated);
    println!("  metric errors:        {}", report.metric_errors);
    println!("  alerts triggered:     {}", report.alerts_triggered);
    println!("  notifications sent:   {}", report.notifications_sent);
    println!("  notifications failed: {}", report.notifications_failed);
}

fn run_init_rules(config_path: &str, seed_path: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let manager = build_manager(&config)?;
    let seed = seed::load_rules_seed(seed_path)?;
    seed::init_rules(&manager, seed)
}

fn run_init_channels(config_path: &str, seed_path: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let manager = build_manager(&config)?;
    let seed = seed::load_channels_seed(seed_path)?;
    seed::init_channels(&manager, seed)
}
