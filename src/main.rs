use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use groupsync::store::postgres::PgStore;
use groupsync::{cli, config, jobs, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "groupsync=debug,tower_http=debug".into()),
    );
    let json_logs = std::env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false);
    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let cfg = config::load()?;
    let args = cli::Cli::parse();

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => {
            let port = port.unwrap_or(cfg.port);
            run_server(cfg, port).await
        }
        Some(cli::Commands::Sync) => run_once(cfg).await,
        None => {
            let port = cfg.port;
            run_server(cfg, port).await
        }
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

async fn connect_store(cfg: &config::Config) -> anyhow::Result<PgStore> {
    tracing::info!("Connecting to database...");
    let db = PgStore::connect(&cfg.database_url).await?;

    tracing::info!("Running migrations...");
    db.migrate().await?;
    Ok(db)
}

async fn run_server(cfg: config::Config, port: u16) -> anyhow::Result<()> {
    let db = connect_store(&cfg).await?;
    let state = Arc::new(AppState::new(cfg, Arc::new(db))?);

    // Warm the token cache so the first request does not pay for the grant.
    match state.gate.ensure_valid().await {
        Ok(()) => tracing::info!("Initial access token acquired"),
        Err(e) => tracing::warn!("Initial access token acquisition failed: {}", e),
    }

    if let Some(secs) = state.config.sync_interval_secs {
        jobs::scheduled_sync::spawn(state.reconciler.clone(), Duration::from_secs(secs));
        tracing::info!("Background sync job started (every {}s)", secs);
    }

    let app = groupsync::app(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("groupsync listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn run_once(cfg: config::Config) -> anyhow::Result<()> {
    let db = connect_store(&cfg).await?;
    let state = AppState::new(cfg, Arc::new(db))?;

    let report = state.reconciler.sync().await?;
    println!(
        "Security groups synced:\n  Fetched: {}\n  Created: {}\n  Updated: {}",
        report.fetched,
        report.created.len(),
        report.updated
    );
    for id in &report.created {
        println!("  + {}", id);
    }
    Ok(())
}
