//! Collector API server entry point

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use collector_api::config::Config;
use collector_api::db::{Database, run_seeds};
use collector_api::{AppState, build_app, entities};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "collector_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = Config::from_env()?;

    let registry = entities::registry();
    let db = Database::connect(&config.database_url, config.database_max_connections).await?;

    let sync = db.sync_schema(&registry).await;
    if !sync.errors.is_empty() {
        anyhow::bail!("Schema sync failed: {}", sync.errors.join("; "));
    }

    run_seeds(&db, &config).await;

    let addr = config.listen_addr;
    let state = AppState::new(config, db, registry);
    let app = build_app(state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
