use std::sync::Arc;

use anyhow::Context;
use dental_care_service::{AppState, LogFormat, ServiceConfig, build_router};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wizard_flow::{InMemorySessionStorage, PostgresSessionStorage, SessionStorage};

/// Initialize tracing; JSON unless LOG_FORMAT=pretty
fn init_tracing(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dental_care_service=debug,wizard_flow=debug,tower_http=debug".into());

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true),
                )
                .init();
        }
    }
}

/// PostgreSQL when DATABASE_URL is set and reachable, in-memory otherwise.
async fn session_storage(config: &ServiceConfig) -> Arc<dyn SessionStorage> {
    let Some(database_url) = &config.database_url else {
        info!("Using in-memory session storage (set DATABASE_URL to use PostgreSQL)");
        return Arc::new(InMemorySessionStorage::new());
    };

    info!("Using PostgreSQL session storage");
    match PostgresSessionStorage::connect(database_url).await {
        Ok(storage) => Arc::new(storage),
        Err(e) => {
            error!(
                "Failed to connect to PostgreSQL: {}. Falling back to in-memory storage.",
                e
            );
            Arc::new(InMemorySessionStorage::new())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env().context("invalid configuration")?;
    init_tracing(config.log_format);

    let storage = session_storage(&config).await;
    let app = build_router(AppState::new(storage, &config));

    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address))?;

    info!("Server running on http://{}", config.bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}
