use action_flow::{FlowRunner, InMemorySessionStorage, PostgresSessionStorage, SessionStorage};
use action_flow_server::{AppState, app, config::ServerConfig, demo};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing, JSON unless `LOG_FORMAT=pretty`
fn init_tracing(log_format: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "action_flow_server=debug,action_flow=debug,tower_http=debug".into()
    });

    match log_format {
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        _ => {
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

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?;
    init_tracing(&config.log_format);

    let session_storage: Arc<dyn SessionStorage> = match config.database_url.as_deref() {
        Some(database_url) => {
            info!("Using PostgreSQL session storage");
            match PostgresSessionStorage::connect(database_url).await {
                Ok(postgres_storage) => Arc::new(postgres_storage),
                Err(e) => {
                    error!(
                        "Failed to connect to PostgreSQL: {}. Falling back to in-memory storage.",
                        e
                    );
                    Arc::new(InMemorySessionStorage::new())
                }
            }
        }
        None => {
            info!("Using in-memory session storage (set DATABASE_URL to use PostgreSQL)");
            Arc::new(InMemorySessionStorage::new())
        }
    };

    let registration = Arc::new(demo::registration_package(config.flow.clone())?);
    let state = AppState::new(session_storage.clone())
        .with_runner(FlowRunner::new(registration, session_storage));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Server running on http://{}", config.bind_addr);

    axum::serve(listener, app(state)).await?;
    Ok(())
}
