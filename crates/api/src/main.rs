use quillpost_api::bootstrap::ensure_admin;
use quillpost_api::config::StoreBackend;
use quillpost_api::{router, AppConfig, AppState};
use quillpost_auth::TokenService;
use quillpost_core::{MemoryRepository, PgRepository};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quillpost_api=info,quillpost_auth=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let tokens = Arc::new(TokenService::new(config.jwt.clone()));

    let state = match config.store {
        StoreBackend::Postgres => {
            let database_url = config.database_url.as_deref().unwrap_or_default();
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(database_url)
                .await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("Connected to Postgres and applied migrations");

            let repo = Arc::new(PgRepository::new(pool));
            AppState {
                users: repo.clone(),
                blogs: repo,
                tokens,
            }
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            let repo = Arc::new(MemoryRepository::new());
            AppState {
                users: repo.clone(),
                blogs: repo,
                tokens,
            }
        }
    };

    if let Some(admin) = &config.bootstrap_admin {
        if let Err(e) = ensure_admin(state.users.as_ref(), admin).await {
            tracing::error!("Failed to bootstrap admin account: {}", e);
            std::process::exit(1);
        }
    }

    let app = router(Arc::new(state), config.request_timeout);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Quillpost API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
