use std::net::SocketAddr;

use anyhow::Result;
use tracing::{info, warn};

use api::{
    AppState,
    config::{Settings, StorageBackend},
    routes,
};
use common::{
    database::{DatabaseConfig, init_pool},
    error::DatabaseError,
    telemetry,
    token::{JwtConfig, TokenKeys},
};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();

    info!("Starting API service");

    let settings = Settings::from_env()?;
    let token_keys = TokenKeys::from_config(&JwtConfig::from_env()?)?;

    let state = match settings.storage {
        StorageBackend::Postgres => {
            let db_config = DatabaseConfig::from_env()?;
            let pool = init_pool(&db_config).await?;

            // Check database connectivity
            if common::database::health_check(&pool).await? {
                info!("Database connection successful");
            } else {
                anyhow::bail!("Failed to connect to database");
            }

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|e| DatabaseError::Migration(e.to_string()))?;
            info!("Database migrations applied");

            AppState::postgres(pool, token_keys)
        }
        StorageBackend::Memory => {
            warn!("Running with in-memory storage; data is lost on shutdown");
            AppState::in_memory(token_keys)
        }
    };

    let app = routes::create_router(state)?;

    let address = settings.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("API service listening on {}", address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
