use std::sync::Arc;

use anyhow::Result;
use auth::{
    AppState,
    config::Settings,
    credentials::PgCredentialRepository,
    jwt::JwtService,
    rate_limiter::{RateLimiter, RateLimiterConfig},
    routes,
};
use common::{database, telemetry, token::JwtConfig};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();

    info!("Starting authentication service");

    let settings = Settings::from_env()?;

    let db_config = database::DatabaseConfig::from_env()?;
    let pool = database::init_pool(&db_config).await?;

    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    let jwt_service = JwtService::new(&JwtConfig::from_env()?)?;
    let rate_limiter = RateLimiter::new(RateLimiterConfig::default());
    info!(
        "Login rate limit: {} attempts per {} seconds",
        rate_limiter.config().max_attempts,
        rate_limiter.config().window.as_secs()
    );

    let app_state = AppState {
        jwt_service,
        credentials: Arc::new(PgCredentialRepository::new(pool)),
        rate_limiter,
    };

    let app = routes::create_router(app_state);

    let address = settings.bind_address();
    let listener = TcpListener::bind(&address).await?;
    info!("Authentication service listening on {}", address);

    axum::serve(listener, app).await?;

    Ok(())
}
