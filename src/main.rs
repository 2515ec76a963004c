use bootcamp_api::app::{app, AppState};
use bootcamp_api::config;
use bootcamp_api::database::DatabaseManager;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();

    let default_filter = if config.api.enable_request_logging {
        "bootcamp_api=info,tower_http=info"
    } else {
        "bootcamp_api=info,tower_http=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    tracing::info!("Starting Bootcamp API in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set outside development");
    }

    let pool = DatabaseManager::connect().await?;
    if config.database.run_migrations {
        DatabaseManager::migrate(&pool).await?;
    }

    let app = app(AppState::from_config(pool, config));

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("Bootcamp API listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
