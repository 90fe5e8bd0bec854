use std::sync::Arc;

use anyhow::Result;
use domain::services::{MockStylistService, StylistService};
use persistence::repositories::ClosetRepository;
use tracing::{info, warn};

use squadvibe_api::app::{self, AppState};
use squadvibe_api::config;
use squadvibe_api::middleware;
use squadvibe_api::services::{self, GeminiStylist, ImageFetcher, ImageSearchClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Load configuration
    let config = config::Config::load()?;

    // Initialize logging and metrics
    middleware::logging::init_logging(&config.logging);
    middleware::init_metrics();

    info!("Starting SquadVibe API v{}", env!("CARGO_PKG_VERSION"));

    // Create database pool
    let pool = persistence::db::create_pool(&config.database.pool_config()).await?;

    // Run migrations
    info!("Running database migrations...");
    persistence::db::run_migrations(&pool).await?;
    info!("Migrations completed");

    let images = ImageFetcher::new(&config.image_search)?;
    let photos = ImageSearchClient::new(&config.image_search)?;

    let stylist: Arc<dyn StylistService> = if config.genai.is_configured() {
        info!(base_url = %config.genai.base_url, "Using Gemini stylist");
        Arc::new(GeminiStylist::new(
            config.genai.clone(),
            images.clone(),
            photos,
        )?)
    } else {
        warn!("SV__GENAI__API_KEY is not set - running with the offline mock stylist");
        Arc::new(MockStylistService::new())
    };

    if config.studio.seed_default_wardrobe {
        let closet = ClosetRepository::new(pool.clone());
        services::seed_default_wardrobe(&closet, &images).await?;
    }

    let addr = config.socket_addr()?;

    // Build application
    let state = AppState::new(config, pool, stylist);
    state.initialize().await?;
    let app = app::create_app(state);

    // Start server
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
