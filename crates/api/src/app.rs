use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use chrono::Duration as ChronoDuration;
use domain::services::{
    IntakeService, SharedToasts, StudioOrchestrator, StudioSession, StylistService, ToastQueue,
};
use persistence::repositories::{ClosetRepository, SearchHistoryRepository, SquadRepository};
use persistence::CollectionStore;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, trace_id};
use crate::routes::{closet, health, history, squad, studio, toasts};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    pub studio: Arc<StudioOrchestrator>,
    pub intake: Arc<IntakeService>,
    pub toasts: SharedToasts,
}

impl AppState {
    pub fn new(config: Config, pool: SqlitePool, stylist: Arc<dyn StylistService>) -> Self {
        let toasts = SharedToasts::new(ToastQueue::new(
            config.studio.toast_capacity,
            ChronoDuration::milliseconds(config.studio.toast_ttl_ms),
        ));
        let session = StudioSession::new(config.studio.default_map_location());

        Self {
            pool,
            studio: Arc::new(StudioOrchestrator::new(
                session,
                stylist.clone(),
                toasts.clone(),
            )),
            intake: Arc::new(IntakeService::new(stylist, toasts.clone())),
            toasts,
            config: Arc::new(config),
        }
    }

    /// Reload squad and closet into the studio session, pruning stale
    /// references.
    pub async fn sync_studio(&self) -> Result<(), sqlx::Error> {
        let members = SquadRepository::new(self.pool.clone()).list_all().await?;
        let garments = ClosetRepository::new(self.pool.clone()).list_all().await?;
        self.studio.sync_collections(members, garments).await;
        Ok(())
    }

    /// Startup hydration: collections into the session, and the onboarding
    /// hint when there is no search history yet.
    pub async fn initialize(&self) -> Result<(), sqlx::Error> {
        self.sync_studio().await?;
        let first_run = SearchHistoryRepository::new(self.pool.clone())
            .is_empty()
            .await?;
        self.studio
            .with_session(|s| s.set_show_onboarding(first_run))
            .await;
        Ok(())
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let squad_routes = Router::new()
        .route(
            "/api/v1/squad",
            get(squad::list_members).post(squad::add_member),
        )
        .route("/api/v1/squad/:id", delete(squad::remove_member));

    let closet_routes = Router::new()
        .route(
            "/api/v1/closet",
            get(closet::list_garments).post(closet::add_garment),
        )
        .route("/api/v1/closet/tags", get(closet::list_tags))
        .route("/api/v1/closet/palette", get(closet::palette))
        .route("/api/v1/closet/:id", delete(closet::remove_garment));

    let history_routes = Router::new()
        .route("/api/v1/history", get(history::list_history))
        .route("/api/v1/history/:id", delete(history::remove_history));

    let studio_routes = Router::new()
        .route("/api/v1/studio", get(studio::get_snapshot))
        .route("/api/v1/studio/suggestions", get(studio::suggestions))
        // Search mode
        .route("/api/v1/studio/search", post(studio::search))
        .route(
            "/api/v1/studio/search/coordinates",
            post(studio::search_coordinates),
        )
        .route("/api/v1/studio/search/clear", post(studio::clear_search))
        .route("/api/v1/studio/history/:id", post(studio::apply_history))
        .route("/api/v1/studio/locate", post(studio::locate))
        .route("/api/v1/studio/places/:id", post(studio::select_place))
        .route(
            "/api/v1/studio/places/:id/recommendations",
            get(studio::recommendations),
        )
        // Detail mode
        .route("/api/v1/studio/detail/close", post(studio::close_detail))
        .route("/api/v1/studio/visualize", post(studio::visualize))
        // Compose mode
        .route("/api/v1/studio/back", post(studio::back_to_detail))
        .route(
            "/api/v1/studio/members/:id/assignment",
            put(studio::assign_garment),
        )
        .route(
            "/api/v1/studio/members/:id/include",
            post(studio::toggle_inclusion),
        )
        .route(
            "/api/v1/studio/members/:id/select",
            post(studio::select_member),
        )
        .route(
            "/api/v1/studio/members/:id/regenerate",
            post(studio::regenerate),
        )
        .route("/api/v1/studio/settings", put(studio::update_settings))
        .route("/api/v1/studio/render", post(studio::render))
        .route("/api/v1/studio/result/close", post(studio::close_result));

    let toast_routes = Router::new()
        .route("/api/v1/toasts", get(toasts::list_toasts))
        .route("/api/v1/toasts/:id", delete(toasts::dismiss_toast));

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(squad_routes)
        .merge(closet_routes)
        .merge(history_routes)
        .merge(studio_routes)
        .merge(toast_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware)) // Prometheus metrics
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id)) // Request ID and logging
        .layer(cors)
        .with_state(state)
}
