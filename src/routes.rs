use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    create_session, download_archive, export_selection, generate_scenarios, generate_videos,
    get_session, health, render_session_videos, update_selection,
};
use crate::pages::{app_script, gallery_page, index_page, scenarios_page, stylesheet};
use crate::state::AppState;
use crate::storage::PUBLIC_PREFIX;

pub fn create_router(state: AppState) -> Router {
    let page_routes = Router::new()
        .route("/", get(index_page))
        .route("/scenarios", get(scenarios_page))
        .route("/gallery", get(gallery_page))
        .route("/assets/app.css", get(stylesheet))
        .route("/assets/app.js", get(app_script));

    let session_routes = Router::new()
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id/selection", put(update_selection))
        .route("/api/sessions/:id/export", get(export_selection))
        .route("/api/sessions/:id/videos", post(render_session_videos))
        .route("/api/sessions/:id/archive", get(download_archive));

    let generation_routes = Router::new()
        .route("/generate", post(generate_scenarios))
        .route("/generate-videos", post(generate_videos));

    let max_body_size = state.config.max_body_size;
    let video_files = ServeDir::new(state.store().dir());

    Router::new()
        .merge(page_routes)
        .merge(session_routes)
        .merge(generation_routes)
        .route("/health", get(health))
        .nest_service(PUBLIC_PREFIX, video_files)
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
