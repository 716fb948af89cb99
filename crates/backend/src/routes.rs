use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::handlers::u501_imports;
use crate::system;
use crate::usecases::u501_file_import::ImportExecutor;

/// Uploaded spreadsheets may exceed axum's 2 MB default
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Общее состояние обработчиков
#[derive(Clone)]
pub struct AppState {
    pub import: Arc<ImportExecutor>,
}

fn import_routes() -> Router<AppState> {
    Router::new()
        .route("/templates", get(u501_imports::list_templates))
        .route("/templates/:id", get(u501_imports::get_template))
        .route(
            "/upload",
            post(u501_imports::upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/sessions", get(u501_imports::sessions))
        .route("/history", get(u501_imports::history))
        .route("/:upload_id", delete(u501_imports::delete_by_upload))
        .route("/:upload_id/mappings", post(u501_imports::configure_mappings))
        .route("/:upload_id/confirm", post(u501_imports::confirm))
        .route("/:upload_id/status", get(u501_imports::status))
        .route("/:upload_id/undo", delete(u501_imports::undo))
        .route_layer(middleware::from_fn(system::auth::middleware::require_auth))
}

/// Конфигурация всех роутов приложения
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION]);

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/api/imports", import_routes())
        .with_state(state)
        .layer(middleware::from_fn(
            system::middleware::request_logger::request_logger,
        ))
        .layer(cors)
}
