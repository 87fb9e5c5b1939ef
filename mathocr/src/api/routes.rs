use std::convert::Infallible;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::middleware::{payload_too_large_as_json, rate_limit_middleware};
use super::openapi;
use super::AppState;

pub fn create_router(state: AppState) -> Router {
    // axum's 2 MB default would otherwise cap multipart bodies below the configured limit.
    let ocr = post(handlers::ocr::extract_text)
        .layer::<_, Infallible>(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.config.uploads.max_body_bytes));

    Router::new()
        .route("/", get(handlers::index))
        .route("/ocr", ocr)
        .route("/health", get(handlers::health_check))
        .route("/openapi.json", get(openapi::openapi_json))
        .layer(middleware::map_response(payload_too_large_as_json))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
