//! Web demo running object detection on photos captured in the browser.

pub mod decode;
pub mod endpoints;
pub mod meter;
pub mod nn;
pub mod page;
pub mod pipeline;
pub mod render;
pub mod utils;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Router,
};

use endpoints::{detect_api, detect_page, healthcheck, index, AppState};

/// Build the HTTP router with all endpoints.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthcheck", get(healthcheck))
        .route("/detect", post(detect_page))
        .route("/api/detect", post(detect_api))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(Extension(state))
}
