use axum::http::{header, Method};
use tower_http::cors::{Any, CorsLayer};

/// Any origin may read and submit evaluations; nothing else is exposed.
pub fn fitscore_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(Any)
}
