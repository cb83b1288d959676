use axum::{
    Router,
    extract::{DefaultBodyLimit, MatchedPath, Request},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use state::AppState;
use std::time::Instant;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer,
};

pub mod error;
pub mod routes;
pub mod state;

pub use axum;
pub use error::ApiError;
pub use state::State;

/// Build the public router. Uploaded images are also mounted under
/// `/uploads` when the store lives on local disk.
pub fn construct_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(routes::home))
        .route("/upload-scan/", post(routes::scan::upload_scan))
        .route(
            "/scan-results/{scan_id}",
            get(routes::scan::get_scan_results),
        )
        .route(
            "/classifications/",
            get(routes::classifications::get_classifications),
        )
        .route("/health", get(routes::health::health))
        .route("/{file}", get(routes::scan::get_scan_image));

    if let Some(root) = state.store.root() {
        router = router.nest_service("/uploads", ServeDir::new(root));
    }

    router
        .route_layer(middleware::from_fn(track_metrics))
        .with_state(state.clone())
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn track_metrics(req: Request, next: Next) -> Response {
    let started = Instant::now();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());
    let method = req.method().to_string();

    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    let labels = [("method", method), ("path", path), ("status", status)];
    metrics::counter!("http_requests_total", &labels).increment(1);
    metrics::histogram!("http_request_duration_seconds", &labels)
        .record(started.elapsed().as_secs_f64());
    response
}
