#[cfg(not(any(all(target_os = "macos", target_arch = "aarch64"), target_os = "ios")))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use axum::{Router, routing::get};
use dotenv::dotenv;
use neuroscan_model::onnx;
use neuroscan_storage::ScanStore;
use neuroscan_web::{construct_router, state::State};
use std::sync::Arc;

mod config;
mod metrics;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    metrics::init_telemetry();

    tracing::info!("Starting NeuroScan AI API");

    let config = config::Config::from_env()?;
    tracing::info!(
        "Loaded configuration: model={}, uploads={}, img_size={}",
        config.model_path.display(),
        config.upload_dir.display(),
        config.img_size
    );

    // Loading failures leave the server up with inference disabled
    let model = onnx::load(&config.onnx());
    if !model.is_ready() {
        tracing::warn!("Serving without a model; uploads will fail until restart");
    }

    let store = ScanStore::open(&config.upload_dir)?;

    let state = Arc::new(
        State::new(model, Arc::new(store)).with_max_upload_bytes(config.max_upload_bytes),
    );

    let app = Router::new()
        .route("/metrics", get(metrics::handler))
        .merge(construct_router(state));

    let addr = config.bind_addr();
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
