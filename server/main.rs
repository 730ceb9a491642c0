/// Food aesthetics HTTP service
///
/// Scores food photographs sent as base64 JSON or multipart uploads.
/// Served by a synchronous tiny_http server.
///
/// Run with:
///   cargo run --bin server --release
/// Then POST to http://127.0.0.1:8000/score
///
/// Endpoints:
///   GET  /             service description
///   GET  /health       503 until the model has loaded
///   POST /score        one base64 image
///   POST /score-batch  a list of base64 images
///   POST /score-file   one multipart image upload

mod state;
mod routes;
mod handlers;
mod util;

use std::sync::Arc;

use anyhow::{anyhow, Result};
use tiny_http::Server;
use tracing::{error, info};

use food_aesthetics::{logging, ScoringNetwork, ServiceConfig};

use state::AppState;

fn main() -> Result<()> {
    logging::init();
    let config = ServiceConfig::load()?;

    let server = Server::http(config.bind_addr.as_str())
        .map_err(|e| anyhow!("failed to bind {}: {}", config.bind_addr, e))?;
    info!(addr = %config.bind_addr, model = %config.model_path, "food aesthetics service listening");

    let shared_state = Arc::new(AppState::new(config));

    // The model loads in the background; until it is installed every
    // scoring route and /health answer 503.
    let loader_state = shared_state.clone();
    std::thread::spawn(move || {
        let path = loader_state.config.model_path.clone();
        let installed = ScoringNetwork::load_json(&path)
            .and_then(|net| loader_state.scorer.install_model(Arc::new(net)));
        match installed {
            Ok(()) => info!(path = %path, "model loaded"),
            Err(e) => error!(path = %path, error = %e, "model failed to load"),
        }
    });

    // One thread per request so a slow batch does not stall health checks.
    for request in server.incoming_requests() {
        let state_clone = shared_state.clone();
        std::thread::spawn(move || {
            routes::dispatch(request, state_clone);
        });
    }
    Ok(())
}
