use serde_json::json;

use food_aesthetics::ImageFormat;

use crate::routes::ApiResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

pub fn root() -> ApiResponse {
    let formats: Vec<&str> = ImageFormat::SUPPORTED.iter().map(|f| f.as_str()).collect();
    ApiResponse::ok(json!({
        "message": "Food Aesthetics API",
        "version": env!("CARGO_PKG_VERSION"),
        "supported_formats": formats,
        "endpoints": {
            "/score": "POST - Send base64 image data and get an aesthetic score",
            "/score-batch": "POST - Send multiple base64 images for batch scoring",
            "/score-file": "POST - Upload an image file (multipart) and get its score",
            "/health": "GET - Check API health and model status"
        }
    }))
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Readiness probe.  Never runs inference.
pub fn health(state: &AppState) -> ApiResponse {
    if !state.scorer.is_ready() {
        return ApiResponse::error(503, "Model not loaded");
    }
    ApiResponse::ok(json!({
        "status": "healthy",
        "model_loaded": true,
        "message": "Food Aesthetics model is ready"
    }))
}
