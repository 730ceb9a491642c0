use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use food_aesthetics::{ImageFormat, ImageOutcome, RawImage, ScoreError};

use crate::routes::ApiResponse;
use crate::state::AppState;
use crate::util::multipart::{extract_boundary, extract_first_file};

fn default_format() -> String {
    "jpeg".to_string()
}

#[derive(Debug, Deserialize)]
struct ScoreRequest {
    image_data: String,
    #[serde(default = "default_format")]
    image_format: String,
}

/// Maps a pipeline error onto an HTTP status: bad input is the client's
/// problem, a missing model is temporary, anything else is ours.
fn status_for(error: &ScoreError) -> u16 {
    if error.is_bad_input() {
        400
    } else if error.is_retryable() {
        503
    } else {
        500
    }
}

fn error_response(error: &ScoreError) -> ApiResponse {
    ApiResponse::error(status_for(error), format!("Error processing image: {}", error))
}

fn not_ready() -> ApiResponse {
    ApiResponse::error(503, "Model not loaded")
}

// ---------------------------------------------------------------------------
// POST /score
// ---------------------------------------------------------------------------

pub fn score(body: &[u8], state: &AppState) -> ApiResponse {
    if !state.scorer.is_ready() {
        return not_ready();
    }
    let request: ScoreRequest = match serde_json::from_slice(body) {
        Ok(r) => r,
        Err(e) => return ApiResponse::error(400, format!("invalid request body: {}", e)),
    };

    let image = match RawImage::from_base64(&request.image_data, request.image_format.as_str()) {
        Ok(image) => image,
        Err(e) => return error_response(&e),
    };

    match state.scorer.score_one(&image) {
        Ok(scored) => ApiResponse::ok(json!({
            "aesthetic_score": scored.score.value(),
            "image_format": request.image_format,
            "image_size": scored.image_size(),
            "message": "Image scored successfully"
        })),
        Err(e) => {
            warn!(error = %e, "single image scoring failed");
            error_response(&e)
        }
    }
}

// ---------------------------------------------------------------------------
// POST /score-batch
// ---------------------------------------------------------------------------

fn failed_entry(index: usize, error: &ScoreError) -> Value {
    json!({
        "image_index": index,
        "error": format!("Failed to process image: {}", error),
        "error_kind": error.kind(),
    })
}

/// Scores a JSON list of `{image_data, image_format}` objects.  Entries that
/// are not objects or have no `image_data` are skipped but still counted in
/// `total_images`.
pub fn score_batch(body: &[u8], state: &AppState) -> ApiResponse {
    if !state.scorer.is_ready() {
        return not_ready();
    }
    let entries: Vec<Value> = match serde_json::from_slice(body) {
        Ok(Value::Array(entries)) => entries,
        Ok(_) => return ApiResponse::error(400, "request body must be a JSON list of images"),
        Err(e) => return ApiResponse::error(400, format!("invalid request body: {}", e)),
    };
    if entries.is_empty() {
        return ApiResponse::error(400, "No images provided");
    }
    let max = state.config.max_batch_images;
    if entries.len() > max {
        return ApiResponse::error(400, format!("Maximum {} images allowed per batch", max));
    }

    let mut results: Vec<(usize, Value)> = Vec::with_capacity(entries.len());
    let mut origin = Vec::with_capacity(entries.len());
    let mut images = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let Some(data) = entry.get("image_data").and_then(Value::as_str) else {
            continue;
        };
        let format = entry
            .get("image_format")
            .and_then(Value::as_str)
            .unwrap_or("jpeg");
        match RawImage::from_base64(data, format) {
            Ok(image) => {
                origin.push(index);
                images.push(image);
            }
            Err(e) => results.push((index, failed_entry(index, &e))),
        }
    }

    let batch = match state.scorer.score_many(&images) {
        Ok(batch) => batch,
        Err(e) => return error_response(&e),
    };
    for (outcome, &index) in batch.outcomes.iter().zip(&origin) {
        let value = match outcome {
            ImageOutcome::Scored(s) => json!({
                "image_index": index,
                "aesthetic_score": s.score.value(),
                "image_format": s.format,
                "image_size": s.image_size(),
            }),
            ImageOutcome::Failed(f) => failed_entry(index, &f.error),
        };
        results.push((index, value));
    }
    results.sort_by_key(|(index, _)| *index);

    let successful = results.iter().filter(|(_, v)| v.get("error").is_none()).count();
    info!(total = entries.len(), successful, "batch request scored");
    ApiResponse::ok(json!({
        "results": results.into_iter().map(|(_, v)| v).collect::<Vec<_>>(),
        "total_images": entries.len(),
        "successful_images": successful,
        "message": "Batch scoring completed"
    }))
}

// ---------------------------------------------------------------------------
// POST /score-file
// ---------------------------------------------------------------------------

/// `"image/JPEG; charset=binary"` -> `"image/jpeg"`.
fn mime_essence(content_type: &str) -> String {
    content_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase()
}

pub fn score_file(content_type: &str, body: &[u8], state: &AppState) -> ApiResponse {
    if !state.scorer.is_ready() {
        return not_ready();
    }
    let Some(boundary) = extract_boundary(content_type) else {
        return ApiResponse::error(400, "Invalid multipart request");
    };
    let part = match extract_first_file(body, &boundary) {
        Some(part) if !part.bytes.is_empty() => part,
        _ => return ApiResponse::error(400, "No image file was uploaded"),
    };

    let image = match part.content_type.as_deref().map(mime_essence) {
        Some(mime) if !mime.starts_with("image/") => {
            return ApiResponse::error(400, "File must be an image");
        }
        // An image subtype we do not know is left to content sniffing.
        Some(mime) if ImageFormat::parse(&mime).is_ok() => RawImage::new(part.bytes, mime),
        _ => RawImage::undeclared(part.bytes),
    };

    match state.scorer.score_one(&image) {
        Ok(scored) => ApiResponse::ok(json!({
            "filename": part.filename,
            "aesthetic_score": scored.score.value(),
            "image_size": scored.image_size(),
            "message": "Image scored successfully"
        })),
        Err(e) => error_response(&e),
    }
}
