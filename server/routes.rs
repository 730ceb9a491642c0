use std::io::{Cursor, Read};

use serde_json::{json, Value};
use tiny_http::{Header, Method, Request, Response, StatusCode};
use tracing::{debug, warn};

use food_aesthetics::ServiceConfig;

use crate::handlers;
use crate::state::SharedState;

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

/// Handler output before it is turned into a tiny_http response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        ApiResponse { status: 200, body }
    }

    /// `{"detail": ...}` error body, the shape clients already parse.
    pub fn error(status: u16, detail: impl Into<String>) -> Self {
        ApiResponse { status, body: json!({ "detail": detail.into() }) }
    }
}

fn header(name: &str, value: &str) -> Option<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes()).ok()
}

fn cors_headers() -> Vec<Header> {
    [
        header("Access-Control-Allow-Origin", "*"),
        header("Access-Control-Allow-Methods", "GET, POST, OPTIONS"),
        header("Access-Control-Allow-Headers", "*"),
    ]
    .into_iter()
    .flatten()
    .collect()
}

pub fn json_response(api: ApiResponse) -> Response<Cursor<Vec<u8>>> {
    let bytes = api.body.to_string().into_bytes();
    let len = bytes.len();
    let mut headers = cors_headers();
    headers.extend(header("Content-Type", "application/json"));
    Response::new(StatusCode(api.status), headers, Cursor::new(bytes), Some(len), None)
}

fn preflight() -> Response<Cursor<Vec<u8>>> {
    Response::new(StatusCode(204), cors_headers(), Cursor::new(Vec::new()), Some(0), None)
}

pub fn not_found(path: &str) -> ApiResponse {
    ApiResponse::error(404, format!("no route for {}", path))
}

// ---------------------------------------------------------------------------
// Request dispatcher
// ---------------------------------------------------------------------------

fn content_type(request: &Request) -> String {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv("Content-Type"))
        .map(|h| h.value.as_str().to_owned())
        .unwrap_or_default()
}

/// Extra room for JSON/multipart framing on top of the encoded images.
const BODY_SLACK: usize = 64 * 1024;

/// Largest body accepted on `path`: the base64 size of as many images as the
/// route takes, plus framing.
pub fn body_limit(path: &str, config: &ServiceConfig) -> usize {
    let images = if path == "/score-batch" { config.max_batch_images } else { 1 };
    let encoded = (config.max_image_bytes / 3 + 1).saturating_mul(4);
    images.saturating_mul(encoded).saturating_add(BODY_SLACK)
}

#[derive(Debug)]
pub enum BodyError {
    TooLarge(usize),
    Io(std::io::Error),
}

/// Reads at most `limit` bytes.  A declared length over the limit is
/// rejected before anything is read.
pub fn read_limited<R: Read>(
    reader: R,
    declared: Option<usize>,
    limit: usize,
) -> Result<Vec<u8>, BodyError> {
    if declared.is_some_and(|len| len > limit) {
        return Err(BodyError::TooLarge(limit));
    }
    let mut body = Vec::with_capacity(declared.unwrap_or(0));
    reader
        .take(limit as u64 + 1)
        .read_to_end(&mut body)
        .map_err(BodyError::Io)?;
    if body.len() > limit {
        return Err(BodyError::TooLarge(limit));
    }
    Ok(body)
}

/// Routes one request and writes the response.
pub fn dispatch(mut request: Request, state: SharedState) {
    let method = request.method().clone();
    let url = request.url().to_owned();
    let path = url.split('?').next().unwrap_or("").to_owned();
    debug!(method = %method, path = %path, "request");

    if method == Method::Options {
        let _ = request.respond(preflight());
        return;
    }

    let api = match (&method, path.as_str()) {
        (Method::Get, "/") => handlers::info::root(),
        (Method::Get, "/health") => handlers::info::health(&state),
        (Method::Post, "/score") | (Method::Post, "/score-batch") | (Method::Post, "/score-file") => {
            let limit = body_limit(&path, &state.config);
            let declared = request.body_length();
            match read_limited(request.as_reader(), declared, limit) {
                Ok(body) => match path.as_str() {
                    "/score" => handlers::score::score(&body, &state),
                    "/score-batch" => handlers::score::score_batch(&body, &state),
                    _ => handlers::score::score_file(&content_type(&request), &body, &state),
                },
                Err(BodyError::TooLarge(limit)) => {
                    warn!(path = %path, declared = ?declared, limit, "request body too large");
                    ApiResponse::error(413, format!("request body exceeds {} bytes", limit))
                }
                Err(BodyError::Io(e)) => {
                    warn!(error = %e, "could not read request body");
                    ApiResponse::error(400, format!("could not read request body: {}", e))
                }
            }
        }
        _ => not_found(&path),
    };

    if let Err(e) = request.respond(json_response(api)) {
        warn!(error = %e, "failed to write response");
    }
}
